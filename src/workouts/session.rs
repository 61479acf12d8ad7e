//! Workout session actor.
//!
//! A single tokio task owns the [`WorkoutClassifier`]. Frames, commands and
//! timer expiries all arrive as [`SessionCommand`]s on one inbox and are
//! handled strictly in order, so no two mutations of the workout state ever
//! interleave. Timers are tokio tasks that post `TimerFired` back to the same
//! inbox; re-arming or cancelling a kind aborts the previous task.

use crate::sensors::strain::decode_frame;
use crate::workouts::classifier::{ClassifierOutput, WorkoutClassifier};
use crate::workouts::types::{
    ClassifierConfig, TimerAction, TimerId, TimerKind, WorkoutError, WorkoutEvent,
    WorkoutSession, WorkoutState,
};
use crossbeam::channel::{Receiver, Sender};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Messages handled by the session actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// Raw notification frame from the sensor link
    Frame(Vec<u8>),
    /// Already decoded samples
    Samples(Vec<u16>),
    Pause,
    Resume,
    TogglePause,
    /// Finalize the session and reply with the record
    EndSession(oneshot::Sender<WorkoutSession>),
    /// Reply with a copy of the live state
    Snapshot(oneshot::Sender<WorkoutState>),
    /// Register an event subscriber
    Subscribe(Sender<WorkoutEvent>),
    /// A timer armed by the classifier expired
    TimerFired { kind: TimerKind, id: TimerId },
    /// Stop the actor
    Shutdown,
}

/// Cloneable handle to a running session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> Result<(), WorkoutError> {
        self.tx.send(command).map_err(|_| WorkoutError::ActorStopped)
    }

    /// Queue a raw frame for decoding and classification.
    pub fn submit_frame(&self, frame: Vec<u8>) -> Result<(), WorkoutError> {
        self.send(SessionCommand::Frame(frame))
    }

    /// Queue decoded samples for classification.
    pub fn submit_samples(&self, samples: Vec<u16>) -> Result<(), WorkoutError> {
        self.send(SessionCommand::Samples(samples))
    }

    pub fn pause(&self) -> Result<(), WorkoutError> {
        self.send(SessionCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), WorkoutError> {
        self.send(SessionCommand::Resume)
    }

    pub fn toggle_pause(&self) -> Result<(), WorkoutError> {
        self.send(SessionCommand::TogglePause)
    }

    /// Finalize the current session. Everything queued before this call is
    /// processed first.
    pub async fn end_session(&self) -> Result<WorkoutSession, WorkoutError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::EndSession(reply_tx))?;
        reply_rx.await.map_err(|_| WorkoutError::ActorStopped)
    }

    /// Copy of the live state after everything queued so far.
    pub async fn snapshot(&self) -> Result<WorkoutState, WorkoutError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| WorkoutError::ActorStopped)
    }

    /// Get a receiver for workout events.
    pub fn subscribe(&self) -> Result<Receiver<WorkoutEvent>, WorkoutError> {
        let (tx, rx) = crossbeam::channel::unbounded();
        self.send(SessionCommand::Subscribe(tx))?;
        Ok(rx)
    }

    /// Ask the actor to stop after the commands already queued.
    pub fn shutdown(&self) -> Result<(), WorkoutError> {
        self.send(SessionCommand::Shutdown)
    }
}

/// Owner of the workout classifier and its timers.
pub struct SessionActor {
    classifier: WorkoutClassifier,
    inbox: mpsc::UnboundedReceiver<SessionCommand>,
    /// Weak so that timers alone never keep the actor alive
    timer_tx: mpsc::WeakUnboundedSender<SessionCommand>,
    subscribers: Vec<Sender<WorkoutEvent>>,
    rep_timer: Option<JoinHandle<()>>,
    recovery_ticker: Option<JoinHandle<()>>,
}

impl SessionActor {
    /// Create an actor and its handle without starting it.
    pub fn new(config: ClassifierConfig) -> (Self, SessionHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let actor = Self {
            classifier: WorkoutClassifier::new(config),
            inbox,
            timer_tx: tx.downgrade(),
            subscribers: Vec::new(),
            rep_timer: None,
            recovery_ticker: None,
        };
        (actor, SessionHandle { tx })
    }

    /// Create an actor and run it on the current tokio runtime.
    pub fn spawn(config: ClassifierConfig) -> (SessionHandle, JoinHandle<()>) {
        let (actor, handle) = Self::new(config);
        let task = tokio::spawn(actor.run());
        (handle, task)
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("Workout session actor started");

        while let Some(command) = self.inbox.recv().await {
            match command {
                SessionCommand::Frame(frame) => match decode_frame(&frame) {
                    Ok(samples) => {
                        let out = self.classifier.process_samples(&samples);
                        self.apply(out);
                    }
                    Err(e) => tracing::warn!("Dropping frame: {}", e),
                },
                SessionCommand::Samples(samples) => {
                    let out = self.classifier.process_samples(&samples);
                    self.apply(out);
                }
                SessionCommand::Pause => {
                    let out = self.classifier.pause();
                    self.apply(out);
                }
                SessionCommand::Resume => {
                    let out = self.classifier.resume();
                    self.apply(out);
                }
                SessionCommand::TogglePause => {
                    let out = self.classifier.toggle_pause();
                    self.apply(out);
                }
                SessionCommand::EndSession(reply) => {
                    let (session, out) = self.classifier.end_session(chrono::Utc::now());
                    self.apply(out);
                    if reply.send(session).is_err() {
                        tracing::warn!("Session ended but the requester went away");
                    }
                }
                SessionCommand::Snapshot(reply) => {
                    if reply.send(self.classifier.state().clone()).is_err() {
                        tracing::warn!("Snapshot taken but the requester went away");
                    }
                }
                SessionCommand::Subscribe(tx) => self.subscribers.push(tx),
                SessionCommand::TimerFired { kind, id } => {
                    let out = self.classifier.on_timer(kind, id);
                    self.apply(out);
                }
                SessionCommand::Shutdown => break,
            }
        }

        self.stop_timer(TimerKind::RepDebounce);
        self.stop_timer(TimerKind::RecoveryTick);
        tracing::info!("Workout session actor stopped");
    }

    fn apply(&mut self, out: ClassifierOutput) {
        for action in out.timers {
            match action {
                TimerAction::Arm { kind, id, period } => self.arm_timer(kind, id, period),
                TimerAction::Cancel { kind } => self.stop_timer(kind),
            }
        }
        self.broadcast(out.events);
    }

    fn broadcast(&mut self, events: Vec<WorkoutEvent>) {
        if events.is_empty() {
            return;
        }
        // Drop subscribers whose receiver is gone
        self.subscribers
            .retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<JoinHandle<()>> {
        match kind {
            TimerKind::RepDebounce => &mut self.rep_timer,
            TimerKind::RecoveryTick => &mut self.recovery_ticker,
        }
    }

    fn arm_timer(&mut self, kind: TimerKind, id: TimerId, period: Duration) {
        let tx = self.timer_tx.clone();
        let task = match kind {
            TimerKind::RepDebounce => tokio::spawn(async move {
                tokio::time::sleep(period).await;
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(SessionCommand::TimerFired { kind, id });
                }
            }),
            TimerKind::RecoveryTick => tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                loop {
                    ticker.tick().await;
                    let Some(tx) = tx.upgrade() else { break };
                    if tx.send(SessionCommand::TimerFired { kind, id }).is_err() {
                        break;
                    }
                }
            }),
        };

        if let Some(previous) = self.slot(kind).replace(task) {
            previous.abort();
        }
        tracing::trace!("Armed {} {:?} for {:?}", kind, id, period);
    }

    fn stop_timer(&mut self, kind: TimerKind) {
        if let Some(task) = self.slot(kind).take() {
            task.abort();
            tracing::trace!("Stopped {}", kind);
        }
    }
}
