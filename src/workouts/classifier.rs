//! Workout classifier: turns the strain sample stream into reps, sets and
//! recovery time.
//!
//! The classifier is a synchronous state machine. It never sleeps or spawns;
//! every call returns the events it produced and the timer changes it needs.
//! Whoever owns it (see [`crate::workouts::session`]) runs those timers and
//! feeds expiries back through [`WorkoutClassifier::on_timer`]. Expiries for a
//! timer that has since been cancelled or replaced are ignored by id.

use crate::workouts::aggregator::{average, finalize_session};
use crate::workouts::types::{
    ClassifierConfig, RepDetector, StrainPoint, TimerAction, TimerId, TimerKind, WorkoutEvent,
    WorkoutMetrics, WorkoutSession, WorkoutState,
};
use chrono::{DateTime, Utc};

/// Events and timer changes produced by one classifier step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierOutput {
    pub events: Vec<WorkoutEvent>,
    pub timers: Vec<TimerAction>,
}

impl ClassifierOutput {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.timers.is_empty()
    }

    /// Append another step's output, keeping order.
    pub fn merge(&mut self, other: ClassifierOutput) {
        self.events.extend(other.events);
        self.timers.extend(other.timers);
    }
}

/// Workout state machine.
///
/// Starts `Paused` and unarmed. The first [`resume`](Self::resume) arms the
/// session and starts set 1; samples are ignored until then. Pause and
/// resume are driven only by commands, never by the signal.
pub struct WorkoutClassifier {
    config: ClassifierConfig,
    state: WorkoutState,
    /// Live recovery ticker, if any
    recovery_timer: Option<TimerId>,
    next_timer_id: u64,
}

impl WorkoutClassifier {
    /// Create a new classifier.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            state: WorkoutState::new(),
            recovery_timer: None,
            next_timer_id: 0,
        }
    }

    /// Create a new classifier with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default())
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Current live state.
    pub fn state(&self) -> &WorkoutState {
        &self.state
    }

    pub fn metrics(&self) -> WorkoutMetrics {
        self.state.metrics()
    }

    fn next_timer(&mut self) -> TimerId {
        self.next_timer_id += 1;
        TimerId(self.next_timer_id)
    }

    /// Process one decoded sample.
    pub fn process_sample(&mut self, sample: u16) -> ClassifierOutput {
        let mut out = ClassifierOutput::default();

        if !self.state.armed {
            tracing::trace!("Sample {} ignored: no session in progress", sample);
            return out;
        }
        // Zero is the idle reading
        if sample == 0 {
            return out;
        }

        let mut metrics_changed = false;
        self.state.sensor_value = sample;
        out.events.push(WorkoutEvent::SensorValue(sample));

        if sample > self.state.max_strain {
            self.state.max_strain = sample;
            out.events.push(WorkoutEvent::NewMaxStrain(sample));
            metrics_changed = true;
        }

        if self.state.is_paused {
            if metrics_changed {
                out.events.push(WorkoutEvent::MetricsUpdated(self.state.metrics()));
            }
            return out;
        }

        let on_grid = self
            .state
            .elapsed_ms
            .checked_rem(self.config.decimation_ms)
            .map_or(true, |r| r == 0);
        if on_grid {
            let point = StrainPoint {
                elapsed_ms: self.state.elapsed_ms,
                strain: sample.max(self.config.chart_floor),
            };
            self.state.points.push(point);
            out.events.push(WorkoutEvent::PointAppended(point));
        }
        self.state.elapsed_ms += self.config.sample_interval_ms;

        if sample >= self.config.rep_threshold && self.state.rep_detector == RepDetector::Armed {
            self.count_rep(sample, &mut out);
            metrics_changed = true;
        }

        if metrics_changed {
            out.events.push(WorkoutEvent::MetricsUpdated(self.state.metrics()));
        }
        out
    }

    /// Process a batch of samples in arrival order.
    pub fn process_samples(&mut self, samples: &[u16]) -> ClassifierOutput {
        let mut out = ClassifierOutput::default();
        for &sample in samples {
            out.merge(self.process_sample(sample));
        }
        out
    }

    fn count_rep(&mut self, sample: u16, out: &mut ClassifierOutput) {
        let state = &mut self.state;
        state.rep_count += 1;
        state.total_reps += 1;
        state.current_rep_strain_sum += u64::from(sample);
        state.total_rep_strain_sum += u64::from(sample);
        state.strain_per_rep = average(state.current_rep_strain_sum, state.rep_count);
        state.strain_per_set = average(state.total_rep_strain_sum, state.total_reps);

        tracing::debug!(
            "Rep {} counted (strain {}), strain per rep: {}",
            state.rep_count,
            sample,
            state.strain_per_rep
        );

        out.events.push(WorkoutEvent::RepCompleted {
            rep_count: state.rep_count,
            total_reps: state.total_reps,
            strain: sample,
        });

        let timer = self.next_timer();
        self.state.rep_detector = RepDetector::Debouncing { timer };
        out.timers.push(TimerAction::Arm {
            kind: TimerKind::RepDebounce,
            id: timer,
            period: self.config.rep_debounce,
        });
    }

    /// Enter recovery between sets.
    pub fn pause(&mut self) -> ClassifierOutput {
        let mut out = ClassifierOutput::default();

        if !self.state.armed || self.state.is_paused {
            tracing::debug!("Pause ignored: no active set");
            return out;
        }

        self.state.is_paused = true;
        self.state.rep_detector = RepDetector::Armed;
        out.timers.push(TimerAction::Cancel {
            kind: TimerKind::RepDebounce,
        });

        self.close_recovery_interval();
        let ticker = self.next_timer();
        self.recovery_timer = Some(ticker);
        out.timers.push(TimerAction::Arm {
            kind: TimerKind::RecoveryTick,
            id: ticker,
            period: self.config.recovery_tick,
        });

        out.events.push(WorkoutEvent::Paused);
        out.events.push(WorkoutEvent::MetricsUpdated(self.state.metrics()));

        tracing::info!("Data collection is now paused");
        out
    }

    /// Start the next set. The first call also starts the session.
    pub fn resume(&mut self) -> ClassifierOutput {
        let mut out = ClassifierOutput::default();

        if self.state.armed && !self.state.is_paused {
            tracing::debug!("Resume ignored: set already active");
            return out;
        }

        if self.recovery_timer.take().is_some() {
            out.timers.push(TimerAction::Cancel {
                kind: TimerKind::RecoveryTick,
            });
        }
        self.close_recovery_interval();

        let state = &mut self.state;
        state.armed = true;
        state.is_paused = false;
        state.set_count += 1;
        state.points.clear();
        state.elapsed_ms = 0;
        state.rep_count = 0;
        state.strain_per_rep = 0;
        state.current_rep_strain_sum = 0;
        state.rep_detector = RepDetector::Armed;

        out.events.push(WorkoutEvent::SetStarted {
            set_number: state.set_count,
        });
        out.events.push(WorkoutEvent::MetricsUpdated(state.metrics()));

        tracing::info!("Data collection is now resumed (set {})", state.set_count);
        out
    }

    /// Pause an active set, otherwise start the next one.
    pub fn toggle_pause(&mut self) -> ClassifierOutput {
        if self.state.armed && !self.state.is_paused {
            self.pause()
        } else {
            self.resume()
        }
    }

    /// Deliver a timer expiry.
    pub fn on_timer(&mut self, kind: TimerKind, id: TimerId) -> ClassifierOutput {
        let mut out = ClassifierOutput::default();

        match kind {
            TimerKind::RepDebounce => {
                if self.state.rep_detector == (RepDetector::Debouncing { timer: id }) {
                    self.state.rep_detector = RepDetector::Armed;
                    tracing::trace!("Rep detection re-armed");
                } else {
                    tracing::trace!("Stale rep debounce expiry {:?} ignored", id);
                }
            }
            TimerKind::RecoveryTick => {
                if self.recovery_timer == Some(id) {
                    self.state.recovery_seconds += 1;
                    out.events.push(WorkoutEvent::MetricsUpdated(self.state.metrics()));
                } else {
                    tracing::trace!("Stale recovery tick {:?} ignored", id);
                }
            }
        }
        out
    }

    /// Finalize the session and reset everything for the next one.
    pub fn end_session(&mut self, date: DateTime<Utc>) -> (WorkoutSession, ClassifierOutput) {
        let mut out = ClassifierOutput::default();
        out.timers.push(TimerAction::Cancel {
            kind: TimerKind::RepDebounce,
        });
        out.timers.push(TimerAction::Cancel {
            kind: TimerKind::RecoveryTick,
        });
        self.recovery_timer = None;

        self.close_recovery_interval();
        let session = finalize_session(&self.state, date);

        tracing::info!(
            "Session ended: {} sets, {} reps/set, max strain {}",
            session.sets,
            session.reps,
            session.max_strain
        );

        self.state = WorkoutState::new();
        out.events.push(WorkoutEvent::SessionEnded(session.clone()));
        out.events.push(WorkoutEvent::MetricsUpdated(self.state.metrics()));

        (session, out)
    }

    fn close_recovery_interval(&mut self) {
        self.state.total_recovery_seconds += self.state.recovery_seconds;
        self.state.recovery_seconds = 0;
    }
}

impl Default for WorkoutClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}
