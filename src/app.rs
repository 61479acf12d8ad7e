//! Headless application: wires the sensor link, the workout session actor
//! and session storage together, driven by line commands on stdin.

use anyhow::Context;
use crossbeam::channel::Receiver;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use strainsense::recording::{
    export_points_csv_to_file, export_sessions_csv_to_file, generate_csv_filename,
};
use strainsense::sensors::types::{ConnectionState, LinkEvent};
use strainsense::storage::config::{load_config, AppConfig};
use strainsense::workouts::types::{WorkoutEvent, WorkoutSession};
use strainsense::{SessionActor, SessionHandle, SessionStore, StrainLink};
use tokio::sync::mpsc;

/// A command typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a new scan for the sensor
    Scan,
    /// Disconnect the sensor
    Disconnect,
    /// Toggle between set and recovery
    Toggle,
    Pause,
    Resume,
    /// Finalize and store the current session
    End,
    /// Print the live metrics
    Status,
    /// Print stored sessions
    List,
    /// Delete stored sessions by list position
    Delete(Vec<usize>),
    /// Export a stored session's trace
    Export {
        position: usize,
        path: Option<PathBuf>,
    },
    /// Export the summary of every stored session
    ExportAll { path: Option<PathBuf> },
    Help,
    Quit,
}

impl AppCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match name.to_lowercase().as_str() {
            "scan" | "connect" => AppCommand::Scan,
            "disconnect" => AppCommand::Disconnect,
            "toggle" | "t" => AppCommand::Toggle,
            "pause" => AppCommand::Pause,
            "resume" | "start" => AppCommand::Resume,
            "end" | "finish" => AppCommand::End,
            "status" | "s" => AppCommand::Status,
            "list" | "ls" => AppCommand::List,
            "delete" | "rm" => {
                let positions = words
                    .map(|w| w.parse::<usize>().map_err(|_| format!("bad position: {}", w)))
                    .collect::<Result<Vec<_>, _>>()?;
                if positions.is_empty() {
                    return Err("delete needs at least one position".to_string());
                }
                AppCommand::Delete(positions)
            }
            "export" => {
                let position = words
                    .next()
                    .ok_or_else(|| "export needs a position".to_string())?;
                let position = position
                    .parse::<usize>()
                    .map_err(|_| format!("bad position: {}", position))?;
                AppCommand::Export {
                    position,
                    path: words.next().map(PathBuf::from),
                }
            }
            "export-all" => AppCommand::ExportAll {
                path: words.next().map(PathBuf::from),
            },
            "help" | "?" => AppCommand::Help,
            "quit" | "exit" | "q" => AppCommand::Quit,
            other => return Err(format!("unknown command: {}", other)),
        };

        Ok(command)
    }
}

const HELP: &str = "commands: scan, disconnect, toggle, pause, resume, end, status, list, \
delete <n>..., export <n> [path], export-all [path], help, quit";

/// Main application state.
pub struct StrainSenseApp {
    config: AppConfig,
    store: Arc<Mutex<SessionStore>>,
    session: SessionHandle,
    link: StrainLink,
}

impl StrainSenseApp {
    /// Load configuration and storage, start the session actor and the link
    /// event bridges. Must be called inside a tokio runtime.
    pub fn new() -> anyhow::Result<Self> {
        let config = load_config().context("Failed to load configuration")?;

        let db_path = config.database_path();
        let store = SessionStore::open(&db_path)
            .with_context(|| format!("Failed to open session database at {:?}", db_path))?;
        let store = Arc::new(Mutex::new(store));

        let (session, _actor) = SessionActor::spawn(config.classifier.classifier_config());

        let mut link = StrainLink::new(config.sensor.link_config());
        spawn_link_bridge(link.event_receiver(), session.clone());

        let workout_events = session
            .subscribe()
            .context("Workout session actor is not running")?;
        spawn_workout_listener(workout_events);

        Ok(Self {
            config,
            store,
            session,
            link,
        })
    }

    /// Run the command loop until `quit` or end of input.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut commands = spawn_stdin_reader();

        if self.config.sensor.scan_on_start {
            self.link.start_scan().await;
        }
        println!("{}", HELP);

        while let Some(line) = commands.recv().await {
            let command = match AppCommand::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            tracing::debug!("Command: {:?}", command);
            if command == AppCommand::Quit {
                break;
            }
            if let Err(e) = self.handle(command).await {
                println!("error: {:#}", e);
            }
        }

        self.link.shutdown().await;
        let _ = self.session.shutdown();
        tracing::info!("StrainSense stopped");
        Ok(())
    }

    async fn handle(&mut self, command: AppCommand) -> anyhow::Result<()> {
        match command {
            AppCommand::Scan => self.link.start_scan().await,
            AppCommand::Disconnect => self.link.disconnect().await?,
            AppCommand::Toggle => self.session.toggle_pause()?,
            AppCommand::Pause => self.session.pause()?,
            AppCommand::Resume => self.session.resume()?,
            AppCommand::End => {
                let session = finish_session(&self.session, &self.store).await?;
                println!("session ended: {}", summary_line(&session));
            }
            AppCommand::Status => {
                let metrics = self.session.snapshot().await?.metrics();
                let link_state = self.link.state().await;
                println!(
                    "link {} | sets {} reps {} recovery {}s | strain/set {} strain/rep {} max {} | sensor {}{}",
                    link_state,
                    metrics.sets,
                    metrics.reps,
                    metrics.recovery_seconds,
                    metrics.strain_per_set,
                    metrics.strain_per_rep,
                    metrics.max_strain,
                    metrics.sensor_value,
                    if metrics.is_paused { " (recovery)" } else { "" },
                );
                if link_state == ConnectionState::Error {
                    if let Some(cause) = self.link.last_error().await {
                        println!("link error: {}", cause);
                    }
                }
            }
            AppCommand::List => {
                let store = lock_store(&self.store)?;
                if store.sessions().is_empty() {
                    println!("no sessions");
                }
                for (position, session) in store.sessions().iter().enumerate() {
                    println!("{:>3}  {}", position, summary_line(session));
                }
            }
            AppCommand::Delete(positions) => {
                let removed = lock_store(&self.store)?.delete_at(&positions)?;
                println!("deleted {} sessions", removed);
            }
            AppCommand::Export { position, path } => {
                let session = lock_store(&self.store)?
                    .sessions()
                    .get(position)
                    .cloned()
                    .with_context(|| format!("no session at position {}", position))?;
                let path = path.unwrap_or_else(|| {
                    self.config.data_dir.join(generate_csv_filename(&session))
                });
                export_points_csv_to_file(&session, &path)?;
                println!("exported to {}", path.display());
            }
            AppCommand::ExportAll { path } => {
                let path = path.unwrap_or_else(|| self.config.data_dir.join(SUMMARY_FILENAME));
                let store = lock_store(&self.store)?;
                export_sessions_csv_to_file(store.sessions(), &path)?;
                println!("exported {} sessions to {}", store.sessions().len(), path.display());
            }
            AppCommand::Help => println!("{}", HELP),
            AppCommand::Quit => {}
        }
        Ok(())
    }
}

const SUMMARY_FILENAME: &str = "StrainSense_sessions.csv";

/// End the running session and store its record before returning it.
async fn finish_session(
    session: &SessionHandle,
    store: &Arc<Mutex<SessionStore>>,
) -> anyhow::Result<WorkoutSession> {
    let record = session.end_session().await?;
    lock_store(store)?
        .add_session(record.clone())
        .context("Failed to store session")?;
    Ok(record)
}

fn lock_store(
    store: &Arc<Mutex<SessionStore>>,
) -> anyhow::Result<std::sync::MutexGuard<'_, SessionStore>> {
    store
        .lock()
        .map_err(|_| anyhow::anyhow!("session store lock poisoned"))
}

fn summary_line(session: &WorkoutSession) -> String {
    format!(
        "{}  sets {} reps/set {} recovery/set {}s strain/set {} strain/rep {} max {}",
        session.date.format("%Y-%m-%d %H:%M"),
        session.sets,
        session.reps,
        session.recovery_seconds,
        session.strain_per_set,
        session.strain_per_rep,
        session.max_strain,
    )
}

/// Forward sensor frames to the session actor and log link state.
fn spawn_link_bridge(events: Receiver<LinkEvent>, session: SessionHandle) {
    std::thread::spawn(move || {
        for event in events {
            match event {
                LinkEvent::Frame(frame) => {
                    if session.submit_frame(frame).is_err() {
                        break;
                    }
                }
                LinkEvent::StateChanged { state, cause } => match cause {
                    Some(cause) => tracing::warn!("Sensor link {}: {}", state, cause),
                    None => tracing::info!("Sensor link {}", state),
                },
                LinkEvent::Discovered { device_id, name } => {
                    println!("found sensor {} ({})", name, device_id);
                }
            }
        }
    });
}

/// Log workout progress.
fn spawn_workout_listener(events: Receiver<WorkoutEvent>) {
    std::thread::spawn(move || {
        for event in events {
            match event {
                WorkoutEvent::SessionEnded(session) => {
                    tracing::info!("Session {} ended with {} sets", session.id, session.sets)
                }
                WorkoutEvent::RepCompleted {
                    rep_count, strain, ..
                } => tracing::info!("Rep {} at strain {}", rep_count, strain),
                WorkoutEvent::SetStarted { set_number } => {
                    tracing::info!("Set {} started", set_number)
                }
                WorkoutEvent::Paused => tracing::info!("Recovery started"),
                WorkoutEvent::MetricsUpdated(metrics) => tracing::debug!("{:?}", metrics),
                _ => {}
            }
        }
    });
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
