//! Integration test with a mock strain sensor.
//!
//! Full BLE tests need real hardware; the mock produces the notification
//! frames the sensor would send and feeds them through the link event path.

use crossbeam::channel::unbounded;
use strainsense::sensors::strain::encode_frame;
use strainsense::sensors::types::{ConnectionState, LinkEvent};
use strainsense::sensors::LinkTracker;
use strainsense::workouts::types::ClassifierConfig;
use strainsense::SessionActor;
use std::time::Duration;

/// Mock strain sensor producing notification frames.
pub struct MockStrainSensor {
    /// Idle reading between reps
    pub baseline: u16,
    /// Peak reading of a rep
    pub peak: u16,
    /// Samples per notification
    pub samples_per_frame: usize,
}

impl Default for MockStrainSensor {
    fn default() -> Self {
        Self {
            baseline: 450,
            peak: 720,
            samples_per_frame: 4,
        }
    }
}

impl MockStrainSensor {
    /// Frames for one rep: a rise to the peak and back to baseline.
    pub fn rep_frames(&self) -> Vec<Vec<u8>> {
        let mid = (self.baseline + self.peak) / 2;
        let samples = [
            self.baseline,
            mid,
            self.peak,
            mid,
            self.baseline,
            self.baseline,
            self.baseline,
            self.baseline,
        ];
        samples
            .chunks(self.samples_per_frame)
            .map(encode_frame)
            .collect()
    }

    /// Frames of idle readings.
    pub fn idle_frames(&self, count: usize) -> Vec<Vec<u8>> {
        (0..count)
            .map(|_| encode_frame(&vec![0; self.samples_per_frame]))
            .collect()
    }
}

fn fast_config() -> ClassifierConfig {
    ClassifierConfig {
        rep_debounce: Duration::from_millis(60),
        recovery_tick: Duration::from_millis(25),
        ..Default::default()
    }
}

#[test]
fn test_mock_rep_frames_are_well_formed() {
    let sensor = MockStrainSensor::default();
    let frames = sensor.rep_frames();

    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f.len() == 8));
}

#[test]
fn test_link_lifecycle_events() {
    let mut tracker = LinkTracker::new();
    let mut events = vec![tracker.begin_scan()];
    events.extend(tracker.select("AA:BB:CC:DD:EE:FF"));
    events.extend(tracker.on_connected("AA:BB:CC:DD:EE:FF"));

    let states: Vec<ConnectionState> = events
        .iter()
        .filter_map(|e| match e {
            LinkEvent::StateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect();

    assert_eq!(
        states,
        vec![
            ConnectionState::Scanning,
            ConnectionState::Connecting,
            ConnectionState::Connected
        ]
    );
}

#[tokio::test]
async fn test_link_frames_drive_the_session() {
    let (handle, _task) = SessionActor::spawn(fast_config());
    let (link_tx, link_rx) = unbounded::<LinkEvent>();

    // Same bridge shape as the application
    let bridge_handle = handle.clone();
    let bridge = std::thread::spawn(move || {
        for event in link_rx {
            if let LinkEvent::Frame(frame) = event {
                let _ = bridge_handle.submit_frame(frame);
            }
        }
    });

    let sensor = MockStrainSensor::default();
    handle.resume().unwrap();

    for frame in sensor.rep_frames() {
        link_tx.send(LinkEvent::Frame(frame)).unwrap();
    }
    for frame in sensor.idle_frames(3) {
        link_tx.send(LinkEvent::Frame(frame)).unwrap();
    }
    drop(link_tx);
    bridge.join().unwrap();

    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.rep_count, 1);
    assert_eq!(state.max_strain, 720);
    assert_eq!(state.elapsed_ms, 400);
    assert_eq!(state.points.len(), 4);

    // Second rep after the debounce window
    tokio::time::sleep(Duration::from_millis(150)).await;
    for frame in sensor.rep_frames() {
        handle.submit_frame(frame).unwrap();
    }

    let session = handle.end_session().await.unwrap();
    assert_eq!(session.sets, 1);
    assert_eq!(session.reps, 2);
    assert_eq!(session.strain_per_rep, 720);
}
