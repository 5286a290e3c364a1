//! Live recording driver
//!
//! Wraps a [`SessionRecorder`] with a clock and two repeating tasks: the pause
//! checker and the gaze poller. Both tasks are cancelled and joined by
//! [`LiveSession::stop`] before the recorder is finalized, so no late tick can
//! touch a session that has already been handed back. The clock is read only
//! while the recorder lock is held, so events reach the recorder in timestamp
//! order.

use crate::aoi::AoiClassifier;
use crate::clock::{Clock, MonotonicClock};
use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::recorder::SessionRecorder;
use crate::sensor::GazeSensor;
use crate::types::{GazeSide, KeyEvent, RecorderStatus, SessionLog, TextChange};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A repeating task that can be cancelled any number of times
struct PollingTask {
    name: &'static str,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollingTask {
    fn spawn<F, Fut>(name: &'static str, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => on_tick().await,
                }
            }
            debug!("{} task stopped", name);
        });

        Self {
            name,
            cancel_token,
            handle: Some(handle),
        }
    }

    /// Cancel and wait for the task to finish. Safe to call repeatedly.
    async fn cancel(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!("{} task failed to join: {}", self.name, err);
            }
        }
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[derive(Clone)]
struct GazeSource {
    sensor: Arc<dyn GazeSensor>,
    classifier: Arc<dyn AoiClassifier>,
}

/// Clock-driven recording session with background pause and gaze polling
#[derive(Clone)]
pub struct LiveSession {
    recorder: Arc<Mutex<SessionRecorder>>,
    clock: Arc<dyn Clock>,
    gaze: Option<GazeSource>,
    tasks: Arc<Mutex<Vec<PollingTask>>>,
}

impl LiveSession {
    /// Create a live session with a monotonic clock and no gaze sensor.
    pub fn new(config: RecorderConfig) -> Result<Self, RecorderError> {
        config.validate()?;
        Ok(Self {
            recorder: Arc::new(Mutex::new(SessionRecorder::new(config))),
            clock: Arc::new(MonotonicClock::new()),
            gaze: None,
            tasks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Replace the session clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a gaze sensor and the classifier used to categorize its output.
    pub fn with_gaze_sensor(
        mut self,
        sensor: Arc<dyn GazeSensor>,
        classifier: Arc<dyn AoiClassifier>,
    ) -> Self {
        self.gaze = Some(GazeSource { sensor, classifier });
        self
    }

    /// Current session-relative time in milliseconds.
    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    pub async fn start(&self) -> bool {
        self.start_with_text("").await
    }

    /// Start recording and spawn the polling tasks.
    ///
    /// Returns false if a session is already running.
    pub async fn start_with_text(&self, initial_text: &str) -> bool {
        let mut tasks = self.tasks.lock().await;

        let config = {
            let mut recorder = self.recorder.lock().await;
            if !recorder.start_with_text(self.clock.now_ms(), initial_text) {
                return false;
            }
            recorder.config().clone()
        };

        tasks.push(self.spawn_pause_checker(&config));

        match &self.gaze {
            Some(source) => tasks.push(self.spawn_gaze_poller(&config, source.clone())),
            None => warn!("no gaze sensor attached; gaze logging disabled"),
        }

        true
    }

    /// Record a key press stamped with the session clock.
    pub async fn record_keystroke(
        &self,
        key: &str,
        code: &str,
        selection_start: usize,
        selection_end: usize,
        text_length: usize,
    ) -> bool {
        let mut recorder = self.recorder.lock().await;
        recorder.record_keystroke(KeyEvent {
            time: self.clock.now_ms(),
            key: key.to_string(),
            code: code.to_string(),
            selection_start,
            selection_end,
            text_length,
        })
    }

    /// Record the widget's current text after an input notification.
    pub async fn record_text(&self, text: &str, selection_start: Option<usize>) -> Option<TextChange> {
        let mut recorder = self.recorder.lock().await;
        recorder
            .record_text_snapshot(self.clock.now_ms(), text, selection_start)
            .cloned()
    }

    /// Record a gaze sample pushed by the host instead of the poller.
    pub async fn record_gaze(&self, x: f64, y: f64, side: GazeSide) -> bool {
        let mut recorder = self.recorder.lock().await;
        recorder.record_gaze_sample(x, y, side, self.clock.now_ms())
    }

    pub async fn status(&self) -> RecorderStatus {
        self.recorder.lock().await.status()
    }

    /// Stop the polling tasks, then finalize and return the session log.
    ///
    /// Returns `None` if no session is running.
    pub async fn stop(&self) -> Option<SessionLog> {
        let mut tasks = self.tasks.lock().await;

        for task in tasks.iter_mut() {
            task.cancel().await;
        }
        tasks.clear();

        let mut recorder = self.recorder.lock().await;
        recorder.stop(self.clock.now_ms())
    }

    fn spawn_pause_checker(&self, config: &RecorderConfig) -> PollingTask {
        let recorder = self.recorder.clone();
        let clock = self.clock.clone();

        PollingTask::spawn(
            "pause checker",
            Duration::from_millis(config.pause_check_interval_ms),
            move || {
                let recorder = recorder.clone();
                let clock = clock.clone();
                async move {
                    let mut recorder = recorder.lock().await;
                    recorder.check_pause(clock.now_ms());
                }
            },
        )
    }

    fn spawn_gaze_poller(&self, config: &RecorderConfig, source: GazeSource) -> PollingTask {
        let recorder = self.recorder.clone();
        let clock = self.clock.clone();
        let timeout = Duration::from_millis(config.gaze_timeout_ms);

        info!(
            "polling gaze sensor every {}ms",
            config.gaze_sample_interval_ms
        );

        PollingTask::spawn(
            "gaze poller",
            Duration::from_millis(config.gaze_sample_interval_ms),
            move || {
                let recorder = recorder.clone();
                let clock = clock.clone();
                let source = source.clone();
                async move { poll_gaze(&recorder, clock.as_ref(), &source, timeout).await }
            },
        )
    }
}

async fn poll_gaze(
    recorder: &Mutex<SessionRecorder>,
    clock: &dyn Clock,
    source: &GazeSource,
    timeout: Duration,
) {
    match tokio::time::timeout(timeout, source.sensor.current_prediction()).await {
        Ok(Ok(Some(point))) => {
            let side = source.classifier.classify(point.x, point.y);
            let mut recorder = recorder.lock().await;
            recorder.record_gaze_sample(point.x, point.y, side, clock.now_ms());
        }
        Ok(Ok(None)) => {}
        Ok(Err(err)) => debug!("gaze prediction skipped: {}", err),
        Err(_) => debug!("gaze prediction timed out after {}ms", timeout.as_millis()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aoi::AoiLayout;
    use crate::clock::ManualClock;
    use crate::sensor::GazePoint;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSensor {
        point: GazePoint,
        calls: AtomicUsize,
    }

    impl FixedSensor {
        fn new(x: f64, y: f64) -> Arc<Self> {
            Arc::new(Self {
                point: GazePoint::new(x, y),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GazeSensor for FixedSensor {
        async fn current_prediction(&self) -> Result<Option<GazePoint>, RecorderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.point))
        }
    }

    struct FailingSensor;

    #[async_trait]
    impl GazeSensor for FailingSensor {
        async fn current_prediction(&self) -> Result<Option<GazePoint>, RecorderError> {
            Err(RecorderError::SensorError("model not ready".to_string()))
        }
    }

    /// Fails every other poll
    struct FlakySensor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GazeSensor for FlakySensor {
        async fn current_prediction(&self) -> Result<Option<GazePoint>, RecorderError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(RecorderError::SensorError("dropped frame".to_string()))
            } else {
                Ok(Some(GazePoint::new(100.0, 100.0)))
            }
        }
    }

    struct SlowSensor;

    #[async_trait]
    impl GazeSensor for SlowSensor {
        async fn current_prediction(&self) -> Result<Option<GazePoint>, RecorderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(GazePoint::new(1.0, 1.0)))
        }
    }

    fn layout() -> Arc<AoiLayout> {
        Arc::new(AoiLayout::midline(1000.0))
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_sensor_records_no_gaze() {
        let session = LiveSession::new(RecorderConfig::default()).unwrap();
        assert!(session.start().await);
        session.record_keystroke("a", "KeyA", 0, 0, 0).await;
        session.record_text("a", Some(1)).await;
        sleep_ms(500).await;

        let log = session.stop().await.unwrap();
        assert_eq!(log.keystrokes.len(), 1);
        assert_eq!(log.text_changes.len(), 1);
        assert!(log.gaze_raw.is_empty());
        assert!(log.gaze_states.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gaze_polling_builds_dwell_segment() {
        let sensor = FixedSensor::new(900.0, 200.0);
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_gaze_sensor(sensor.clone(), layout());

        session.start().await;
        sleep_ms(1000).await;
        let log = session.stop().await.unwrap();

        assert!(log.gaze_raw.len() >= 10, "got {} samples", log.gaze_raw.len());
        assert!(log.gaze_raw.iter().all(|s| s.side == GazeSide::Right));
        assert!(log.gaze_raw.windows(2).all(|w| w[0].time <= w[1].time));

        assert_eq!(log.gaze_states.len(), 1);
        let segment = &log.gaze_states[0];
        assert_eq!(segment.category, GazeSide::Right);
        assert!(segment.start_time.abs() < 1e-6);
        assert!((segment.end_time - log.meta.ended_at).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_errors_are_swallowed() {
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_gaze_sensor(Arc::new(FailingSensor), layout());

        session.start().await;
        session.record_text("hello", Some(5)).await;
        sleep_ms(1000).await;

        let log = session.stop().await.unwrap();
        assert!(log.gaze_raw.is_empty());
        assert_eq!(log.text_changes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_sensor_skips_failed_polls() {
        let sensor = Arc::new(FlakySensor {
            calls: AtomicUsize::new(0),
        });
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_gaze_sensor(sensor.clone(), layout());

        session.start().await;
        sleep_ms(1000).await;
        let log = session.stop().await.unwrap();

        let polls = sensor.calls.load(Ordering::SeqCst);
        assert!(polls >= 10);
        assert!(!log.gaze_raw.is_empty());
        assert!(log.gaze_raw.len() < polls);
        assert!(log.gaze_raw.iter().all(|s| s.side == GazeSide::Left));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sensor_times_out() {
        let config = RecorderConfig {
            gaze_timeout_ms: 200,
            ..RecorderConfig::default()
        };
        let session = LiveSession::new(config)
            .unwrap()
            .with_gaze_sensor(Arc::new(SlowSensor), layout());

        session.start().await;
        sleep_ms(1000).await;
        let log = session.stop().await.unwrap();
        assert!(log.gaze_raw.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_detected_by_ticker() {
        let session = LiveSession::new(RecorderConfig::default()).unwrap();
        session.start().await;
        session.record_text("a", Some(1)).await;

        sleep_ms(2500).await;
        assert!(session.status().await.paused);
        session.record_text("ab", Some(2)).await;

        let log = session.stop().await.unwrap();
        assert_eq!(log.pauses.len(), 1);
        let pause = &log.pauses[0];
        assert!(pause.start_time.abs() < 1e-6);
        assert!((pause.end_time - 2500.0).abs() < 1e-6);
        assert!((pause.duration - 2500.0).abs() < 1e-6);
        assert_eq!(pause.cursor_index_at_pause, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_and_start_twice() {
        let session = LiveSession::new(RecorderConfig::default()).unwrap();
        assert!(session.start().await);
        assert!(!session.start().await);
        assert!(session.stop().await.is_some());
        assert!(session.stop().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_polling() {
        let sensor = FixedSensor::new(10.0, 10.0);
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_gaze_sensor(sensor.clone(), layout());

        session.start().await;
        sleep_ms(300).await;
        session.stop().await.unwrap();

        let calls_at_stop = sensor.calls.load(Ordering::SeqCst);
        sleep_ms(1000).await;
        assert_eq!(sensor.calls.load(Ordering::SeqCst), calls_at_stop);

        let status = session.status().await;
        assert!(!status.active);
        assert_eq!(status.gaze_samples, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let sensor = FixedSensor::new(10.0, 10.0);
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_gaze_sensor(sensor, layout());

        session.start().await;
        sleep_ms(300).await;
        let first = session.stop().await.unwrap();

        session.start().await;
        sleep_ms(300).await;
        let second = session.stop().await.unwrap();

        assert!(second.meta.started_at >= first.meta.ended_at);
        assert!(second
            .gaze_raw
            .iter()
            .all(|s| s.time >= second.meta.started_at));
    }

    #[tokio::test]
    async fn test_events_stamped_with_session_clock() {
        let clock = ManualClock::new(1000.0);
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_clock(Arc::new(clock.clone()));

        session.start().await;
        clock.advance(40.0);
        session.record_keystroke("a", "KeyA", 0, 0, 0).await;
        clock.advance(2.0);
        let change = session.record_text("a", Some(1)).await.unwrap();
        assert_eq!(change.time, 1042.0);

        clock.set(1200.0);
        assert!(session.record_gaze(5.0, 5.0, GazeSide::Left).await);

        clock.set(1500.0);
        let log = session.stop().await.unwrap();
        assert_eq!(log.gaze_states[0].start_time, 1200.0);
        assert_eq!(log.gaze_states[0].duration, 300.0);
        assert_eq!(log.meta.started_at, 1000.0);
        assert_eq!(log.meta.ended_at, 1500.0);
        assert_eq!(log.keystrokes[0].time, 1040.0);
    }

    /// Counts reads taken while the recorder lock is free
    struct LockCheckingClock {
        recorder: Arc<Mutex<SessionRecorder>>,
        reads: AtomicUsize,
        unlocked_reads: AtomicUsize,
    }

    impl Clock for LockCheckingClock {
        fn now_ms(&self) -> f64 {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.recorder.try_lock().is_ok() {
                self.unlocked_reads.fetch_add(1, Ordering::SeqCst);
            }
            100.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_read_while_recorder_locked() {
        let session = LiveSession::new(RecorderConfig::default())
            .unwrap()
            .with_gaze_sensor(FixedSensor::new(100.0, 10.0), layout());
        let clock = Arc::new(LockCheckingClock {
            recorder: session.recorder.clone(),
            reads: AtomicUsize::new(0),
            unlocked_reads: AtomicUsize::new(0),
        });
        let session = session.with_clock(clock.clone());

        session.start().await;
        session.record_keystroke("a", "KeyA", 0, 0, 0).await;
        session.record_text("a", Some(1)).await;
        session.record_gaze(5.0, 5.0, GazeSide::Left).await;
        sleep_ms(500).await;
        let log = session.stop().await.unwrap();

        assert!(log.gaze_raw.len() > 1);
        assert!(clock.reads.load(Ordering::SeqCst) > 5);
        assert_eq!(clock.unlocked_reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RecorderConfig::default().with_gaze_sample_interval_ms(0);
        assert!(LiveSession::new(config).is_err());
    }
}
