//! Frame pipeline
//!
//! Owns the estimator, the calibration session and the observers, and runs
//! every frame through them in order. Detection is asynchronous in the
//! browser, so `begin_frame` / `complete_frame` keep at most one detector
//! call in flight and drop camera frames that arrive in between.

use crate::calibration::{CalibrationEvent, CalibrationSession, CalibrationStatus};
use crate::config::{PipelineConfig, TrackerConfig};
use crate::error::TrackerError;
use crate::estimator::{PoseEstimate, PoseEstimator};
use crate::frame::{FrameInput, JointStream, JointUpdate, PoseFrame, PoseObserver};

/// Permission to run the detector for one frame.
///
/// Must be handed back to `complete_frame`.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameTicket {
    id: u64,
}

type JointCallback = Box<dyn FnMut(&JointUpdate)>;

pub struct FramePipeline {
    estimator: PoseEstimator,
    session: CalibrationSession,
    config: PipelineConfig,
    observers: Vec<Box<dyn PoseObserver>>,
    joint_observers: Vec<(JointStream, JointCallback)>,
    /// Ticket id and start time of the unresolved detection
    in_flight: Option<(u64, f64)>,
    next_ticket: u64,
    first_frame_at: Option<f64>,
    auto_started: bool,
    dropped_frames: u64,
    last_estimate: Option<PoseEstimate>,
    last_frame: Option<PoseFrame>,
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl FramePipeline {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            estimator: PoseEstimator::new(config),
            session: CalibrationSession::new(config.calibration),
            config: config.pipeline,
            observers: Vec::new(),
            joint_observers: Vec::new(),
            in_flight: None,
            next_ticket: 0,
            first_frame_at: None,
            auto_started: false,
            dropped_frames: 0,
            last_estimate: None,
            last_frame: None,
        }
    }

    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    /// Camera frames skipped because a detection was still running
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Most recent calibrated frame
    pub fn last_frame(&self) -> Option<&PoseFrame> {
        self.last_frame.as_ref()
    }

    /// Most recent raw estimate, calibrated or not
    pub fn last_estimate(&self) -> Option<&PoseEstimate> {
        self.last_estimate.as_ref()
    }

    pub fn subscribe(&mut self, observer: Box<dyn PoseObserver>) {
        self.observers.push(observer);
    }

    pub fn subscribe_joint(&mut self, stream: JointStream, callback: impl FnMut(&JointUpdate) + 'static) {
        self.joint_observers.push((stream, Box::new(callback)));
    }

    /// Start a calibration run now
    pub fn start_calibration(&mut self, now: f64) {
        self.auto_started = true;
        self.session.start(now);
        self.notify_calibration(now);
    }

    pub fn cancel_calibration(&mut self, now: f64) {
        self.session.cancel();
        self.notify_calibration(now);
    }

    pub fn calibration_status(&self, now: f64) -> CalibrationStatus {
        self.session.status(now)
    }

    /// Claim the detector for a new camera frame.
    ///
    /// Returns None (and counts a dropped frame) while a previous detection
    /// is unresolved. A detection older than `detection_timeout_ms` is
    /// abandoned; its ticket is then stale and its result ignored.
    pub fn begin_frame(&mut self, now: f64) -> Option<FrameTicket> {
        if let Some((id, started_at)) = self.in_flight {
            let waited = now - started_at;
            if waited < self.config.detection_timeout_ms {
                self.dropped_frames += 1;
                log::debug!("detector busy, dropping frame ({} dropped)", self.dropped_frames);
                return None;
            }
            log::warn!("detection {} unresolved after {} ms, abandoning it", id, waited);
        }
        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some((id, now));
        Some(FrameTicket { id })
    }

    /// Release the detector and process its result.
    ///
    /// A detector error is logged and the frame skipped.
    pub fn complete_frame(
        &mut self,
        ticket: FrameTicket,
        result: Result<FrameInput, TrackerError>,
    ) -> Option<PoseFrame> {
        if self.in_flight.map(|(id, _)| id) != Some(ticket.id) {
            log::warn!("stale frame ticket {} ignored", ticket.id);
            return None;
        }
        self.in_flight = None;

        match result {
            Ok(input) => self.process_frame(&input),
            Err(err) => {
                log::warn!("Skipping frame: {}", err);
                None
            }
        }
    }

    /// Run one frame of detector output through estimation and calibration.
    ///
    /// Does not claim the detector; use `begin_frame` / `complete_frame`
    /// when detection is asynchronous.
    ///
    /// Returns the calibrated frame once a calibration has succeeded; while
    /// calibrating or before the first calibration nothing is emitted.
    pub fn process_frame(&mut self, input: &FrameInput) -> Option<PoseFrame> {
        let now = input.timestamp_ms;
        self.schedule_calibration(now);

        let estimate = self.estimator.estimate(input);
        self.last_estimate = Some(estimate);

        if self.session.is_calibrating() {
            match self.session.tick(now, &estimate) {
                CalibrationEvent::Completed(_) | CalibrationEvent::Failed(_) => {
                    self.notify_calibration(now);
                }
                CalibrationEvent::Sampled | CalibrationEvent::Skipped => {}
            }
            return None;
        }

        if !self.session.is_calibrated() {
            return None;
        }

        let frame = self.session.apply(now, &estimate);
        self.dispatch(&frame);
        self.last_frame = Some(frame);
        Some(frame)
    }

    /// Auto-start after the first frame, and restart failed runs
    fn schedule_calibration(&mut self, now: f64) {
        let first = *self.first_frame_at.get_or_insert(now);

        if self.config.auto_start
            && !self.auto_started
            && now - first >= self.config.auto_start_delay_ms
        {
            log::info!("Auto-starting calibration");
            self.start_calibration(now);
        } else if self.config.auto_retry && self.session.retry_due(now) {
            log::info!("Retrying calibration");
            self.start_calibration(now);
        }
    }

    fn dispatch(&mut self, frame: &PoseFrame) {
        for observer in &mut self.observers {
            observer.on_pose_frame(frame);
        }
        for (stream, callback) in &mut self.joint_observers {
            if let Some(update) = frame.joint(*stream) {
                callback(&update);
            }
        }
    }

    fn notify_calibration(&mut self, now: f64) {
        let status = self.session.status(now);
        for observer in &mut self.observers {
            observer.on_calibration(&status);
        }
    }
}
