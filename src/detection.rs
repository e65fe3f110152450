//! The inference loop.
//!
//! Detection is driven by video frame delivery rather than by display
//! refresh. Each delivered frame advances the loop once; frames whose
//! playback time has already been seen are skipped, which both removes
//! duplicates and keeps at most one inference call per decoded frame.

use error::Result;
use inference::{Detector, InferenceFrame};
use timer::Timer;
use video::VideoSource;

/// Lifecycle of the [`DetectionLoop`](struct.DetectionLoop.html).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Nothing started yet.
    Uninitialized,
    /// Waiting for the detector or the video.
    Loading,
    /// Detecting on every new frame.
    Running,
    /// Paused by the user, frames are ignored.
    Stopped,
}

/// Turns video frames into [`InferenceFrame`]s.
///
/// [`InferenceFrame`]: ../inference/struct.InferenceFrame.html
#[derive(Debug)]
pub struct DetectionLoop {
    state: LoopState,
    timer: Timer,
    last_video_time: Option<f64>,
    last_timestamp_ms: Option<i64>,
    detections: usize,
}

impl DetectionLoop {
    /// Creates a loop in the `Uninitialized` state.
    pub fn new() -> Self {
        DetectionLoop {
            state: LoopState::Uninitialized,
            timer: Timer::new(),
            last_video_time: None,
            last_timestamp_ms: None,
            detections: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Moves to `state`.
    pub fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            info!("Detection loop {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Switches between `Running` and `Stopped`.
    ///
    /// Does nothing in the other states. Returns the new state.
    pub fn toggle(&mut self) -> LoopState {
        match self.state {
            LoopState::Running => self.set_state(LoopState::Stopped),
            LoopState::Stopped => self.set_state(LoopState::Running),
            other => debug!("Ignoring toggle while {:?}", other),
        }
        self.state
    }

    /// Number of detector calls made so far.
    pub fn detections(&self) -> usize {
        self.detections
    }

    /// Milliseconds since the loop was created, strictly increasing across
    /// calls.
    fn timestamp_ms(&mut self) -> i64 {
        let now = self.timer.elapsed_ms();
        let now = match self.last_timestamp_ms {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_timestamp_ms = Some(now);
        now
    }

    /// Handles one video frame delivery.
    ///
    /// Returns `Ok(None)` when the frame was skipped: the loop is not
    /// running, the detector is not ready yet, or the video has not moved
    /// since the previous call. Detector failures and malformed results are
    /// logged and returned.
    pub fn advance(
        &mut self,
        video: &dyn VideoSource,
        detector: &mut dyn Detector,
    ) -> Result<Option<InferenceFrame>> {
        if self.state != LoopState::Running {
            trace!("Skipping frame while {:?}", self.state);
            return Ok(None);
        }
        if !detector.is_ready() {
            debug!("Detector is not ready, skipping frame");
            return Ok(None);
        }
        let video_time = video.current_time();
        if self.last_video_time == Some(video_time) {
            trace!("Video still at {}, skipping", video_time);
            return Ok(None);
        }
        let frame = match video.frame() {
            Some(frame) => frame,
            None => {
                debug!("No video frame available at {}", video_time);
                return Ok(None);
            }
        };
        self.last_video_time = Some(video_time);

        let timestamp_ms = self.timestamp_ms();
        self.detections += 1;
        let detection = detector.detect(&frame, timestamp_ms).map_err(|e| {
            error!("Detection failed at {} ms: {}", timestamp_ms, e);
            e
        })?;
        let frame = InferenceFrame::from_detection(&detection, timestamp_ms).map_err(|e| {
            error!("Discarding detection at {} ms: {}", timestamp_ms, e);
            e
        })?;
        Ok(Some(frame))
    }
}

impl Default for DetectionLoop {
    fn default() -> Self {
        DetectionLoop::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error::Error;
    use inference::Detection;
    use video::VideoFrame;

    use image::RgbaImage;
    use std::cell::Cell;
    use std::sync::Arc;

    struct StillVideo {
        time: Cell<f64>,
    }

    impl VideoSource for StillVideo {
        fn current_time(&self) -> f64 {
            self.time.get()
        }

        fn dimensions(&self) -> (u32, u32) {
            (2, 2)
        }

        fn frame(&self) -> Option<VideoFrame> {
            Some(VideoFrame {
                time: self.time.get(),
                image: Arc::new(RgbaImage::new(2, 2)),
            })
        }
    }

    struct Counter {
        ready: bool,
        calls: Vec<i64>,
        fail: bool,
    }

    impl Detector for Counter {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn detect(&mut self, _: &VideoFrame, timestamp_ms: i64) -> Result<Detection> {
            self.calls.push(timestamp_ms);
            if self.fail {
                Err(Error::Detect("model crashed".into()))
            } else {
                Ok(Detection::default())
            }
        }
    }

    fn running() -> DetectionLoop {
        let mut dl = DetectionLoop::new();
        dl.set_state(LoopState::Running);
        dl
    }

    #[test]
    fn same_video_time_is_detected_once() {
        let video = StillVideo { time: Cell::new(0.5) };
        let mut detector = Counter { ready: true, calls: Vec::new(), fail: false };
        let mut dl = running();
        assert!(dl.advance(&video, &mut detector).unwrap().is_some());
        assert!(dl.advance(&video, &mut detector).unwrap().is_none());
        assert_eq!(detector.calls.len(), 1);

        video.time.set(0.6);
        assert!(dl.advance(&video, &mut detector).unwrap().is_some());
        assert_eq!(detector.calls.len(), 2);
        assert!(detector.calls[0] < detector.calls[1]);
    }

    #[test]
    fn unready_detector_is_skipped() {
        let video = StillVideo { time: Cell::new(1.0) };
        let mut detector = Counter { ready: false, calls: Vec::new(), fail: false };
        let mut dl = running();
        assert!(dl.advance(&video, &mut detector).unwrap().is_none());
        assert!(detector.calls.is_empty());

        // The frame was not consumed, so it is detected once the model is up.
        detector.ready = true;
        assert!(dl.advance(&video, &mut detector).unwrap().is_some());
    }

    #[test]
    fn stopped_loop_does_not_detect() {
        let video = StillVideo { time: Cell::new(1.0) };
        let mut detector = Counter { ready: true, calls: Vec::new(), fail: false };
        let mut dl = running();
        assert_eq!(dl.toggle(), LoopState::Stopped);
        assert!(dl.advance(&video, &mut detector).unwrap().is_none());
        assert!(detector.calls.is_empty());
        assert_eq!(dl.toggle(), LoopState::Running);
        assert!(dl.advance(&video, &mut detector).unwrap().is_some());
    }

    #[test]
    fn toggle_is_ignored_before_running() {
        let mut dl = DetectionLoop::new();
        assert_eq!(dl.toggle(), LoopState::Uninitialized);
    }

    #[test]
    fn detector_errors_are_returned() {
        let video = StillVideo { time: Cell::new(1.0) };
        let mut detector = Counter { ready: true, calls: Vec::new(), fail: true };
        let mut dl = running();
        assert!(dl.advance(&video, &mut detector).is_err());
        assert_eq!(dl.detections(), 1);
    }
}
