//! Live video input shared by detection and the background plane.

use image::RgbaImage;

use std::fmt;
use std::sync::Arc;

/// A decoded video frame.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Playback position of the frame, in seconds.
    pub time: f64,
    /// Pixel data.
    pub image: Arc<RgbaImage>,
}

impl VideoFrame {
    /// Frame dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// A playing video, typically a webcam stream.
///
/// Both loops only read from it: detection samples the current frame, the
/// renderer samples it as the background texture.
pub trait VideoSource {
    /// Current playback position in seconds.
    ///
    /// Stays the same until a new frame has been decoded.
    fn current_time(&self) -> f64;

    /// Native video dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// The frame at the current playback position, if one is available yet.
    fn frame(&self) -> Option<VideoFrame>;
}

/// Texture that samples the current frame of a [`VideoSource`].
///
/// [`VideoSource`]: trait.VideoSource.html
#[derive(Clone)]
pub struct VideoTexture {
    source: Arc<dyn VideoSource>,
}

impl VideoTexture {
    /// Wraps a video source.
    pub fn new(source: Arc<dyn VideoSource>) -> Self {
        VideoTexture { source }
    }

    /// The underlying video.
    pub fn source(&self) -> &Arc<dyn VideoSource> {
        &self.source
    }

    /// Frame to upload for the current render pass.
    pub fn frame(&self) -> Option<VideoFrame> {
        self.source.frame()
    }
}

impl fmt::Debug for VideoTexture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (width, height) = self.source.dimensions();
        f.debug_struct("VideoTexture")
            .field("width", &width)
            .field("height", &height)
            .finish()
    }
}
