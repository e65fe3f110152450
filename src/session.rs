//! The controller tying both loops together.
//!
//! A [`Session`] owns the scene runtime, the current avatar, the detection
//! loop and its collaborators. The host feeds it [`HostEvent`]s one at a
//! time; nothing in the session runs on its own.
//!
//! [`Session`]: struct.Session.html
//! [`HostEvent`]: enum.HostEvent.html

use std::fmt;
use std::ops;
use std::sync::Arc;

use asset::{AssetDocument, AssetLoader, PendingLoad};
use avatar::AvatarModel;
use detection::{DetectionLoop, LoopState};
use error::Result;
use factory::GltfLoader;
use inference::{Detector, InferenceFrame};
use render::Renderer;
use retarget::{self, RetargetConfig, RotationChain};
use runtime::{self, SceneRuntime};
use video::{VideoSource, VideoTexture};

/// When inference results are written to the avatar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// Right after the detector returns.
    Detection,
    /// At the next display refresh, before the render callbacks. Only the
    /// latest result is kept in between.
    Render,
}

/// What the pose matrix drives.
#[derive(Clone, Debug, PartialEq)]
pub enum PoseTarget {
    /// The root of the avatar, see
    /// [`apply_transform`](../retarget/fn.apply_transform.html).
    SceneRoot,
    /// Named bones, see
    /// [`apply_rotation_chain`](../retarget/fn.apply_rotation_chain.html).
    BoneChain(RotationChain),
}

/// Something happened on the host side.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// The video delivered a frame.
    VideoFrame,
    /// The display is ready for a new image.
    DisplayRefresh {
        /// Host clock, in milliseconds.
        time_ms: f64,
    },
    /// The viewport changed size.
    Resize {
        /// New width in logical pixels.
        width: u32,
        /// New height in logical pixels.
        height: u32,
    },
    /// The user picked another avatar.
    LoadAvatar(String),
    /// The user pressed start/stop.
    Toggle,
}

/// Builder for creating a new [`Session`](struct.Session.html) with desired
/// parameters.
#[derive(Clone)]
pub struct Builder {
    runtime: runtime::Builder,
    retarget: RetargetConfig,
    apply_mode: ApplyMode,
    pose_target: PoseTarget,
    loader: Arc<dyn AssetLoader>,
}

impl Builder {
    /// Create new `Builder` with default parameters.
    pub fn new() -> Self {
        Builder {
            runtime: runtime::Builder::new(),
            retarget: RetargetConfig::default(),
            apply_mode: ApplyMode::Detection,
            pose_target: PoseTarget::SceneRoot,
            loader: Arc::new(GltfLoader::new()),
        }
    }

    /// Set the size of the viewport in logical pixels. Defaults to 1280x720.
    pub fn dimensions(&mut self, width: u32, height: u32) -> &mut Self {
        self.runtime.dimensions(width, height);
        self
    }

    /// Vertical field of view of the camera in degrees. Defaults to 60.
    pub fn fov(&mut self, fov_y: f32) -> &mut Self {
        self.runtime.fov(fov_y);
        self
    }

    /// Near and far clipping distances. Defaults to `0.01 .. 5000.0`.
    pub fn zrange(&mut self, zrange: ops::Range<f32>) -> &mut Self {
        self.runtime.zrange(zrange);
        self
    }

    /// Distance of the video background from the camera. Defaults to 500.
    pub fn background_depth(&mut self, depth: f32) -> &mut Self {
        self.runtime.background_depth(depth);
        self
    }

    /// Ratio of physical to logical pixels of the display. Defaults to 1.
    pub fn device_pixel_ratio(&mut self, ratio: f32) -> &mut Self {
        self.runtime.device_pixel_ratio(ratio);
        self
    }

    /// How the pose matrix is applied to the avatar root.
    pub fn retarget(&mut self, config: RetargetConfig) -> &mut Self {
        self.retarget = config;
        self
    }

    /// When results are applied. Defaults to `ApplyMode::Detection`.
    pub fn apply_mode(&mut self, mode: ApplyMode) -> &mut Self {
        self.apply_mode = mode;
        self
    }

    /// What the pose matrix drives. Defaults to `PoseTarget::SceneRoot`.
    pub fn pose_target(&mut self, target: PoseTarget) -> &mut Self {
        self.pose_target = target;
        self
    }

    /// Asset transport used by `LoadAvatar`. Defaults to
    /// [`GltfLoader`](../struct.GltfLoader.html).
    pub fn loader(&mut self, loader: Arc<dyn AssetLoader>) -> &mut Self {
        self.loader = loader;
        self
    }

    /// Create new `Session` drawing with `renderer`.
    pub fn build<R: Renderer>(&self, renderer: R) -> Session<R> {
        Session {
            runtime: self.runtime.build(renderer),
            avatar: None,
            detection: DetectionLoop::new(),
            detector: None,
            video: None,
            latest: None,
            pending: None,
            loader: self.loader.clone(),
            retarget: self.retarget,
            apply_mode: self.apply_mode,
            pose_target: self.pose_target.clone(),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

/// Owns everything needed to drive an avatar from a video.
pub struct Session<R> {
    runtime: SceneRuntime<R>,
    avatar: Option<AvatarModel>,
    detection: DetectionLoop,
    detector: Option<Box<dyn Detector>>,
    video: Option<Arc<dyn VideoSource>>,
    latest: Option<Arc<InferenceFrame>>,
    pending: Option<PendingLoad>,
    loader: Arc<dyn AssetLoader>,
    retarget: RetargetConfig,
    apply_mode: ApplyMode,
    pose_target: PoseTarget,
}

impl<R: Renderer> Session<R> {
    /// Current state of the detection loop.
    pub fn state(&self) -> LoopState {
        self.detection.state()
    }

    /// The render side.
    pub fn runtime(&self) -> &SceneRuntime<R> {
        &self.runtime
    }

    /// The render side, mutably. Use it to register render callbacks.
    pub fn runtime_mut(&mut self) -> &mut SceneRuntime<R> {
        &mut self.runtime
    }

    /// The detection side.
    pub fn detection(&self) -> &DetectionLoop {
        &self.detection
    }

    /// The current avatar, if one has been loaded.
    pub fn avatar(&self) -> Option<&AvatarModel> {
        self.avatar.as_ref()
    }

    /// The current avatar, mutably.
    pub fn avatar_mut(&mut self) -> Option<&mut AvatarModel> {
        self.avatar.as_mut()
    }

    /// Result waiting for the next display refresh in `ApplyMode::Render`.
    pub fn latest_frame(&self) -> Option<&Arc<InferenceFrame>> {
        self.latest.as_ref()
    }

    /// Is an avatar being loaded in the background?
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn try_run(&mut self) {
        if self.detection.state() == LoopState::Loading
            && self.detector.is_some()
            && self.video.is_some()
        {
            self.detection.set_state(LoopState::Running);
        }
    }

    /// Hands the inference service to the session.
    pub fn start(&mut self, detector: Box<dyn Detector>) {
        self.detector = Some(detector);
        if self.detection.state() == LoopState::Uninitialized {
            self.detection.set_state(LoopState::Loading);
        }
        self.try_run();
    }

    /// Acquires the video with `acquire`.
    ///
    /// On failure the error is logged and the session stays in `Loading`
    /// for good, detection never starts.
    pub fn acquire_video<F>(&mut self, acquire: F)
    where
        F: FnOnce() -> Result<Arc<dyn VideoSource>>,
    {
        if self.detection.state() == LoopState::Uninitialized {
            self.detection.set_state(LoopState::Loading);
        }
        match acquire() {
            Ok(video) => {
                let (width, height) = video.dimensions();
                info!("Video acquired, {}x{}", width, height);
                self.runtime.set_video(VideoTexture::new(video.clone()));
                self.video = Some(video);
                self.try_run();
            }
            Err(e) => error!("Unable to acquire video: {}", e),
        }
    }

    /// Pauses or resumes detection. Returns the new state.
    pub fn toggle(&mut self) -> LoopState {
        self.detection.toggle()
    }

    /// Starts loading the avatar at `url` in the background.
    ///
    /// The current avatar stays in place until the new one is ready. A load
    /// that is still running is superseded.
    pub fn load_avatar(&mut self, url: &str) {
        if let Some(old) = self.pending.take() {
            info!("Abandoning load of {}", old.url());
        }
        self.pending = Some(PendingLoad::spawn(self.loader.clone(), url));
    }

    /// Loads the avatar at `url` right away.
    ///
    /// On failure the current avatar is kept and the error returned.
    pub fn load_avatar_blocking(&mut self, url: &str) -> Result<()> {
        let model = AvatarModel::load(self.runtime.factory(), &*self.loader, url)?;
        self.install(model);
        Ok(())
    }

    /// Waits for the background load, if any, and applies its result.
    pub fn finish_loading(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(pending) => {
                let url = pending.url().to_string();
                self.complete_load(&url, pending.wait())
            }
            None => Ok(()),
        }
    }

    fn poll_load(&mut self) {
        let result = match self.pending {
            Some(ref pending) => match pending.poll() {
                Some(result) => result,
                None => return,
            },
            None => return,
        };
        if let Some(pending) = self.pending.take() {
            // Already logged.
            let _ = self.complete_load(pending.url(), result);
        }
    }

    fn complete_load(&mut self, url: &str, result: Result<AssetDocument>) -> Result<()> {
        match result {
            Ok(document) => {
                let model = AvatarModel::from_document(self.runtime.factory(), &document);
                self.install(model);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load avatar {}: {}", url, e);
                Err(e)
            }
        }
    }

    fn install(&mut self, model: AvatarModel) {
        info!("Avatar {} is now current", model.url());
        AvatarModel::replace(&mut self.avatar, self.runtime.scene(), model);
    }

    /// Writes `frame` to the current avatar.
    pub fn apply(&mut self, frame: &InferenceFrame) {
        if let Some(ref pose) = frame.pose_matrix {
            match self.pose_target {
                PoseTarget::SceneRoot => {
                    retarget::apply_transform(self.avatar.as_mut(), pose, &self.retarget)
                }
                PoseTarget::BoneChain(ref chain) => {
                    retarget::apply_rotation_chain(self.avatar.as_mut(), pose, chain)
                }
            }
        }
        if !frame.blendshapes.is_empty() {
            retarget::apply_blendshapes(self.avatar.as_mut(), &frame.blendshapes);
        }
    }

    fn on_video_frame(&mut self) -> Result<()> {
        let frame = match (self.video.as_ref(), self.detector.as_mut()) {
            (Some(video), Some(detector)) => self.detection.advance(&**video, &mut **detector)?,
            _ => {
                trace!("Video frame before the session is set up");
                None
            }
        };
        if let Some(frame) = frame {
            match self.apply_mode {
                ApplyMode::Detection => self.apply(&frame),
                ApplyMode::Render => self.latest = Some(Arc::new(frame)),
            }
        }
        Ok(())
    }

    fn on_display_refresh(&mut self, time_ms: f64) {
        if let Some(frame) = self.latest.take() {
            self.apply(&frame);
        }
        self.runtime.render_frame(time_ms);
    }

    /// Handles one host event.
    ///
    /// A background avatar load that finished in the meantime is applied
    /// first. Only detection failures are returned.
    pub fn dispatch(&mut self, event: HostEvent) -> Result<()> {
        self.poll_load();
        match event {
            HostEvent::VideoFrame => self.on_video_frame()?,
            HostEvent::DisplayRefresh { time_ms } => self.on_display_refresh(time_ms),
            HostEvent::Resize { width, height } => self.runtime.resize(width, height),
            HostEvent::LoadAvatar(url) => self.load_avatar(&url),
            HostEvent::Toggle => {
                self.toggle();
            }
        }
        Ok(())
    }
}

impl<R: fmt::Debug> fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.detection.state())
            .field("avatar", &self.avatar.as_ref().map(|a| a.url()))
            .field("runtime", &self.runtime)
            .field("apply_mode", &self.apply_mode)
            .finish()
    }
}
