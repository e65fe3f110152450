//! The render loop.
//!
//! [`SceneRuntime`] owns the scene, its camera and the video background, and
//! turns display refreshes into render passes. It never waits for inference:
//! whatever the scene holds when a refresh arrives is what gets drawn.
//!
//! [`SceneRuntime`]: struct.SceneRuntime.html

use camera::Camera;
use factory::Factory;
use mesh::Mesh;
use object::Object;
use render::{Frame, Renderer};
use scene::Scene;
use video::VideoTexture;

use std::fmt;
use std::ops;

/// Upper bound of the pixel ratio given to the renderer.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Builder for creating a new [`SceneRuntime`](struct.SceneRuntime.html)
/// with desired parameters.
#[derive(Clone, Debug)]
pub struct Builder {
    dimensions: (u32, u32),
    fov_y: f32,
    zrange: ops::Range<f32>,
    background_depth: f32,
    device_pixel_ratio: f32,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            dimensions: (1280, 720),
            fov_y: 60.0,
            zrange: 0.01 .. 5000.0,
            background_depth: 500.0,
            device_pixel_ratio: 1.0,
        }
    }
}

impl Builder {
    /// Create new `Builder` with default parameters.
    pub fn new() -> Self {
        Builder::default()
    }

    /// Set the size of the viewport in logical pixels. Defaults to 1280x720.
    pub fn dimensions(&mut self, width: u32, height: u32) -> &mut Self {
        self.dimensions = (width, height);
        self
    }

    /// Vertical field of view of the camera in degrees. Defaults to 60.
    pub fn fov(&mut self, fov_y: f32) -> &mut Self {
        self.fov_y = fov_y;
        self
    }

    /// Near and far clipping distances. Defaults to `0.01 .. 5000.0`.
    pub fn zrange(&mut self, zrange: ops::Range<f32>) -> &mut Self {
        self.zrange = zrange;
        self
    }

    /// Distance of the video background from the camera. Defaults to 500.
    pub fn background_depth(&mut self, depth: f32) -> &mut Self {
        self.background_depth = depth;
        self
    }

    /// Ratio of physical to logical pixels of the display. Defaults to 1.
    pub fn device_pixel_ratio(&mut self, ratio: f32) -> &mut Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// Create new `SceneRuntime` drawing with `renderer`.
    pub fn build<R: Renderer>(&self, mut renderer: R) -> SceneRuntime<R> {
        let (width, height) = self.dimensions;
        let aspect = width as f32 / height.max(1) as f32;
        let mut factory = Factory::new();
        let scene = factory.scene();
        let camera = factory.perspective_camera(self.fov_y, self.zrange.clone(), aspect);
        let background = factory.background_plane(&camera, self.background_depth, None);
        // Shown once a video is attached.
        background.set_visible(false);
        scene.add(&background);

        renderer.set_size(width, height);
        renderer.set_pixel_ratio(self.device_pixel_ratio.min(MAX_PIXEL_RATIO));
        info!("Scene runtime {}x{}, camera fov {}", width, height, self.fov_y);

        SceneRuntime {
            factory,
            scene,
            camera,
            background,
            background_depth: self.background_depth,
            device_pixel_ratio: self.device_pixel_ratio,
            size: self.dimensions,
            renderer,
            callbacks: Vec::new(),
            last_time_ms: None,
        }
    }
}

/// Owns the scene and renders it on every display refresh.
pub struct SceneRuntime<R> {
    factory: Factory,
    scene: Scene,
    camera: Camera,
    background: Mesh,
    background_depth: f32,
    device_pixel_ratio: f32,
    size: (u32, u32),
    renderer: R,
    callbacks: Vec<Box<dyn FnMut(f32)>>,
    last_time_ms: Option<f64>,
}

impl<R: Renderer> SceneRuntime<R> {
    /// The scene being rendered.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Factory of the scene graph the scene lives in.
    pub fn factory(&mut self) -> &mut Factory {
        &mut self.factory
    }

    /// The camera used for every render pass.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The video background plane.
    pub fn background(&self) -> &Mesh {
        &self.background
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Viewport size in logical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Shows `video` on the background plane.
    pub fn set_video(&mut self, video: VideoTexture) {
        self.background.set_map(Some(video));
        self.background.set_visible(true);
    }

    /// Registers a callback invoked before every loop render pass, after the
    /// callbacks registered earlier.
    ///
    /// The callback receives the seconds elapsed since the previous pass.
    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f32) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Seconds since the previous loop pass, zero for the first one.
    fn delta(&mut self, time_ms: f64) -> f32 {
        let delta = match self.last_time_ms {
            Some(last) => ((time_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_time_ms = Some(time_ms);
        delta
    }

    /// Runs one iteration of the render loop at display time `time_ms`.
    pub fn render_frame(&mut self, time_ms: f64) {
        let delta = self.delta(time_ms);
        for callback in self.callbacks.iter_mut() {
            callback(delta);
        }
        self.render();
    }

    /// Renders the current state of the scene right away, without running
    /// the callbacks.
    pub fn render(&mut self) {
        let frame = Frame::capture(&self.scene, &self.camera);
        self.renderer.render(&frame);
    }

    /// Adapts the camera, the renderer and the background to a new viewport
    /// size, then renders once.
    pub fn resize(&mut self, width: u32, height: u32) {
        // Minimized windows report a zero size.
        if width == 0 || height == 0 {
            debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        self.size = (width, height);
        self.camera.set_aspect(width as f32 / height as f32);
        self.renderer.set_size(width, height);
        self.renderer.set_pixel_ratio(self.device_pixel_ratio.min(MAX_PIXEL_RATIO));
        self.background.set_geometry(Factory::background_geometry(&self.camera, self.background_depth));
        self.render();
    }
}

impl<R: fmt::Debug> fmt::Debug for SceneRuntime<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SceneRuntime")
            .field("size", &self.size)
            .field("camera", &self.camera)
            .field("renderer", &self.renderer)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
