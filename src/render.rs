//! Snapshots of the scene handed to rasterizers.
//!
//! The crate owns the scene graph but not the rasterization. Every render
//! pass drains the pending scene updates, walks the visible nodes and hands
//! the resulting [`Frame`] to a [`Renderer`].
//!
//! [`Frame`]: struct.Frame.html
//! [`Renderer`]: trait.Renderer.html

use cgmath::{Matrix4, SquareMatrix};
use mint;

use camera::Camera;
use geometry::Geometry;
use hub::{self, SubNode};
use scene::Scene;
use video::VideoTexture;

use std::sync::Arc;

/// What a [`DrawItem`](struct.DrawItem.html) represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawKind {
    /// Regular geometry, possibly morphed.
    Mesh,
    /// Video textured background.
    Background,
}

/// A single visible node.
#[derive(Clone, Debug)]
pub struct DrawItem {
    /// Name of the node, if any.
    pub name: Option<String>,
    /// Mesh or background.
    pub kind: DrawKind,
    /// Local to world transform.
    pub world: mint::ColumnMatrix4<f32>,
    /// Vertex data.
    pub geometry: Arc<Geometry>,
    /// Video texture to sample, if any.
    pub map: Option<VideoTexture>,
    /// Morph target influences at the time of the snapshot.
    pub influences: Option<Arc<Vec<f32>>>,
    /// May the node be skipped when outside of the view frustum?
    pub frustum_culled: bool,
}

/// Everything needed to rasterize one image.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Camera projection matrix.
    pub projection: mint::ColumnMatrix4<f32>,
    /// World to camera transform.
    pub view: mint::ColumnMatrix4<f32>,
    /// Visible nodes, depth-first. Children of a group are visited from the
    /// most recently added one.
    pub items: Vec<DrawItem>,
}

impl Frame {
    /// Applies all pending scene updates and takes a snapshot of what
    /// `camera` sees of `scene`.
    ///
    /// The updates are applied under the scene lock, so the snapshot contains
    /// either all or none of the updates made by one retargeting step.
    pub fn capture(
        scene: &Scene,
        camera: &Camera,
    ) -> Self {
        let mut hub = hub::lock(&scene.hub);
        hub.process_messages();

        let mx_camera = hub[camera].local_matrix();
        let mx_view = mx_camera.invert().unwrap_or_else(Matrix4::identity);

        let root = Some(scene.object.node.clone());
        let items = hub
            .walk(&root)
            .filter_map(|w| match w.node.sub_node {
                SubNode::Visual(ref data) => Some(DrawItem {
                    name: w.node.name.clone(),
                    kind: if data.map.is_some() {
                        DrawKind::Background
                    } else {
                        DrawKind::Mesh
                    },
                    world: w.world_matrix.into(),
                    geometry: data.geometry.clone(),
                    map: data.map.clone(),
                    influences: data.morph.as_ref().map(|m| m.influences.clone()),
                    frustum_culled: w.node.frustum_culled,
                }),
                _ => None,
            })
            .collect();

        Frame {
            projection: camera.projection_matrix(),
            view: mx_view.into(),
            items,
        }
    }

    /// Items of the given kind.
    pub fn items_of(&self, kind: DrawKind) -> impl Iterator<Item = &DrawItem> {
        self.items.iter().filter(move |item| item.kind == kind)
    }
}

/// Rasterizer of [`Frame`](struct.Frame.html)s.
pub trait Renderer {
    /// Resizes the output, in logical pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Sets the ratio of physical to logical pixels.
    fn set_pixel_ratio(&mut self, ratio: f32);

    /// Draws a frame.
    fn render(&mut self, frame: &Frame);
}

/// Renderer that only records what it is asked to draw.
#[derive(Clone, Debug, Default)]
pub struct Headless {
    size: (u32, u32),
    pixel_ratio: f32,
    frames: usize,
    last_frame: Option<Frame>,
}

impl Headless {
    /// Creates a renderer that has not drawn anything yet.
    pub fn new() -> Self {
        Headless {
            pixel_ratio: 1.0,
            ..Headless::default()
        }
    }

    /// Output size as last set.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Pixel ratio as last set.
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Number of frames rendered so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// The most recent frame.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }
}

impl Renderer for Headless {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
    }

    fn render(&mut self, frame: &Frame) {
        trace!("Frame {} with {} items", self.frames, frame.items.len());
        self.frames += 1;
        self.last_frame = Some(frame.clone());
    }
}
