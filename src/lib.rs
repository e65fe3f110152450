#![warn(missing_docs)]
//! Drive three-style 3D avatars from face and body tracking.
//!
//! `mimic` takes per-frame output of a vision-landmark inference service
//! (blendshape scores and a head pose matrix) and retargets it onto a loaded
//! avatar, while a separate render loop keeps drawing the current state of the
//! scene at display rate.
//!
//! ## Overview
//!
//! * A [`Session`] owns everything: the [`SceneRuntime`] with its camera and
//!   video background, the current [`AvatarModel`], and the
//!   [`DetectionLoop`] that feeds a [`Detector`].
//! * The host drives the session by dispatching [`HostEvent`]s, one at a time:
//!   video frames advance detection, display refreshes advance rendering.
//! * Retargeting itself lives in the [`retarget`] module and only ever writes
//!   whole values (influence arrays, matrices) into the scene graph.
//!
//! ```rust,no_run
//! extern crate mimic;
//!
//! use mimic::HostEvent;
//! use mimic::session::Builder;
//!
//! # fn detector() -> Box<dyn mimic::Detector> { unimplemented!() }
//! # fn camera() -> mimic::Result<std::sync::Arc<dyn mimic::VideoSource>> { unimplemented!() }
//! # fn main() {
//! let mut session = Builder::new()
//!     .dimensions(1280, 720)
//!     .build(mimic::render::Headless::new());
//! session.start(detector());
//! session.acquire_video(camera);
//! session.dispatch(HostEvent::LoadAvatar("avatar.glb".into())).unwrap();
//! loop {
//!     session.dispatch(HostEvent::VideoFrame).unwrap();
//!     session.dispatch(HostEvent::DisplayRefresh { time_ms: 16.0 }).unwrap();
//! }
//! # }
//! ```
//!
//! [`Session`]: session/struct.Session.html
//! [`SceneRuntime`]: runtime/struct.SceneRuntime.html
//! [`AvatarModel`]: avatar/struct.AvatarModel.html
//! [`DetectionLoop`]: detection/struct.DetectionLoop.html
//! [`Detector`]: inference/trait.Detector.html
//! [`HostEvent`]: session/enum.HostEvent.html
//! [`retarget`]: retarget/index.html

extern crate cgmath;
extern crate froggy;
extern crate genmesh;
extern crate gltf;
extern crate image;
#[macro_use]
extern crate log;
extern crate mint;
#[macro_use]
extern crate quick_error;
extern crate serde_json;

#[macro_use]
mod macros;

pub mod asset;
pub mod avatar;
pub mod camera;
pub mod detection;
mod error;
mod factory;
pub mod geometry;
mod group;
mod hub;
pub mod inference;
mod mesh;
mod node;
mod object;
pub mod render;
pub mod retarget;
pub mod runtime;
mod scene;
pub mod session;
mod skeleton;
mod timer;
pub mod video;

pub use asset::{AssetDocument, AssetLoader, AssetNode, AssetNodeKind, PendingLoad};
pub use avatar::{AvatarModel, MorphTargetMesh};
pub use camera::{Camera, Perspective, Projection};
pub use detection::{DetectionLoop, LoopState};
pub use error::{Error, Result};
pub use factory::{Factory, GltfLoader, Instance, Instanced, MorphTargets};
pub use geometry::Geometry;
pub use group::Group;
pub use inference::{BlendshapeScores, Category, Detection, Detector, InferenceFrame, Landmark,
                    MatrixData, PoseMatrix};
pub use mesh::{Mesh, MorphDictionary};
pub use node::{LocalMatrix, NodeInfo, NodeTransform};
pub use object::{Base, Object};
pub use render::{DrawItem, DrawKind, Frame, Headless, Renderer};
pub use retarget::{RetargetConfig, RotationChain};
pub use runtime::SceneRuntime;
pub use scene::Scene;
pub use session::{ApplyMode, HostEvent, PoseTarget, Session};
pub use skeleton::Bone;
pub use timer::Timer;
pub use video::{VideoFrame, VideoSource, VideoTexture};
