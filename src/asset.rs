//! Plain-data description of a loaded avatar, and the loaders producing it.
//!
//! Loading is split in two halves. An [`AssetLoader`] turns a URL into an
//! [`AssetDocument`], which holds nothing but owned data and can therefore be
//! produced on a worker thread. The document is later instantiated into the
//! scene graph by the [`Factory`] on the thread that owns the scene, see
//! [`AvatarModel`].
//!
//! [`AssetLoader`]: trait.AssetLoader.html
//! [`AssetDocument`]: struct.AssetDocument.html
//! [`Factory`]: ../struct.Factory.html
//! [`AvatarModel`]: ../avatar/struct.AvatarModel.html

use mint;

use error::{Error, Result};
use geometry::Geometry;

use std::sync::{mpsc, Arc};
use std::thread;

/// A hierarchy of nodes ready to be instantiated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetDocument {
    /// Where the document was loaded from.
    pub url: String,
    /// Top level nodes, in document order.
    pub roots: Vec<AssetNode>,
}

/// What an [`AssetNode`](struct.AssetNode.html) is instantiated as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetNodeKind {
    /// Plain transform node.
    Group,
    /// Joint of a skin.
    Bone,
}

/// A single node of an [`AssetDocument`](struct.AssetDocument.html).
#[derive(Clone, Debug, PartialEq)]
pub struct AssetNode {
    /// Optional name of the node.
    pub name: Option<String>,
    /// Group or bone.
    pub kind: AssetNodeKind,
    /// The node's local translation.
    pub translation: mint::Point3<f32>,
    /// The node's local rotation.
    pub rotation: mint::Quaternion<f32>,
    /// The node's local (uniform) scale.
    pub scale: f32,
    /// Renderable primitives attached to this node.
    pub meshes: Vec<AssetMesh>,
    /// Child nodes, in document order.
    pub children: Vec<AssetNode>,
}

impl AssetNode {
    /// Creates an empty node with identity transform.
    pub fn new(kind: AssetNodeKind, name: Option<String>) -> Self {
        AssetNode {
            name,
            kind,
            translation: [0.0, 0.0, 0.0].into(),
            rotation: mint::Quaternion { v: [0.0, 0.0, 0.0].into(), s: 1.0 },
            scale: 1.0,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a child node.
    pub fn with_child(mut self, child: AssetNode) -> Self {
        self.children.push(child);
        self
    }

    /// Attaches a mesh primitive.
    pub fn with_mesh(mut self, mesh: AssetMesh) -> Self {
        self.meshes.push(mesh);
        self
    }
}

/// A mesh primitive, with its morph targets if it has any.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetMesh {
    /// Optional name of the mesh.
    pub name: Option<String>,
    /// Vertex data.
    pub geometry: Geometry,
    /// Morph target names, in influence array order.
    pub target_names: Vec<String>,
    /// Initial influences, one per target.
    pub weights: Vec<f32>,
}

impl AssetMesh {
    /// Creates a mesh primitive with the given morph target names and zero
    /// influences.
    pub fn with_targets<I, S>(name: Option<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target_names: Vec<String> = targets.into_iter().map(Into::into).collect();
        AssetMesh {
            name,
            geometry: Geometry::empty(),
            weights: vec![0.0; target_names.len()],
            target_names,
        }
    }
}

/// Asset transport: turns a URL into a document.
///
/// Implementations run on a worker thread when used through
/// [`PendingLoad::spawn`](struct.PendingLoad.html#method.spawn).
pub trait AssetLoader: Send + Sync {
    /// Fetches and parses the asset at `url`.
    fn load(&self, url: &str) -> Result<AssetDocument>;
}

/// Result of a load that is running in the background.
pub struct PendingLoad {
    url: String,
    rx: mpsc::Receiver<Result<AssetDocument>>,
}

impl PendingLoad {
    /// Starts loading `url` on a worker thread.
    pub fn spawn(loader: Arc<dyn AssetLoader>, url: &str) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread_url = url.to_string();
        thread::spawn(move || {
            info!("Loading avatar {}", thread_url);
            let result = loader.load(&thread_url);
            let _ = tx.send(result);
        });
        PendingLoad {
            url: url.to_string(),
            rx,
        }
    }

    /// URL being loaded.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the outcome once the worker is done, `None` while it is still
    /// running.
    pub fn poll(&self) -> Option<Result<AssetDocument>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(Error::LoaderGone)),
        }
    }

    /// Blocks until the worker is done.
    pub fn wait(self) -> Result<AssetDocument> {
        self.rx.recv().unwrap_or(Err(Error::LoaderGone))
    }
}
