mod load_gltf;

pub use self::load_gltf::GltfLoader;

use std::ops;
use std::sync::Arc;

use asset::{AssetDocument, AssetMesh, AssetNode, AssetNodeKind};
use camera::{Camera, Perspective};
use geometry::Geometry;
use group::Group;
use hub::{self, Hub, HubPtr, MorphData, SubNode, VisualData};
use mesh::{Mesh, MorphDictionary};
use object::{Base, Object};
use scene::Scene;
use skeleton::Bone;
use video::VideoTexture;

/// `Factory` is used to instantiate scene objects.
///
/// All objects created by one factory share its scene graph and may be added
/// to any [`Scene`](struct.Scene.html) it created.
pub struct Factory {
    hub: HubPtr,
}

/// Morph target data of a mesh created by the factory.
#[derive(Clone, Debug)]
pub struct MorphTargets {
    /// Name to index mapping.
    pub dictionary: Arc<MorphDictionary>,
    /// Influences the mesh starts with.
    pub influences: Arc<Vec<f32>>,
}

/// A scene object created while instantiating an
/// [`AssetDocument`](asset/struct.AssetDocument.html).
#[derive(Clone, Debug)]
pub enum Instanced {
    /// Plain transform node.
    Group(Group),
    /// Named or unnamed joint.
    Bone(Option<String>, Bone),
    /// Mesh primitive, with its morph targets if it has any.
    Mesh(Mesh, Option<MorphTargets>),
}

/// Scene objects created from an [`AssetDocument`].
///
/// [`AssetDocument`]: asset/struct.AssetDocument.html
#[derive(Clone, Debug)]
pub struct Instance {
    /// Group holding every top level node of the document.
    pub root: Group,
    /// Every created object, depth-first in document order.
    ///
    /// A node comes before its mesh primitives, which come before its
    /// children.
    pub objects: Vec<Instanced>,
}

impl Factory {
    /// Creates a factory with an empty scene graph.
    pub fn new() -> Self {
        Factory { hub: Hub::new() }
    }

    /// Create new empty [`Scene`](struct.Scene.html).
    pub fn scene(&mut self) -> Scene {
        let object = hub::lock(&self.hub).spawn(SubNode::Group { first_child: None });
        Scene {
            object,
            hub: self.hub.clone(),
        }
    }

    /// Create empty [`Group`](struct.Group.html).
    pub fn group(&mut self) -> Group {
        let object = hub::lock(&self.hub).spawn(SubNode::Group { first_child: None });
        Group::new(object)
    }

    /// Create a new [`Bone`](struct.Bone.html).
    ///
    /// Bones may parent other objects, like the joints of a skin do.
    pub fn bone(&mut self, name: Option<String>) -> Bone {
        let object = hub::lock(&self.hub).spawn_named(SubNode::Group { first_child: None }, name);
        Bone { object }
    }

    /// Create new `Mesh` with the desired `Geometry`, optionally carrying
    /// morph targets.
    pub fn mesh(
        &mut self,
        geometry: Geometry,
        morph: Option<MorphTargets>,
    ) -> Mesh {
        let data = VisualData {
            geometry: Arc::new(geometry),
            map: None,
            morph: morph.map(|m| MorphData {
                dictionary: m.dictionary,
                influences: m.influences,
            }),
        };
        let object = hub::lock(&self.hub).spawn_visual(data, None);
        Mesh { object }
    }

    /// Create new perspective [`Camera`](struct.Camera.html).
    ///
    /// `fov_y` is the vertical field of view in degrees.
    pub fn perspective_camera(
        &mut self,
        fov_y: f32,
        range: ops::Range<f32>,
        aspect: f32,
    ) -> Camera {
        let object = hub::lock(&self.hub).spawn(SubNode::Empty);
        let projection = Perspective {
            fov_y,
            near: range.start,
            far: range.end,
        };
        Camera::new(object, projection, aspect)
    }

    /// Create a plane at `depth` in front of `camera` that exactly fills its
    /// view, textured with `map`.
    ///
    /// The plane is meant to be added to the scene root while the camera
    /// stays at the origin looking down -Z.
    pub fn background_plane(
        &mut self,
        camera: &Camera,
        depth: f32,
        map: Option<VideoTexture>,
    ) -> Mesh {
        let data = VisualData {
            geometry: Arc::new(Factory::background_geometry(camera, depth)),
            map,
            morph: None,
        };
        let object = hub::lock(&self.hub).spawn_visual(data, Some("background".to_string()));
        Mesh { object }
    }

    /// Plane geometry at `depth` sized to fill the view of `camera`.
    ///
    /// Warns when the plane ends up outside of the camera clipping range.
    pub fn background_geometry(
        camera: &Camera,
        depth: f32,
    ) -> Geometry {
        let range = camera.projection().zrange();
        if depth < range.start || depth > range.end {
            warn!(
                "Background plane at depth {} is outside of the camera range {:?} and will be clipped",
                depth, range
            );
        }
        let (width, height) = camera.viewport_size_at_depth(depth);
        Geometry::plane(width, height).translate(0.0, 0.0, -depth)
    }

    /// Creates scene objects for every node of `document`.
    ///
    /// The returned root is not attached to any scene yet.
    pub fn instantiate(
        &mut self,
        document: &AssetDocument,
    ) -> Instance {
        let root = self.group();
        let mut objects = Vec::new();
        for node in &document.roots {
            let object = self.instantiate_node(node, &mut objects);
            root.add(&object);
        }
        Instance { root, objects }
    }

    fn instantiate_node(
        &mut self,
        node: &AssetNode,
        objects: &mut Vec<Instanced>,
    ) -> Group {
        // Bones share the group node type so they can parent the rest of the skin.
        let group = {
            let mut hub = hub::lock(&self.hub);
            let object = hub.spawn_named(SubNode::Group { first_child: None }, node.name.clone());
            Group::new(object)
        };
        group.set_transform(node.translation, node.rotation, node.scale);
        objects.push(match node.kind {
            AssetNodeKind::Group => Instanced::Group(group.clone()),
            AssetNodeKind::Bone => Instanced::Bone(
                node.name.clone(),
                Bone { object: group.upcast() },
            ),
        });

        for primitive in &node.meshes {
            let (mesh, morph) = self.instantiate_mesh(primitive);
            group.add(&mesh);
            objects.push(Instanced::Mesh(mesh, morph));
        }

        for child in &node.children {
            let object = self.instantiate_node(child, objects);
            group.add(&object);
        }

        group
    }

    fn instantiate_mesh(
        &mut self,
        primitive: &AssetMesh,
    ) -> (Mesh, Option<MorphTargets>) {
        let morph = if primitive.target_names.is_empty() {
            None
        } else {
            let dictionary = MorphDictionary::new(primitive.target_names.iter().cloned());
            let mut influences = primitive.weights.clone();
            influences.resize(dictionary.len(), 0.0);
            Some(MorphTargets {
                dictionary: Arc::new(dictionary),
                influences: Arc::new(influences),
            })
        };
        let data = VisualData {
            geometry: Arc::new(primitive.geometry.clone()),
            map: None,
            morph: morph.clone().map(|m| MorphData {
                dictionary: m.dictionary,
                influences: m.influences,
            }),
        };
        let object = hub::lock(&self.hub).spawn_visual(data, primitive.name.clone());
        (Mesh { object }, morph)
    }
}

impl Default for Factory {
    fn default() -> Self {
        Factory::new()
    }
}

impl AsRef<Base> for Instance {
    fn as_ref(&self) -> &Base {
        self.root.as_ref()
    }
}

impl AsMut<Base> for Instance {
    fn as_mut(&mut self) -> &mut Base {
        self.root.as_mut()
    }
}

impl Object for Instance {}
