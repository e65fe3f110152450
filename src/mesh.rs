use std::collections::HashMap;
use std::sync::Arc;

use geometry::Geometry;
use hub::Operation;
use object::Base;
use video::VideoTexture;

/// Mapping from morph target name to its index in the influence array.
///
/// Built once per mesh when the model is loaded; every index it hands out is
/// within the bounds of that mesh's influence array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MorphDictionary {
    indices: HashMap<String, usize>,
    len: usize,
}

impl MorphDictionary {
    /// Creates a dictionary from the ordered list of target names.
    ///
    /// A name listed twice resolves to its last index, like three.js does
    /// for glTF `targetNames`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indices = HashMap::new();
        let mut len = 0;
        for name in names {
            indices.insert(name.into(), len);
            len += 1;
        }
        MorphDictionary { indices, len }
    }

    /// Index of the target called `name`, if the mesh has one.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.indices.get(name).cloned()
    }

    /// Returns `true` if the mesh has a target called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Number of morph targets, i.e. the length of the influence array.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the mesh has no morph targets at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over `(name, index)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.indices.iter().map(|(name, &index)| (name.as_str(), index))
    }
}

/// Renderable geometry in the scene graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Mesh {
    pub(crate) object: Base,
}
mimic_object!(Mesh::object);

impl Mesh {
    /// Replaces the vertex data.
    pub fn set_geometry(&self, geometry: Geometry) {
        self.object.send(Operation::SetGeometry(Arc::new(geometry)));
    }

    /// Sets or clears the video texture sampled by the mesh.
    pub fn set_map(&self, map: Option<VideoTexture>) {
        self.object.send(Operation::SetMap(map));
    }

    /// Replaces the whole morph target influence array.
    ///
    /// Avatar meshes are written through retargeting only, which keeps its
    /// own copy of the array.
    pub(crate) fn set_influences(&self, influences: Arc<Vec<f32>>) {
        self.object.send(Operation::SetInfluences(influences));
    }
}
