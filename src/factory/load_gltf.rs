//! `glTF` loading sub-module.
//!
//! ### Implementation Notes
//!
//! * The order of function declarations matches the order of usage.
//! * The entry point is `GltfLoader::load`, at the end of the file.
//! * Nodes used as skin joints are loaded as bones, everything else as
//!   groups.

use gltf;
use mint;
use serde_json;

use std::collections::HashSet;
use std::path::Path;

use asset::{AssetDocument, AssetLoader, AssetMesh, AssetNode, AssetNodeKind};
use error::{Error, Result};
use geometry::{Geometry, Shape};

/// Morph target names from the `targetNames` mesh extra.
///
/// Meshes without it get their target indices as names.
fn load_target_names(
    mesh: &gltf::Mesh,
    count: usize,
) -> Vec<String> {
    let names = mesh
        .extras()
        .as_ref()
        .and_then(|extras| serde_json::from_str::<serde_json::Value>(extras.get()).ok())
        .and_then(|value| {
            value.get("targetNames").and_then(|v| v.as_array()).map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(String::from))
                    .collect::<Vec<_>>()
            })
        });
    match names {
        Some(ref names) if names.len() == count => names.clone(),
        Some(names) => {
            warn!(
                "Mesh {:?} declares {} target names for {} morph targets",
                mesh.name(), names.len(), count
            );
            (0 .. count)
                .map(|i| names.get(i).cloned().unwrap_or_else(|| i.to_string()))
                .collect()
        }
        None => (0 .. count).map(|i| i.to_string()).collect(),
    }
}

fn load_primitive<'a>(
    primitive: gltf::Primitive<'a>,
    buffers: &[gltf::buffer::Data],
) -> Geometry {
    let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));

    let faces = match reader.read_indices() {
        Some(iter) => {
            let indices: Vec<u32> = iter.into_u32().collect();
            indices.chunks(3).filter(|c| c.len() == 3).map(|c| [c[0], c[1], c[2]]).collect()
        }
        None => Vec::new(),
    };
    let vertices: Vec<mint::Point3<f32>> = match reader.read_positions() {
        Some(iter) => iter.map(|x| x.into()).collect(),
        None => {
            warn!("Primitive {} has no positions", primitive.index());
            Vec::new()
        }
    };
    let normals = if let Some(iter) = reader.read_normals() {
        iter.map(|x| x.into()).collect()
    } else {
        Vec::new()
    };
    let tex_coords = if let Some(iter) = reader.read_tex_coords(0) {
        iter.into_f32().map(|x| x.into()).collect()
    } else {
        Vec::new()
    };
    let shapes = reader
        .read_morph_targets()
        .map(|(positions, normals, _tangents)| {
            let mut shape = Shape::default();
            if let Some(iter) = positions {
                shape.vertices.extend(iter.map(mint::Point3::<f32>::from));
            }
            if let Some(iter) = normals {
                shape.normals.extend(iter.map(mint::Vector3::<f32>::from));
            }
            shape
        })
        .collect();

    Geometry {
        base_shape: Shape {
            vertices,
            normals,
        },
        shapes,
        tex_coords,
        faces,
    }
}

fn load_mesh<'a>(
    mesh: gltf::Mesh<'a>,
    buffers: &[gltf::buffer::Data],
) -> Vec<AssetMesh> {
    let name = mesh.name().map(Into::into);
    let geometries: Vec<Geometry> = mesh
        .primitives()
        .map(|prim| load_primitive(prim, buffers))
        .collect();
    // All primitives of a glTF mesh share the same set of targets.
    let count = geometries.iter().map(|g| g.shapes.len()).max().unwrap_or(0);
    let target_names = if count > 0 {
        load_target_names(&mesh, count)
    } else {
        Vec::new()
    };
    let mut weights = mesh.weights().map(|w| w.to_vec()).unwrap_or_default();
    weights.resize(count, 0.0);
    debug!("Mesh {:?} has {} morph targets", name, count);

    geometries
        .into_iter()
        .map(|geometry| AssetMesh {
            name: name.clone(),
            geometry,
            target_names: target_names.clone(),
            weights: weights.clone(),
        })
        .collect()
}

fn load_node<'a>(
    node: gltf::Node<'a>,
    joints: &HashSet<usize>,
    buffers: &[gltf::buffer::Data],
) -> AssetNode {
    let kind = if joints.contains(&node.index()) {
        AssetNodeKind::Bone
    } else {
        AssetNodeKind::Group
    };
    let mut asset = AssetNode::new(kind, node.name().map(Into::into));

    let (translation, rotation, scale) = node.transform().decomposed();
    asset.translation = translation.into();
    asset.rotation = rotation.into();
    // Groups do not handle non-uniform scaling, Y is used in all directions.
    asset.scale = scale[1];

    if let Some(mesh) = node.mesh() {
        asset.meshes = load_mesh(mesh, buffers);
    }
    asset.children = node
        .children()
        .map(|child| load_node(child, joints, buffers))
        .collect();
    asset
}

/// Loads avatars from local glTF 2.0 files (`.gltf` or `.glb`).
///
/// Accepts plain paths and `file://` URLs.
#[derive(Clone, Debug, Default)]
pub struct GltfLoader;

impl GltfLoader {
    /// Creates a new loader.
    pub fn new() -> Self {
        GltfLoader
    }

    fn path_of(url: &str) -> Result<&Path> {
        if url.starts_with("file://") {
            Ok(Path::new(&url["file://".len() ..]))
        } else if url.contains("://") {
            Err(Error::UnsupportedUrl(url.to_string()))
        } else {
            Ok(Path::new(url))
        }
    }
}

impl AssetLoader for GltfLoader {
    fn load(&self, url: &str) -> Result<AssetDocument> {
        info!("Loading glTF file {}", url);
        let path = GltfLoader::path_of(url)?;
        let (gltf, buffers, _images) = gltf::import(path)?;

        let joints: HashSet<usize> = gltf
            .skins()
            .flat_map(|skin| skin.joints().map(|joint| joint.index()).collect::<Vec<_>>())
            .collect();

        if gltf.scenes().len() > 1 {
            warn!("Multiple scenes found in {}, only the default one is loaded", url);
        }
        let roots = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
            Some(scene) => scene
                .nodes()
                .map(|node| load_node(node, &joints, &buffers))
                .collect(),
            None => {
                warn!("No scene found in {}", url);
                Vec::new()
            }
        };

        let document = AssetDocument {
            url: url.to_string(),
            roots,
        };
        info!("Loaded glTF file {}", url);
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_urls_are_rejected() {
        match GltfLoader::new().load("https://example.com/avatar.glb") {
            Err(Error::UnsupportedUrl(url)) => assert_eq!(url, "https://example.com/avatar.glb"),
            other => panic!("unexpected result {:?}", other.map(|d| d.url)),
        }
    }

    #[test]
    fn file_urls_map_to_paths() {
        let path = GltfLoader::path_of("file:///tmp/avatar.glb").unwrap();
        assert_eq!(path, Path::new("/tmp/avatar.glb"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(GltfLoader::new().load("does/not/exist.glb").is_err());
    }
}
