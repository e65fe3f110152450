//! Loaded avatar models.
//!
//! An [`AvatarModel`] owns the scene subtree created from an
//! [`AssetDocument`], along with the handles retargeting writes to: the meshes
//! carrying morph targets, the skeletal root and the named bones.
//!
//! [`AvatarModel`]: struct.AvatarModel.html
//! [`AssetDocument`]: ../asset/struct.AssetDocument.html

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{Quaternion, Rad, Rotation3};
use mint;

use asset::{AssetDocument, AssetLoader};
use error::Result;
use factory::{Factory, Instanced};
use group::Group;
use mesh::{Mesh, MorphDictionary};
use object::Object;
use scene::Scene;
use skeleton::Bone;

/// A mesh of the avatar that has morph targets.
#[derive(Clone, Debug)]
pub struct MorphTargetMesh {
    mesh: Mesh,
    dictionary: Arc<MorphDictionary>,
    influences: Arc<Vec<f32>>,
}

impl MorphTargetMesh {
    /// The scene graph handle.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Name to influence index mapping of this mesh.
    pub fn dictionary(&self) -> &MorphDictionary {
        &self.dictionary
    }

    /// Influences as last written.
    pub fn influences(&self) -> &[f32] {
        &self.influences
    }

    /// Replaces the whole influence array.
    ///
    /// The render side picks the new array up as one value.
    pub(crate) fn publish(&mut self, influences: Vec<f32>) {
        self.influences = Arc::new(influences);
        self.mesh.set_influences(self.influences.clone());
    }
}

/// Euler angles in radians, applied in X, Y, Z order.
pub(crate) fn euler_xyz(angles: [f32; 3]) -> Quaternion<f32> {
    Quaternion::from_angle_x(Rad(angles[0]))
        * Quaternion::from_angle_y(Rad(angles[1]))
        * Quaternion::from_angle_z(Rad(angles[2]))
}

/// A loaded avatar and the parts of it retargeting drives.
#[derive(Debug)]
pub struct AvatarModel {
    url: String,
    root: Group,
    meshes: Vec<Mesh>,
    morph_target_meshes: Vec<MorphTargetMesh>,
    skeletal_root: Option<Bone>,
    bones: HashMap<String, Bone>,
}

impl AvatarModel {
    /// Instantiates `document` and collects the handles of interest.
    ///
    /// Objects are visited depth-first in document order: the first bone
    /// becomes the skeletal root, every mesh with morph targets is recorded,
    /// and every mesh has frustum culling disabled so that the avatar never
    /// pops out when its bounds are stale.
    ///
    /// The model is not attached to any scene yet.
    pub fn from_document(
        factory: &mut Factory,
        document: &AssetDocument,
    ) -> Self {
        let instance = factory.instantiate(document);
        let mut model = AvatarModel {
            url: document.url.clone(),
            root: instance.root,
            meshes: Vec::new(),
            morph_target_meshes: Vec::new(),
            skeletal_root: None,
            bones: HashMap::new(),
        };

        for object in instance.objects {
            match object {
                Instanced::Group(_) => {}
                Instanced::Bone(name, bone) => {
                    if model.skeletal_root.is_none() {
                        model.skeletal_root = Some(bone.clone());
                    }
                    if let Some(name) = name {
                        model.bones.entry(name).or_insert(bone);
                    }
                }
                Instanced::Mesh(mesh, morph) => {
                    mesh.set_frustum_culled(false);
                    if let Some(morph) = morph {
                        if !morph.dictionary.is_empty() {
                            model.morph_target_meshes.push(MorphTargetMesh {
                                mesh: mesh.clone(),
                                dictionary: morph.dictionary,
                                influences: morph.influences,
                            });
                        }
                    }
                    model.meshes.push(mesh);
                }
            }
        }

        info!(
            "Avatar {} has {} meshes, {} with morph targets, {} named bones",
            model.url,
            model.meshes.len(),
            model.morph_target_meshes.len(),
            model.bones.len()
        );
        model
    }

    /// Loads the avatar at `url`, blocking until `loader` is done.
    ///
    /// Failures are logged and returned, nothing is created in that case.
    pub fn load(
        factory: &mut Factory,
        loader: &dyn AssetLoader,
        url: &str,
    ) -> Result<Self> {
        match loader.load(url) {
            Ok(document) => Ok(AvatarModel::from_document(factory, &document)),
            Err(e) => {
                error!("Failed to load avatar {}: {}", url, e);
                Err(e)
            }
        }
    }

    /// Makes `model` the current avatar of `scene`.
    ///
    /// The previous avatar, if any, is detached and its handles released
    /// before the new root is attached.
    pub fn replace(
        slot: &mut Option<AvatarModel>,
        scene: &Scene,
        model: AvatarModel,
    ) {
        if let Some(old) = slot.take() {
            info!("Releasing avatar {}", old.url);
            scene.remove(&old.root);
        }
        scene.add(&model.root);
        *slot = Some(model);
    }

    /// Where the avatar was loaded from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Root of the avatar subtree.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Every mesh of the avatar, with or without morph targets.
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Meshes with a non-empty morph dictionary, in document order.
    pub fn morph_target_meshes(&self) -> &[MorphTargetMesh] {
        &self.morph_target_meshes
    }

    pub(crate) fn morph_target_meshes_mut(&mut self) -> &mut [MorphTargetMesh] {
        &mut self.morph_target_meshes
    }

    /// First bone of the hierarchy, if the model is skinned.
    pub fn skeletal_root(&self) -> Option<&Bone> {
        self.skeletal_root.as_ref()
    }

    /// Looks up a bone by name.
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.get(name)
    }

    /// Moves the skeletal root to `offset`, optionally rotating it by the
    /// given XYZ Euler angles in radians.
    ///
    /// Does nothing for models without bones.
    pub fn offset_root<P>(&self, offset: P, rotation: Option<[f32; 3]>)
    where
        P: Into<mint::Point3<f32>>,
    {
        let bone = match self.skeletal_root {
            Some(ref bone) => bone,
            None => return,
        };
        bone.set_position(offset);
        if let Some(angles) = rotation {
            bone.set_orientation(euler_xyz(angles));
        }
    }
}
