//! Mapping of inference output onto an avatar.
//!
//! Every function here takes the current model as an `Option`: when no avatar
//! is loaded yet they simply do nothing. None of them accumulate state across
//! calls, the same input always leaves the model in the same state.
//!
//! Updates are published as whole values (a complete local matrix, a complete
//! influence array), so the render loop never observes half of an update.

use cgmath::{InnerSpace, Matrix3, Matrix4, Quaternion, SquareMatrix, Vector3};
use mint;

use avatar::{euler_xyz, AvatarModel};
use error::{Error, Result};
use inference::{BlendshapeScores, PoseMatrix};
use object::Object;

/// Options of [`apply_transform`](fn.apply_transform.html).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetargetConfig {
    scale_factor: f32,
    decompose: bool,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        RetargetConfig {
            scale_factor: 1.0,
            decompose: false,
        }
    }
}

impl RetargetConfig {
    /// Creates a config with the given scale factor, which must be positive.
    pub fn new(scale_factor: f32) -> Result<Self> {
        if !(scale_factor > 0.0) || !scale_factor.is_finite() {
            return Err(Error::InvalidScale(scale_factor));
        }
        Ok(RetargetConfig {
            scale_factor,
            .. RetargetConfig::default()
        })
    }

    /// When set, the pose is split into position, orientation and scale
    /// instead of being assigned as a matrix.
    pub fn decompose(self, decompose: bool) -> Self {
        RetargetConfig { decompose, .. self }
    }

    /// Uniform scale applied on top of the pose.
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Is the pose decomposed before being applied?
    pub fn is_decomposed(&self) -> bool {
        self.decompose
    }
}

/// Poses the avatar root with `matrix`.
///
/// By default the basis vectors of `matrix` are scaled by the configured
/// factor and the result becomes the root's manual local matrix. With
/// [`decompose`](struct.RetargetConfig.html#method.decompose) set, the root's
/// position, orientation and scale are assigned instead and the local matrix
/// goes back to being derived from them.
pub fn apply_transform(
    model: Option<&mut AvatarModel>,
    matrix: &PoseMatrix,
    config: &RetargetConfig,
) {
    let model = match model {
        Some(model) => model,
        None => return,
    };
    let m = matrix.to_matrix4();
    let s = config.scale_factor;

    if config.decompose {
        let (position, orientation, scale) = decompose(&m);
        trace!("Root pose {:?} {:?} x{}", position, orientation, scale);
        model.root().set_transform(position, orientation, scale * s);
        model.root().set_matrix(None);
    } else {
        let scaled = Matrix4::from_cols(m.x * s, m.y * s, m.z * s, m.w);
        model.root().set_matrix(Some(scaled.into()));
    }
}

/// Splits a transform into translation, rotation and uniform scale.
///
/// Non-uniform scale is reduced to its Y component.
fn decompose(m: &Matrix4<f32>) -> (mint::Point3<f32>, Quaternion<f32>, f32) {
    let mut sx = m.x.truncate().magnitude();
    let sy = m.y.truncate().magnitude();
    let sz = m.z.truncate().magnitude();
    if m.determinant() < 0.0 {
        sx = -sx;
    }
    let position = [m.w.x, m.w.y, m.w.z].into();
    let basis = |v: Vector3<f32>, s: f32| if s == 0.0 { v } else { v / s };
    let rotation = Matrix3::from_cols(
        basis(m.x.truncate(), sx),
        basis(m.y.truncate(), sy),
        basis(m.z.truncate(), sz),
    );
    (position, Quaternion::from(rotation), sy)
}

/// Writes expression scores into the morph target influences of the avatar.
///
/// Every score lands on every mesh that has a target with the same name.
/// Unknown names are skipped, and a mesh that knows none of the names is left
/// alone.
pub fn apply_blendshapes(
    model: Option<&mut AvatarModel>,
    scores: &BlendshapeScores,
) {
    let model = match model {
        Some(model) => model,
        None => return,
    };
    for target in model.morph_target_meshes_mut() {
        let mut influences: Option<Vec<f32>> = None;
        for (name, score) in scores.iter() {
            let index = match target.dictionary().get(name) {
                Some(index) => index,
                None => continue,
            };
            let values = influences.get_or_insert_with(|| target.influences().to_vec());
            if let Some(value) = values.get_mut(index) {
                *value = score;
            }
        }
        if let Some(values) = influences {
            target.publish(values);
        }
    }
}

/// Moves the skeletal root of the avatar, see
/// [`AvatarModel::offset_root`](../avatar/struct.AvatarModel.html#method.offset_root).
pub fn offset_root<P>(
    model: Option<&mut AvatarModel>,
    offset: P,
    rotation: Option<[f32; 3]>,
) where
    P: Into<mint::Point3<f32>>,
{
    if let Some(model) = model {
        model.offset_root(offset, rotation);
    }
}

/// A bone taking part in a [`RotationChain`](struct.RotationChain.html).
#[derive(Clone, Debug, PartialEq)]
pub struct ChainLink {
    /// Name of the bone.
    pub bone: String,
    /// Share of the head rotation given to this bone.
    pub weight: f32,
    /// Constant XYZ Euler angles added on top, in radians.
    pub offset: [f32; 3],
}

/// Distributes the head rotation over a chain of named bones.
#[derive(Clone, Debug, PartialEq)]
pub struct RotationChain {
    links: Vec<ChainLink>,
}

impl RotationChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        RotationChain { links: Vec::new() }
    }

    /// Appends a bone to the chain.
    pub fn link<S: Into<String>>(mut self, bone: S, weight: f32, offset: [f32; 3]) -> Self {
        self.links.push(ChainLink {
            bone: bone.into(),
            weight,
            offset,
        });
        self
    }

    /// Bones of the chain, in application order.
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }
}

impl Default for RotationChain {
    /// Full rotation on the head, a fifth on the neck (tilted forward) and a
    /// tenth on the upper spine.
    fn default() -> Self {
        RotationChain::new()
            .link("Head", 1.0, [0.0, 0.0, 0.0])
            .link("Neck", 0.2, [0.3, 0.0, 0.0])
            .link("Spine2", 0.1, [0.0, 0.0, 0.0])
    }
}

/// XYZ Euler angles of the rotation part of `matrix`, in radians.
///
/// The basis is assumed to be unscaled.
pub fn euler_angles(matrix: &PoseMatrix) -> [f32; 3] {
    let m11 = matrix.get(0, 0);
    let m12 = matrix.get(0, 1);
    let m13 = matrix.get(0, 2);
    let m22 = matrix.get(1, 1);
    let m23 = matrix.get(1, 2);
    let m32 = matrix.get(2, 1);
    let m33 = matrix.get(2, 2);

    let y = m13.max(-1.0).min(1.0).asin();
    if m13.abs() < 0.999_999_9 {
        [(-m23).atan2(m33), y, (-m12).atan2(m11)]
    } else {
        // gimbal lock
        [m32.atan2(m22), y, 0.0]
    }
}

/// Orients the bones of `chain` after the rotation of `matrix`.
///
/// Each bone gets the Euler angles of the pose scaled by its weight, plus its
/// offset. Bones the avatar does not have are skipped.
pub fn apply_rotation_chain(
    model: Option<&mut AvatarModel>,
    matrix: &PoseMatrix,
    chain: &RotationChain,
) {
    let model = match model {
        Some(model) => model,
        None => return,
    };
    let angles = euler_angles(matrix);
    for link in chain.links() {
        let bone = match model.bone(&link.bone) {
            Some(bone) => bone,
            None => {
                trace!("Avatar has no bone {}", link.bone);
                continue;
            }
        };
        let rotation = [
            angles[0] * link.weight + link.offset[0],
            angles[1] * link.weight + link.offset[1],
            angles[2] * link.weight + link.offset[2],
        ];
        bone.set_orientation(euler_xyz(rotation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::{AssetDocument, AssetMesh, AssetNode, AssetNodeKind};
    use factory::Factory;
    use node::LocalMatrix;
    use scene::Scene;

    use cgmath::{Deg, Rotation3};
    use std::sync::Arc;

    const EPSILON: f32 = 1e-5;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn setup() -> (Scene, AvatarModel) {
        let head = AssetNode::new(AssetNodeKind::Bone, Some("Head".into()));
        let neck = AssetNode::new(AssetNodeKind::Bone, Some("Neck".into())).with_child(head);
        let root = AssetNode::new(AssetNodeKind::Group, None)
            .with_mesh(AssetMesh::with_targets(
                Some("A".into()),
                vec!["browDownLeft", "browDownRight", "cheekPuff", "eyeBlinkLeft"],
            ))
            .with_mesh(AssetMesh::with_targets(Some("B".into()), vec!["jawOpen"]))
            .with_child(neck);
        let document = AssetDocument {
            url: "memory".into(),
            roots: vec![root],
        };
        let mut factory = Factory::new();
        let scene = factory.scene();
        let mut slot = None;
        AvatarModel::replace(&mut slot, &scene, AvatarModel::from_document(&mut factory, &document));
        (scene, slot.unwrap())
    }

    fn influences(model: &AvatarModel, scene: &Scene, index: usize) -> Vec<f32> {
        model.morph_target_meshes()[index].mesh().sync(scene).influences.unwrap()
    }

    #[test]
    fn identity_scaled_by_two() {
        let (scene, mut model) = setup();
        let config = RetargetConfig::new(2.0).unwrap();
        apply_transform(Some(&mut model), &PoseMatrix::identity(), &config);
        let info = model.root().sync(&scene);
        let expected = Matrix4::from_diagonal([2.0, 2.0, 2.0, 1.0].into());
        assert_eq!(info.local_matrix, LocalMatrix::Manual(expected.into()));
        assert!(!info.matrix_auto_update());
    }

    #[test]
    fn translation_is_not_scaled() {
        let (scene, mut model) = setup();
        let mut data = PoseMatrix::identity().as_slice().to_vec();
        data[12] = 1.0;
        data[13] = -2.0;
        data[14] = -30.0;
        let pose = PoseMatrix::from_slice(&data).unwrap();
        apply_transform(Some(&mut model), &pose, &RetargetConfig::new(3.0).unwrap());
        let m = model.root().sync(&scene).matrix;
        assert_eq!((m.w.x, m.w.y, m.w.z, m.w.w), (1.0, -2.0, -30.0, 1.0));
        assert_eq!(m.x.x, 3.0);
    }

    #[test]
    fn transform_does_not_accumulate() {
        let (scene, mut model) = setup();
        let config = RetargetConfig::new(2.0).unwrap();
        apply_transform(Some(&mut model), &PoseMatrix::identity(), &config);
        let first = model.root().sync(&scene).matrix;
        apply_transform(Some(&mut model), &PoseMatrix::identity(), &config);
        assert_eq!(model.root().sync(&scene).matrix, first);
    }

    #[test]
    fn decomposed_transform_restores_auto_update() {
        let (scene, mut model) = setup();
        let rotation = Matrix4::from(Quaternion::from_angle_y(Deg(30.0f32)));
        let pose = Matrix4::from_translation(Vector3::new(0.0, 1.0, -5.0))
            * rotation
            * Matrix4::from_scale(0.5);
        let m: [[f32; 4]; 4] = pose.into();
        let data: Vec<f32> = m.iter().flat_map(|c| c.iter().cloned()).collect();
        let pose = PoseMatrix::from_slice(&data).unwrap();

        apply_transform(Some(&mut model), &pose, &RetargetConfig::default());
        apply_transform(
            Some(&mut model),
            &pose,
            &RetargetConfig::new(2.0).unwrap().decompose(true),
        );
        let info = model.root().sync(&scene);
        assert!(info.matrix_auto_update());
        assert!(close(info.transform.scale, 1.0));
        assert!(close(info.transform.position.y, 1.0));
        assert!(close(info.transform.position.z, -5.0));
        let expected = Quaternion::from_angle_y(Deg(30.0f32));
        let actual = Quaternion::from(info.transform.orientation);
        assert!(close(actual.s.abs(), expected.s.abs()));
        assert!(close(actual.v.y.abs(), expected.v.y.abs()));
    }

    #[test]
    fn missing_model_is_a_no_op() {
        apply_transform(None, &PoseMatrix::identity(), &RetargetConfig::default());
        apply_blendshapes(None, &BlendshapeScores::new());
        apply_rotation_chain(None, &PoseMatrix::identity(), &RotationChain::default());
        offset_root(None, [0.0f32, 0.0, 0.0], None);
    }

    #[test]
    fn scale_must_be_positive() {
        assert!(RetargetConfig::new(0.0).is_err());
        assert!(RetargetConfig::new(-1.0).is_err());
        assert!(RetargetConfig::new(::std::f32::NAN).is_err());
        assert_eq!(RetargetConfig::new(1.0).unwrap(), RetargetConfig::default());
    }

    #[test]
    fn blink_lands_only_on_the_mesh_that_has_it() {
        let (scene, mut model) = setup();
        let scores: BlendshapeScores = vec![("eyeBlinkLeft", 0.8)].into_iter().collect();
        apply_blendshapes(Some(&mut model), &scores);
        assert_eq!(influences(&model, &scene, 0), vec![0.0, 0.0, 0.0, 0.8]);
        assert_eq!(influences(&model, &scene, 1), vec![0.0]);
    }

    #[test]
    fn blendshapes_are_idempotent() {
        let (scene, mut model) = setup();
        let scores: BlendshapeScores = vec![("cheekPuff", 0.3), ("jawOpen", 1.5)]
            .into_iter()
            .collect();
        apply_blendshapes(Some(&mut model), &scores);
        let first = (influences(&model, &scene, 0), influences(&model, &scene, 1));
        apply_blendshapes(Some(&mut model), &scores);
        let second = (influences(&model, &scene, 0), influences(&model, &scene, 1));
        assert_eq!(first, second);
        // Scores are not clamped.
        assert_eq!(second.1, vec![1.5]);
    }

    #[test]
    fn matched_scores_overwrite_the_scene_value() {
        let (scene, mut model) = setup();
        model.morph_target_meshes()[1].mesh().set_influences(Arc::new(vec![0.9]));
        assert_eq!(influences(&model, &scene, 1), vec![0.9]);

        let scores: BlendshapeScores = vec![("jawOpen", 0.0)].into_iter().collect();
        apply_blendshapes(Some(&mut model), &scores);
        assert_eq!(influences(&model, &scene, 1), vec![0.0]);
    }

    #[test]
    fn unknown_categories_change_nothing() {
        let (scene, mut model) = setup();
        let scores: BlendshapeScores = vec![("tongueOut", 1.0)].into_iter().collect();
        apply_blendshapes(Some(&mut model), &scores);
        assert_eq!(influences(&model, &scene, 0), vec![0.0; 4]);
        assert_eq!(model.morph_target_meshes()[0].influences(), &[0.0; 4][..]);
    }

    #[test]
    fn offset_moves_the_skeletal_root() {
        let (scene, mut model) = setup();
        offset_root(Some(&mut model), [0.0f32, -1.0, 2.0], Some([0.3, 0.0, 0.0]));
        let info = model.skeletal_root().unwrap().sync(&scene);
        let p = info.transform.position;
        assert_eq!((p.x, p.y, p.z), (0.0, -1.0, 2.0));
        let actual = Quaternion::from(info.transform.orientation);
        let expected = Quaternion::from_angle_x(::cgmath::Rad(0.3f32));
        assert!(close(actual.s, expected.s));
        assert!(close(actual.v.x, expected.v.x));

        // Position only keeps the orientation.
        offset_root(Some(&mut model), [1.0f32, 0.0, 0.0], None);
        let info = model.skeletal_root().unwrap().sync(&scene);
        assert_eq!(info.transform.position.x, 1.0);
        assert!(close(Quaternion::from(info.transform.orientation).s, expected.s));
    }

    #[test]
    fn euler_angles_of_a_pure_rotation() {
        let rotation = Matrix4::from(Quaternion::from_angle_x(Deg(20.0f32)));
        let m: [[f32; 4]; 4] = rotation.into();
        let data: Vec<f32> = m.iter().flat_map(|c| c.iter().cloned()).collect();
        let angles = euler_angles(&PoseMatrix::from_slice(&data).unwrap());
        assert!(close(angles[0], 20f32.to_radians()));
        assert!(close(angles[1], 0.0));
        assert!(close(angles[2], 0.0));
    }

    #[test]
    fn rotation_chain_weights_the_bones() {
        let (scene, mut model) = setup();
        apply_rotation_chain(Some(&mut model), &PoseMatrix::identity(), &RotationChain::default());
        let head = Quaternion::from(model.bone("Head").unwrap().sync(&scene).transform.orientation);
        let neck = Quaternion::from(model.bone("Neck").unwrap().sync(&scene).transform.orientation);
        assert!(close(head.s, 1.0));
        let tilt = Quaternion::from_angle_x(::cgmath::Rad(0.3f32));
        assert!(close(neck.s, tilt.s));
        assert!(close(neck.v.x, tilt.v.x));
    }
}
