//! Skeletal joints.

use object::Base;

/// A single joint of a skinned model.
///
/// Avatars use the first bone of their hierarchy as the anchor for coarse
/// retargeting, and named bones for head rotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bone {
    pub(crate) object: Base,
}
mimic_object!(Bone::object);
