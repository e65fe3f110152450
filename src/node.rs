use cgmath::{self, Matrix4, One, Quaternion, Vector3, Zero};
use froggy;
use mint;

use hub::SubNode;

/// Pointer to a Node
pub(crate) type NodePointer = froggy::Pointer<NodeInternal>;
pub(crate) type TransformInternal = cgmath::Decomposed<Vector3<f32>, Quaternion<f32>>;

/// Local matrix state of a scene node.
///
/// Mirrors the `matrixAutoUpdate` switch of three.js: by default the local
/// matrix is recomputed from position, orientation and scale on every graph
/// update. Once a manual matrix is assigned the fields are ignored until the
/// node is switched back to [`Auto`](#variant.Auto).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalMatrix {
    /// Derived from the node transform fields.
    Auto,
    /// Assigned verbatim.
    Manual(mint::ColumnMatrix4<f32>),
}

// Fat node of the scene graph.
#[derive(Debug)]
pub(crate) struct NodeInternal {
    pub(crate) name: Option<String>,
    pub(crate) visible: bool,
    /// Skipped by the renderer when entirely outside of the view frustum.
    pub(crate) frustum_culled: bool,
    pub(crate) transform: TransformInternal,
    pub(crate) matrix: Option<Matrix4<f32>>,
    pub(crate) next_sibling: Option<NodePointer>,
    pub(crate) sub_node: SubNode,
}

impl NodeInternal {
    pub(crate) fn local_matrix(&self) -> Matrix4<f32> {
        match self.matrix {
            Some(matrix) => matrix,
            None => transform_matrix(&self.transform),
        }
    }
}

pub(crate) fn transform_matrix(tf: &TransformInternal) -> Matrix4<f32> {
    Matrix4::from_translation(tf.disp) * Matrix4::from(tf.rot) * Matrix4::from_scale(tf.scale)
}

impl From<SubNode> for NodeInternal {
    fn from(sub: SubNode) -> Self {
        NodeInternal {
            name: None,
            visible: true,
            frustum_culled: true,
            transform: TransformInternal {
                scale: 1.0,
                rot: Quaternion::one(),
                disp: Vector3::zero(),
            },
            matrix: None,
            next_sibling: None,
            sub_node: sub,
        }
    }
}

/// Position, rotation and scale of the scene node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeTransform {
    /// Position.
    pub position: mint::Point3<f32>,
    /// Orientation.
    pub orientation: mint::Quaternion<f32>,
    /// Scale.
    pub scale: f32,
}

impl From<TransformInternal> for NodeTransform {
    fn from(tf: TransformInternal) -> Self {
        NodeTransform {
            position: [tf.disp.x, tf.disp.y, tf.disp.z].into(),
            orientation: tf.rot.into(),
            scale: tf.scale,
        }
    }
}

/// General information about a scene node, as seen by the render side.
#[derive(Clone, Debug)]
pub struct NodeInfo {
    /// Optional name given by the asset the node came from.
    pub name: Option<String>,
    /// Relative to parent transform fields.
    pub transform: NodeTransform,
    /// Local matrix mode, see [`LocalMatrix`](enum.LocalMatrix.html).
    pub local_matrix: LocalMatrix,
    /// Effective local matrix, whatever its source.
    pub matrix: mint::ColumnMatrix4<f32>,
    /// Is the node visible by cameras or not?
    pub visible: bool,
    /// Does the renderer cull this node against the view frustum?
    pub frustum_culled: bool,
    /// Morph target influences, for meshes that have them.
    pub influences: Option<Vec<f32>>,
}

impl NodeInfo {
    /// Returns `true` when the local matrix is derived from the transform fields.
    pub fn matrix_auto_update(&self) -> bool {
        self.local_matrix == LocalMatrix::Auto
    }
}

impl NodeInfo {
    pub(crate) fn from_internal(node: &NodeInternal) -> Self {
        NodeInfo {
            name: node.name.clone(),
            transform: node.transform.clone().into(),
            local_matrix: match node.matrix {
                Some(m) => LocalMatrix::Manual(m.into()),
                None => LocalMatrix::Auto,
            },
            matrix: node.local_matrix().into(),
            visible: node.visible,
            frustum_culled: node.frustum_culled,
            influences: match node.sub_node {
                SubNode::Visual(ref data) => data.morph.as_ref().map(|m| (*m.influences).clone()),
                _ => None,
            },
        }
    }
}
