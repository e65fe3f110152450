use std::hash::{Hash, Hasher};
use std::sync::mpsc;

use mint;

use hub::{self, Message, Operation};
use node::{NodeInfo, NodePointer};
use scene::Scene;

//Note: no local state should be here, only remote links
/// Handle to a node in the scene graph.
///
/// There is no need to use `Base` directly, there are specific wrapper types
/// for each case (e.g. [`Group`](struct.Group.html), [`Mesh`](struct.Mesh.html),
/// [`Bone`](struct.Bone.html), ...). All of them implement [`Object`].
///
/// Modifications are sent as messages and applied by the render side the
/// next time it processes the scene, which keeps every update whole.
///
/// [`Object`]: trait.Object.html
#[derive(Clone, Debug)]
pub struct Base {
    pub(crate) node: NodePointer,
    pub(crate) tx: mpsc::Sender<Message>,
}

impl PartialEq for Base {
    fn eq(&self, other: &Base) -> bool {
        self.node == other.node
    }
}

impl Eq for Base {}

impl Hash for Base {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl AsRef<Base> for Base {
    fn as_ref(&self) -> &Base {
        self
    }
}

impl AsMut<Base> for Base {
    fn as_mut(&mut self) -> &mut Base {
        self
    }
}

impl Base {
    pub(crate) fn send(&self, operation: Operation) {
        let _ = self.tx.send((self.node.downgrade(), operation));
    }
}

/// Anything that lives in the scene graph.
pub trait Object: AsRef<Base> + AsMut<Base> {
    /// Converts into the base type.
    fn upcast(&self) -> Base {
        self.as_ref().clone()
    }

    /// Invisible objects are not rendered by cameras.
    fn set_visible(&self, visible: bool) {
        self.as_ref().send(Operation::SetVisible(visible));
    }

    /// Objects with culling disabled are drawn even when the renderer thinks
    /// they are outside of the view frustum.
    fn set_frustum_culled(&self, culled: bool) {
        self.as_ref().send(Operation::SetFrustumCulled(culled));
    }

    /// Set both position, orientation and scale.
    fn set_transform<P, Q>(&self, pos: P, rot: Q, scale: f32)
    where
        Self: Sized,
        P: Into<mint::Point3<f32>>,
        Q: Into<mint::Quaternion<f32>>,
    {
        let msg = Operation::SetTransform(Some(pos.into()), Some(rot.into()), Some(scale));
        self.as_ref().send(msg);
    }

    /// Set position.
    fn set_position<P>(&self, pos: P)
    where
        Self: Sized,
        P: Into<mint::Point3<f32>>,
    {
        self.as_ref().send(Operation::SetTransform(Some(pos.into()), None, None));
    }

    /// Set orientation.
    fn set_orientation<Q>(&self, rot: Q)
    where
        Self: Sized,
        Q: Into<mint::Quaternion<f32>>,
    {
        self.as_ref().send(Operation::SetTransform(None, Some(rot.into()), None));
    }

    /// Assigns a manual local matrix, or goes back to deriving it from the
    /// transform fields with `None`.
    fn set_matrix(&self, matrix: Option<mint::ColumnMatrix4<f32>>) {
        self.as_ref().send(Operation::SetMatrix(matrix));
    }

    /// Get actual information about itself from the `scene`.
    ///
    /// Flushes all pending messages of the scene first.
    fn sync(&self, scene: &Scene) -> NodeInfo {
        let mut hub = hub::lock(&scene.hub);
        hub.process_messages();
        NodeInfo::from_internal(&hub.nodes[&self.as_ref().node])
    }
}

impl Object for Base {}
