use hub::{self, HubPtr, Operation};
use node::NodeInternal;
use object::{Base, Object};

use std::ptr;

/// Scene contains the objects rendered by the [`Camera`](struct.Camera.html).
///
/// The scene is the root group of the graph; everything reachable from it is
/// visited by every render pass.
pub struct Scene {
    pub(crate) object: Base,
    pub(crate) hub: HubPtr,
}

impl Scene {
    /// Add new [`Object`](trait.Object.html) to the scene.
    pub fn add<T: Object>(&self, child: &T) {
        let node = child.as_ref().node.clone();
        self.object.send(Operation::AddChild(node));
    }

    /// Remove a previously added [`Object`](trait.Object.html) from the scene.
    pub fn remove<T: Object>(&self, child: &T) {
        let node = child.as_ref().node.clone();
        self.object.send(Operation::RemoveChild(node));
    }

    /// Checks whether `object` is reachable from the scene root.
    ///
    /// Flushes all pending messages first.
    pub fn contains<T: Object>(&self, object: &T) -> bool {
        let mut hub = hub::lock(&self.hub);
        hub.process_messages();
        let target: *const NodeInternal = &hub.nodes[&object.as_ref().node];
        let root = Some(self.object.node.clone());
        let found = hub.walk_all(&root).any(|wn| ptr::eq(wn.node, target));
        found
    }
}
