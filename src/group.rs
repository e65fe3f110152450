use hub::Operation;
use object::{Base, Object};

/// Groups are used to combine several other objects or groups to work with
/// them as with a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    pub(crate) object: Base,
}
mimic_object!(Group::object);

impl Group {
    pub(crate) fn new(object: Base) -> Self {
        Group { object }
    }

    /// Add new [`Object`](trait.Object.html) to the group.
    pub fn add<T: Object>(&self, child: &T) {
        let node = child.as_ref().node.clone();
        self.object.send(Operation::AddChild(node));
    }

    /// Removes a child [`Object`](trait.Object.html) from the group.
    pub fn remove<T: Object>(&self, child: &T) {
        let node = child.as_ref().node.clone();
        self.object.send(Operation::RemoveChild(node));
    }
}
