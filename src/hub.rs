use geometry::Geometry;
use mesh::MorphDictionary;
use node::{NodeInternal, NodePointer};
use object::Base;
use video::VideoTexture;

use cgmath::{Matrix4, Quaternion, Vector3};
use froggy;
use mint;

use std::{mem, ops};
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::mpsc;


#[derive(Clone, Debug)]
pub(crate) struct MorphData {
    pub dictionary: Arc<MorphDictionary>,
    pub influences: Arc<Vec<f32>>,
}

#[derive(Clone, Debug)]
pub(crate) struct VisualData {
    pub geometry: Arc<Geometry>,
    pub map: Option<VideoTexture>,
    pub morph: Option<MorphData>,
}

#[derive(Debug)]
pub(crate) enum SubNode {
    /// No extra data.
    Empty,
    /// Group can be a parent to other objects.
    Group { first_child: Option<NodePointer> },
    /// Renderable 3D content, such as a mesh or the video background.
    Visual(VisualData),
}

pub(crate) type Message = (froggy::WeakPointer<NodeInternal>, Operation);

#[derive(Debug)]
pub(crate) enum Operation {
    AddChild(NodePointer),
    RemoveChild(NodePointer),
    SetVisible(bool),
    SetFrustumCulled(bool),
    SetTransform(
        Option<mint::Point3<f32>>,
        Option<mint::Quaternion<f32>>,
        Option<f32>,
    ),
    SetMatrix(Option<mint::ColumnMatrix4<f32>>),
    SetGeometry(Arc<Geometry>),
    SetMap(Option<VideoTexture>),
    SetInfluences(Arc<Vec<f32>>),
}

pub(crate) type HubPtr = Arc<Mutex<Hub>>;

/// Locks the hub, recovering the guard if another holder panicked.
pub(crate) fn lock(hub: &HubPtr) -> MutexGuard<Hub> {
    hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct Hub {
    pub(crate) nodes: froggy::Storage<NodeInternal>,
    pub(crate) message_tx: mpsc::Sender<Message>,
    message_rx: mpsc::Receiver<Message>,
}

impl<T: AsRef<Base>> ops::Index<T> for Hub {
    type Output = NodeInternal;
    fn index(&self, i: T) -> &Self::Output {
        let base: &Base = i.as_ref();
        &self.nodes[&base.node]
    }
}

impl<T: AsRef<Base>> ops::IndexMut<T> for Hub {
    fn index_mut(&mut self, i: T) -> &mut Self::Output {
        let base: &Base = i.as_ref();
        &mut self.nodes[&base.node]
    }
}

impl Hub {
    pub(crate) fn new() -> HubPtr {
        let (tx, rx) = mpsc::channel();
        let hub = Hub {
            nodes: froggy::Storage::new(),
            message_tx: tx,
            message_rx: rx,
        };
        Arc::new(Mutex::new(hub))
    }

    pub(crate) fn spawn(
        &mut self,
        sub: SubNode,
    ) -> Base {
        Base {
            node: self.nodes.create(sub.into()),
            tx: self.message_tx.clone(),
        }
    }

    pub(crate) fn spawn_named(
        &mut self,
        sub: SubNode,
        name: Option<String>,
    ) -> Base {
        let mut node: NodeInternal = sub.into();
        node.name = name;
        Base {
            node: self.nodes.create(node),
            tx: self.message_tx.clone(),
        }
    }

    pub(crate) fn spawn_visual(
        &mut self,
        data: VisualData,
        name: Option<String>,
    ) -> Base {
        self.spawn_named(SubNode::Visual(data), name)
    }

    /// Applies every pending operation.
    ///
    /// Called with the hub locked, so a render pass observes either all
    /// operations queued before it or none of them.
    pub(crate) fn process_messages(&mut self) {
        while let Ok((weak_ptr, operation)) = self.message_rx.try_recv() {
            let ptr = match weak_ptr.upgrade() {
                Ok(ptr) => ptr,
                Err(_) => continue,
            };
            match operation {
                Operation::SetVisible(visible) => {
                    self.nodes[&ptr].visible = visible;
                }
                Operation::SetFrustumCulled(culled) => {
                    self.nodes[&ptr].frustum_culled = culled;
                }
                Operation::SetTransform(pos, rot, scale) => {
                    let transform = &mut self.nodes[&ptr].transform;
                    if let Some(pos) = pos {
                        transform.disp = Vector3::new(pos.x, pos.y, pos.z);
                    }
                    if let Some(rot) = rot {
                        transform.rot = Quaternion::from(rot);
                    }
                    if let Some(scale) = scale {
                        transform.scale = scale;
                    }
                }
                Operation::SetMatrix(matrix) => {
                    self.nodes[&ptr].matrix = matrix.map(Matrix4::from);
                }
                Operation::AddChild(child_ptr) => {
                    let sibling = match self.nodes[&ptr].sub_node {
                        SubNode::Group { ref mut first_child } =>
                            mem::replace(first_child, Some(child_ptr.clone())),
                        _ => {
                            error!("Children can only be added to groups");
                            continue;
                        }
                    };
                    let child = &mut self.nodes[&child_ptr];
                    if child.next_sibling.is_some() {
                        error!("Element {:?} is added to a group while still having old parent - {}",
                            child.name, "discarding siblings");
                    }
                    child.next_sibling = sibling;
                }
                Operation::RemoveChild(child_ptr) => {
                    let next_sibling = self.nodes[&child_ptr].next_sibling.take();
                    let target_maybe = Some(child_ptr);
                    let mut cur_ptr = match self.nodes[&ptr].sub_node {
                        SubNode::Group { ref mut first_child } => {
                            if *first_child == target_maybe {
                                *first_child = next_sibling;
                                continue;
                            }
                            first_child.clone()
                        }
                        _ => {
                            error!("Children can only be removed from groups");
                            continue;
                        }
                    };

                    loop {
                        let node = match cur_ptr.take() {
                            Some(next_ptr) => &mut self.nodes[&next_ptr],
                            None => {
                                error!("Unable to find child for removal");
                                break;
                            }
                        };
                        if node.next_sibling == target_maybe {
                            node.next_sibling = next_sibling;
                            break;
                        }
                        cur_ptr = node.next_sibling.clone();
                    }
                }
                Operation::SetGeometry(geometry) => {
                    match self.nodes[&ptr].sub_node {
                        SubNode::Visual(ref mut data) => data.geometry = geometry,
                        _ => error!("Geometry can only be set on visual nodes"),
                    }
                }
                Operation::SetMap(map) => {
                    match self.nodes[&ptr].sub_node {
                        SubNode::Visual(ref mut data) => data.map = map,
                        _ => error!("Texture can only be set on visual nodes"),
                    }
                }
                Operation::SetInfluences(influences) => {
                    match self.nodes[&ptr].sub_node {
                        SubNode::Visual(VisualData { morph: Some(ref mut morph), .. }) => {
                            morph.influences = influences;
                        }
                        _ => warn!("Ignoring morph target influences for a node without morph targets"),
                    }
                }
            }
        }

        self.nodes.sync_pending();
    }

    fn walk_impl(
        &self, base: &Option<NodePointer>, only_visible: bool
    ) -> TreeWalker {
        let default_stack_size = 10;
        let mut walker = TreeWalker {
            hub: self,
            only_visible,
            stack: Vec::with_capacity(default_stack_size),
        };
        walker.descend(base);
        walker
    }

    pub(crate) fn walk(&self, base: &Option<NodePointer>) -> TreeWalker {
        self.walk_impl(base, true)
    }

    pub(crate) fn walk_all(&self, base: &Option<NodePointer>) -> TreeWalker {
        self.walk_impl(base, false)
    }
}

#[derive(Debug)]
pub(crate) struct WalkedNode<'a> {
    pub(crate) node: &'a NodeInternal,
    pub(crate) world_visible: bool,
    pub(crate) world_matrix: Matrix4<f32>,
}

pub(crate) struct TreeWalker<'a> {
    hub: &'a Hub,
    only_visible: bool,
    stack: Vec<WalkedNode<'a>>,
}

impl<'a> TreeWalker<'a> {
    fn descend(&mut self, base: &Option<NodePointer>) -> Option<&NodeInternal> {
        let mut node = &self.hub.nodes[base.as_ref()?];

        loop {
            let wn = match self.stack.last() {
                Some(parent) => WalkedNode {
                    node,
                    world_visible: parent.world_visible && node.visible,
                    world_matrix: parent.world_matrix * node.local_matrix(),
                },
                None => WalkedNode {
                    node,
                    world_visible: node.visible,
                    world_matrix: node.local_matrix(),
                },
            };
            self.stack.push(wn);

            if self.only_visible && !node.visible {
                break;
            }

            node = match node.sub_node {
                SubNode::Group { first_child: Some(ref ptr) } => &self.hub.nodes[ptr],
                _ => break,
            };
        }

        Some(node)
    }
}

impl<'a> Iterator for TreeWalker<'a> {
    type Item = WalkedNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.pop() {
            self.descend(&top.node.next_sibling);
            if !self.only_visible || top.world_visible {
                return Some(top)
            }
        }
        None
    }
}
