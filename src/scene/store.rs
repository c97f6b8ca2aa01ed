use std::collections::HashMap;

use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::error::{SceneError, SceneResult};
use super::NodeId;

pub trait SceneNode {
    fn id(&self) -> NodeId;
}

/// Arena of nodes keyed by id with an explicit z-order (later ids draw on top).
#[derive(Debug, Clone)]
pub struct NodeStore<T> {
    nodes: HashMap<NodeId, T>,
    order: Vec<NodeId>,
}

impl<T> Default for NodeStore<T> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: SceneNode> NodeStore<T> {
    pub fn insert(&mut self, node: T) -> SceneResult<()> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            debug_assert!(false, "duplicate node id {id}");
            return Err(SceneError::DuplicateNodeId(id));
        }
        self.nodes.insert(id, node);
        self.order.push(id);
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let node = self.nodes.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in draw order (bottom first).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn max_id(&self) -> Option<NodeId> {
        self.order.iter().copied().max()
    }

    pub fn bring_to_front(&mut self, id: NodeId) -> SceneResult<()> {
        let index = self.position(id)?;
        let id = self.order.remove(index);
        self.order.push(id);
        Ok(())
    }

    pub fn send_to_back(&mut self, id: NodeId) -> SceneResult<()> {
        let index = self.position(id)?;
        let id = self.order.remove(index);
        self.order.insert(0, id);
        Ok(())
    }

    fn position(&self, id: NodeId) -> SceneResult<usize> {
        self.order
            .iter()
            .position(|existing| *existing == id)
            .ok_or(SceneError::NodeNotFound(id))
    }
}

impl<T: Serialize + SceneNode> Serialize for NodeStore<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de> + SceneNode> Deserialize<'de> for NodeStore<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nodes = Vec::<T>::deserialize(deserializer)?;
        let mut store = Self::default();
        for node in nodes {
            let id = node.id();
            if store.nodes.contains_key(&id) {
                return Err(D::Error::custom(SceneError::DuplicateNodeId(id)));
            }
            store.nodes.insert(id, node);
            store.order.push(id);
        }
        Ok(store)
    }
}
