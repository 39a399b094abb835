use std::collections::HashMap;
use std::fmt;

use super::GraphDescription;
use crate::net::DeviceId;
use crate::net::Link;

/// Graph vertex; two vertices are equal when their device ids are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopologyVertex {
    device_id: DeviceId,
}

impl TopologyVertex {
    pub fn new(device_id: DeviceId) -> Self {
        Self { device_id }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}

impl fmt::Display for TopologyVertex {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.device_id.fmt(f)
    }
}

/// Directed graph edge backed by one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEdge {
    link: Link,
    pub(crate) src: usize,
    pub(crate) dst: usize,
}

impl TopologyEdge {
    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn src(&self) -> &DeviceId {
        self.link.src().device_id()
    }

    pub fn dst(&self) -> &DeviceId {
        self.link.dst().device_id()
    }
}

/// Indexed adjacency representation of a [`GraphDescription`].
///
/// Vertices and edges keep description order; all indices are positions in
/// `vertices` / `edges`.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    vertices: Vec<TopologyVertex>,
    index: HashMap<DeviceId, usize>,
    edges: Vec<TopologyEdge>,
    outgoing: Vec<Vec<usize>>,
}

impl TopologyGraph {
    pub fn from_description(description: &GraphDescription) -> Self {
        let mut graph = TopologyGraph::default();
        for device in description.devices() {
            graph.index.insert(device.id().clone(), graph.vertices.len());
            graph.vertices.push(TopologyVertex::new(device.id().clone()));
            graph.outgoing.push(Vec::new());
        }

        for link in description.links() {
            let (Some(&src), Some(&dst)) = (
                graph.index.get(link.src().device_id()),
                graph.index.get(link.dst().device_id()),
            ) else {
                continue;
            };
            graph.outgoing[src].push(graph.edges.len());
            graph.edges.push(TopologyEdge {
                link: link.clone(),
                src,
                dst,
            });
        }
        graph
    }

    pub fn vertices(&self) -> &[TopologyVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[TopologyEdge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(
        &self,
        device_id: &DeviceId,
    ) -> bool {
        self.index.contains_key(device_id)
    }

    /// Edges leaving `device_id`, in description order.
    pub fn edges_from<'a>(
        &'a self,
        device_id: &DeviceId,
    ) -> impl Iterator<Item = &'a TopologyEdge> + 'a {
        let out: &'a [usize] = match self.index.get(device_id) {
            Some(&i) => &self.outgoing[i],
            None => &[],
        };
        out.iter().map(move |&e| &self.edges[e])
    }

    pub(crate) fn index_of(
        &self,
        device_id: &DeviceId,
    ) -> Option<usize> {
        self.index.get(device_id).copied()
    }

    pub(crate) fn outgoing(
        &self,
        vertex: usize,
    ) -> &[usize] {
        &self.outgoing[vertex]
    }

    pub(crate) fn edge(
        &self,
        edge: usize,
    ) -> &TopologyEdge {
        &self.edges[edge]
    }
}
