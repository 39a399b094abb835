use std::collections::BTreeSet;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::search;
use super::search::Exclusions;
use super::GraphDescription;
use super::HopCountLinkWeigher;
use super::KShortestPaths;
use super::LinkWeigher;
use super::TopologyEdge;
use super::TopologyGraph;
use crate::net::ClusterId;
use crate::net::ConnectPoint;
use crate::net::DeviceId;
use crate::net::Link;
use crate::net::LinkType;
use crate::net::Path;
use crate::net::ProviderId;
use crate::net::Weight;

/// Connected component of the topology graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyCluster {
    id: ClusterId,
    device_count: usize,
    link_count: usize,
    root: DeviceId,
}

impl TopologyCluster {
    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn device_count(&self) -> usize {
        self.device_count
    }

    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Lowest device id in the cluster
    pub fn root(&self) -> &DeviceId {
        &self.root
    }
}

/// Links that hold a cluster together.
fn joins_cluster(link: &Link) -> bool {
    link.is_active() && link.link_type() != LinkType::Indirect
}

/// Immutable topology snapshot.
///
/// Built once from a [`GraphDescription`]; every query is a pure function of
/// the snapshot.
pub struct Topology {
    provider_id: ProviderId,
    time: u64,
    creation_time: u64,
    compute_cost: u64,
    graph: TopologyGraph,
    clusters: Vec<TopologyCluster>,
    /// Cluster index per vertex index
    cluster_of: Vec<usize>,
    cluster_devices: Vec<BTreeSet<DeviceId>>,
    cluster_links: Vec<Vec<Link>>,
    broadcast_sets: Vec<BTreeSet<ConnectPoint>>,
    infrastructure_points: HashSet<ConnectPoint>,
    default_weigher: Arc<dyn LinkWeigher>,
    max_paths: usize,
}

impl fmt::Debug for Topology {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Topology")
            .field("provider_id", &self.provider_id)
            .field("time", &self.time)
            .field("devices", &self.device_count())
            .field("links", &self.link_count())
            .field("clusters", &self.cluster_count())
            .finish()
    }
}

impl Topology {
    /// Builds a snapshot. `weigher` becomes the default for path queries;
    /// hop count is used when it is `None`.
    pub fn build(
        provider_id: ProviderId,
        description: &GraphDescription,
        weigher: Option<Arc<dyn LinkWeigher>>,
    ) -> Self {
        let started = Instant::now();
        let graph = TopologyGraph::from_description(description);

        let (cluster_of, cluster_count) = Self::find_components(&graph);

        let mut cluster_devices = vec![BTreeSet::new(); cluster_count];
        for (vertex, &cluster) in cluster_of.iter().enumerate() {
            cluster_devices[cluster].insert(graph.vertices()[vertex].device_id().clone());
        }

        let mut cluster_links: Vec<Vec<Link>> = vec![Vec::new(); cluster_count];
        for edge in graph.edges() {
            let cluster = cluster_of[edge.src];
            if cluster == cluster_of[edge.dst] {
                cluster_links[cluster].push(edge.link().clone());
            }
        }

        // Every component holds at least one device, so indices line up
        let clusters: Vec<TopologyCluster> = cluster_devices
            .iter()
            .enumerate()
            .filter_map(|(c, devices)| {
                Some(TopologyCluster {
                    id: ClusterId::new(c),
                    device_count: devices.len(),
                    link_count: cluster_links[c].len(),
                    root: devices.first()?.clone(),
                })
            })
            .collect();

        let broadcast_sets = clusters
            .iter()
            .map(|cluster| Self::broadcast_set(&graph, cluster.root()))
            .collect();

        let infrastructure_points = graph
            .edges()
            .iter()
            .map(|edge| edge.link())
            .filter(|link| link.link_type() != LinkType::Edge)
            .flat_map(|link| [link.src().clone(), link.dst().clone()])
            .collect();

        let compute_cost = started.elapsed().as_nanos() as u64;
        debug!(
            devices = graph.vertex_count(),
            links = graph.edge_count(),
            clusters = cluster_count,
            compute_cost_ns = compute_cost,
            "Topology computed"
        );

        Self {
            provider_id,
            time: description.time(),
            creation_time: description.creation_time(),
            compute_cost,
            graph,
            clusters,
            cluster_of,
            cluster_devices,
            cluster_links,
            broadcast_sets,
            infrastructure_points,
            default_weigher: weigher.unwrap_or_else(|| Arc::new(HopCountLinkWeigher::default())),
            max_paths: 0,
        }
    }

    /// Caps the number of equal-cost paths returned by `get_paths`.
    /// 0 returns every tie.
    pub fn with_max_paths(
        mut self,
        max_paths: usize,
    ) -> Self {
        self.max_paths = max_paths;
        self
    }

    /// Union-find over cluster-forming links, treated as undirected.
    /// Cluster ids follow the position of each component's first device.
    fn find_components(graph: &TopologyGraph) -> (Vec<usize>, usize) {
        fn find(
            parent: &mut [usize],
            mut x: usize,
        ) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        let n = graph.vertex_count();
        let mut parent: Vec<usize> = (0..n).collect();
        for edge in graph.edges() {
            if !joins_cluster(edge.link()) {
                continue;
            }
            let a = find(&mut parent, edge.src);
            let b = find(&mut parent, edge.dst);
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        let mut cluster_ids = vec![usize::MAX; n];
        let mut cluster_of = vec![0; n];
        let mut count = 0;
        for vertex in 0..n {
            let root = find(&mut parent, vertex);
            if cluster_ids[root] == usize::MAX {
                cluster_ids[root] = count;
                count += 1;
            }
            cluster_of[vertex] = cluster_ids[root];
        }
        (cluster_of, count)
    }

    /// Endpoints of the hop-count shortest path tree rooted at `root`.
    fn broadcast_set(
        graph: &TopologyGraph,
        root: &DeviceId,
    ) -> BTreeSet<ConnectPoint> {
        let mut points = BTreeSet::new();
        let Some(root) = graph.index_of(root) else {
            return points;
        };

        let tree_weigher = |edge: &TopologyEdge| {
            if joins_cluster(edge.link()) {
                Weight::new(1.0)
            } else {
                Weight::NON_VIABLE
            }
        };
        let result = search::dijkstra(graph, root, &tree_weigher, &Exclusions::default());
        for vertex in 0..graph.vertex_count() {
            if let Some(first_parent) = result.parent_edges(vertex).first() {
                let link = graph.edge(*first_parent).link();
                points.insert(link.src().clone());
                points.insert(link.dst().clone());
            }
        }
        points
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    /// Ordering time of the source description (nanoseconds)
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Wall clock creation time (milliseconds)
    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    /// Nanoseconds spent building this snapshot
    pub fn compute_cost(&self) -> u64 {
        self.compute_cost
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn device_count(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn contains_device(
        &self,
        device_id: &DeviceId,
    ) -> bool {
        self.graph.contains(device_id)
    }

    pub fn clusters(&self) -> &[TopologyCluster] {
        &self.clusters
    }

    pub fn cluster_by_id(
        &self,
        id: ClusterId,
    ) -> Option<&TopologyCluster> {
        self.clusters.get(id.index())
    }

    /// Cluster containing `device_id`, `None` for unknown devices.
    pub fn get_cluster(
        &self,
        device_id: &DeviceId,
    ) -> Option<&TopologyCluster> {
        let vertex = self.graph.index_of(device_id)?;
        self.clusters.get(self.cluster_of[vertex])
    }

    pub fn get_cluster_devices(
        &self,
        id: ClusterId,
    ) -> Option<&BTreeSet<DeviceId>> {
        self.cluster_devices.get(id.index())
    }

    pub fn cluster_links(
        &self,
        id: ClusterId,
    ) -> Option<&[Link]> {
        self.cluster_links.get(id.index()).map(Vec::as_slice)
    }

    /// True when the point terminates at least one non-edge link.
    pub fn is_infrastructure(
        &self,
        point: &ConnectPoint,
    ) -> bool {
        self.infrastructure_points.contains(point)
    }

    /// Edge points always receive broadcasts; infrastructure points only
    /// when they lie on their cluster's broadcast tree.
    pub fn is_broadcast_point(
        &self,
        point: &ConnectPoint,
    ) -> bool {
        let Some(cluster) = self.get_cluster(point.device_id()) else {
            return false;
        };
        if !self.is_infrastructure(point) {
            return true;
        }
        self.broadcast_sets[cluster.id().index()].contains(point)
    }

    pub fn broadcast_points(
        &self,
        id: ClusterId,
    ) -> Option<&BTreeSet<ConnectPoint>> {
        self.broadcast_sets.get(id.index())
    }

    pub fn broadcast_set_size(
        &self,
        id: ClusterId,
    ) -> usize {
        self.broadcast_sets.get(id.index()).map_or(0, BTreeSet::len)
    }

    /// All minimum-cost paths under the default weigher. Unknown devices,
    /// `src == dst` and unreachable pairs yield an empty set.
    pub fn get_paths(
        &self,
        src: &DeviceId,
        dst: &DeviceId,
    ) -> Vec<Path> {
        self.get_paths_weighted(src, dst, self.default_weigher.as_ref())
    }

    pub fn get_paths_weighted(
        &self,
        src: &DeviceId,
        dst: &DeviceId,
        weigher: &dyn LinkWeigher,
    ) -> Vec<Path> {
        match (self.graph.index_of(src), self.graph.index_of(dst)) {
            (Some(s), Some(d)) => search::shortest_paths(&self.graph, s, d, weigher, self.max_paths),
            _ => Vec::new(),
        }
    }

    /// Up to `k` loop-free paths in order of increasing cost.
    pub fn get_k_shortest_paths(
        &self,
        src: &DeviceId,
        dst: &DeviceId,
        k: usize,
        weigher: Option<&dyn LinkWeigher>,
    ) -> Vec<Path> {
        self.get_k_shortest_paths_lazy(src, dst, weigher).take(k).collect()
    }

    /// Lazily computed paths in order of increasing cost. Each call starts
    /// a fresh search.
    pub fn get_k_shortest_paths_lazy<'a>(
        &'a self,
        src: &DeviceId,
        dst: &DeviceId,
        weigher: Option<&'a dyn LinkWeigher>,
    ) -> KShortestPaths<'a> {
        let weigher = weigher.unwrap_or(self.default_weigher.as_ref());
        KShortestPaths::new(&self.graph, weigher, self.graph.index_of(src), self.graph.index_of(dst))
    }
}
