//! Shortest path search over a [`TopologyGraph`].
//!
//! Dijkstra keeps every equal-cost parent of a vertex so that all minimum
//! weight paths can be enumerated. K-shortest paths are produced lazily with
//! Yen's algorithm.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashSet;

use tracing::warn;

use super::LinkWeigher;
use super::TopologyGraph;
use crate::net::Path;
use crate::net::Weight;

#[derive(Debug)]
struct HeapEntry {
    cost: Weight,
    vertex: usize,
}

impl PartialEq for HeapEntry {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Reversed so the max-heap pops the cheapest vertex first
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Edges and vertices a search must not use.
#[derive(Debug, Default)]
pub(crate) struct Exclusions {
    pub(crate) edges: HashSet<usize>,
    pub(crate) vertices: HashSet<usize>,
}

/// Single-source result: cost and all equal-cost parent edges per vertex.
#[derive(Debug)]
pub(crate) struct ShortestPaths {
    cost: Vec<Weight>,
    parents: Vec<Vec<usize>>,
}

pub(crate) fn edge_weight(
    graph: &TopologyGraph,
    weigher: &dyn LinkWeigher,
    edge: usize,
) -> Weight {
    let weight = weigher.weight(graph.edge(edge));
    if weight.is_viable() || weight.value() == f64::INFINITY {
        return weight;
    }
    warn!(link = %graph.edge(edge).link(), %weight, "Ignoring link with invalid weight");
    Weight::NON_VIABLE
}

pub(crate) fn dijkstra(
    graph: &TopologyGraph,
    src: usize,
    weigher: &dyn LinkWeigher,
    exclusions: &Exclusions,
) -> ShortestPaths {
    let n = graph.vertex_count();
    let mut cost = vec![Weight::NON_VIABLE; n];
    let mut parents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    cost[src] = Weight::ZERO;
    heap.push(HeapEntry {
        cost: Weight::ZERO,
        vertex: src,
    });

    while let Some(HeapEntry { vertex, .. }) = heap.pop() {
        if settled[vertex] {
            continue;
        }
        settled[vertex] = true;

        for &edge in graph.outgoing(vertex) {
            if exclusions.edges.contains(&edge) {
                continue;
            }
            let dst = graph.edge(edge).dst;
            if dst == src || exclusions.vertices.contains(&dst) {
                continue;
            }
            let weight = edge_weight(graph, weigher, edge);
            if !weight.is_viable() {
                continue;
            }

            let candidate = cost[vertex] + weight;
            if candidate.approx_eq(cost[dst]) {
                if !parents[dst].contains(&edge) {
                    parents[dst].push(edge);
                }
            } else if candidate.total_cmp(&cost[dst]) == Ordering::Less {
                cost[dst] = candidate;
                parents[dst] = vec![edge];
                heap.push(HeapEntry {
                    cost: candidate,
                    vertex: dst,
                });
            }
        }
    }

    ShortestPaths { cost, parents }
}

impl ShortestPaths {
    pub(crate) fn cost(
        &self,
        vertex: usize,
    ) -> Weight {
        self.cost[vertex]
    }

    pub(crate) fn parent_edges(
        &self,
        vertex: usize,
    ) -> &[usize] {
        &self.parents[vertex]
    }

    /// Enumerates minimum cost edge sequences ending at `dst`.
    /// `max_paths == 0` means no limit.
    pub(crate) fn edge_paths(
        &self,
        graph: &TopologyGraph,
        dst: usize,
        max_paths: usize,
    ) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        if self.parents[dst].is_empty() {
            return paths;
        }

        let mut on_path = vec![false; graph.vertex_count()];
        let mut reversed = Vec::new();
        self.collect(graph, dst, max_paths, &mut on_path, &mut reversed, &mut paths);
        paths
    }

    fn collect(
        &self,
        graph: &TopologyGraph,
        vertex: usize,
        max_paths: usize,
        on_path: &mut Vec<bool>,
        reversed: &mut Vec<usize>,
        paths: &mut Vec<Vec<usize>>,
    ) {
        if max_paths > 0 && paths.len() >= max_paths {
            return;
        }
        if self.parents[vertex].is_empty() {
            // Reached the source
            let mut path = reversed.clone();
            path.reverse();
            paths.push(path);
            return;
        }

        on_path[vertex] = true;
        for &edge in &self.parents[vertex] {
            let prev = graph.edge(edge).src;
            if on_path[prev] {
                continue;
            }
            reversed.push(edge);
            self.collect(graph, prev, max_paths, on_path, reversed, paths);
            reversed.pop();
        }
        on_path[vertex] = false;
    }
}

pub(crate) fn to_path(
    graph: &TopologyGraph,
    edges: &[usize],
    cost: Weight,
) -> Path {
    Path::new(edges.iter().map(|&e| graph.edge(e).link().clone()).collect(), cost)
}

/// All minimum weight paths from `src` to `dst`, at most `max_paths` of them
/// when non-zero.
pub(crate) fn shortest_paths(
    graph: &TopologyGraph,
    src: usize,
    dst: usize,
    weigher: &dyn LinkWeigher,
    max_paths: usize,
) -> Vec<Path> {
    if src == dst {
        return Vec::new();
    }
    let result = dijkstra(graph, src, weigher, &Exclusions::default());
    let cost = result.cost(dst);
    result
        .edge_paths(graph, dst, max_paths)
        .into_iter()
        .map(|edges| to_path(graph, &edges, cost))
        .collect()
}

#[derive(Debug, Clone)]
struct Candidate {
    edges: Vec<usize>,
    cost: Weight,
}

/// Lazily yields loop-free paths in order of increasing cost.
///
/// Each call to `Topology::get_k_shortest_paths_lazy` starts a fresh search;
/// take as many paths as needed and drop the iterator.
pub struct KShortestPaths<'a> {
    graph: &'a TopologyGraph,
    weigher: &'a dyn LinkWeigher,
    src: Option<usize>,
    dst: Option<usize>,
    accepted: Vec<Candidate>,
    candidates: Vec<Candidate>,
    exhausted: bool,
}

impl<'a> KShortestPaths<'a> {
    pub(crate) fn new(
        graph: &'a TopologyGraph,
        weigher: &'a dyn LinkWeigher,
        src: Option<usize>,
        dst: Option<usize>,
    ) -> Self {
        let exhausted = match (src, dst) {
            (Some(s), Some(d)) => s == d,
            _ => true,
        };
        Self {
            graph,
            weigher,
            src,
            dst,
            accepted: Vec::new(),
            candidates: Vec::new(),
            exhausted,
        }
    }

    fn path_cost(
        &self,
        edges: &[usize],
    ) -> Weight {
        edges
            .iter()
            .fold(Weight::ZERO, |acc, &e| acc + edge_weight(self.graph, self.weigher, e))
    }

    fn first(
        &self,
        src: usize,
        dst: usize,
    ) -> Option<Candidate> {
        let result = dijkstra(self.graph, src, self.weigher, &Exclusions::default());
        let edges = result.edge_paths(self.graph, dst, 1).into_iter().next()?;
        Some(Candidate {
            cost: result.cost(dst),
            edges,
        })
    }

    fn is_known(
        &self,
        edges: &[usize],
    ) -> bool {
        self.accepted.iter().chain(self.candidates.iter()).any(|c| c.edges == edges)
    }

    fn add_spur_candidates(
        &mut self,
        dst: usize,
    ) {
        let Some(last) = self.accepted.last().cloned() else {
            return;
        };

        for i in 0..last.edges.len() {
            let root = &last.edges[..i];
            let spur = self.graph.edge(last.edges[i]).src;

            let mut exclusions = Exclusions::default();
            for path in &self.accepted {
                if path.edges.len() > i && path.edges[..i] == *root {
                    exclusions.edges.insert(path.edges[i]);
                }
            }
            for &edge in root {
                exclusions.vertices.insert(self.graph.edge(edge).src);
            }

            let result = dijkstra(self.graph, spur, self.weigher, &exclusions);
            let Some(spur_edges) = result.edge_paths(self.graph, dst, 1).into_iter().next() else {
                continue;
            };

            let mut edges = root.to_vec();
            edges.extend(spur_edges);
            if self.is_known(&edges) {
                continue;
            }
            let cost = self.path_cost(&edges);
            self.candidates.push(Candidate { edges, cost });
        }
    }

    fn take_cheapest_candidate(&mut self) -> Option<Candidate> {
        let best = self
            .candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.cost
                    .total_cmp(&b.cost)
                    .then_with(|| a.edges.len().cmp(&b.edges.len()))
            })
            .map(|(i, _)| i)?;
        Some(self.candidates.swap_remove(best))
    }
}

impl Iterator for KShortestPaths<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        if self.exhausted {
            return None;
        }
        let (src, dst) = (self.src?, self.dst?);

        let next = if self.accepted.is_empty() {
            self.first(src, dst)
        } else {
            self.add_spur_candidates(dst);
            self.take_cheapest_candidate()
        };

        match next {
            Some(candidate) => {
                let path = to_path(self.graph, &candidate.edges, candidate.cost);
                self.accepted.push(candidate);
                Some(path)
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}
