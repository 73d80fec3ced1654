//! Shortest-path search over a [`RoadNetworkGraph`].
//!
//! Dijkstra and A* share one label-correcting search; they differ only in the
//! heuristic. Labels are compared by cost, then length, then edge count, then
//! the sequence of edge ids, so equal-cost alternatives always resolve the
//! same way and both algorithms return the same path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::geo::Coordinate;
use crate::network::{EdgeId, NetworkEdge, NodeId, RoadNetworkGraph};

/// Relative tolerance used when comparing accumulated costs and lengths.
const RELATIVE_EPSILON: f64 = 1e-9;

/// Lower-bound estimate of remaining cost used to order the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// No estimate; the search behaves as Dijkstra.
    #[default]
    Zero,
    /// Great-circle distance to the goal scaled by the network's minimum
    /// cost per metre. Admissible and consistent for any cost assignment.
    StraightLine,
}

/// One directed traversal in a found path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStep<'g> {
    pub edge: &'g NetworkEdge,
    pub from: NodeId,
    pub to: NodeId,
    pub start: Coordinate,
    pub end: Coordinate,
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResult<'g> {
    pub start: NodeId,
    pub goal: NodeId,
    pub steps: Vec<PathStep<'g>>,
    pub cost: f64,
    pub length_meters: f64,
    /// Number of queue entries expanded.
    pub expanded: usize,
}

impl PathResult<'_> {
    /// Node ids along the path, start and goal included.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(self.steps.len() + 1);
        nodes.push(self.start);
        nodes.extend(self.steps.iter().map(|step| step.to));
        nodes
    }

    /// Edge ids along the path, in traversal order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.steps.iter().map(|step| step.edge.id).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    cost: f64,
    length: f64,
    hops: usize,
    /// (previous node index, edge index) used to reach this node.
    parent: Option<(usize, usize)>,
    version: u32,
}

/// Find the best path from `start` to `goal`.
///
/// Returns `None` when either node is unknown or the goal is unreachable. A
/// path from a node to itself is empty.
pub fn find_path(
    graph: &RoadNetworkGraph,
    start: NodeId,
    goal: NodeId,
    heuristic: Heuristic,
) -> Option<PathResult<'_>> {
    let start_index = graph.index_of(start)?;
    let goal_index = graph.index_of(goal)?;

    if start_index == goal_index {
        return Some(PathResult {
            start,
            goal,
            steps: Vec::new(),
            cost: 0.0,
            length_meters: 0.0,
            expanded: 0,
        });
    }

    let goal_coordinate = graph.node_at(goal_index).coordinate;
    let scale = match heuristic {
        Heuristic::Zero => 0.0,
        Heuristic::StraightLine => graph.cost_per_meter_floor(),
    };
    let estimate = |index: usize| {
        if scale == 0.0 {
            0.0
        } else {
            scale * graph.node_at(index).coordinate.distance_to(&goal_coordinate)
        }
    };

    let mut labels: Vec<Option<Label>> = vec![None; graph.node_count()];
    labels[start_index] = Some(Label {
        cost: 0.0,
        length: 0.0,
        hops: 0,
        parent: None,
        version: 0,
    });

    let mut queue = BinaryHeap::new();
    queue.push(QueueEntry::new(start_index, 0.0, estimate(start_index), 0.0, 0, 0));
    let mut expanded = 0usize;

    while let Some(entry) = queue.pop() {
        let Some(current) = labels[entry.node] else {
            continue;
        };
        if current.version != entry.version {
            continue;
        }
        if let Some(best) = labels[goal_index] {
            if definitely_greater(entry.estimate.0, best.cost) {
                break;
            }
        }
        if entry.node == goal_index {
            continue;
        }
        expanded += 1;

        for link in graph.links(entry.node) {
            let edge = graph.edge_at(link.edge);
            let candidate = Label {
                cost: current.cost + edge.traversal_cost,
                length: current.length + edge.length_meters,
                hops: current.hops + 1,
                parent: Some((entry.node, link.edge)),
                version: 0,
            };

            let improves = match labels[link.target] {
                None => true,
                Some(existing) => {
                    compare_labels(graph, &labels, &candidate, &existing) == Ordering::Less
                }
            };
            if !improves {
                continue;
            }

            let version = labels[link.target]
                .map_or(0, |existing| existing.version.wrapping_add(1));
            labels[link.target] = Some(Label {
                version,
                ..candidate
            });
            queue.push(QueueEntry::new(
                link.target,
                candidate.cost,
                candidate.cost + estimate(link.target),
                candidate.length,
                candidate.hops,
                version,
            ));
        }
    }

    let goal_label = labels[goal_index]?;
    let edge_path = reconstruct(&labels, goal_index)?;

    let mut steps = Vec::with_capacity(edge_path.len());
    for (from_index, edge_index, to_index) in edge_path {
        let (from, to) = (graph.node_at(from_index), graph.node_at(to_index));
        steps.push(PathStep {
            edge: graph.edge_at(edge_index),
            from: from.id,
            to: to.id,
            start: from.coordinate,
            end: to.coordinate,
        });
    }

    Some(PathResult {
        start,
        goal,
        steps,
        cost: goal_label.cost,
        length_meters: goal_label.length,
        expanded,
    })
}

fn compare_labels(
    graph: &RoadNetworkGraph,
    labels: &[Option<Label>],
    candidate: &Label,
    existing: &Label,
) -> Ordering {
    approx_cmp(candidate.cost, existing.cost)
        .then_with(|| approx_cmp(candidate.length, existing.length))
        .then_with(|| candidate.hops.cmp(&existing.hops))
        .then_with(|| {
            let lhs = edge_ids_through(graph, labels, candidate.parent);
            let rhs = edge_ids_through(graph, labels, existing.parent);
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => lhs.cmp(&rhs),
                _ => Ordering::Equal,
            }
        })
}

/// Edge ids from the start to the node reached through `parent`.
fn edge_ids_through(
    graph: &RoadNetworkGraph,
    labels: &[Option<Label>],
    parent: Option<(usize, usize)>,
) -> Option<Vec<EdgeId>> {
    let (previous, edge) = parent?;
    let mut ids: Vec<EdgeId> = reconstruct(labels, previous)?
        .into_iter()
        .map(|(_, edge_index, _)| graph.edge_at(edge_index).id)
        .collect();
    ids.push(graph.edge_at(edge).id);
    Some(ids)
}

/// Walk parent pointers back to the start. Returns (from, edge, to) index
/// triples in traversal order, or `None` if the chain does not terminate.
fn reconstruct(labels: &[Option<Label>], node: usize) -> Option<Vec<(usize, usize, usize)>> {
    let mut path = Vec::new();
    let mut current = node;
    while let Some((previous, edge)) = labels[current]?.parent {
        if path.len() > labels.len() {
            return None;
        }
        path.push((previous, edge, current));
        current = previous;
    }
    path.reverse();
    Some(path)
}

fn tolerance(a: f64, b: f64) -> f64 {
    RELATIVE_EPSILON * a.abs().max(b.abs()).max(1.0)
}

fn approx_cmp(a: f64, b: f64) -> Ordering {
    if (a - b).abs() <= tolerance(a, b) {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

fn definitely_greater(a: f64, b: f64) -> bool {
    a - b > tolerance(a, b)
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: usize,
    cost: FloatOrd,
    estimate: FloatOrd,
    length: FloatOrd,
    hops: usize,
    version: u32,
}

impl QueueEntry {
    fn new(node: usize, cost: f64, estimate: f64, length: f64, hops: usize, version: u32) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(estimate),
            length: FloatOrd(length),
            hops,
            version,
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| other.length.cmp(&self.length))
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| other.node.cmp(&self.node))
            .then_with(|| other.version.cmp(&self.version))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
