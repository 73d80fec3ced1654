//! Search strategies behind [`RouteAlgorithm`].
//!
//! Each algorithm is a small strategy object so the planner never matches on
//! the algorithm itself.

use crate::network::{NodeId, RoadNetworkGraph};
use crate::path::{find_path, Heuristic, PathResult};

use super::RouteAlgorithm;

/// A shortest-path search between two network nodes.
pub trait PathStrategy: Send + Sync {
    /// The algorithm identifier for this strategy.
    fn algorithm(&self) -> RouteAlgorithm;

    /// Run the search. `None` means the goal cannot be reached from `start`.
    fn find_path<'g>(
        &self,
        graph: &'g RoadNetworkGraph,
        start: NodeId,
        goal: NodeId,
    ) -> Option<PathResult<'g>>;
}

/// Uniform-cost search.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraStrategy;

impl PathStrategy for DijkstraStrategy {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Dijkstra
    }

    fn find_path<'g>(
        &self,
        graph: &'g RoadNetworkGraph,
        start: NodeId,
        goal: NodeId,
    ) -> Option<PathResult<'g>> {
        find_path(graph, start, goal, Heuristic::Zero)
    }
}

/// Search guided by straight-line distance to the goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarStrategy;

impl PathStrategy for AStarStrategy {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::AStar
    }

    fn find_path<'g>(
        &self,
        graph: &'g RoadNetworkGraph,
        start: NodeId,
        goal: NodeId,
    ) -> Option<PathResult<'g>> {
        find_path(graph, start, goal, Heuristic::StraightLine)
    }
}

/// Strategy implementing the given algorithm.
pub fn select_strategy(algorithm: RouteAlgorithm) -> Box<dyn PathStrategy> {
    match algorithm {
        RouteAlgorithm::Dijkstra => Box::new(DijkstraStrategy),
        RouteAlgorithm::AStar => Box::new(AStarStrategy),
    }
}
