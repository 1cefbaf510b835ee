//! # Pathfinding Module
//!
//! A* search for agents walking on top of solid voxels.
//!
//! ## Search space
//!
//! A node is the cell an agent's feet occupy. An agent `height` cells tall can stand at a node
//! when the cell below it is solid and unreserved, and the `height` cells starting at the node
//! are all empty and unreserved. Solidity and obstacle reservations are checked separately;
//! neither stands in for the other.
//!
//! ## Moves
//!
//! From each node the four horizontal neighbors are tried:
//!
//! | Move  | Target y     | Cost           | Extra requirement                          |
//! |-------|--------------|----------------|--------------------------------------------|
//! | Level | `y`          | 1              |                                            |
//! | Climb | `y + 1`      | 2              | Headroom above the agent's current column  |
//! | Fall  | ground below | `1 + 2 * drop` | Every cell of the drop free and unreserved |
//!
//! Climbing more than one cell per step is impossible. Falls have no depth limit but their cost
//! grows with the drop, so the search only jumps down when walking around is more expensive.
//! Supports must lie within `min_y..=max_y`.
//!
//! ## Budget
//!
//! At most `max_visited` nodes are expanded. When the budget runs out the path to the
//! discovered node closest to the goal is returned and marked [`PathOutcome::BudgetExhausted`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use cgmath::Point3;
use log::debug;
use web_time::Instant;

use crate::{
    engine_state::voxels::{face_direction::FaceDirection, volume::Volume},
    error::PathfindError,
};

/// Default number of expansions before a search gives up.
pub const DEFAULT_MAX_VISITED: usize = 4096;

const LEVEL_COST: u32 = 1;
const CLIMB_COST: u32 = 2;
const FALL_COST_PER_CELL: u32 = 2;

const HORIZONTAL: [FaceDirection; 4] = [
    FaceDirection::LEFT,
    FaceDirection::RIGHT,
    FaceDirection::BACK,
    FaceDirection::FRONT,
];

/// Parameters of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRequest {
    pub from: Point3<i32>,
    pub to: Point3<i32>,
    /// Cells the agent occupies above its node
    pub height: u32,
    /// Maximum node expansions
    pub max_visited: usize,
    /// Lowest y a supporting voxel may have
    pub min_y: i32,
    /// Highest y a supporting voxel may have
    pub max_y: i32,
}

impl PathRequest {
    /// A request for a one cell tall agent with the default budget and no height limits.
    pub fn new(from: Point3<i32>, to: Point3<i32>) -> Self {
        PathRequest {
            from,
            to,
            height: 1,
            max_visited: DEFAULT_MAX_VISITED,
            min_y: 0,
            max_y: i32::MAX,
        }
    }

    /// Sets the agent height. Agents are at least one cell tall.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height.max(1);
        self
    }

    pub fn with_max_visited(mut self, max_visited: usize) -> Self {
        self.max_visited = max_visited;
        self
    }

    /// Restricts supports to `min_y..=max_y`.
    pub fn with_y_range(mut self, min_y: i32, max_y: i32) -> Self {
        self.min_y = min_y;
        self.max_y = max_y;
        self
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// The goal was reached.
    Complete,
    /// The expansion budget ran out; the path leads to the closest node found.
    BudgetExhausted,
    /// Every reachable node was expanded without reaching the goal.
    Unreachable,
}

/// The result of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Nodes from the start (inclusive) onwards
    pub waypoints: Vec<Point3<i32>>,
    pub outcome: PathOutcome,
    /// Nodes expanded by the search
    pub visited: usize,
}

impl Path {
    /// Whether the path is worth following.
    ///
    /// Complete paths always are. A partial path needs to make at least two steps, anything
    /// shorter counts as no path at all.
    pub fn is_usable(&self) -> bool {
        match self.outcome {
            PathOutcome::Complete => !self.waypoints.is_empty(),
            PathOutcome::BudgetExhausted => self.waypoints.len() > 2,
            PathOutcome::Unreachable => false,
        }
    }

    /// Waypoints as a flat `x, y, z, x, y, z, ...` sequence.
    pub fn flattened(&self) -> Vec<i32> {
        self.waypoints.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    estimate: u32,
    heuristic: u32,
    cost: u32,
    position: Point3<i32>,
}

impl Ord for OpenNode {
    // Reversed so that `BinaryHeap` pops the lowest estimate, then the lowest heuristic.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.heuristic.cmp(&self.heuristic))
            .then_with(|| {
                (other.position.x, other.position.y, other.position.z).cmp(&(
                    self.position.x,
                    self.position.y,
                    self.position.z,
                ))
            })
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn manhattan(a: Point3<i32>, b: Point3<i32>) -> u32 {
    a.x.abs_diff(b.x) + a.y.abs_diff(b.y) + a.z.abs_diff(b.z)
}

/// Read-only view of the volume under one request's rules.
struct Walkable<'a> {
    volume: &'a Volume,
    request: &'a PathRequest,
}

impl Walkable<'_> {
    /// Empty and unreserved.
    fn is_free(&self, position: Point3<i32>) -> bool {
        self.volume.voxel(position).is_some()
            && !self.volume.is_solid(position)
            && !self.volume.is_obstacle(position)
    }

    /// Agent height in cells, never less than one.
    fn height(&self) -> u32 {
        self.request.height.max(1)
    }

    fn can_go_through(&self, position: Point3<i32>) -> bool {
        (0..self.height() as i32)
            .all(|h| self.is_free(Point3::new(position.x, position.y + h, position.z)))
    }

    fn can_step_at(&self, position: Point3<i32>) -> bool {
        let support = Point3::new(position.x, position.y - 1, position.z);
        if support.y < self.request.min_y || support.y > self.request.max_y {
            return false;
        }
        self.volume.is_solid(support)
            && !self.volume.is_obstacle(support)
            && self.can_go_through(position)
    }

    /// The single move into the column next to `from` in `direction`, if any.
    fn step(&self, from: Point3<i32>, direction: FaceDirection) -> Option<(Point3<i32>, u32)> {
        let level = direction.neighbor(from);
        if self.can_step_at(level) {
            return Some((level, LEVEL_COST));
        }

        let climb = Point3::new(level.x, level.y + 1, level.z);
        let headroom = Point3::new(from.x, from.y + self.height() as i32, from.z);
        if self.can_step_at(climb) && self.is_free(headroom) {
            return Some((climb, CLIMB_COST));
        }

        if !self.can_go_through(level) {
            return None;
        }
        let landing = self.volume.ground_within(
            level,
            self.height(),
            self.request.min_y,
            self.request.max_y,
        )?;
        let target = Point3::new(level.x, landing, level.z);
        if landing >= from.y || !self.can_step_at(target) {
            return None;
        }
        // The agent drops through every cell between the ledge and the landing.
        if !(landing..level.y).all(|y| self.is_free(Point3::new(level.x, y, level.z))) {
            return None;
        }
        let drop = (from.y - landing) as u32;
        Some((target, LEVEL_COST + FALL_COST_PER_CELL * drop))
    }
}

/// Searches for a walkable path from `request.from` to `request.to`.
///
/// The volume is only read. Obstacles reserved by other agents are respected, so agents
/// should release their own footprint before searching from it.
///
/// # Errors
/// Returns [`PathfindError::OutOfBounds`] when either endpoint lies outside the volume. No
/// search is attempted in that case.
pub fn pathfind(volume: &Volume, request: &PathRequest) -> Result<Path, PathfindError> {
    for position in [request.from, request.to] {
        if volume.voxel(position).is_none() {
            return Err(PathfindError::OutOfBounds { position });
        }
    }

    let start = Instant::now();
    let walkable = Walkable { volume, request };
    let goal = request.to;

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Point3<i32>, Point3<i32>> = HashMap::new();
    let mut best_cost: HashMap<Point3<i32>, u32> = HashMap::new();

    let start_heuristic = manhattan(request.from, goal);
    open.push(OpenNode {
        estimate: start_heuristic,
        heuristic: start_heuristic,
        cost: 0,
        position: request.from,
    });
    best_cost.insert(request.from, 0);
    let mut closest = (start_heuristic, 0, request.from);

    let mut visited = 0;
    let mut outcome = PathOutcome::Unreachable;
    while let Some(node) = open.pop() {
        if best_cost.get(&node.position).is_some_and(|&cost| cost < node.cost) {
            continue;
        }
        if node.position == goal {
            closest = (0, node.cost, goal);
            outcome = PathOutcome::Complete;
            break;
        }
        visited += 1;
        if visited > request.max_visited {
            outcome = PathOutcome::BudgetExhausted;
            break;
        }

        for direction in HORIZONTAL {
            let Some((next, step_cost)) = walkable.step(node.position, direction) else {
                continue;
            };
            let cost = node.cost + step_cost;
            if best_cost.get(&next).is_some_and(|&known| known <= cost) {
                continue;
            }
            best_cost.insert(next, cost);
            came_from.insert(next, node.position);
            let heuristic = manhattan(next, goal);
            if (heuristic, cost) < (closest.0, closest.1) {
                closest = (heuristic, cost, next);
            }
            open.push(OpenNode {
                estimate: cost + heuristic,
                heuristic,
                cost,
                position: next,
            });
        }
    }

    let waypoints = match outcome {
        PathOutcome::Unreachable => Vec::new(),
        _ => reconstruct(&came_from, request.from, closest.2),
    };
    debug!(
        "Pathfind {:?} -> {:?}: {:?}, {} waypoints, {} visited in {:?}",
        request.from,
        request.to,
        outcome,
        waypoints.len(),
        visited,
        start.elapsed()
    );
    Ok(Path {
        waypoints,
        outcome,
        visited,
    })
}

fn reconstruct(
    came_from: &HashMap<Point3<i32>, Point3<i32>>,
    from: Point3<i32>,
    to: Point3<i32>,
) -> Vec<Point3<i32>> {
    let mut waypoints = vec![to];
    let mut current = to;
    while current != from {
        match came_from.get(&current) {
            Some(&previous) => {
                waypoints.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    waypoints.reverse();
    waypoints
}
