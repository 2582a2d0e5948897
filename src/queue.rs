use std::{cmp::Ordering, collections::BinaryHeap};

use crate::types::Distance;

/// A queued voxel: its priority and its flat grid index.
#[derive(Debug, Clone, Copy)]
pub struct PriorityNode {
    pub priority: Distance,
    pub index: usize,
}

// Larger priority first. Equal priorities pop the smaller flat index first, so a
// run does not depend on insertion order.
impl Ord for PriorityNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for PriorityNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PriorityNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityNode {}

/// Max-first priority queue of voxels.
#[derive(Debug, Default, Clone)]
pub struct VoxelQueue {
    heap: BinaryHeap<PriorityNode>,
}

impl VoxelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, priority: Distance, index: usize) {
        self.heap.push(PriorityNode { priority, index });
    }

    /// Removes the node with the highest priority.
    pub fn pop(&mut self) -> Option<PriorityNode> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&PriorityNode> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
