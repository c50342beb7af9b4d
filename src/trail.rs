//! Bounded ground-track trail.

use std::collections::VecDeque;

use bevy::math::DVec3;

use crate::types::TRAIL_CAPACITY;

/// Ordered ring of recent ground positions, oldest first.
///
/// When full, the oldest point is evicted before the new one is appended.
#[derive(Clone, Debug)]
pub struct TrailBuffer {
    points: VecDeque<DVec3>,
    capacity: usize,
}

impl Default for TrailBuffer {
    fn default() -> Self {
        Self::with_capacity(TRAIL_CAPACITY)
    }
}

impl TrailBuffer {
    /// Create an empty trail. A capacity of zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: DVec3) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Points oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DVec3> + ExactSizeIterator {
        self.points.iter()
    }

    #[cfg(test)]
    pub fn newest(&self) -> Option<DVec3> {
        self.points.back().copied()
    }
}
