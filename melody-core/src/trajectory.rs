//! Bounded, time-ordered buffer of extracted frequencies.
//!
//! The buffer is a hard-reset window: once it holds `capacity` points, the
//! next append clears it before pushing. It deliberately does not roll over
//! point by point, so every match is made against a trajectory that started
//! at a single point in time.

/// Pitch trajectory sampled at the session's tick cadence.
///
/// The time axis is implicit: point `i` was captured `i * interval_ms` after
/// the buffer was last cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryBuffer {
    points: Vec<f32>,
    capacity: usize,
}

impl TrajectoryBuffer {
    /// Creates an empty buffer. A capacity of zero is raised to one.
    ///
    /// Storage grows with the points actually appended, so a large capacity
    /// costs nothing up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a frequency, clearing the buffer first if it is full.
    ///
    /// Silence is appended as `0.0` like any other point.
    pub fn append(&mut self, freq: f32) {
        if self.points.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "trajectory full, resetting");
            self.points.clear();
        }
        self.points.push(freq);
    }

    /// Empties the buffer.
    pub fn reset(&mut self) {
        self.points.clear();
    }

    /// The points captured since the last reset, oldest first.
    pub fn points(&self) -> &[f32] {
        &self.points
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

    /// True when the next append will reset the buffer.
    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    /// Time span covered by the buffered points.
    pub fn duration_ms(&self, interval_ms: u64) -> u64 {
        self.points.len() as u64 * interval_ms
    }
}
