//! Bounded telemetry window
//!
//! Keeps the most recent system-wide telemetry points for charting:
//! - Append-only from the reconciler
//! - FIFO eviction once the window is full
//! - Cheap snapshotting for the outward projection

use crate::models::MetricPoint;
use std::collections::VecDeque;

/// Default window length (20 points, ~40s at the default tick)
pub const DEFAULT_WINDOW: usize = 20;

/// Ring window of telemetry points, oldest first
#[derive(Debug, Clone)]
pub struct MetricsSeries {
    points: VecDeque<MetricPoint>,
    max_size: usize,
}

impl Default for MetricsSeries {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl MetricsSeries {
    /// Create a window holding at most `max_size` points
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            points: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Append a point, evicting the oldest ones while at capacity
    pub fn push(&mut self, point: MetricPoint) {
        while self.points.len() >= self.max_size {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Most recent point
    pub fn latest(&self) -> Option<&MetricPoint> {
        self.points.back()
    }

    /// Copy of the window, oldest first
    pub fn points(&self) -> Vec<MetricPoint> {
        self.points.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: usize) -> MetricPoint {
        MetricPoint {
            time: format!("00:00:{:02}", i),
            value: i as f64,
            value2: (i * 10) as f64,
        }
    }

    #[test]
    fn test_series_never_exceeds_window() {
        let mut series = MetricsSeries::default();

        for i in 0..50 {
            series.push(point(i));
            assert!(series.len() <= DEFAULT_WINDOW);
        }

        assert_eq!(series.len(), 20);
        assert_eq!(series.capacity(), 20);
    }

    #[test]
    fn test_series_evicts_exactly_the_oldest() {
        let mut series = MetricsSeries::new(20);
        for i in 0..20 {
            series.push(point(i));
        }
        let before = series.points();

        series.push(point(20));
        let after = series.points();

        assert_eq!(after.len(), 20);
        assert_eq!(&after[..19], &before[1..]);
        assert_eq!(after[19], point(20));
        assert_eq!(series.latest(), Some(&point(20)));
    }

    #[test]
    fn test_series_zero_capacity_is_clamped() {
        let mut series = MetricsSeries::new(0);
        series.push(point(1));
        series.push(point(2));
        assert_eq!(series.points(), vec![point(2)]);
    }
}
