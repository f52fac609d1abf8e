//! Allocator statistics

use core::fmt;

/// Snapshot of allocator counters
///
/// Counters are only advanced while
/// [`StackConfig::track_stats`](crate::StackConfig::track_stats) is set. The
/// gauges (`depth`, `used`, `pages_held`) are read live on every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackStats {
    // Operation counters
    pub allocations: usize,
    pub deallocations: usize,
    pub failed_allocations: usize,

    // Page traffic
    pub pages_grown: usize,
    pub pages_released: usize,

    // Memory tracking
    pub peak_used: usize,
    pub used: usize,
    pub pages_held: usize,
    pub depth: usize,
}

impl StackStats {
    /// Allocations that have been made and not popped yet, as counted
    pub fn live_allocations(&self) -> usize {
        self.allocations.saturating_sub(self.deallocations)
    }

    /// Fraction of allocation attempts that failed, in `[0, 1]`
    pub fn failure_rate(&self) -> f64 {
        let attempts = self.allocations + self.failed_allocations;
        if attempts == 0 {
            0.0
        } else {
            self.failed_allocations as f64 / attempts as f64
        }
    }
}

impl fmt::Display for StackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack Statistics:")?;
        writeln!(f, "  Allocations: {} ({} failed)", self.allocations, self.failed_allocations)?;
        writeln!(f, "  Deallocations: {}", self.deallocations)?;
        writeln!(f, "  Depth: {}", self.depth)?;
        writeln!(f, "  Used: {} bytes (peak {})", self.used, self.peak_used)?;
        write!(
            f,
            "  Pages: {} held ({} grown, {} released)",
            self.pages_held, self.pages_grown, self.pages_released
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let stats = StackStats {
            allocations: 3,
            failed_allocations: 1,
            ..StackStats::default()
        };
        assert!((stats.failure_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(StackStats::default().failure_rate(), 0.0);
    }

    #[test]
    fn test_display_mentions_pages() {
        let stats = StackStats {
            pages_held: 2,
            pages_grown: 3,
            pages_released: 1,
            ..StackStats::default()
        };
        assert!(stats.to_string().contains("2 held (3 grown, 1 released)"));
    }
}
