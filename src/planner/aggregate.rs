//! Project-wide demand totals.

use serde::{Deserialize, Serialize};
use std::ops::Add;

use super::Stream;

/// Aggregated demand of a set of streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Calculations {
    pub total_streams: u32,
    /// Megapixels per second.
    pub total_throughput: f64,
    /// Terabytes.
    pub total_storage: f64,
}

impl Calculations {
    /// Sum the demand of any collection of streams.
    pub fn from_streams<'a, I>(streams: I) -> Self
    where
        I: IntoIterator<Item = &'a Stream>,
    {
        Self::default().with_streams(streams)
    }

    /// These totals with more streams added, one at a time in order.
    pub fn with_streams<'a, I>(self, streams: I) -> Self
    where
        I: IntoIterator<Item = &'a Stream>,
    {
        streams.into_iter().fold(self, |acc, s| Self {
            total_streams: acc.total_streams + 1,
            total_throughput: acc.total_throughput + s.throughput,
            total_storage: acc.total_storage + s.storage,
        })
    }
}

impl Add for Calculations {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            total_streams: self.total_streams + other.total_streams,
            total_throughput: self.total_throughput + other.total_throughput,
            total_storage: self.total_storage + other.total_storage,
        }
    }
}

/// Recompute totals for the full stream list.
pub fn aggregate(streams: &[Stream]) -> Calculations {
    Calculations::from_streams(streams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::demand::camera;
    use crate::planner::derive_all;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_aggregate_example() {
        let streams = derive_all(&[camera("Lobby", 2, 2.0, 10, 30)]);
        let totals = aggregate(&streams);
        assert_eq!(totals.total_streams, 2);
        assert!(close(totals.total_throughput, 40.0));
        assert!(close(totals.total_storage, 1.296));
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate(&[]), Calculations::default());
    }

    #[test]
    fn test_aggregate_is_additive() {
        let streams = derive_all(&[
            camera("A", 3, 4.0, 15, 30),
            camera("B", 1, 12.0, 30, 90),
            camera("C", 2, 0.3, 5, 365),
        ]);
        let whole = aggregate(&streams);

        for k in 0..=streams.len() {
            let split = aggregate(&streams[..k]) + aggregate(&streams[k..]);
            assert_eq!(split.total_streams, whole.total_streams);
            assert!(close(split.total_throughput, whole.total_throughput));
            assert!(close(split.total_storage, whole.total_storage));
        }
    }

    #[test]
    fn test_with_streams_continues_running_totals() {
        let streams = derive_all(&[camera("A", 3, 4.0, 15, 30), camera("B", 1, 12.0, 30, 90)]);
        let mut running = Calculations::default();
        for stream in &streams {
            running = running.with_streams(std::iter::once(stream));
        }
        assert_eq!(running, aggregate(&streams));
    }
}
