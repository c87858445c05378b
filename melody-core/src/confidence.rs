//! Running tally of which template keeps winning.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::dtw::MatchRecord;

/// One row of the confidence ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confidence {
    pub name: String,
    pub count: u64,
    /// Share of all wins, in percent.
    pub percentage: f64,
    /// True for the winner of the most recent match.
    pub last_winner: bool,
}

/// Histogram of match winners. Counts only ever grow until [`reset`](Self::reset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceHistogram {
    counts: BTreeMap<String, u64>,
    total: u64,
    last_winner: Option<String>,
}

impl ConfidenceHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one win for the record's template.
    pub fn record(&mut self, record: &MatchRecord) {
        *self.counts.entry(record.name.clone()).or_insert(0) += 1;
        self.total += 1;
        self.last_winner = Some(record.name.clone());
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Number of matches recorded since the last reset.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn last_winner(&self) -> Option<&str> {
        self.last_winner.as_deref()
    }

    /// `100 * count / total` for every template that has won at least once,
    /// in name order. Empty until the first match.
    pub fn percentages(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        let total = self.total as f64;
        self.counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(move |(name, &count)| (name.as_str(), 100.0 * count as f64 / total))
    }

    /// Winners sorted by count, highest first; equal counts sort by name.
    pub fn ranking(&self) -> Vec<Confidence> {
        let mut rows: Vec<Confidence> = self
            .percentages()
            .map(|(name, percentage)| Confidence {
                name: name.to_string(),
                count: self.count(name),
                percentage,
                last_winner: self.last_winner.as_deref() == Some(name),
            })
            .collect();
        // Stable sort keeps the name order among equal counts.
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }

    pub fn reset(&mut self) {
        self.counts.clear();
        self.total = 0;
        self.last_winner = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn win(name: &str) -> MatchRecord {
        MatchRecord {
            name: name.to_string(),
            distance: 1.0,
        }
    }

    #[test]
    fn percentages_follow_counts() {
        let mut histogram = ConfidenceHistogram::new();
        for name in ["A", "B", "A", "C", "A"] {
            histogram.record(&win(name));
        }
        let pct: BTreeMap<_, _> = histogram.percentages().collect();
        assert!((pct["A"] - 60.0).abs() < 1e-9);
        assert!((pct["B"] - 20.0).abs() < 1e-9);
        let sum: f64 = pct.values().sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_orders_by_count_then_name() {
        let mut histogram = ConfidenceHistogram::new();
        for name in ["zeta", "beta", "alpha", "beta"] {
            histogram.record(&win(name));
        }
        let names: Vec<_> = histogram.ranking().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["beta", "alpha", "zeta"]);
    }

    #[test]
    fn last_winner_is_flagged() {
        let mut histogram = ConfidenceHistogram::new();
        histogram.record(&win("A"));
        histogram.record(&win("A"));
        histogram.record(&win("B"));
        assert_eq!(histogram.last_winner(), Some("B"));
        let ranking = histogram.ranking();
        assert!(!ranking[0].last_winner);
        assert!(ranking[1].last_winner);
        assert_eq!(ranking[0].name, "A");
    }

    #[test]
    fn empty_histogram_has_no_rows() {
        let histogram = ConfidenceHistogram::new();
        assert_eq!(histogram.percentages().count(), 0);
        assert!(histogram.ranking().is_empty());
        assert_eq!(histogram.last_winner(), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut histogram = ConfidenceHistogram::new();
        histogram.record(&win("A"));
        histogram.reset();
        assert_eq!(histogram.total(), 0);
        assert_eq!(histogram.count("A"), 0);
        assert_eq!(histogram.last_winner(), None);
    }
}
