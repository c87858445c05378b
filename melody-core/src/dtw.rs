//! # Dynamic Time Warping Module
//!
//! Alignment distance between the live trajectory and reference segments,
//! and the search that picks the closest template.
//!
//! ## Features
//! - Full-matrix DTW over sequences of unequal length
//! - Optional Sakoe-Chiba band for longer trajectories
//! - Deterministic best-match search (first minimum wins)

use serde::Serialize;
use std::num::NonZeroUsize;

use crate::templates::TemplateLibrary;

/// Local cost between two frequencies: their absolute difference in Hz.
#[inline]
pub fn absolute_difference(a: f32, b: f32) -> f32 {
    (a - b).abs()
}

/// Computes the DTW distance between two sequences.
///
/// The cumulative cost of cell `(i, j)` is `local_cost(a[i], b[j])` plus the
/// cheapest of its upper, left and diagonal neighbours; the first row and
/// column accumulate along the edge. The result is the cost of the last cell.
/// Rows are kept two at a time, the values are those of the full matrix.
///
/// # Returns
/// * The alignment distance, or `f32::INFINITY` if either sequence is empty
pub fn dtw_distance<F>(a: &[f32], b: &[f32], local_cost: F) -> f32
where
    F: Fn(f32, f32) -> f32,
{
    dtw_distance_banded(a, b, None, local_cost)
}

/// DTW restricted to a Sakoe-Chiba band of half-width `band` around the
/// diagonal. The band is widened to the length difference of the two
/// sequences so the final cell stays reachable. `None` computes the full
/// matrix.
pub fn dtw_distance_banded<F>(a: &[f32], b: &[f32], band: Option<usize>, local_cost: F) -> f32
where
    F: Fn(f32, f32) -> f32,
{
    if a.is_empty() || b.is_empty() {
        return f32::INFINITY;
    }

    let n = a.len();
    let m = b.len();
    let window = band.map(|w| w.max(n.abs_diff(m)));

    let mut prev = vec![f32::INFINITY; m];
    let mut curr = vec![f32::INFINITY; m];

    for i in 0..n {
        let (lo, hi) = match window {
            Some(w) => (i.saturating_sub(w), (i + w).min(m - 1)),
            None => (0, m - 1),
        };
        curr.fill(f32::INFINITY);

        for j in lo..=hi {
            let cost = local_cost(a[i], b[j]);
            let best_prior = if i == 0 && j == 0 {
                0.0
            } else {
                let up = if i > 0 { prev[j] } else { f32::INFINITY };
                let left = if j > 0 { curr[j - 1] } else { f32::INFINITY };
                let diag = if i > 0 && j > 0 {
                    prev[j - 1]
                } else {
                    f32::INFINITY
                };
                up.min(left).min(diag)
            };
            curr[j] = cost + best_prior;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m - 1]
}

/// Outcome of one matching pass: the closest template and its distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub name: String,
    pub distance: f32,
}

/// Matches a trajectory against every segment of a template library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DtwMatcher {
    band: Option<usize>,
}

impl DtwMatcher {
    /// Full-matrix matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher restricted to a Sakoe-Chiba band (`None` = full matrix).
    pub fn with_band(band: Option<usize>) -> Self {
        Self { band }
    }

    pub fn band(&self) -> Option<usize> {
        self.band
    }

    /// Distance between two sequences with this matcher's settings.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        dtw_distance_banded(a, b, self.band, absolute_difference)
    }

    /// Finds the template whose segment aligns best with the trajectory.
    ///
    /// Each template is cut into segments of the trajectory's length and
    /// every segment is scored. Templates are visited in library order and
    /// segments in sequence; a later candidate only wins when it is strictly
    /// closer.
    ///
    /// # Returns
    /// * `Some(record)` - The winning template and its distance
    /// * `None` - The trajectory is empty, nothing to match yet
    pub fn best_match(&self, trajectory: &[f32], library: &TemplateLibrary) -> Option<MatchRecord> {
        let segment_len = NonZeroUsize::new(trajectory.len())?;

        let mut best: Option<(&str, f32)> = None;
        for (name, segment) in library.segments(segment_len) {
            let distance = self.distance(trajectory, segment);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((name, distance));
            }
        }

        best.map(|(name, distance)| {
            tracing::debug!(template = name, distance, points = trajectory.len(), "best match");
            MatchRecord {
                name: name.to_string(),
                distance,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Template;

    #[test]
    fn identical_sequences_have_zero_distance() {
        assert_eq!(dtw_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], absolute_difference), 0.0);
    }

    #[test]
    fn reversed_sequences_are_symmetric() {
        let ab = dtw_distance(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0], absolute_difference);
        let ba = dtw_distance(&[3.0, 2.0, 1.0], &[1.0, 2.0, 3.0], absolute_difference);
        assert!(ab > 0.0);
        assert_eq!(ab, ba);
    }

    #[test]
    fn known_small_matrix() {
        // local costs    cumulative
        //   2 1 0          2 3 3
        //   1 0 1          3 2 3
        //   0 1 2          3 3 4
        assert_eq!(dtw_distance(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0], absolute_difference), 4.0);
    }

    #[test]
    fn warping_absorbs_repeated_points() {
        let d = dtw_distance(&[1.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], absolute_difference);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn unequal_lengths_are_supported() {
        let d = dtw_distance(&[5.0, 6.0, 7.0, 8.0], &[5.0], absolute_difference);
        assert_eq!(d, 0.0 + 1.0 + 2.0 + 3.0);
    }

    #[test]
    fn empty_input_is_infinite() {
        assert_eq!(dtw_distance(&[], &[1.0], absolute_difference), f32::INFINITY);
        assert_eq!(dtw_distance(&[1.0], &[], absolute_difference), f32::INFINITY);
    }

    #[test]
    fn wide_band_equals_full_matrix() {
        let a = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
        let b = [2.0, 3.0, 9.0, 4.0, 6.0];
        let full = dtw_distance(&a, &b, absolute_difference);
        let banded = dtw_distance_banded(&a, &b, Some(10), absolute_difference);
        assert_eq!(full, banded);
    }

    #[test]
    fn narrow_band_never_beats_full_matrix() {
        let a = [1.0, 1.0, 1.0, 9.0, 9.0, 9.0];
        let b = [9.0, 9.0, 9.0, 1.0, 1.0, 1.0];
        let full = dtw_distance(&a, &b, absolute_difference);
        let banded = dtw_distance_banded(&a, &b, Some(0), absolute_difference);
        assert!(banded.is_finite());
        assert!(banded >= full);
    }

    #[test]
    fn band_widens_for_length_difference() {
        let d = dtw_distance_banded(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 5.0], Some(0), absolute_difference);
        assert!(d.is_finite());
    }

    #[test]
    fn exact_segment_wins() {
        let library = TemplateLibrary::new(vec![
            Template::new("decoy", vec![100.0, 200.0, 300.0, 400.0]),
            Template::new("target", vec![900.0, 800.0, 700.0, 523.0, 587.0, 659.0, 0.0]),
        ])
        .unwrap();
        let record = DtwMatcher::new()
            .best_match(&[523.0, 587.0, 659.0], &library)
            .unwrap();
        assert_eq!(record.name, "target");
        assert_eq!(record.distance, 0.0);
    }

    #[test]
    fn ties_go_to_first_template() {
        let library = TemplateLibrary::new(vec![
            Template::new("a", vec![10.0, 10.0]),
            Template::new("b", vec![10.0, 10.0]),
        ])
        .unwrap();
        let record = DtwMatcher::new().best_match(&[12.0, 12.0], &library).unwrap();
        assert_eq!(record.name, "a");
        assert_eq!(record.distance, 4.0);
    }

    #[test]
    fn empty_trajectory_has_no_match() {
        let library = TemplateLibrary::new(vec![Template::new("a", vec![1.0])]).unwrap();
        assert_eq!(DtwMatcher::new().best_match(&[], &library), None);
    }
}
