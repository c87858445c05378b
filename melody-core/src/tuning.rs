//! # Pitch Naming Module
//!
//! Maps a frequency to the nearest pitch class of a single reference octave
//! (C5 at 523.25 Hz up to C6 at 1046.50 Hz). Frequencies outside the octave
//! are folded into it by doubling or halving first. The name is only used for
//! display and never feeds the matcher.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// A named pitch of the reference octave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchClass {
    /// Display name ("C", "Db", ... "C2" for the upper C)
    pub name: &'static str,
    /// Frequency in Hz
    pub frequency: f32,
}

/// The 13-entry reference octave, in ascending order. Lookup ties resolve to
/// the earlier entry, so the ordering is part of the contract.
pub const REFERENCE_OCTAVE: [PitchClass; 13] = [
    PitchClass { name: "C", frequency: 523.25 },
    PitchClass { name: "Db", frequency: 554.37 },
    PitchClass { name: "D", frequency: 587.33 },
    PitchClass { name: "Eb", frequency: 622.25 },
    PitchClass { name: "E", frequency: 659.25 },
    PitchClass { name: "F", frequency: 698.46 },
    PitchClass { name: "Gb", frequency: 739.99 },
    PitchClass { name: "G", frequency: 783.99 },
    PitchClass { name: "Ab", frequency: 830.61 },
    PitchClass { name: "A", frequency: 880.00 },
    PitchClass { name: "Bb", frequency: 932.33 },
    PitchClass { name: "B", frequency: 987.77 },
    PitchClass { name: "C2", frequency: 1046.50 },
];

const LOWEST_REFERENCE: f32 = REFERENCE_OCTAVE[0].frequency;
const HIGHEST_REFERENCE: f32 = REFERENCE_OCTAVE[REFERENCE_OCTAVE.len() - 1].frequency;

/// Static map for name to frequency lookups.
static PITCH_MAP: Lazy<BTreeMap<&'static str, f32>> = Lazy::new(|| {
    REFERENCE_OCTAVE
        .iter()
        .map(|pitch| (pitch.name, pitch.frequency))
        .collect()
});

/// Folds a frequency into the reference octave by octave steps.
///
/// Implemented as a loop; every step moves the value one octave closer to
/// the range, so it terminates for any finite positive input. Subnormal
/// and huge values need at most a few hundred steps.
///
/// # Returns
/// * `Some(folded)` - Frequency within `[523.25, 1046.50]`
/// * `None` - Input was zero, negative or not finite
pub fn fold_into_reference_octave(freq: f32) -> Option<f32> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let mut folded = freq;
    while folded < LOWEST_REFERENCE {
        folded *= 2.0;
    }
    while folded > HIGHEST_REFERENCE {
        folded /= 2.0;
    }
    Some(folded)
}

/// Finds the reference pitch class nearest to a frequency.
///
/// The frequency is folded into the reference octave, then the entry with the
/// smallest absolute distance wins. On equal distance the entry that comes
/// first in [`REFERENCE_OCTAVE`] is kept.
pub fn find_nearest_pitch_class(freq: f32) -> Option<PitchClass> {
    let folded = fold_into_reference_octave(freq)?;
    let mut best = REFERENCE_OCTAVE[0];
    let mut best_distance = (best.frequency - folded).abs();
    for pitch in &REFERENCE_OCTAVE[1..] {
        let distance = (pitch.frequency - folded).abs();
        if distance < best_distance {
            best = *pitch;
            best_distance = distance;
        }
    }
    Some(best)
}

/// Returns the nearest pitch name for a frequency, or `""` when there is no
/// pitch to name (zero, negative or non-finite input).
pub fn find_nearest_pitch(freq: f32) -> &'static str {
    find_nearest_pitch_class(freq).map_or("", |pitch| pitch.name)
}

/// Looks up the reference frequency of a pitch name.
pub fn reference_frequency(name: &str) -> Option<f32> {
    PITCH_MAP.get(name).copied()
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents make a semitone; positive values are sharp, negative flat.
pub fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
