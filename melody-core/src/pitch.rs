//! # Pitch Extraction Module
//!
//! Turns one spectral frame (byte magnitudes per frequency bin) into the
//! dominant frequency of that frame.
//!
//! ## Features
//! - Peak picking restricted to a magnitude band
//! - Bin index to Hz conversion for the session's sample rate and transform size

/// Default lower magnitude bound; bins at or below it count as silence.
pub const DEFAULT_MAGNITUDE_FLOOR: f32 = 100.0;

/// Default upper magnitude bound; bins at or above it count as clipping.
pub const DEFAULT_MAGNITUDE_CEILING: f32 = 1100.0;

/// Magnitude band a bin must fall in (exclusive on both ends) to be
/// considered for the dominant peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakGate {
    /// Bins must be strictly louder than this.
    pub floor: f32,
    /// Bins must be strictly quieter than this.
    pub ceiling: f32,
}

impl Default for PeakGate {
    fn default() -> Self {
        Self {
            floor: DEFAULT_MAGNITUDE_FLOOR,
            ceiling: DEFAULT_MAGNITUDE_CEILING,
        }
    }
}

impl PeakGate {
    /// Returns true when `magnitude` lies strictly inside the band.
    #[inline]
    pub fn admits(&self, magnitude: f32) -> bool {
        magnitude > self.floor && magnitude < self.ceiling
    }
}

/// The loudest eligible bin of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    /// Bin index within the frame.
    pub bin: usize,
    /// Magnitude of that bin.
    pub magnitude: u8,
}

/// Finds the loudest bin inside the gate.
///
/// Bins are scanned in order and a later bin only replaces the current best
/// when it is strictly louder, so the lowest index wins among equal peaks.
///
/// # Returns
/// * `Some(peak)` - The dominant bin and its magnitude
/// * `None` - No bin passed the gate
pub fn find_peak(frame: &[u8], gate: PeakGate) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for (bin, &magnitude) in frame.iter().enumerate() {
        if !gate.admits(f32::from(magnitude)) {
            continue;
        }
        if best.is_none_or(|b| magnitude > b.magnitude) {
            best = Some(Peak { bin, magnitude });
        }
    }
    best
}

/// Converts a bin index to its centre frequency in Hz.
#[inline]
pub fn bin_to_hz(bin: usize, sample_rate: u32, transform_size: usize) -> f32 {
    (f64::from(sample_rate) * bin as f64 / transform_size as f64) as f32
}

/// Extracts the fundamental frequency of one spectral frame.
///
/// # Arguments
/// * `frame` - Byte magnitudes, one per bin (`transform_size / 2` of them)
/// * `sample_rate` - Sample rate of the capture session in Hz
/// * `transform_size` - Size of the transform that produced the frame
/// * `gate` - Magnitude band for eligible bins
///
/// # Returns
/// * `Some(frequency)` - `sample_rate * bin / transform_size` of the dominant bin
/// * `None` - No bin passed the gate (silence or clipping)
pub fn extract_fundamental(
    frame: &[u8],
    sample_rate: u32,
    transform_size: usize,
    gate: PeakGate,
) -> Option<f32> {
    if transform_size == 0 {
        return None;
    }
    find_peak(frame, gate).map(|peak| bin_to_hz(peak.bin, sample_rate, transform_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;
    const N: usize = 32768;

    fn frame_with(bins: &[(usize, u8)]) -> Vec<u8> {
        let mut frame = vec![0u8; N / 2];
        for &(bin, mag) in bins {
            frame[bin] = mag;
        }
        frame
    }

    #[test]
    fn single_bin_maps_to_exact_frequency() {
        let frame = frame_with(&[(1000, 200)]);
        let freq = extract_fundamental(&frame, SR, N, PeakGate::default()).unwrap();
        assert_eq!(freq, bin_to_hz(1000, SR, N));
        assert!((freq - 44100.0 * 1000.0 / 32768.0).abs() < 1e-3);
    }

    #[test]
    fn silent_frame_has_no_fundamental() {
        let frame = vec![0u8; N / 2];
        assert_eq!(extract_fundamental(&frame, SR, N, PeakGate::default()), None);
    }

    #[test]
    fn floor_is_exclusive() {
        let frame = frame_with(&[(10, 100), (20, 101)]);
        let peak = find_peak(&frame, PeakGate::default()).unwrap();
        assert_eq!(peak.bin, 20);

        let only_floor = frame_with(&[(10, 100)]);
        assert_eq!(find_peak(&only_floor, PeakGate::default()), None);
    }

    #[test]
    fn ceiling_excludes_loud_bins() {
        let gate = PeakGate {
            floor: 100.0,
            ceiling: 200.0,
        };
        let frame = frame_with(&[(5, 250), (6, 150)]);
        assert_eq!(find_peak(&frame, gate).unwrap().bin, 6);
    }

    #[test]
    fn first_of_equal_peaks_wins() {
        let frame = frame_with(&[(300, 180), (400, 180)]);
        assert_eq!(find_peak(&frame, PeakGate::default()).unwrap().bin, 300);
    }

    #[test]
    fn loudest_bin_wins() {
        let frame = frame_with(&[(300, 150), (390, 240), (800, 200)]);
        let peak = find_peak(&frame, PeakGate::default()).unwrap();
        assert_eq!(peak, Peak { bin: 390, magnitude: 240 });
    }
}
