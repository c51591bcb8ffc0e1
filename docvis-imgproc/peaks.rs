use crate::error::{ImgprocError, ImgprocResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Filters applied to the raw local maxima of a profile
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakOptions {
    /// Minimum peak value (inclusive)
    pub height: Option<f64>,
    /// Minimum index distance between kept peaks
    pub distance: Option<usize>,
}

impl PeakOptions {
    pub fn new(height: f64, distance: usize) -> Self {
        Self {
            height: Some(height),
            distance: Some(distance),
        }
    }
}

/// Indices of strict local maxima.
///
/// A flat top counts once, at its midpoint (rounded down). Samples at either
/// end of the signal are never peaks.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let n = signal.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let i_max = n - 1;
    let mut i = 1;
    while i < i_max {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < i_max && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Greedy minimum-distance selection: the highest peak wins, lower peaks
/// within `distance` of a kept one are dropped. Ties go to the later index.
fn select_by_distance(peaks: &[usize], signal: &[f64], distance: usize) -> Vec<usize> {
    let n = peaks.len();
    let mut keep = vec![true; n];
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        signal[peaks[a]]
            .partial_cmp(&signal[peaks[b]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < n && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Peak indices of `signal` in ascending order.
///
/// Local maxima are filtered by `height` first, then thinned to respect
/// `distance`.
pub fn find_peaks(signal: &[f64], options: &PeakOptions) -> ImgprocResult<Vec<usize>> {
    if options.distance == Some(0) {
        return Err(ImgprocError::InvalidDistance(0));
    }

    let mut peaks = local_maxima(signal);
    if let Some(height) = options.height {
        peaks.retain(|&p| signal[p] >= height);
    }
    if let Some(distance) = options.distance {
        if distance > 1 {
            peaks = select_by_distance(&peaks, signal, distance);
        }
    }
    Ok(peaks)
}
