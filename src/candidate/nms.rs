//! Non-maximum suppression for match peaks.

use crate::candidate::topk::{sort_peaks_desc, Peak};

fn chebyshev(a: &Peak, b: &Peak) -> usize {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

/// Keeps the strongest peak of every `radius` neighbourhood.
///
/// Peaks are ranked by descending score (row-major on ties); a peak survives
/// when its Chebyshev distance to every stronger survivor exceeds `radius`.
/// The result is what distinguishes a unique match from a repeated texture.
pub fn nms_2d(mut peaks: Vec<Peak>, radius: usize) -> Vec<Peak> {
    sort_peaks_desc(&mut peaks);
    if radius == 0 {
        return peaks;
    }

    let mut kept: Vec<Peak> = Vec::with_capacity(peaks.len());
    for peak in peaks {
        if kept.iter().all(|k| chebyshev(k, &peak) > radius) {
            kept.push(peak);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::nms_2d;
    use crate::candidate::topk::Peak;

    #[test]
    fn suppresses_neighbours_of_stronger_peaks() {
        let peaks = vec![
            Peak { x: 10, y: 10, score: 0.5 },
            Peak { x: 11, y: 10, score: 0.95 },
            Peak { x: 30, y: 2, score: 0.6 },
        ];
        let kept = nms_2d(peaks, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].x, kept[0].y), (11, 10));
        assert_eq!((kept[1].x, kept[1].y), (30, 2));
    }

    #[test]
    fn zero_radius_only_sorts() {
        let peaks = vec![
            Peak { x: 0, y: 0, score: 0.1 },
            Peak { x: 1, y: 0, score: 0.2 },
        ];
        let kept = nms_2d(peaks, 0);
        assert_eq!(kept[0].x, 1);
        assert_eq!(kept.len(), 2);
    }
}
