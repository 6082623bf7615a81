//! Overlap and colocalization metrics between ROI geometries.
//!
//! Builds on the boolean kernel in [`crate::clip`]: pairwise metrics
//! (intersection/union areas, IoU, overlap ratio), N-way folds, and
//! symmetric IoU / overlap-ratio matrices. All ratio metrics are guarded —
//! a zero denominator yields 0.0, never NaN — so degenerate regions flow
//! through reports instead of failing them.

use ndarray::Array2;

use crate::channel::{Channel, ComponentMap};
use crate::clip::{
    difference_paths, intersect_paths, path_area, path_centroid, union_paths, Point2, Ring,
};
use crate::measure::{measure, MeasureOptions, RoiMeasurement};
use crate::roi::Roi;

/// Pairwise overlap metrics between two ring sets.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseOverlap {
    pub intersection_area: f64,
    pub union_area: f64,
    /// Intersection over union; 0.0 when the union is empty.
    pub iou: f64,
    /// Intersection over the smaller region; 0.0 when either is empty.
    pub overlap_ratio: f64,
    pub intersection_centroid: Point2,
    /// Area of A outside the intersection.
    pub only_a: f64,
    /// Area of B outside the intersection.
    pub only_b: f64,
}

/// Common-intersection metrics across N regions.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiOverlap {
    pub region_count: usize,
    /// Area shared by every region.
    pub intersection_area: f64,
    /// Area covered by at least one region.
    pub union_area: f64,
    /// Union minus common intersection.
    pub non_overlap: f64,
    pub intersection_centroid: Point2,
}

/// Symmetric overlap matrices with their parallel label list.
#[derive(Debug, Clone)]
pub struct OverlapMatrix {
    pub labels: Vec<String>,
    pub iou: Array2<f64>,
    pub overlap_ratio: Array2<f64>,
}

/// Intensity statistics for the shared and exclusive parts of a pair.
#[derive(Debug, Clone)]
pub struct PairwiseIntensity {
    pub intersection: RoiMeasurement,
    pub only_a: RoiMeasurement,
    pub only_b: RoiMeasurement,
}

/// Compute pairwise overlap metrics between two ring sets.
pub fn pairwise(a: &[Ring], b: &[Ring]) -> PairwiseOverlap {
    let inter = intersect_paths(a, b);
    let un = union_paths(a, b);

    let area_a = path_area(a);
    let area_b = path_area(b);
    let intersection_area = path_area(&inter);
    let union_area = path_area(&un);

    let iou = if union_area > 0.0 {
        intersection_area / union_area
    } else {
        0.0
    };
    let min_area = area_a.min(area_b);
    let overlap_ratio = if min_area > 0.0 {
        intersection_area / min_area
    } else {
        0.0
    };

    PairwiseOverlap {
        intersection_area,
        union_area,
        iou,
        overlap_ratio,
        intersection_centroid: path_centroid(&inter),
        only_a: (area_a - intersection_area).max(0.0),
        only_b: (area_b - intersection_area).max(0.0),
    }
}

/// Fold intersection and union across all regions.
///
/// The intersection is the area common to every region, the union the area
/// covered by any; `non_overlap` is their difference. An empty input
/// yields an all-zero record.
pub fn multi(paths: &[Vec<Ring>]) -> MultiOverlap {
    let Some(first) = paths.first() else {
        return MultiOverlap {
            region_count: 0,
            intersection_area: 0.0,
            union_area: 0.0,
            non_overlap: 0.0,
            intersection_centroid: [0.0, 0.0],
        };
    };

    let mut inter: Vec<Ring> = first.clone();
    let mut un: Vec<Ring> = first.clone();
    for path in &paths[1..] {
        inter = intersect_paths(&inter, path);
        un = union_paths(&un, path);
    }

    let intersection_area = path_area(&inter);
    let union_area = path_area(&un);
    MultiOverlap {
        region_count: paths.len(),
        intersection_area,
        union_area,
        non_overlap: (union_area - intersection_area).max(0.0),
        intersection_centroid: path_centroid(&inter),
    }
}

/// Symmetric N×N IoU and overlap-ratio matrices.
///
/// Only the upper triangle is computed and mirrored; the diagonal is
/// exactly 1.0 by definition (self-overlap).
pub fn matrix(regions: &[(String, Vec<Ring>)]) -> OverlapMatrix {
    let n = regions.len();
    let mut iou = Array2::zeros((n, n));
    let mut ratio = Array2::zeros((n, n));

    for i in 0..n {
        iou[[i, i]] = 1.0;
        ratio[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let pw = pairwise(&regions[i].1, &regions[j].1);
            iou[[i, j]] = pw.iou;
            iou[[j, i]] = pw.iou;
            ratio[[i, j]] = pw.overlap_ratio;
            ratio[[j, i]] = pw.overlap_ratio;
        }
    }

    OverlapMatrix {
        labels: regions.iter().map(|(l, _)| l.clone()).collect(),
        iou,
        overlap_ratio: ratio,
    }
}

/// Pairwise metrics plus intensity statistics for the intersection and
/// each region's exclusive remainder.
///
/// The clipped paths are measured as temporary wand ROIs, so the full
/// background-correction machinery applies to sub-regions too.
pub fn pairwise_with_intensity(
    a: &Roi,
    b: &Roi,
    channels: &[Channel],
    map: Option<&ComponentMap>,
    opts: &MeasureOptions,
) -> (PairwiseOverlap, PairwiseIntensity) {
    let pw = pairwise(a.rings(), b.rings());

    let inter = intersect_paths(a.rings(), b.rings());
    let only_a = difference_paths(a.rings(), b.rings());
    let only_b = difference_paths(b.rings(), a.rings());

    let measure_region = |label: String, rings: Vec<Ring>| {
        let roi = Roi::from_rings(rings).with_label(label);
        measure(&roi, channels, map, opts)
    };

    let intensity = PairwiseIntensity {
        intersection: measure_region(format!("{} ∩ {}", a.label, b.label), inter),
        only_a: measure_region(format!("{} only", a.label), only_a),
        only_b: measure_region(format!("{} only", b.label), only_b),
    };
    (pw, intensity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Ring> {
        vec![vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]]
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    // ==================== Pairwise ====================

    #[test]
    fn test_pairwise_overlapping_rectangles() {
        // A = [0,10]², B = [5,15]²: the canonical quarter-overlap pair.
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let pw = pairwise(&a, &b);

        assert!(approx_eq(pw.intersection_area, 25.0, 1e-9));
        assert!(approx_eq(pw.union_area, 175.0, 1e-9));
        assert!(approx_eq(pw.iou, 25.0 / 175.0, 1e-9));
        assert!(approx_eq(pw.overlap_ratio, 0.25, 1e-9));
        assert!(approx_eq(pw.only_a, 75.0, 1e-9));
        assert!(approx_eq(pw.only_b, 75.0, 1e-9));
        assert!(approx_eq(pw.intersection_centroid[0], 7.5, 1e-9));
        assert!(approx_eq(pw.intersection_centroid[1], 7.5, 1e-9));
    }

    #[test]
    fn test_pairwise_identity() {
        let a = rect(0.0, 0.0, 8.0, 8.0);
        let pw = pairwise(&a, &a);
        assert!(approx_eq(pw.iou, 1.0, 1e-9));
        assert!(approx_eq(pw.overlap_ratio, 1.0, 1e-9));
        assert!(approx_eq(pw.only_a, 0.0, 1e-9));
    }

    #[test]
    fn test_pairwise_symmetry() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(3.0, -2.0, 12.0, 6.0);
        let ab = pairwise(&a, &b);
        let ba = pairwise(&b, &a);
        assert!(approx_eq(ab.iou, ba.iou, 1e-9));
        assert!(approx_eq(ab.overlap_ratio, ba.overlap_ratio, 1e-9));
        assert!(approx_eq(ab.intersection_area, ba.intersection_area, 1e-9));
    }

    #[test]
    fn test_pairwise_disjoint_is_zero() {
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(10.0, 10.0, 12.0, 12.0);
        let pw = pairwise(&a, &b);
        assert_eq!(pw.intersection_area, 0.0);
        assert_eq!(pw.iou, 0.0);
        assert_eq!(pw.overlap_ratio, 0.0);
        assert!(approx_eq(pw.union_area, 8.0, 1e-9));
    }

    #[test]
    fn test_pairwise_degenerate_is_zero() {
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let empty: Vec<Ring> = Vec::new();
        let pw = pairwise(&a, &empty);
        assert_eq!(pw.iou, 0.0);
        assert_eq!(pw.overlap_ratio, 0.0);
        assert!(approx_eq(pw.union_area, 16.0, 1e-9));
    }

    #[test]
    fn test_containment_bound() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let pw = pairwise(&a, &b);
        assert!(pw.intersection_area <= path_area(&a).min(path_area(&b)) + 1e-9);
    }

    // ==================== Multi ====================

    #[test]
    fn test_multi_three_regions() {
        // Three rects sharing the band x ∈ [4,6], y ∈ [0,4].
        let paths = vec![
            rect(0.0, 0.0, 6.0, 4.0),
            rect(2.0, 0.0, 8.0, 4.0),
            rect(4.0, 0.0, 10.0, 4.0),
        ];
        // Collinear horizontal edges take the general-position nudge path,
        // so areas are exact to the nudge magnitude.
        let m = multi(&paths);
        assert_eq!(m.region_count, 3);
        assert!(approx_eq(m.intersection_area, 8.0, 1e-4));
        assert!(approx_eq(m.union_area, 40.0, 1e-4));
        assert!(approx_eq(m.non_overlap, 32.0, 1e-4));
        assert!(approx_eq(m.intersection_centroid[0], 5.0, 1e-4));
    }

    #[test]
    fn test_multi_empty_input() {
        let m = multi(&[]);
        assert_eq!(m.region_count, 0);
        assert_eq!(m.union_area, 0.0);
    }

    #[test]
    fn test_multi_disjoint_has_empty_intersection() {
        let paths = vec![rect(0.0, 0.0, 2.0, 2.0), rect(5.0, 5.0, 7.0, 7.0)];
        let m = multi(&paths);
        assert_eq!(m.intersection_area, 0.0);
        assert!(approx_eq(m.union_area, 8.0, 1e-9));
        assert!(approx_eq(m.non_overlap, 8.0, 1e-9));
    }

    // ==================== Matrix ====================

    #[test]
    fn test_matrix_disjoint_regions() {
        let regions = vec![
            ("a".to_string(), rect(0.0, 0.0, 2.0, 2.0)),
            ("b".to_string(), rect(5.0, 0.0, 7.0, 2.0)),
            ("c".to_string(), rect(0.0, 5.0, 2.0, 7.0)),
        ];
        let m = matrix(&regions);
        assert_eq!(m.labels, vec!["a", "b", "c"]);
        for i in 0..3 {
            assert_eq!(m.iou[[i, i]], 1.0);
            assert_eq!(m.overlap_ratio[[i, i]], 1.0);
            for j in 0..3 {
                if i != j {
                    assert_eq!(m.iou[[i, j]], 0.0);
                    assert_eq!(m.overlap_ratio[[i, j]], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_matrix_symmetry() {
        let regions = vec![
            ("a".to_string(), rect(0.0, 0.0, 10.0, 10.0)),
            ("b".to_string(), rect(5.0, 5.0, 15.0, 15.0)),
            ("c".to_string(), rect(8.0, 0.0, 12.0, 6.0)),
        ];
        let m = matrix(&regions);
        for i in 0..3 {
            for j in 0..3 {
                assert!(approx_eq(m.iou[[i, j]], m.iou[[j, i]], 1e-12));
                assert!(approx_eq(
                    m.overlap_ratio[[i, j]],
                    m.overlap_ratio[[j, i]],
                    1e-12
                ));
            }
        }
        assert!(m.iou[[0, 1]] > 0.0);
    }

    // ==================== Intensity sub-statistics ====================

    #[test]
    fn test_pairwise_with_intensity() {
        use crate::roi::RoiKind;
        use ndarray::Array2;

        let plane = Array2::from_elem((20, 20), 10.0f32);
        let ch = Channel::from_f32("GFP", plane);

        let a = Roi::new(RoiKind::Rectangle, vec![[0.0, 0.0], [10.0, 10.0]]).with_label("A");
        let b = Roi::new(RoiKind::Rectangle, vec![[5.0, 5.0], [15.0, 15.0]]).with_label("B");

        let (pw, intensity) =
            pairwise_with_intensity(&a, &b, &[ch], None, &MeasureOptions::default());

        assert!(approx_eq(pw.intersection_area, 25.0, 1e-9));
        assert!(approx_eq(intensity.intersection.area_px, 25.0, 1e-9));
        assert!(approx_eq(intensity.only_a.area_px, 75.0, 1e-9));
        assert!(approx_eq(intensity.only_b.area_px, 75.0, 1e-9));
        let (_, stats) = &intensity.intersection.channels[0];
        assert!(approx_eq(stats.mean, 10.0, 1e-9));
    }
}
