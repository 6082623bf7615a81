//! Colocalization statistics: Pearson correlation and Manders overlap.
//!
//! Both operate on whole planes or on a masked subset, and both are guarded
//! against degenerate input — zero variance or zero total signal yields
//! 0.0 rather than NaN. Channel-level wrappers apply the same per-pixel
//! maximum component reduction as segmentation, so multi-component data is
//! compared on fluorescence signal, not display luminance.

use ndarray::{Array2, ArrayView2};

use crate::channel::{Channel, ComponentMap};
use crate::float_trait::QuantFloat;

/// Variance / total-signal threshold under which ratios collapse to zero.
const EPS_DEGENERATE: f64 = 1e-12;

/// Pearson correlation coefficient between two intensity planes.
///
/// Restricted to the masked pixels when `mask` is given. Returns 0.0 when
/// the shapes disagree, fewer than two pixels are selected, or either
/// variance is ~0.
pub fn pcc<F: QuantFloat>(
    a: ArrayView2<F>,
    b: ArrayView2<F>,
    mask: Option<&Array2<bool>>,
) -> f64 {
    if a.dim() != b.dim() {
        log::warn!("pcc: plane shapes {:?} vs {:?} differ", a.dim(), b.dim());
        return 0.0;
    }
    if let Some(m) = mask {
        if m.dim() != a.dim() {
            log::warn!("pcc: mask shape {:?} does not match planes", m.dim());
            return 0.0;
        }
    }

    let mut n = 0usize;
    let mut sum_a = 0.0f64;
    let mut sum_b = 0.0f64;
    for ((idx, &va), &vb) in a.indexed_iter().zip(b.iter()) {
        if selected(mask, idx) {
            n += 1;
            sum_a += va.as_f64();
            sum_b += vb.as_f64();
        }
    }
    if n < 2 {
        return 0.0;
    }
    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;

    let mut cov = 0.0f64;
    let mut var_a = 0.0f64;
    let mut var_b = 0.0f64;
    for ((idx, &va), &vb) in a.indexed_iter().zip(b.iter()) {
        if selected(mask, idx) {
            let da = va.as_f64() - mean_a;
            let db = vb.as_f64() - mean_b;
            cov += da * db;
            var_a += da * da;
            var_b += db * db;
        }
    }
    if var_a < EPS_DEGENERATE || var_b < EPS_DEGENERATE {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}

/// Manders colocalization coefficients (M1, M2).
///
/// `M1` is the fraction of A's signal at pixels where B exceeds `thr_b`;
/// `M2` the fraction of B's signal where A exceeds `thr_a`. Returns (0, 0)
/// when shapes disagree or either total is ~0.
pub fn manders<F: QuantFloat>(
    a: ArrayView2<F>,
    b: ArrayView2<F>,
    thr_a: f64,
    thr_b: f64,
    mask: Option<&Array2<bool>>,
) -> (f64, f64) {
    if a.dim() != b.dim() {
        log::warn!("manders: plane shapes {:?} vs {:?} differ", a.dim(), b.dim());
        return (0.0, 0.0);
    }
    if let Some(m) = mask {
        if m.dim() != a.dim() {
            log::warn!("manders: mask shape {:?} does not match planes", m.dim());
            return (0.0, 0.0);
        }
    }

    let mut total_a = 0.0f64;
    let mut total_b = 0.0f64;
    let mut coloc_a = 0.0f64;
    let mut coloc_b = 0.0f64;
    for ((idx, &va), &vb) in a.indexed_iter().zip(b.iter()) {
        if !selected(mask, idx) {
            continue;
        }
        let va = va.as_f64();
        let vb = vb.as_f64();
        total_a += va;
        total_b += vb;
        if vb > thr_b {
            coloc_a += va;
        }
        if va > thr_a {
            coloc_b += vb;
        }
    }
    if total_a.abs() < EPS_DEGENERATE || total_b.abs() < EPS_DEGENERATE {
        return (0.0, 0.0);
    }
    (coloc_a / total_a, coloc_b / total_b)
}

#[inline]
fn selected(mask: Option<&Array2<bool>>, idx: (usize, usize)) -> bool {
    mask.map_or(true, |m| m[idx])
}

/// Pearson correlation between two channels through the standard
/// component reduction.
pub fn pcc_channels(
    a: &Channel,
    b: &Channel,
    map: Option<&ComponentMap>,
    mask: Option<&Array2<bool>>,
) -> f64 {
    let pa = a.working_plane(map);
    let pb = b.working_plane(map);
    pcc(pa.view(), pb.view(), mask)
}

/// Manders coefficients between two channels through the standard
/// component reduction.
pub fn manders_channels(
    a: &Channel,
    b: &Channel,
    thr_a: f64,
    thr_b: f64,
    map: Option<&ComponentMap>,
    mask: Option<&Array2<bool>>,
) -> (f64, f64) {
    let pa = a.working_plane(map);
    let pb = b.working_plane(map);
    manders(pa.view(), pb.view(), thr_a, thr_b, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn gradient(shape: (usize, usize)) -> Array2<f64> {
        Array2::from_shape_fn(shape, |(r, c)| (r * shape.1 + c) as f64)
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    // ==================== Pearson ====================

    #[test]
    fn test_pcc_identical_planes() {
        let a = gradient((16, 16));
        assert!(approx_eq(pcc(a.view(), a.view(), None), 1.0, 1e-12));
    }

    #[test]
    fn test_pcc_anticorrelated_planes() {
        let a = gradient((16, 16));
        let b = a.mapv(|v| -v);
        assert!(approx_eq(pcc(a.view(), b.view(), None), -1.0, 1e-12));
    }

    #[test]
    fn test_pcc_constant_plane_is_zero() {
        let a = gradient((8, 8));
        let b = Array2::from_elem((8, 8), 3.0);
        assert_eq!(pcc(a.view(), b.view(), None), 0.0);
    }

    #[test]
    fn test_pcc_shape_mismatch_is_zero() {
        let a = gradient((8, 8));
        let b = gradient((8, 9));
        assert_eq!(pcc(a.view(), b.view(), None), 0.0);
    }

    #[test]
    fn test_pcc_masked_subset() {
        // Planes correlate perfectly inside the mask and are junk outside.
        let mut a = gradient((8, 8));
        let mut b = gradient((8, 8));
        for c in 0..8 {
            a[[0, c]] = 100.0;
            b[[0, c]] = -(c as f64);
        }
        let mut mask = Array2::from_elem((8, 8), true);
        for c in 0..8 {
            mask[[0, c]] = false;
        }
        assert!(approx_eq(pcc(a.view(), b.view(), Some(&mask)), 1.0, 1e-12));
        assert!(pcc(a.view(), b.view(), None) < 1.0);
    }

    // ==================== Manders ====================

    #[test]
    fn test_manders_identical_above_threshold() {
        let a = Array2::from_elem((8, 8), 10.0);
        let (m1, m2) = manders(a.view(), a.view(), 5.0, 5.0, None);
        assert!(approx_eq(m1, 1.0, 1e-12));
        assert!(approx_eq(m2, 1.0, 1e-12));
    }

    #[test]
    fn test_manders_no_shared_signal() {
        // A bright on the left half, B bright on the right half.
        let a = Array2::from_shape_fn((8, 8), |(_, c)| if c < 4 { 10.0 } else { 0.0 });
        let b = Array2::from_shape_fn((8, 8), |(_, c)| if c >= 4 { 10.0 } else { 0.0 });
        let (m1, m2) = manders(a.view(), b.view(), 5.0, 5.0, None);
        assert_eq!(m1, 0.0);
        assert_eq!(m2, 0.0);
    }

    #[test]
    fn test_manders_partial_overlap() {
        // A everywhere, B above threshold on half the pixels.
        let a = Array2::from_elem((4, 4), 10.0);
        let b = Array2::from_shape_fn((4, 4), |(r, _)| if r < 2 { 10.0 } else { 0.0 });
        let (m1, m2) = manders(a.view(), b.view(), 5.0, 5.0, None);
        assert!(approx_eq(m1, 0.5, 1e-12));
        assert!(approx_eq(m2, 1.0, 1e-12));
    }

    #[test]
    fn test_manders_zero_total_is_zero() {
        let a = Array2::from_elem((4, 4), 0.0);
        let b = Array2::from_elem((4, 4), 10.0);
        assert_eq!(manders(a.view(), b.view(), 1.0, 1.0, None), (0.0, 0.0));
    }

    // ==================== Channel wrappers ====================

    #[test]
    fn test_pcc_channels_uses_component_reduction() {
        use crate::channel::BitDepth;
        use ndarray::Array3;

        // Signal lives in component 1; component 0 carries nothing.
        let data_a = Array3::from_shape_fn((4, 4, 2), |(r, c, comp)| {
            if comp == 1 {
                (r * 4 + c) as f32
            } else {
                0.0
            }
        });
        let a = Channel::from_components("A", BitDepth::F32, data_a.clone());
        let b = Channel::from_components("B", BitDepth::F32, data_a);
        assert!(approx_eq(pcc_channels(&a, &b, None, None), 1.0, 1e-6));
    }
}
