//! Mask ↔ vector geometry conversion.
//!
//! `rasterize` fills polygon rings into a boolean mask with the nonzero
//! winding rule sampled at pixel centers. `vectorize` traces the external
//! outline of each 4-connected mask component on the pixel-corner lattice,
//! so a tolerance-0, smoothing-off round trip reproduces the mask exactly.
//! Interior holes are not represented as rings — a vectorized component is
//! its outer boundary only.

use ndarray::Array2;

use crate::clip::{Point2, Ring};
use crate::float_trait::QuantFloat;
use crate::segmentation::{gaussian_blur_2d, label_components};

// =============================================================================
// Constants
// =============================================================================

/// Spline samples emitted per input segment when smoothing.
const SMOOTH_SAMPLES_PER_SEGMENT: usize = 8;

/// Sigma for the pre-trace mask blur used with smoothing at low tolerance.
const PRETRACE_BLUR_SIGMA: f64 = 0.8;

/// Below this simplification tolerance a smoothed trace pre-blurs the mask
/// to remove staircase aliasing before the spline fit.
const PRETRACE_BLUR_MAX_TOLERANCE: f64 = 1.0;

/// Divisor applied to √area when deriving an adaptive tolerance.
const ADAPTIVE_TOLERANCE_DIVISOR: f64 = 32.0;

/// Upper clamp for the adaptive tolerance, in pixels.
const ADAPTIVE_TOLERANCE_MAX: f64 = 8.0;

// =============================================================================
// Rasterization
// =============================================================================

/// Fill a ring set into a boolean H×W mask.
///
/// Nonzero winding rule, sampled at pixel centers, no antialiasing. Rings
/// with fewer than 3 vertices contribute nothing; an empty path produces an
/// all-false mask.
pub fn rasterize(rings: &[Ring], shape: (usize, usize)) -> Array2<bool> {
    let (rows, cols) = shape;
    let mut mask = Array2::from_elem(shape, false);
    let valid: Vec<&Ring> = rings.iter().filter(|r| r.len() >= 3).collect();
    if valid.is_empty() || rows == 0 || cols == 0 {
        return mask;
    }

    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for r in 0..rows {
        let yc = r as f64 + 0.5;
        crossings.clear();
        for ring in &valid {
            let n = ring.len();
            for i in 0..n {
                let p = ring[i];
                let q = ring[(i + 1) % n];
                if p[1] <= yc && q[1] > yc {
                    let t = (yc - p[1]) / (q[1] - p[1]);
                    crossings.push((p[0] + t * (q[0] - p[0]), 1));
                } else if q[1] <= yc && p[1] > yc {
                    let t = (yc - p[1]) / (q[1] - p[1]);
                    crossings.push((p[0] + t * (q[0] - p[0]), -1));
                }
            }
        }
        if crossings.len() < 2 {
            continue;
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for k in 0..crossings.len() - 1 {
            winding += crossings[k].1;
            if winding == 0 {
                continue;
            }
            let x0 = crossings[k].0;
            let x1 = crossings[k + 1].0;
            let start = (x0 - 0.5).ceil().max(0.0) as usize;
            let end = ((x1 - 0.5).ceil().min(cols as f64)).max(0.0) as usize;
            for c in start..end {
                mask[[r, c]] = true;
            }
        }
    }
    mask
}

// =============================================================================
// Vectorization
// =============================================================================

/// Trace a mask into simplified polygon rings, one per 4-connected
/// component (external outlines only).
///
/// `tolerance` is the Douglas-Peucker pixel distance; 0 keeps the exact
/// outline. `smooth` replaces each simplified ring with a closed
/// Catmull-Rom spline, pre-blurring the mask first when the tolerance is
/// low so staircase steps do not show through the fit.
pub fn vectorize(mask: &Array2<bool>, tolerance: f64, smooth: bool) -> Vec<Ring> {
    let blurred;
    let src = if smooth && tolerance < PRETRACE_BLUR_MAX_TOLERANCE {
        blurred = preblur_binarize(mask);
        &blurred
    } else {
        mask
    };

    let (labels, count) = label_components(src);
    if count == 0 {
        return Vec::new();
    }

    // First pixel of each component in scan order is its topmost-leftmost.
    let (rows, cols) = src.dim();
    let mut starts: Vec<Option<(usize, usize)>> = vec![None; count + 1];
    for r in 0..rows {
        for c in 0..cols {
            let l = labels[[r, c]] as usize;
            if l != 0 && starts[l].is_none() {
                starts[l] = Some((r, c));
            }
        }
    }

    let mut rings = Vec::new();
    for comp in 1..=count as u32 {
        let Some(start) = starts[comp as usize] else {
            continue;
        };
        let outline = trace_outline(&labels, comp, start);
        let outline = compress_collinear(&outline);
        let simplified = if tolerance > 0.0 {
            rdp_closed(&outline, tolerance)
        } else {
            outline
        };
        if simplified.len() < 3 {
            continue;
        }
        if smooth {
            rings.push(catmull_rom_closed(&simplified, SMOOTH_SAMPLES_PER_SEGMENT));
        } else {
            rings.push(simplified);
        }
    }
    rings
}

/// Simplification tolerance scaled to region size.
///
/// Monotone in √area: small regions keep near-exact outlines, large ones
/// re-vectorize with aggressively reduced vertex counts.
pub fn adaptive_tolerance(area_px: f64) -> f64 {
    if area_px <= 0.0 {
        return 0.0;
    }
    (area_px.sqrt() / ADAPTIVE_TOLERANCE_DIVISOR).min(ADAPTIVE_TOLERANCE_MAX)
}

/// Blur a boolean mask and re-binarize at 0.5.
fn preblur_binarize(mask: &Array2<bool>) -> Array2<bool> {
    let plane = mask.mapv(|v| if v { 1.0f32 } else { 0.0 });
    let blurred = gaussian_blur_2d(plane.view(), PRETRACE_BLUR_SIGMA);
    blurred.mapv(|v| v > 0.5)
}

/// Crack-following outline trace on the pixel-corner lattice.
///
/// Starts from the component's topmost-leftmost pixel heading east with the
/// component on the right-hand side, preferring the tightest right turn at
/// every corner. The right-turn preference keeps diagonally touching pixels
/// on separate outlines, matching 4-connected labeling.
fn trace_outline(labels: &Array2<u32>, comp: u32, start: (usize, usize)) -> Ring {
    let (rows, cols) = labels.dim();
    let fg = |r: isize, c: isize| -> bool {
        r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols
            && labels[[r as usize, c as usize]] == comp
    };

    // Directions: E, S, W, N as (dx, dy); right turn = +1 mod 4.
    const DIRS: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

    // (right pixel, left pixel) offsets relative to the corner for an edge
    // leaving in each direction, as (row, col) deltas.
    const SIDES: [((isize, isize), (isize, isize)); 4] = [
        ((0, 0), (-1, 0)),   // E
        ((0, -1), (0, 0)),   // S
        ((-1, -1), (0, -1)), // W
        ((-1, 0), (-1, -1)), // N
    ];

    let edge_valid = |x: isize, y: isize, d: usize| -> bool {
        let (right, left) = SIDES[d];
        fg(y + right.0, x + right.1) && !fg(y + left.0, x + left.1)
    };

    let start_corner = (start.1 as isize, start.0 as isize);
    let mut points: Ring = vec![[start_corner.0 as f64, start_corner.1 as f64]];
    let (mut x, mut y) = start_corner;
    let mut d = 0usize; // east along the top edge of the start pixel

    let max_steps = 4 * rows * cols + 4;
    for _ in 0..max_steps {
        x += DIRS[d].0;
        y += DIRS[d].1;
        if (x, y) == start_corner {
            return points;
        }
        points.push([x as f64, y as f64]);

        let mut turned = false;
        for turn in [1usize, 0, 3, 2] {
            let nd = (d + turn) % 4;
            if edge_valid(x, y, nd) {
                d = nd;
                turned = true;
                break;
            }
        }
        if !turned {
            break;
        }
    }
    log::warn!("trace_outline: boundary walk did not close; returning partial ring");
    points
}

/// Drop vertices that sit on a straight run between their neighbors,
/// including across the ring's wrap-around.
fn compress_collinear(ring: &Ring) -> Ring {
    let n = ring.len();
    if n < 3 {
        return ring.clone();
    }
    let mut out: Ring = Vec::with_capacity(n / 2);
    for i in 0..n {
        let p = ring[(i + n - 1) % n];
        let q = ring[i];
        let r = ring[(i + 1) % n];
        let crossv = (q[0] - p[0]) * (r[1] - p[1]) - (q[1] - p[1]) * (r[0] - p[0]);
        if crossv.abs() > 1e-12 {
            out.push(q);
        }
    }
    out
}

// =============================================================================
// Douglas-Peucker simplification
// =============================================================================

/// Distance from `pt` to the line through `a` and `b` (or to `a` when the
/// endpoints coincide).
fn perpendicular_distance(pt: Point2, a: Point2, b: Point2) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-18 {
        let ex = pt[0] - a[0];
        let ey = pt[1] - a[1];
        return (ex * ex + ey * ey).sqrt();
    }
    ((pt[0] - a[0]) * dy - (pt[1] - a[1]) * dx).abs() / len_sq.sqrt()
}

/// Recursive Douglas-Peucker over an open polyline. Appends every kept
/// point except the final endpoint.
fn rdp_open(points: &[Point2], tolerance: f64, out: &mut Ring) {
    let n = points.len();
    if n < 2 {
        out.extend_from_slice(points);
        return;
    }
    let first = points[0];
    let last = points[n - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0usize;
    for (i, &p) in points.iter().enumerate().take(n - 1).skip(1) {
        let dist = perpendicular_distance(p, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        rdp_open(&points[..=max_idx], tolerance, out);
        rdp_open(&points[max_idx..], tolerance, out);
    } else {
        out.push(first);
    }
}

/// Douglas-Peucker simplification of a closed ring.
///
/// Anchored at vertex 0 and the vertex farthest from it, so the ring stays
/// closed without privileging an arbitrary split edge.
fn rdp_closed(ring: &Ring, tolerance: f64) -> Ring {
    let n = ring.len();
    if n <= 3 {
        return ring.clone();
    }

    let anchor = ring[0];
    let mut far_idx = 0usize;
    let mut far_dist = 0.0;
    for (i, p) in ring.iter().enumerate().skip(1) {
        let dx = p[0] - anchor[0];
        let dy = p[1] - anchor[1];
        let d = dx * dx + dy * dy;
        if d > far_dist {
            far_dist = d;
            far_idx = i;
        }
    }
    if far_idx == 0 {
        return Vec::new();
    }

    let mut out: Ring = Vec::new();
    rdp_open(&ring[..=far_idx], tolerance, &mut out);
    let mut back: Vec<Point2> = ring[far_idx..].to_vec();
    back.push(ring[0]);
    rdp_open(&back, tolerance, &mut out);
    out
}

// =============================================================================
// Catmull-Rom smoothing
// =============================================================================

/// Sample a closed Catmull-Rom spline through the ring's vertices.
///
/// The tangent at each vertex is half the chord between its two neighbors;
/// each segment contributes `samples` points (the segment start included,
/// its end excluded, so consecutive segments share no duplicates).
pub fn catmull_rom_closed(ring: &Ring, samples: usize) -> Ring {
    let n = ring.len();
    if n < 3 || samples < 2 {
        return ring.clone();
    }

    let mut out: Ring = Vec::with_capacity(n * samples);
    for i in 0..n {
        let p0 = ring[(i + n - 1) % n];
        let p1 = ring[i];
        let p2 = ring[(i + 1) % n];
        let p3 = ring[(i + 2) % n];

        let m1 = [(p2[0] - p0[0]) / 2.0, (p2[1] - p0[1]) / 2.0];
        let m2 = [(p3[0] - p1[0]) / 2.0, (p3[1] - p1[1]) / 2.0];

        for s in 0..samples {
            let t = s as f64 / samples as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            out.push([
                h00 * p1[0] + h10 * m1[0] + h01 * p2[0] + h11 * m2[0],
                h00 * p1[1] + h10 * m1[1] + h01 * p2[1] + h11 * m2[1],
            ]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_pattern(pattern: &[&str]) -> Array2<bool> {
        let rows = pattern.len();
        let cols = pattern[0].len();
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            pattern[r].as_bytes()[c] == b'#'
        })
    }

    fn mask_area(mask: &Array2<bool>) -> usize {
        mask.iter().filter(|&&v| v).count()
    }

    // ==================== Rasterize ====================

    #[test]
    fn test_rasterize_rect() {
        let ring = vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let mask = rasterize(&[ring], (12, 12));
        assert_eq!(mask_area(&mask), 100);
        assert!(mask[[0, 0]]);
        assert!(mask[[9, 9]]);
        assert!(!mask[[10, 10]]);
    }

    #[test]
    fn test_rasterize_empty_and_degenerate() {
        assert_eq!(mask_area(&rasterize(&[], (8, 8))), 0);
        let line = vec![[0.0, 0.0], [5.0, 5.0]];
        assert_eq!(mask_area(&rasterize(&[line], (8, 8))), 0);
    }

    #[test]
    fn test_rasterize_disjoint_rings() {
        let a = vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
        let b = vec![[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0]];
        let mask = rasterize(&[a, b], (8, 8));
        assert_eq!(mask_area(&mask), 8);
    }

    #[test]
    fn test_rasterize_clips_to_shape() {
        let ring = vec![[-5.0, -5.0], [20.0, -5.0], [20.0, 20.0], [-5.0, 20.0]];
        let mask = rasterize(&[ring], (4, 4));
        assert_eq!(mask_area(&mask), 16);
    }

    // ==================== Vectorize / round trip ====================

    #[test]
    fn test_vectorize_square_corners() {
        let mask = mask_from_pattern(&[
            "....",
            ".##.",
            ".##.",
            "....",
        ]);
        let rings = vectorize(&mask, 0.0, false);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
    }

    #[test]
    fn test_round_trip_exact_without_simplification() {
        let mask = mask_from_pattern(&[
            "........",
            ".###....",
            ".#####..",
            ".#####..",
            "..###...",
            "..#.....",
            "........",
        ]);
        let rings = vectorize(&mask, 0.0, false);
        let back = rasterize(&rings, mask.dim());
        assert_eq!(mask, back);
    }

    #[test]
    fn test_vectorize_two_components_two_rings() {
        let mask = mask_from_pattern(&[
            "##..",
            "##..",
            "...#",
            "...#",
        ]);
        let rings = vectorize(&mask, 0.0, false);
        assert_eq!(rings.len(), 2);
        let back = rasterize(&rings, mask.dim());
        assert_eq!(mask, back);
    }

    #[test]
    fn test_diagonal_pixels_stay_separate() {
        let mask = mask_from_pattern(&[
            "#.",
            ".#",
        ]);
        let rings = vectorize(&mask, 0.0, false);
        assert_eq!(rings.len(), 2);
        let back = rasterize(&rings, mask.dim());
        assert_eq!(mask, back);
    }

    #[test]
    fn test_simplification_reduces_vertices() {
        // A large diamond has many staircase vertices at tolerance 0.
        let size = 41usize;
        let mid = 20isize;
        let mask = Array2::from_shape_fn((size, size), |(r, c)| {
            (r as isize - mid).abs() + (c as isize - mid).abs() <= 15
        });
        let exact = vectorize(&mask, 0.0, false);
        let simple = vectorize(&mask, 2.0, false);
        assert_eq!(exact.len(), 1);
        assert_eq!(simple.len(), 1);
        assert!(simple[0].len() < exact[0].len());
        assert!(simple[0].len() >= 4);
    }

    #[test]
    fn test_smoothing_resamples_ring() {
        let mask = mask_from_pattern(&[
            "......",
            ".####.",
            ".####.",
            ".####.",
            "......",
        ]);
        let plain = vectorize(&mask, 1.5, false);
        let smooth = vectorize(&mask, 1.5, true);
        assert_eq!(smooth.len(), 1);
        assert!(smooth[0].len() > plain[0].len());
    }

    #[test]
    fn test_empty_mask_vectorizes_to_nothing() {
        let mask = Array2::from_elem((5, 5), false);
        assert!(vectorize(&mask, 0.0, false).is_empty());
    }

    // ==================== Adaptive tolerance ====================

    #[test]
    fn test_adaptive_tolerance_monotone_and_clamped() {
        let mut prev = 0.0;
        for area in [0.0, 10.0, 100.0, 1000.0, 1e5, 1e9] {
            let tol = adaptive_tolerance(area);
            assert!(tol >= prev);
            prev = tol;
        }
        assert_eq!(adaptive_tolerance(1e12), ADAPTIVE_TOLERANCE_MAX);
        assert!(adaptive_tolerance(16.0) < 0.2);
    }

    // ==================== Catmull-Rom ====================

    #[test]
    fn test_catmull_rom_passes_through_vertices() {
        let ring = vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let smooth = catmull_rom_closed(&ring, 4);
        assert_eq!(smooth.len(), 16);
        // t = 0 samples are the original vertices.
        for (i, v) in ring.iter().enumerate() {
            assert_eq!(smooth[i * 4], *v);
        }
    }
}
