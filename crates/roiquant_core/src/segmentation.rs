//! Seeded region growing ("magic wand") segmentation.
//!
//! Given an intensity plane, a seed pixel, and a tolerance band, the engine
//! flood-fills the 4-connected region around the seed whose intensity stays
//! within the band. The band is fixed relative to the seed pixel's value —
//! it never creeps with a running region average, so growing is order
//! independent and monotone in the tolerance.
//!
//! An optional separable Gaussian pre-blur keeps noise from fragmenting the
//! region before growing starts.

use ndarray::{Array2, ArrayView2};

use crate::channel::{Channel, ComponentMap};
use crate::float_trait::QuantFloat;

// =============================================================================
// Constants
// =============================================================================

/// Default wand tolerance in intensity units (absolute mode).
const DEFAULT_TOLERANCE: f64 = 10.0;

/// Default pre-smoothing sigma (0.0 = no blur).
const DEFAULT_SMOOTHING: f64 = 0.0;

/// Scratch-state markers for the padded flood-fill buffer.
const STATE_UNTOUCHED: u8 = 0;
const STATE_VISITED: u8 = 1;
const STATE_ACCEPTED: u8 = 2;

// =============================================================================
// Configuration
// =============================================================================

/// How the tolerance band around the seed value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToleranceMode {
    /// Fixed ± intensity band: `[seed - tol, seed + tol]`.
    #[default]
    Absolute,
    /// Band scaled by the seed value: `seed ± |seed| * tol / 100`.
    Relative,
}

/// Parameters for one region-growing invocation.
#[derive(Debug, Clone)]
pub struct WandConfig {
    /// Tolerance band half-width; intensity units in absolute mode,
    /// percent of the seed value in relative mode.
    pub tolerance: f64,
    /// Gaussian pre-smoothing sigma applied to the working plane.
    pub smoothing: f64,
    /// Absolute or relative tolerance interpretation.
    pub mode: ToleranceMode,
}

impl Default for WandConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            smoothing: DEFAULT_SMOOTHING,
            mode: ToleranceMode::Absolute,
        }
    }
}

impl WandConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err("tolerance must be >= 0".to_string());
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err("smoothing must be >= 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Gaussian blur
// =============================================================================

/// Compute a normalized 1D Gaussian kernel for the given sigma.
///
/// Kernel size is `2 * round(3 * sigma) + 1`, which is odd by construction;
/// sigma <= 0 degenerates to the identity kernel.
fn gaussian_kernel_1d<F: QuantFloat>(sigma: f64) -> Vec<F> {
    if sigma <= 0.0 {
        return vec![F::one()];
    }

    let radius = (3.0 * sigma).round() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![F::zero(); size];

    let inv_two_sigma2 = -1.0 / (2.0 * sigma * sigma);
    let mut sum = 0.0f64;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f64 - radius as f64;
        let val = (x * x * inv_two_sigma2).exp();
        *k = F::from_f64_c(val);
        sum += val;
    }

    let inv_sum = F::from_f64_c(1.0 / sum);
    for k in kernel.iter_mut() {
        *k *= inv_sum;
    }
    kernel
}

/// Reflect an out-of-range index back into `[0, len)`.
#[inline]
fn reflect_index(idx: isize, len: usize) -> usize {
    let n = len as isize;
    if idx < 0 {
        (-idx - 1).min(n - 1) as usize
    } else if idx >= n {
        let excess = idx - n;
        (n - 2 - excess).max(0) as usize
    } else {
        idx as usize
    }
}

/// Convolve one lane (row or column) against a centered kernel with
/// reflected boundaries.
fn convolve_lane<F: QuantFloat>(input: &[F], kernel: &[F], output: &mut [F]) {
    let n = input.len();
    let radius = kernel.len() / 2;
    for (i, out) in output.iter_mut().enumerate().take(n) {
        let mut acc = F::zero();
        for (k, &kv) in kernel.iter().enumerate() {
            let idx = reflect_index(i as isize + k as isize - radius as isize, n);
            acc += input[idx] * kv;
        }
        *out = acc;
    }
}

/// Separable 2D Gaussian blur with reflected boundaries.
///
/// Kernel size follows `gaussian_kernel_1d`; sigma <= 0 returns a copy.
pub fn gaussian_blur_2d<F: QuantFloat>(plane: ArrayView2<F>, sigma: f64) -> Array2<F> {
    let (rows, cols) = plane.dim();
    if sigma <= 0.0 || rows == 0 || cols == 0 {
        return plane.to_owned();
    }

    let kernel = gaussian_kernel_1d::<F>(sigma);

    // Horizontal pass
    let mut horiz = Array2::zeros((rows, cols));
    let mut lane = vec![F::zero(); cols];
    let mut out_lane = vec![F::zero(); cols];
    for r in 0..rows {
        for c in 0..cols {
            lane[c] = plane[[r, c]];
        }
        convolve_lane(&lane, &kernel, &mut out_lane);
        for c in 0..cols {
            horiz[[r, c]] = out_lane[c];
        }
    }

    // Vertical pass
    let mut out = Array2::zeros((rows, cols));
    let mut col_lane = vec![F::zero(); rows];
    let mut col_out = vec![F::zero(); rows];
    for c in 0..cols {
        for r in 0..rows {
            col_lane[r] = horiz[[r, c]];
        }
        convolve_lane(&col_lane, &kernel, &mut col_out);
        for r in 0..rows {
            out[[r, c]] = col_out[r];
        }
    }

    out
}

// =============================================================================
// Region growing
// =============================================================================

/// Grow a 4-connected region around `seed = (row, col)`.
///
/// Returns a boolean mask with the plane's shape. An out-of-bounds seed
/// yields an all-false mask rather than an error. The tolerance band is
/// computed once from the (optionally pre-blurred) seed pixel value and
/// never re-centered while growing.
pub fn region_grow<F: QuantFloat>(
    plane: ArrayView2<F>,
    seed: (usize, usize),
    config: &WandConfig,
) -> Array2<bool> {
    let (rows, cols) = plane.dim();
    let empty = Array2::from_elem((rows, cols), false);

    if let Err(msg) = config.validate() {
        log::warn!("region_grow: invalid config ({msg}); returning empty mask");
        return empty;
    }
    let (seed_r, seed_c) = seed;
    if seed_r >= rows || seed_c >= cols {
        return empty;
    }

    let working = if config.smoothing > 0.0 {
        gaussian_blur_2d(plane, config.smoothing)
    } else {
        plane.to_owned()
    };

    let seed_val = working[[seed_r, seed_c]].as_f64();
    let half_band = match config.mode {
        ToleranceMode::Absolute => config.tolerance,
        ToleranceMode::Relative => (seed_val * config.tolerance / 100.0).abs(),
    };
    let lo = seed_val - half_band;
    let hi = seed_val + half_band;

    // Scratch buffer one pixel larger on each side; the border ring is
    // pre-marked visited so the neighbor loop needs no bounds checks.
    let mut state = Array2::from_elem((rows + 2, cols + 2), STATE_UNTOUCHED);
    for c in 0..cols + 2 {
        state[[0, c]] = STATE_VISITED;
        state[[rows + 1, c]] = STATE_VISITED;
    }
    for r in 0..rows + 2 {
        state[[r, 0]] = STATE_VISITED;
        state[[r, cols + 1]] = STATE_VISITED;
    }

    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(64);
    state[[seed_r + 1, seed_c + 1]] = STATE_ACCEPTED;
    stack.push((seed_r + 1, seed_c + 1));

    while let Some((pr, pc)) = stack.pop() {
        for (nr, nc) in [(pr - 1, pc), (pr + 1, pc), (pr, pc - 1), (pr, pc + 1)] {
            if state[[nr, nc]] != STATE_UNTOUCHED {
                continue;
            }
            let v = working[[nr - 1, nc - 1]].as_f64();
            if v >= lo && v <= hi {
                state[[nr, nc]] = STATE_ACCEPTED;
                stack.push((nr, nc));
            } else {
                state[[nr, nc]] = STATE_VISITED;
            }
        }
    }

    // Crop the border away.
    Array2::from_shape_fn((rows, cols), |(r, c)| state[[r + 1, c + 1]] == STATE_ACCEPTED)
}

/// Grow a region on a channel's working plane.
///
/// Multi-component channels are reduced by per-pixel maximum (restricted to
/// the mapped components when `map` names the channel) before growing, so
/// the wand follows fluorescence signal rather than display luminance.
pub fn region_grow_channel(
    channel: &Channel,
    map: Option<&ComponentMap>,
    seed: (usize, usize),
    config: &WandConfig,
) -> Array2<bool> {
    let plane = channel.working_plane(map);
    region_grow(plane.view(), seed, config)
}

// =============================================================================
// Connected-component post-filters
// =============================================================================

/// Label the 4-connected foreground components of a mask.
///
/// Returns (labels, count); labels are 1-based, 0 = background.
pub fn label_components(mask: &Array2<bool>) -> (Array2<u32>, usize) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::zeros((rows, cols));
    let mut next = 0u32;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            if !mask[[r, c]] || labels[[r, c]] != 0 {
                continue;
            }
            next += 1;
            labels[[r, c]] = next;
            stack.push((r, c));
            while let Some((pr, pc)) = stack.pop() {
                let mut visit = |nr: usize, nc: usize, labels: &mut Array2<u32>| {
                    if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                        labels[[nr, nc]] = next;
                        stack.push((nr, nc));
                    }
                };
                if pr > 0 {
                    visit(pr - 1, pc, &mut labels);
                }
                if pr + 1 < rows {
                    visit(pr + 1, pc, &mut labels);
                }
                if pc > 0 {
                    visit(pr, pc - 1, &mut labels);
                }
                if pc + 1 < cols {
                    visit(pr, pc + 1, &mut labels);
                }
            }
        }
    }

    (labels, next as usize)
}

/// Keep only the largest 4-connected component of a mask.
///
/// Ties go to the lowest label (first in scan order). An empty mask is
/// returned unchanged.
pub fn largest_component(mask: &Array2<bool>) -> Array2<bool> {
    let (labels, count) = label_components(mask);
    if count == 0 {
        return mask.clone();
    }

    let mut sizes = vec![0usize; count + 1];
    for &l in labels.iter() {
        sizes[l as usize] += 1;
    }
    sizes[0] = 0;
    let mut best = 1u32;
    for l in 2..=count as u32 {
        if sizes[l as usize] > sizes[best as usize] {
            best = l;
        }
    }

    labels.mapv(|l| l == best)
}

/// Split a mask into one mask per 4-connected component, in scan order.
pub fn split_components(mask: &Array2<bool>) -> Vec<Array2<bool>> {
    let (labels, count) = label_components(mask);
    (1..=count as u32)
        .map(|target| labels.mapv(|l| l == target))
        .collect()
}
