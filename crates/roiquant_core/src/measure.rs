//! Per-ROI, per-channel intensity measurement.
//!
//! Each measurement rasterizes the ROI once per distinct channel shape,
//! extracts mean/integrated-density/min/max over the masked pixels, and
//! optionally subtracts a local background estimated from an annulus just
//! outside the region. Batches run one task per ROI on a bounded worker
//! pool over cloned snapshots; channel arrays are only ever read.
//!
//! Nothing here is fatal: degenerate ROIs produce zeroed records, shape
//! mismatches fall back to a resized mask with a logged warning, and a
//! mid-drag ROI short-circuits to an area-only stub.

use ndarray::Array2;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::{Channel, ComponentMap};
use crate::codec::rasterize;
use crate::roi::Roi;

// =============================================================================
// Constants
// =============================================================================

/// Upper bound on the batch worker pool size.
const MAX_MEASURE_THREADS: usize = 8;

/// Default annulus width (pixels) for local-ring background estimation.
const DEFAULT_RING_WIDTH: usize = 5;

// =============================================================================
// Options and result records
// =============================================================================

/// Background correction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundMethod {
    /// No correction; the corrected mean equals the raw mean.
    #[default]
    None,
    /// Average intensity of an annulus `ring_width` pixels wide just
    /// outside the region.
    LocalRing,
}

/// Parameters for one measurement pass.
#[derive(Debug, Clone)]
pub struct MeasureOptions {
    /// Physical pixel edge length (e.g. µm/pixel).
    pub pixel_size: f64,
    pub background: BackgroundMethod,
    /// Annulus width for [`BackgroundMethod::LocalRing`].
    pub ring_width: usize,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            pixel_size: 1.0,
            background: BackgroundMethod::None,
            ring_width: DEFAULT_RING_WIDTH,
        }
    }
}

impl MeasureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the option values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.pixel_size.is_finite() || self.pixel_size <= 0.0 {
            return Err("pixel_size must be > 0".to_string());
        }
        if self.background == BackgroundMethod::LocalRing && self.ring_width == 0 {
            return Err("ring_width must be >= 1 for local ring background".to_string());
        }
        Ok(())
    }

    /// Copy with invalid fields clamped to usable values.
    fn sanitized(&self) -> Self {
        let mut opts = self.clone();
        if let Err(msg) = self.validate() {
            log::warn!("measure: invalid options ({msg}); clamping");
            if !opts.pixel_size.is_finite() || opts.pixel_size <= 0.0 {
                opts.pixel_size = 1.0;
            }
            opts.ring_width = opts.ring_width.max(1);
        }
        opts
    }
}

/// Intensity statistics for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    /// Sum of masked intensities.
    pub integrated_density: f64,
    pub min: f64,
    pub max: f64,
    pub background_mean: f64,
    pub background_corrected_mean: f64,
}

/// One ROI's measurement result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiMeasurement {
    pub roi_id: Uuid,
    pub label: String,
    /// Region size in pixels.
    pub area_px: f64,
    /// Region size in physical units: `area_px * pixel_size²`.
    pub area_physical: f64,
    /// True when the ROI was mid-drag and only the area was computed.
    pub stub: bool,
    pub channels: Vec<(String, ChannelStats)>,
}

impl RoiMeasurement {
    /// Area-only record for ROIs skipped during interactive dragging.
    pub fn stub(roi_id: Uuid, label: impl Into<String>, area_px: f64, area_physical: f64) -> Self {
        Self {
            roi_id,
            label: label.into(),
            area_px,
            area_physical,
            stub: true,
            channels: Vec::new(),
        }
    }

    /// Flatten into the string-keyed dictionary consumed across the
    /// presentation boundary.
    pub fn to_map(&self) -> FxHashMap<String, f64> {
        let mut map = FxHashMap::default();
        map.insert("area_px".to_string(), self.area_px);
        map.insert("area".to_string(), self.area_physical);
        for (name, stats) in &self.channels {
            map.insert(format!("{name}.mean"), stats.mean);
            map.insert(format!("{name}.integrated_density"), stats.integrated_density);
            map.insert(format!("{name}.min"), stats.min);
            map.insert(format!("{name}.max"), stats.max);
            map.insert(format!("{name}.background_mean"), stats.background_mean);
            map.insert(
                format!("{name}.background_corrected_mean"),
                stats.background_corrected_mean,
            );
        }
        map
    }
}

// =============================================================================
// Single-ROI measurement
// =============================================================================

/// Measure one ROI against a channel list.
///
/// A dragging ROI returns an area-only stub. Masks are rasterized once per
/// distinct channel shape; a shape whose rasterization is empty while
/// another shape's is not falls back to a nearest-neighbor resize of that
/// reference mask rather than failing the measurement.
pub fn measure(
    roi: &Roi,
    channels: &[Channel],
    map: Option<&ComponentMap>,
    opts: &MeasureOptions,
) -> RoiMeasurement {
    let opts = opts.sanitized();
    let ps2 = opts.pixel_size * opts.pixel_size;

    if roi.dragging {
        let area = roi.area();
        return RoiMeasurement::stub(roi.id(), roi.label.clone(), area, area * ps2);
    }

    let mut masks: FxHashMap<(usize, usize), Array2<bool>> = FxHashMap::default();
    let mut annuli: FxHashMap<(usize, usize), Array2<bool>> = FxHashMap::default();
    let mut reference_shape: Option<(usize, usize)> = None;
    let mut area_px: Option<f64> = None;
    let mut out = Vec::with_capacity(channels.len());

    for ch in channels {
        let shape = ch.shape();
        if !masks.contains_key(&shape) {
            let mut mask = rasterize(roi.rings(), shape);
            let count = mask.iter().filter(|&&v| v).count();
            if count == 0 {
                if let Some(ref_shape) = reference_shape {
                    log::warn!(
                        "measure: empty mask for shape {:?} on roi {}; resizing {:?} mask",
                        shape,
                        roi.id(),
                        ref_shape
                    );
                    mask = resize_nearest(&masks[&ref_shape], shape);
                }
            } else if reference_shape.is_none() {
                reference_shape = Some(shape);
            }
            masks.insert(shape, mask);
        }
        let mask = &masks[&shape];
        if area_px.is_none() {
            area_px = Some(mask.iter().filter(|&&v| v).count() as f64);
        }

        let plane = ch.working_plane(map);
        let stats = masked_stats(&plane, mask);
        let (background_mean, corrected) = match opts.background {
            BackgroundMethod::None => (0.0, stats.0),
            BackgroundMethod::LocalRing => {
                let annulus = annuli
                    .entry(shape)
                    .or_insert_with(|| ring_annulus(mask, opts.ring_width));
                let bg = masked_stats(&plane, annulus).0;
                (bg, stats.0 - bg)
            }
        };

        out.push((
            ch.name().to_string(),
            ChannelStats {
                mean: stats.0,
                integrated_density: stats.1,
                min: stats.2,
                max: stats.3,
                background_mean,
                background_corrected_mean: corrected,
            },
        ));
    }

    let area_px = area_px.unwrap_or_else(|| roi.area());
    RoiMeasurement {
        roi_id: roi.id(),
        label: roi.label.clone(),
        area_px,
        area_physical: area_px * ps2,
        stub: false,
        channels: out,
    }
}

/// (mean, sum, min, max) over the masked pixels; all zeros when the mask is
/// empty or its shape disagrees with the plane.
fn masked_stats(plane: &Array2<f32>, mask: &Array2<bool>) -> (f64, f64, f64, f64) {
    if plane.dim() != mask.dim() {
        log::warn!(
            "measure: plane shape {:?} does not match mask shape {:?}",
            plane.dim(),
            mask.dim()
        );
        return (0.0, 0.0, 0.0, 0.0);
    }
    let mut sum = 0.0f64;
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (&v, &m) in plane.iter().zip(mask.iter()) {
        if m {
            let v = v as f64;
            sum += v;
            count += 1;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
    }
    if count == 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    (sum / count as f64, sum, min, max)
}

/// Annulus formed by dilating the mask with a disk of radius `width` and
/// subtracting the original region.
fn ring_annulus(mask: &Array2<bool>, width: usize) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    let r = width as isize;
    let mut offsets: Vec<(isize, isize)> = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                offsets.push((dy, dx));
            }
        }
    }

    let mut dilated = Array2::from_elem((rows, cols), false);
    for row in 0..rows {
        for col in 0..cols {
            if !mask[[row, col]] {
                continue;
            }
            for &(dy, dx) in &offsets {
                let nr = row as isize + dy;
                let nc = col as isize + dx;
                if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                    dilated[[nr as usize, nc as usize]] = true;
                }
            }
        }
    }

    for (d, &m) in dilated.iter_mut().zip(mask.iter()) {
        if m {
            *d = false;
        }
    }
    dilated
}

/// Nearest-neighbor mask resize; the last-resort shape fallback.
fn resize_nearest(src: &Array2<bool>, shape: (usize, usize)) -> Array2<bool> {
    let (sh, sw) = src.dim();
    let (dh, dw) = shape;
    if sh == 0 || sw == 0 || dh == 0 || dw == 0 {
        return Array2::from_elem(shape, false);
    }
    Array2::from_shape_fn(shape, |(r, c)| {
        let sr = (r * sh / dh).min(sh - 1);
        let sc = (c * sw / dw).min(sw - 1);
        src[[sr, sc]]
    })
}

// =============================================================================
// Batch measurement
// =============================================================================

/// Measure every measurable ROI, one bounded worker-pool task each.
///
/// ROIs are snapshotted before dispatch; each task reads the shared
/// immutable channels and writes only its own record. Results come back in
/// the order the measurable ROIs appeared in `rois`.
pub fn measure_batch(
    rois: &[Roi],
    channels: &[Channel],
    map: Option<&ComponentMap>,
    opts: &MeasureOptions,
) -> Vec<RoiMeasurement> {
    let snapshots: Vec<Roi> = rois.iter().filter(|r| r.measurable).cloned().collect();
    if snapshots.is_empty() {
        return Vec::new();
    }

    let threads = snapshots.len().min(MAX_MEASURE_THREADS);
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| {
            snapshots
                .par_iter()
                .map(|roi| measure(roi, channels, map, opts))
                .collect()
        }),
        Err(err) => {
            log::warn!("measure_batch: worker pool unavailable ({err}); running serially");
            snapshots
                .iter()
                .map(|roi| measure(roi, channels, map, opts))
                .collect()
        }
    }
}
