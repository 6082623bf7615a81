//! Image channels and component reduction.
//!
//! A [`Channel`] is one immutable fluorophore plane of a scene: either a 2D
//! grayscale array or a 3D array with 3–4 color components per pixel.
//! Multi-component data is collapsed to a single working plane by per-pixel
//! maximum across components — never by a perceptual-luminance weighted
//! average, which would attenuate fluorescence signal that happens to sit in
//! a dim display component. A [`ComponentMap`] can narrow the reduction to
//! the components a named fluorophore is actually mapped to.

use ndarray::{Array2, Array3, ArrayView3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::float_trait::QuantFloat;

/// Dtype class of the acquisition the channel was loaded from.
///
/// Data is held as f32 working precision regardless; the depth is kept so
/// callers can reason about the original dynamic range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    U8,
    U16,
    F32,
}

/// Pixel storage for one channel.
#[derive(Debug, Clone)]
pub enum ChannelData {
    /// 2D grayscale plane, H×W.
    Plane(Array2<f32>),
    /// 3D multi-component data, H×W×C with C in {3, 4}.
    Components(Array3<f32>),
}

/// One immutable image channel with a logical fluorophore name.
///
/// Channels belonging to one scene share identical H×W.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    depth: BitDepth,
    data: ChannelData,
}

/// Channel-name → component-index table.
///
/// Maps a fluorophore name to the components of its multi-component data
/// that actually carry its signal (e.g. a "GFP" channel rendered into the
/// green component only). Channels without an entry reduce over all
/// components.
#[derive(Debug, Clone, Default)]
pub struct ComponentMap {
    entries: FxHashMap<String, Vec<usize>>,
}

impl ComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the component indices for a channel name.
    pub fn insert(&mut self, name: impl Into<String>, components: Vec<usize>) {
        self.entries.insert(name.into(), components);
    }

    pub fn get(&self, name: &str) -> Option<&[usize]> {
        self.entries.get(name).map(Vec::as_slice)
    }
}

impl Channel {
    /// Build a channel from an 8-bit grayscale plane.
    pub fn from_u8(name: impl Into<String>, plane: Array2<u8>) -> Self {
        Self {
            name: name.into(),
            depth: BitDepth::U8,
            data: ChannelData::Plane(plane.mapv(f32::from)),
        }
    }

    /// Build a channel from a 16-bit grayscale plane.
    pub fn from_u16(name: impl Into<String>, plane: Array2<u16>) -> Self {
        Self {
            name: name.into(),
            depth: BitDepth::U16,
            data: ChannelData::Plane(plane.mapv(f32::from)),
        }
    }

    /// Build a channel from a float grayscale plane.
    pub fn from_f32(name: impl Into<String>, plane: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            depth: BitDepth::F32,
            data: ChannelData::Plane(plane),
        }
    }

    /// Build a channel from multi-component data (H×W×C).
    pub fn from_components(name: impl Into<String>, depth: BitDepth, data: Array3<f32>) -> Self {
        Self {
            name: name.into(),
            depth,
            data: ChannelData::Components(data),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn data(&self) -> &ChannelData {
        &self.data
    }

    /// Spatial shape (H, W) of the channel.
    pub fn shape(&self) -> (usize, usize) {
        match &self.data {
            ChannelData::Plane(p) => p.dim(),
            ChannelData::Components(c) => {
                let (h, w, _) = c.dim();
                (h, w)
            }
        }
    }

    /// Collapse the channel to a single H×W intensity plane.
    ///
    /// 2D data is returned as-is. Multi-component data is reduced by
    /// per-pixel maximum across components; if `map` names this channel with
    /// in-range component indices, only those components participate.
    pub fn working_plane(&self, map: Option<&ComponentMap>) -> Array2<f32> {
        match &self.data {
            ChannelData::Plane(p) => p.clone(),
            ChannelData::Components(c) => {
                let mapped = map.and_then(|m| m.get(&self.name));
                reduce_components(c.view(), mapped)
            }
        }
    }
}

/// Per-pixel maximum across the selected components of an H×W×C array.
///
/// `indices` narrows the reduction; indices outside the component axis are
/// ignored, and an empty/absent selection falls back to all components.
pub fn reduce_components<F: QuantFloat>(
    data: ArrayView3<F>,
    indices: Option<&[usize]>,
) -> Array2<F> {
    let (h, w, c) = data.dim();
    let selected: Vec<usize> = match indices {
        Some(idx) => {
            let valid: Vec<usize> = idx.iter().copied().filter(|&i| i < c).collect();
            if valid.is_empty() {
                (0..c).collect()
            } else {
                valid
            }
        }
        None => (0..c).collect(),
    };

    let mut out = Array2::from_elem((h, w), F::neg_infinity());
    for &comp in &selected {
        for r in 0..h {
            for col in 0..w {
                let v = data[[r, col, comp]];
                if v > out[[r, col]] {
                    out[[r, col]] = v;
                }
            }
        }
    }
    if c == 0 {
        out.fill(F::zero());
    }
    out
}
