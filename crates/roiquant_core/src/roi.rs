//! ROI entity: typed vector geometry plus measurement metadata.
//!
//! An ROI's geometry is an ordered set of closed polygon rings in
//! full-resolution image coordinates; regular shapes additionally keep the
//! raw control points they were drawn from, and line-like kinds keep an
//! explicit two-point segment. Path reconstruction is a pure function of
//! `(kind, points, properties)`, so rebuilding is idempotent and persisted
//! ROIs reload deterministically.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::clip::{path_area, Point2, Ring};
use crate::codec::catmull_rom_closed;
use crate::measure::RoiMeasurement;

// =============================================================================
// Constants
// =============================================================================

/// Vertex count for the sampled ellipse outline.
const ELLIPSE_VERTEX_COUNT: usize = 64;

/// Vertex count for the point-kind symbol circle.
const POINT_SYMBOL_VERTEX_COUNT: usize = 16;

/// Symbol radius (pixels) for point ROIs without a `"radius"` property.
const DEFAULT_POINT_RADIUS: f64 = 6.0;

/// Spline samples per segment for spline-smoothed polygons.
const POLYGON_SPLINE_SAMPLES: usize = 8;

/// Property key enabling Catmull-Rom sampling of a polygon ROI.
pub const PROP_SPLINE: &str = "spline";

/// Property key holding the point-kind symbol radius.
pub const PROP_RADIUS: &str = "radius";

// =============================================================================
// Kind
// =============================================================================

/// Closed set of ROI kinds. The kind selects how raw control points
/// reconstruct the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiKind {
    Rectangle,
    Ellipse,
    Polygon,
    Line,
    Point,
    Arrow,
    Text,
    /// Free-form geometry derived from a segmentation mask; its rings are
    /// authoritative and never rebuilt from control points.
    Wand,
}

impl RoiKind {
    /// Whether ROIs of this kind take part in intensity measurement by
    /// default. Line scans, annotations and point markers are excluded.
    pub fn default_measurable(self) -> bool {
        !matches!(
            self,
            RoiKind::Line | RoiKind::Arrow | RoiKind::Text | RoiKind::Point
        )
    }
}

// =============================================================================
// Entity
// =============================================================================

/// One region of interest.
#[derive(Debug, Clone)]
pub struct Roi {
    id: Uuid,
    pub label: String,
    pub color: [u8; 3],
    kind: RoiKind,
    points: Vec<Point2>,
    rings: Vec<Ring>,
    line_points: Option<[Point2; 2]>,
    pub measurable: bool,
    pub export_visible: bool,
    /// Set while the user is actively manipulating the ROI; measurement
    /// short-circuits to a stub until it clears.
    pub dragging: bool,
    pub properties: FxHashMap<String, String>,
    stats: Option<Arc<RoiMeasurement>>,
}

impl Roi {
    /// Create an ROI from raw control points and reconstruct its path.
    pub fn new(kind: RoiKind, points: Vec<Point2>) -> Self {
        let mut roi = Self {
            id: Uuid::new_v4(),
            label: String::new(),
            color: [255, 255, 0],
            kind,
            points,
            rings: Vec::new(),
            line_points: None,
            measurable: kind.default_measurable(),
            export_visible: true,
            dragging: false,
            properties: FxHashMap::default(),
            stats: None,
        };
        roi.rebuild_path();
        roi
    }

    /// Create a wand ROI directly from vectorized rings.
    pub fn from_rings(rings: Vec<Ring>) -> Self {
        let mut roi = Self::new(RoiKind::Wand, Vec::new());
        roi.rings = rings;
        roi
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> RoiKind {
        self.kind
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn line_points(&self) -> Option<&[Point2; 2]> {
        self.line_points.as_ref()
    }

    /// Polygon area of the current path, in square pixels.
    pub fn area(&self) -> f64 {
        path_area(&self.rings)
    }

    pub fn stats(&self) -> Option<&Arc<RoiMeasurement>> {
        self.stats.as_ref()
    }

    /// Attach a computed measurement to the ROI's stats cache.
    pub fn set_stats(&mut self, stats: Arc<RoiMeasurement>) {
        self.stats = Some(stats);
    }

    pub fn clear_stats(&mut self) {
        self.stats = None;
    }

    /// Replace the raw control points and rebuild the path.
    pub fn set_points(&mut self, points: Vec<Point2>) {
        self.points = points;
        self.rebuild_path();
    }

    /// Replace the rings directly (wand geometry). Invalidates cached stats.
    pub fn set_rings(&mut self, rings: Vec<Ring>) {
        self.rings = rings;
        self.stats = None;
    }

    /// Translate the whole geometry by (dx, dy).
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for p in self.points.iter_mut() {
            p[0] += dx;
            p[1] += dy;
        }
        for ring in self.rings.iter_mut() {
            for p in ring.iter_mut() {
                p[0] += dx;
                p[1] += dy;
            }
        }
        if let Some(lp) = self.line_points.as_mut() {
            for p in lp.iter_mut() {
                p[0] += dx;
                p[1] += dy;
            }
        }
        self.stats = None;
    }

    /// Rebuild rings/line points from the kind and control points.
    ///
    /// Wand geometry keeps its rings untouched. Cached stats are
    /// invalidated.
    pub fn rebuild_path(&mut self) {
        if self.kind != RoiKind::Wand {
            let (rings, line) = reconstruct_path(self.kind, &self.points, &self.properties);
            self.rings = rings;
            self.line_points = line;
        }
        self.stats = None;
    }

    /// Export the persistence record for this ROI.
    pub fn to_record(&self) -> RoiRecord {
        RoiRecord {
            id: self.id,
            label: self.label.clone(),
            kind: self.kind,
            color: self.color,
            points: self.points.clone(),
            rings: self.rings.clone(),
            line_points: self.line_points,
            measurable: self.measurable,
            export_visible: self.export_visible,
            properties: self.properties.clone(),
            stats: self
                .stats
                .as_ref()
                .map(|s| s.to_map())
                .unwrap_or_default(),
        }
    }

    /// Rebuild an ROI from its persistence record.
    ///
    /// Non-empty `rings` are taken verbatim (they are authoritative for
    /// wand geometry); otherwise the path is reconstructed from
    /// `kind` + `points`. Cached stats always start cold.
    pub fn from_record(rec: RoiRecord) -> Self {
        let mut roi = Self {
            id: rec.id,
            label: rec.label,
            color: rec.color,
            kind: rec.kind,
            points: rec.points,
            rings: Vec::new(),
            line_points: rec.line_points,
            measurable: rec.measurable,
            export_visible: rec.export_visible,
            dragging: false,
            properties: rec.properties,
            stats: None,
        };
        if !rec.rings.is_empty() {
            roi.rings = rec.rings;
        } else {
            roi.rebuild_path();
        }
        roi
    }
}

// =============================================================================
// Path reconstruction
// =============================================================================

/// Reconstruct rings and line points for a kind from its control points.
///
/// Pure: the same inputs always produce the same output.
pub fn reconstruct_path(
    kind: RoiKind,
    points: &[Point2],
    properties: &FxHashMap<String, String>,
) -> (Vec<Ring>, Option<[Point2; 2]>) {
    match kind {
        RoiKind::Rectangle => {
            let Some((min, max)) = bounding_box(points) else {
                return (Vec::new(), None);
            };
            let ring = vec![
                [min[0], min[1]],
                [max[0], min[1]],
                [max[0], max[1]],
                [min[0], max[1]],
            ];
            (vec![ring], None)
        }
        RoiKind::Ellipse => {
            let Some((min, max)) = bounding_box(points) else {
                return (Vec::new(), None);
            };
            let cx = (min[0] + max[0]) / 2.0;
            let cy = (min[1] + max[1]) / 2.0;
            let rx = (max[0] - min[0]) / 2.0;
            let ry = (max[1] - min[1]) / 2.0;
            (vec![sample_circle(cx, cy, rx, ry, ELLIPSE_VERTEX_COUNT)], None)
        }
        RoiKind::Polygon => {
            if points.len() < 3 {
                return (Vec::new(), None);
            }
            let ring = points.to_vec();
            let ring = if properties.contains_key(PROP_SPLINE) {
                catmull_rom_closed(&ring, POLYGON_SPLINE_SAMPLES)
            } else {
                ring
            };
            (vec![ring], None)
        }
        RoiKind::Line | RoiKind::Arrow => {
            if points.len() < 2 {
                return (Vec::new(), None);
            }
            (Vec::new(), Some([points[0], points[1]]))
        }
        RoiKind::Point => {
            let Some(&center) = points.first() else {
                return (Vec::new(), None);
            };
            let radius = properties
                .get(PROP_RADIUS)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|r| r.is_finite() && *r > 0.0)
                .unwrap_or(DEFAULT_POINT_RADIUS);
            (
                vec![sample_circle(
                    center[0],
                    center[1],
                    radius,
                    radius,
                    POINT_SYMBOL_VERTEX_COUNT,
                )],
                None,
            )
        }
        RoiKind::Text => (Vec::new(), None),
        // Wand rings are authoritative; nothing to rebuild from points.
        RoiKind::Wand => (Vec::new(), None),
    }
}

/// Two-point bounding box: (min corner, max corner). Needs two points.
fn bounding_box(points: &[Point2]) -> Option<(Point2, Point2)> {
    if points.len() < 2 {
        return None;
    }
    let a = points[0];
    let b = points[1];
    Some((
        [a[0].min(b[0]), a[1].min(b[1])],
        [a[0].max(b[0]), a[1].max(b[1])],
    ))
}

fn sample_circle(cx: f64, cy: f64, rx: f64, ry: f64, count: usize) -> Ring {
    (0..count)
        .map(|k| {
            let theta = 2.0 * std::f64::consts::PI * k as f64 / count as f64;
            [cx + rx * theta.cos(), cy + ry * theta.sin()]
        })
        .collect()
}

// =============================================================================
// Persistence record
// =============================================================================

/// Minimal round-trippable geometry record, format-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiRecord {
    pub id: Uuid,
    pub label: String,
    pub kind: RoiKind,
    pub color: [u8; 3],
    pub points: Vec<Point2>,
    pub rings: Vec<Ring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_points: Option<[Point2; 2]>,
    pub measurable: bool,
    pub export_visible: bool,
    #[serde(default)]
    pub properties: FxHashMap<String, String>,
    #[serde(default)]
    pub stats: FxHashMap<String, f64>,
}
