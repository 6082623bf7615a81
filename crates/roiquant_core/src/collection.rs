//! Single-owner ROI collection for one scene.
//!
//! All mutation flows through the collection's add/remove/replace methods,
//! each of which hands back the displaced value so callers can build undo
//! stacks from plain return values — there is no implicit event bus.
//! Batch measurement takes cloned snapshots, never live references.

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::clip::{Point2, Ring};
use crate::roi::Roi;

/// Geometry displaced by a replace operation; enough to undo it.
#[derive(Debug, Clone)]
pub struct RoiGeometry {
    pub points: Vec<Point2>,
    pub rings: Vec<Ring>,
}

/// Owning collection of the ROIs of one scene.
#[derive(Debug, Default)]
pub struct RoiCollection {
    rois: Vec<Roi>,
    index: FxHashMap<Uuid, usize>,
}

impl RoiCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    /// Insert an ROI, replacing any existing ROI with the same id.
    ///
    /// Returns the id, plus the previous ROI when one was replaced.
    pub fn add(&mut self, roi: Roi) -> (Uuid, Option<Roi>) {
        let id = roi.id();
        match self.index.get(&id) {
            Some(&pos) => {
                let previous = std::mem::replace(&mut self.rois[pos], roi);
                (id, Some(previous))
            }
            None => {
                self.index.insert(id, self.rois.len());
                self.rois.push(roi);
                (id, None)
            }
        }
    }

    /// Remove an ROI by id, returning it for undo.
    pub fn remove(&mut self, id: Uuid) -> Option<Roi> {
        let pos = self.index.remove(&id)?;
        let removed = self.rois.swap_remove(pos);
        if pos < self.rois.len() {
            self.index.insert(self.rois[pos].id(), pos);
        }
        Some(removed)
    }

    /// Replace an ROI's geometry in place, returning the previous geometry.
    ///
    /// The ROI keeps its id and metadata; its path is rebuilt from the new
    /// control points unless `rings` is given, in which case the rings are
    /// taken verbatim (wand geometry). Cached stats are invalidated either
    /// way.
    pub fn replace_geometry(
        &mut self,
        id: Uuid,
        points: Vec<Point2>,
        rings: Option<Vec<Ring>>,
    ) -> Option<RoiGeometry> {
        let roi = self.get_mut(id)?;
        let previous = RoiGeometry {
            points: roi.points().to_vec(),
            rings: roi.rings().to_vec(),
        };
        roi.set_points(points);
        if let Some(rings) = rings {
            roi.set_rings(rings);
        }
        Some(previous)
    }

    pub fn get(&self, id: Uuid) -> Option<&Roi> {
        self.index.get(&id).map(|&pos| &self.rois[pos])
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Roi> {
        let pos = *self.index.get(&id)?;
        self.rois.get_mut(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Roi> {
        self.rois.iter()
    }

    /// Cloned snapshots of every ROI, in insertion order, for dispatching
    /// to a measurement batch without aliasing live geometry.
    pub fn snapshot(&self) -> Vec<Roi> {
        self.rois.clone()
    }
}
