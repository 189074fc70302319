//! Axis-aligned bounding boxes.

use serde::{Deserialize, Serialize};

/// Axis-aligned box stored as center + half-size, matching how engines report renderer bounds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: [f32; 3],
    pub extents: [f32; 3],
}

impl Bounds {
    pub fn new(center: [f32; 3], extents: [f32; 3]) -> Self {
        Self { center, extents }
    }

    pub fn from_min_max(min: [f32; 3], max: [f32; 3]) -> Self {
        let mut center = [0.0; 3];
        let mut extents = [0.0; 3];
        for i in 0..3 {
            center[i] = (min[i] + max[i]) * 0.5;
            extents[i] = (max[i] - min[i]) * 0.5;
        }
        Self { center, extents }
    }

    #[inline]
    pub fn min(&self) -> [f32; 3] {
        [
            self.center[0] - self.extents[0],
            self.center[1] - self.extents[1],
            self.center[2] - self.extents[2],
        ]
    }

    #[inline]
    pub fn max(&self) -> [f32; 3] {
        [
            self.center[0] + self.extents[0],
            self.center[1] + self.extents[1],
            self.center[2] + self.extents[2],
        ]
    }

    /// Full edge lengths (twice the extents).
    #[inline]
    pub fn size(&self) -> [f32; 3] {
        [
            self.extents[0] * 2.0,
            self.extents[1] * 2.0,
            self.extents[2] * 2.0,
        ]
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for i in 0..3 {
            min[i] = a_min[i].min(b_min[i]);
            max[i] = a_max[i].max(b_max[i]);
        }
        Bounds::from_min_max(min, max)
    }

    /// Per-axis maximum of the maxima and minimum of the minima across all boxes.
    /// Returns `None` for an empty iterator.
    pub fn union_all<I>(boxes: I) -> Option<Bounds>
    where
        I: IntoIterator<Item = Bounds>,
    {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }
}
