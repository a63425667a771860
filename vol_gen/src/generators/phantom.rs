/*
    vol_gen
    Author: Michal Majer
    Date: 2022-05-05
*/

use nalgebra::{vector, Vector3};

use super::SampleGenerator;

// Hounsfield units
const AIR: f32 = -1000.0;
const LUNG: f32 = -800.0;
const SOFT_TISSUE: f32 = 40.0;
const BONE: f32 = 700.0;

/// Chest-like CT phantom
/// Elliptic body with two lungs and a spine, samples in Hounsfield units.
/// Intended for `i16` output.
pub struct PhantomGenerator {
    dims: Vector3<f32>,
}

impl PhantomGenerator {
    pub fn new(dims: Vector3<u32>) -> PhantomGenerator {
        PhantomGenerator {
            dims: dims.cast::<f32>(),
        }
    }

    // Coordinates mapped to [-1, 1] on every axis
    fn normalized(&self, coords: Vector3<u32>) -> Vector3<f32> {
        let c = coords.cast::<f32>() + vector![0.5, 0.5, 0.5];
        c.component_div(&self.dims) * 2.0 - vector![1.0, 1.0, 1.0]
    }
}

fn in_ellipse(x: f32, y: f32, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
    let dx = (x - cx) / rx;
    let dy = (y - cy) / ry;
    dx * dx + dy * dy <= 1.0
}

impl SampleGenerator for PhantomGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> f32 {
        let p = self.normalized(coords);

        // Body does not touch the top and bottom slices
        if p.z.abs() > 0.9 || !in_ellipse(p.x, p.y, 0.0, 0.0, 0.85, 0.6) {
            return AIR;
        }
        if in_ellipse(p.x, p.y, 0.0, 0.4, 0.12, 0.12) {
            return BONE;
        }
        if in_ellipse(p.x, p.y, -0.4, 0.0, 0.28, 0.4) || in_ellipse(p.x, p.y, 0.4, 0.0, 0.28, 0.4) {
            return LUNG;
        }
        SOFT_TISSUE
    }
}
