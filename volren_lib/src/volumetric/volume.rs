use nalgebra::{vector, Point3, Vector3};

use super::parse::StructuredGrid;
use crate::{
    common::{BoundBox, Ray, ValueRange},
    error::{Error, Result},
};

/// Scalar field sampled on a regular grid.
/// Volume is axis aligned, positions are in world coordinates.
pub trait Volume {
    /// Number of samples along each axis
    fn get_size(&self) -> Vector3<usize>;

    /// World distance between neighbouring samples
    fn get_spacing(&self) -> Vector3<f32>;

    fn get_bound_box(&self) -> BoundBox;

    /// Min and max of all samples
    fn get_scalar_range(&self) -> ValueRange;

    /// Sample stored at grid index, `None` outside the grid
    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32>;

    /// Trilinear interpolation, positions outside are clamped to the border
    fn sample_at(&self, pos: Point3<f32>) -> f32;

    /// Value of the nearest grid sample
    fn sample_nearest(&self, pos: Point3<f32>) -> f32;

    // position is inside volume
    fn is_in(&self, pos: &Point3<f32>) -> bool {
        self.get_bound_box().contains(pos)
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        self.get_bound_box().intersect(ray)
    }
}

/// Volume keeping all samples in memory as `f32`.
pub struct ScalarVolume {
    bound_box: BoundBox,
    size: Vector3<usize>,
    spacing: Vector3<f32>,
    range: ValueRange,
    name: String,
    data: Vec<f32>,
}

impl std::fmt::Debug for ScalarVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarVolume")
            .field("name", &self.name)
            .field("box", &self.bound_box)
            .field("size", &self.size)
            .field("spacing", &self.spacing)
            .field("range", &self.range)
            .field("data len", &self.data.len())
            .finish()
    }
}

impl ScalarVolume {
    /// Builds volume from raw samples in x fastest order.
    pub fn new(
        size: Vector3<usize>,
        spacing: Vector3<f32>,
        origin: Point3<f32>,
        name: impl Into<String>,
        data: Vec<f32>,
    ) -> Result<ScalarVolume> {
        if size.iter().any(|&d| d == 0) {
            return Err(Error::data_format(format!("zero dimension in {size:?}")));
        }
        if spacing.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(Error::data_format(format!(
                "spacing must be positive, got {spacing:?}"
            )));
        }
        let expected = size.x * size.y * size.z;
        if data.len() != expected {
            return Err(Error::data_format(format!(
                "expected {expected} samples, got {}",
                data.len()
            )));
        }

        let vol_dims = size.map(|v| (v - 1) as f32).component_mul(&spacing);
        let bound_box = BoundBox::from_position_dims(origin, vol_dims);
        let range = ValueRange::from_samples(data.iter().copied());
        let name = name.into();

        tracing::debug!(
            "New volume '{name}', size {size:?} spacing {spacing:?} range {range:?}"
        );

        Ok(ScalarVolume {
            bound_box,
            size,
            spacing,
            range,
            name,
            data,
        })
    }

    /// Picks array `array` (first array if `None`) from a parsed grid
    pub fn from_grid(grid: StructuredGrid, array: Option<&str>) -> Result<ScalarVolume> {
        let StructuredGrid {
            dims,
            spacing,
            origin,
            arrays,
        } = grid;

        let picked = match array {
            Some(name) => arrays.into_iter().find(|a| a.name == name).ok_or_else(|| {
                Error::data_format(format!("no scalar array named '{name}'"))
            })?,
            None => arrays
                .into_iter()
                .next()
                .ok_or_else(|| Error::data_format("no scalar arrays"))?,
        };

        ScalarVolume::new(dims, spacing, origin, picked.name, picked.values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> Vector3<usize> {
        self.size
    }

    pub fn spacing(&self) -> Vector3<f32> {
        self.spacing
    }

    pub fn origin(&self) -> Point3<f32> {
        self.bound_box.lower
    }

    pub fn scalar_range(&self) -> ValueRange {
        self.range
    }

    /// Grid sample, index is clamped into the grid
    pub fn sample(&self, x: usize, y: usize, z: usize) -> f32 {
        let x = x.min(self.size.x - 1);
        let y = y.min(self.size.y - 1);
        let z = z.min(self.size.z - 1);
        self.data[self.get_3d_index(x, y, z)]
    }

    /// Default opacity unit distance, `diagonal / max(dims)`
    pub fn unit_distance(&self) -> f32 {
        let max_dim = self.size.max() as f32;
        self.bound_box.diagonal() / max_dim
    }

    fn get_3d_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size.x * (y + self.size.y * z)
    }

    /// Continuous grid coordinates of world position, clamped to the grid
    fn to_grid(&self, pos: Point3<f32>) -> Vector3<f32> {
        let rel = (pos - self.bound_box.lower).component_div(&self.spacing);
        let max = self.size.map(|v| (v - 1) as f32);
        vector![
            rel.x.clamp(0.0, max.x),
            rel.y.clamp(0.0, max.y),
            rel.z.clamp(0.0, max.z)
        ]
    }
}

impl Volume for ScalarVolume {
    fn get_size(&self) -> Vector3<usize> {
        self.size
    }

    fn get_spacing(&self) -> Vector3<f32> {
        self.spacing
    }

    fn get_bound_box(&self) -> BoundBox {
        self.bound_box
    }

    fn get_scalar_range(&self) -> ValueRange {
        self.range
    }

    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return None;
        }
        self.data.get(self.get_3d_index(x, y, z)).copied()
    }

    fn sample_at(&self, pos: Point3<f32>) -> f32 {
        let g = self.to_grid(pos);

        let x0 = g.x as usize;
        let y0 = g.y as usize;
        let z0 = g.z as usize;

        let x1 = (x0 + 1).min(self.size.x - 1);
        let y1 = (y0 + 1).min(self.size.y - 1);
        let z1 = (z0 + 1).min(self.size.z - 1);

        let x_t = g.x - x0 as f32;
        let y_t = g.y - y0 as f32;
        let z_t = g.z - z0 as f32;

        let d = |x, y, z| self.data[self.get_3d_index(x, y, z)];

        // x lines
        let c00 = d(x0, y0, z0) * (1.0 - x_t) + d(x1, y0, z0) * x_t;
        let c10 = d(x0, y1, z0) * (1.0 - x_t) + d(x1, y1, z0) * x_t;
        let c01 = d(x0, y0, z1) * (1.0 - x_t) + d(x1, y0, z1) * x_t;
        let c11 = d(x0, y1, z1) * (1.0 - x_t) + d(x1, y1, z1) * x_t;

        // y plane
        let c0 = c00 * (1.0 - y_t) + c10 * y_t;
        let c1 = c01 * (1.0 - y_t) + c11 * y_t;

        c0 * (1.0 - z_t) + c1 * z_t
    }

    fn sample_nearest(&self, pos: Point3<f32>) -> f32 {
        let g = self.to_grid(pos).map(|v| v.round() as usize);
        self.sample(g.x, g.y, g.z)
    }
}

#[cfg(test)]
mod test {

    use nalgebra::point;

    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn bounds_and_range() {
        let volume = ramp_volume();

        assert_eq!(volume.dimensions(), vector![3, 2, 2]);
        assert_eq!(volume.origin(), point![1.0, 1.0, 1.0]);
        assert_eq!(volume.get_bound_box().upper, point![3.0, 3.0, 5.0]);
        assert_eq!(volume.scalar_range().low, 0.0);
        assert_eq!(volume.scalar_range().high, 20.0);
    }

    #[test]
    fn sample_at_grid_points() {
        let volume = ramp_volume();

        for z in 0..2 {
            for y in 0..2 {
                for x in 0..3 {
                    let pos = volume.origin()
                        + vector![x as f32, y as f32, z as f32].component_mul(&volume.spacing());
                    let sample = volume.sample_at(pos);
                    compare_float(sample, volume.sample(x, y, z));
                }
            }
        }
    }

    #[test]
    fn trilinear_midpoint() {
        let volume = ramp_volume();

        // ramp along x is 0, 10, 20
        compare_float(volume.sample_at(point![1.5, 1.0, 1.0]), 5.0);
        compare_float(volume.sample_at(point![2.5, 1.0, 1.0]), 15.0);
    }

    #[test]
    fn clamps_outside() {
        let volume = ramp_volume();

        compare_float(volume.sample_at(point![-100.0, 1.0, 1.0]), 0.0);
        compare_float(volume.sample_at(point![100.0, 1.0, 1.0]), 20.0);
        assert_eq!(volume.get_data(3, 0, 0), None);
    }

    #[test]
    fn single_sample_axis() {
        let volume = ScalarVolume::new(
            vector![2, 1, 1],
            vector![1.0, 1.0, 1.0],
            point![0.0, 0.0, 0.0],
            "flat",
            vec![0.0, 4.0],
        )
        .unwrap();

        compare_float(volume.sample_at(point![0.25, 0.7, -3.0]), 1.0);
        compare_float(volume.sample_nearest(point![0.7, 0.0, 0.0]), 4.0);
    }

    #[test]
    fn wrong_sample_count() {
        let res = ScalarVolume::new(
            vector![2, 2, 2],
            vector![1.0, 1.0, 1.0],
            point![0.0, 0.0, 0.0],
            "bad",
            vec![0.0; 7],
        );
        assert!(matches!(res, Err(Error::DataFormat(_))));
    }
}
