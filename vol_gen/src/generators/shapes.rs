use std::ops::RangeBounds;

use nalgebra::{vector, Vector3};

use crate::config::{Config, GeneratorConfig};

use super::SampleGenerator;

/// Generate volume with a number of randomly placed shapes
pub struct ShapesGenerator {
    shapes: Vec<ShapeInfo>,
}

impl ShapesGenerator {
    pub fn new(
        dims: Vector3<u32>,
        n_of_shapes: usize,
        sample: f32,
        obj_size: u32,
        seed: Option<u64>,
    ) -> ShapesGenerator {
        // Objects never exceed the volume
        let side = obj_size.min(dims.min()).max(1);
        let variance = side / 4;
        let sample_variance = (sample.abs() * 0.1).max(1.0);

        let random_shape_gen = ShapeInfoGenerator::new(
            dims,
            vector![side, side, side],
            vector![variance, variance, variance],
            sample,
            sample_variance,
            seed,
        );
        let shapes = random_shape_gen.get_shapes(n_of_shapes);
        tracing::debug!("Generated {} shapes", shapes.len());
        ShapesGenerator { shapes }
    }

    pub fn from_config(config: &Config) -> ShapesGenerator {
        match config.generator {
            GeneratorConfig::Shapes {
                n_of_shapes,
                sample,
                obj_size,
            } => ShapesGenerator::new(config.dims, n_of_shapes, sample, obj_size, config.seed),
            _ => ShapesGenerator { shapes: vec![] },
        }
    }
}

impl SampleGenerator for ShapesGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> f32 {
        // First shape containing the sample wins
        self.shapes
            .iter()
            .filter(|shape| shape.contains(coords))
            .find_map(|shape| shape.render_at(coords - shape.position_low))
            .unwrap_or(0.0)
    }
}

// # of enum ShapeType variants
const N_OF_SHAPE_KINDS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Cuboid,
    Sphere,
}

/// One shape in volume
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeInfo {
    pub position_low: Vector3<u32>,
    /// Inclusive
    pub position_high: Vector3<u32>,
    pub shape_type: ShapeType,
    pub sample: f32,
}

impl ShapeInfo {
    fn contains(&self, coords: Vector3<u32>) -> bool {
        (0..3).all(|i| coords[i] >= self.position_low[i] && coords[i] <= self.position_high[i])
    }

    fn render_at(&self, offset: Vector3<u32>) -> Option<f32> {
        match self.shape_type {
            ShapeType::Cuboid => Some(self.sample),
            ShapeType::Sphere => self.render_sphere(offset),
        }
    }

    fn render_sphere(&self, offset: Vector3<u32>) -> Option<f32> {
        let extent = (self.position_high - self.position_low).cast::<f32>();
        let center = extent / 2.0;
        let r = extent.min() / 2.0;

        let length = offset.cast::<f32>() - center;
        (length.magnitude() <= r).then(|| self.sample)
    }
}

/// Generate shapes
/// Helper type
pub struct ShapeInfoGenerator {
    rng: fastrand::Rng,
    vol_dims: Vector3<u32>,
    size: Vector3<u32>,
    size_variance: Vector3<u32>,
    sample: f32,
    sample_variance: f32,
}

impl ShapeInfoGenerator {
    #[must_use]
    pub fn new(
        vol_dims: Vector3<u32>,
        size: Vector3<u32>,
        size_variance: Vector3<u32>,
        sample: f32,
        sample_variance: f32,
        seed: Option<u64>,
    ) -> Self {
        let rng = fastrand::Rng::new();
        if let Some(seed) = seed {
            rng.seed(seed);
        }

        Self {
            rng,
            vol_dims,
            size,
            size_variance,
            sample,
            sample_variance,
        }
    }

    fn random_shape(&self) -> ShapeType {
        if self.rng.u8(0..N_OF_SHAPE_KINDS) == 0 {
            ShapeType::Cuboid
        } else {
            ShapeType::Sphere
        }
    }

    fn random_vector<R>(&self, ranges: Vector3<R>) -> Vector3<u32>
    where
        R: RangeBounds<u32> + Clone + std::fmt::Debug + PartialEq + 'static,
    {
        let rand_x = self.rng.u32(ranges[0].clone()); // Using index, .x access not working
        let rand_y = self.rng.u32(ranges[1].clone());
        let rand_z = self.rng.u32(ranges[2].clone());
        vector![rand_x, rand_y, rand_z]
    }

    pub fn get_shapes(&self, n: usize) -> Vec<ShapeInfo> {
        (0..n).map(|_| self.get_shape()).collect()
    }

    pub fn get_shape(&self) -> ShapeInfo {
        let shape_type = self.random_shape();

        let size_min = self.size.zip_map(&self.size_variance, |s, v| s.saturating_sub(v).max(1));
        let size_max = self
            .size
            .zip_map(&self.vol_dims, |s, d| s.min(d))
            .zip_map(&self.size_variance, |s, v| s + v)
            .zip_map(&self.vol_dims, |s, d| s.min(d));

        let size_ranges = vector![
            size_min.x..=size_max.x.max(size_min.x),
            size_min.y..=size_max.y.max(size_min.y),
            size_min.z..=size_max.z.max(size_min.z)
        ];
        let size = self
            .random_vector(size_ranges)
            .zip_map(&self.vol_dims, |s, d| s.min(d));

        // Spawn shape in positions it fits
        let pos_ranges = vector![
            0..=(self.vol_dims.x - size.x),
            0..=(self.vol_dims.y - size.y),
            0..=(self.vol_dims.z - size.z)
        ];
        let position_low = self.random_vector(pos_ranges);
        let position_high = position_low + size - vector![1, 1, 1];

        let sample = self.sample + (self.rng.f32() * 2.0 - 1.0) * self.sample_variance;

        ShapeInfo {
            position_low,
            position_high,
            shape_type,
            sample,
        }
    }
}
