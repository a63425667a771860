/*
    vol_gen
    Author: Michal Majer
    Date: 2022-05-05
*/

use nalgebra::Vector3;

use super::SampleGenerator;

/// Generate solid volume
/// All samples inside the border have the same value
pub struct SolidGenerator {
    /// The sample value
    sample: f32,
    pad: u32,
    dims: Vector3<u32>,
}

impl SolidGenerator {
    pub fn new(dims: Vector3<u32>, sample: f32) -> SolidGenerator {
        // Border shrinks for small volumes
        let pad = (dims.min() / 4).min(5);
        SolidGenerator { sample, pad, dims }
    }
}

impl SampleGenerator for SolidGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> f32 {
        let inside = (0..3).all(|i| coords[i] >= self.pad && coords[i] + self.pad < self.dims[i]);
        if inside {
            self.sample
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod test {

    use nalgebra::vector;

    use super::*;

    #[test]
    fn border() {
        let gen = SolidGenerator::new(vector![40, 40, 40], 9.0);
        assert_eq!(gen.sample_at(vector![4, 20, 20]), 0.0);
        assert_eq!(gen.sample_at(vector![5, 20, 20]), 9.0);
        assert_eq!(gen.sample_at(vector![34, 20, 20]), 9.0);
        assert_eq!(gen.sample_at(vector![35, 20, 20]), 0.0);

        // tiny volume, no border
        let gen = SolidGenerator::new(vector![3, 3, 3], 9.0);
        assert_eq!(gen.sample_at(vector![0, 0, 0]), 9.0);
    }
}
