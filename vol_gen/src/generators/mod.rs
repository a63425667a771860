use std::io::Write;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{vector, Vector3};
use rayon::prelude::*;

use crate::{
    config::{Config, GeneratorConfig},
    file::open_create_file,
    header::{encode_samples, generate_header},
};

mod phantom;
mod shapes;
mod solid;

// Generates one sample at a time, at any location
pub trait SampleGenerator: Sync {
    fn sample_at(&self, coords: Vector3<u32>) -> f32;
}

pub fn get_sample_generator(config: &Config) -> Box<dyn SampleGenerator> {
    match config.generator {
        GeneratorConfig::Shapes { .. } => Box::new(shapes::ShapesGenerator::from_config(config)),
        GeneratorConfig::Solid { sample } => {
            Box::new(solid::SolidGenerator::new(config.dims, sample))
        }
        GeneratorConfig::Phantom => Box::new(phantom::PhantomGenerator::new(config.dims)),
    }
}

/// Samples of one z slice, x fastest
pub fn generate_slice(sg: &dyn SampleGenerator, dims: Vector3<u32>, z: u32) -> Vec<f32> {
    (0..dims.y)
        .into_par_iter()
        .flat_map_iter(|y| (0..dims.x).map(move |x| sg.sample_at(vector![x, y, z])))
        .collect()
}

/// Writes the whole file, slice by slice
pub fn generate_vol(config: &Config) -> Result<()> {
    let gen = get_sample_generator(config);
    let file_name = &config.file_name;
    let mut file = open_create_file(file_name)
        .with_context(|| format!("cannot open {}", file_name.to_string_lossy()))?;

    // Write header
    let header = generate_header(config)?;
    file.write_all(&header)?;

    let progress = ProgressBar::new(config.dims.z as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("{prefix} [{bar:40}] {pos}/{len} slices ({eta})"),
    );
    progress.set_prefix("Generating");

    // Write samples
    let mut buffer = Vec::new();
    for z in 0..config.dims.z {
        let slice = generate_slice(gen.as_ref(), config.dims, z);
        buffer.clear();
        encode_samples(&slice, config.data_type, &mut buffer)?;
        file.write_all(&buffer)?;
        progress.inc(1);
    }
    file.flush()?;
    progress.finish();

    tracing::info!(
        "Generating finished, {} samples in {}",
        config.n_of_samples(),
        file_name.to_string_lossy()
    );
    Ok(())
}

#[cfg(test)]
mod test {

    use std::ffi::OsString;

    use volren_lib::volumetric::{self, DataType, Volume};

    use super::*;

    #[test]
    fn written_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solid.svol");
        let cfg = Config {
            dims: vector![12, 11, 13],
            spacing: vector![1.0, 1.0, 1.0],
            origin: vector![0.0, 0.0, 0.0],
            generator: GeneratorConfig::Solid { sample: 200.0 },
            data_type: DataType::U8,
            array_name: "density".into(),
            file_name: OsString::from(path.as_os_str()),
            seed: None,
        };

        generate_vol(&cfg).unwrap();

        let volume = volumetric::from_file(&path, Some("density")).unwrap();
        assert_eq!(volume.get_size(), vector![12, 11, 13]);
        assert_eq!(volume.sample(0, 0, 0), 0.0);
        assert_eq!(volume.sample(6, 5, 6), 200.0);
    }
}
