use std::{ffi::OsString, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use nalgebra::{vector, Vector3};
use volren_lib::volumetric::DataType;

/// Transform `Values` into `Vector`
fn values_to_vector3<T>(args: &ArgMatches, key: &str) -> Result<Vector3<T>>
where
    T: FromStr + Copy,
{
    let vals: Vec<T> = args
        .values_of(key)
        .with_context(|| format!("missing argument {key}"))?
        .map(|v| v.parse::<T>().map_err(|_| anyhow!("cannot parse {key} value {v}")))
        .collect::<Result<_>>()?;
    if vals.len() != 3 {
        bail!("{key} needs 3 values");
    }
    Ok(vector![vals[0], vals[1], vals[2]])
}

fn parse_value<T>(args: &ArgMatches, key: &str) -> Result<T>
where
    T: FromStr,
{
    let val = args
        .value_of(key)
        .with_context(|| format!("missing argument {key}"))?;
    val.parse()
        .map_err(|_| anyhow!("cannot parse {key} value {val}"))
}

/// App configuration
/// Config is built from args parsed by `clap`
#[derive(Debug)]
pub struct Config {
    /// Dimensions of volume
    pub dims: Vector3<u32>,
    /// Distance between samples
    pub spacing: Vector3<f32>,
    pub origin: Vector3<f32>,
    /// Type of generator to be used
    pub generator: GeneratorConfig,
    /// Type of samples in file
    pub data_type: DataType,
    pub array_name: String,
    // Output file name
    pub file_name: OsString,
    /// Optional seed for RNG, to replicate results
    pub seed: Option<u64>,
}

impl Config {
    pub fn from_args(args: &ArgMatches) -> Result<Config> {
        let dims = values_to_vector3(args, "dims")?;
        let spacing = values_to_vector3(args, "spacing")?;
        let origin = values_to_vector3(args, "origin")?;
        let generator = GeneratorConfig::from_args(args)?;

        let data_type = match args.value_of("data-type") {
            Some("u8") | None => DataType::U8,
            Some("u16") => DataType::U16,
            Some("i16") => DataType::I16,
            Some("f32") => DataType::F32,
            Some(other) => bail!("unknown data type {other}"),
        };

        let array_name: String = parse_value(args, "array-name")?;
        if array_name.len() > u16::MAX as usize {
            bail!("array name too long");
        }

        let file_name = args
            .value_of_os("output-file")
            .context("missing output file")?
            .into();

        let seed = match args.value_of("seed") {
            Some(_) => Some(parse_value(args, "seed")?),
            None => None,
        };

        Ok(Config {
            dims,
            spacing,
            origin,
            generator,
            data_type,
            array_name,
            file_name,
            seed,
        })
    }

    pub fn n_of_samples(&self) -> u64 {
        self.dims.iter().map(|&d| d as u64).product()
    }
}

/// Settings specific to generator variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorConfig {
    /// Randomly placed spheres and cuboids
    Shapes {
        n_of_shapes: usize,
        sample: f32,
        obj_size: u32,
    },
    /// Box of one value with an empty border
    Solid { sample: f32 },
    /// Chest like phantom in Hounsfield units
    Phantom,
}

impl GeneratorConfig {
    pub fn from_args(args: &ArgMatches) -> Result<GeneratorConfig> {
        let s = args.value_of("generator").context("missing generator")?;

        match s {
            "shapes" => Ok(GeneratorConfig::Shapes {
                n_of_shapes: parse_value(args, "n-of-shapes")?,
                sample: parse_value(args, "sample")?,
                obj_size: parse_value(args, "object-size")?,
            }),
            "solid" => Ok(GeneratorConfig::Solid {
                sample: parse_value(args, "sample")?,
            }),
            "phantom" => Ok(GeneratorConfig::Phantom),
            other => bail!("unknown generator {other}"),
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::args::get_command;

    #[test]
    fn shapes_config() {
        let args = get_command()
            .try_get_matches_from([
                "vol_gen",
                "--dims=10,20,30",
                "--spacing=0.5,0.5,2",
                "-g",
                "shapes",
                "--sample",
                "120",
                "--n-of-shapes",
                "3",
                "--object-size",
                "4",
                "-t",
                "i16",
                "--seed",
                "7",
            ])
            .unwrap();
        let cfg = Config::from_args(&args).unwrap();

        assert_eq!(cfg.dims, vector![10, 20, 30]);
        assert_eq!(cfg.spacing, vector![0.5, 0.5, 2.0]);
        assert_eq!(cfg.origin, vector![0.0, 0.0, 0.0]);
        assert_eq!(cfg.data_type, DataType::I16);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.n_of_samples(), 6000);
        assert_eq!(
            cfg.generator,
            GeneratorConfig::Shapes {
                n_of_shapes: 3,
                sample: 120.0,
                obj_size: 4
            }
        );
        assert_eq!(cfg.file_name, OsString::from("a.svol"));
    }
}
