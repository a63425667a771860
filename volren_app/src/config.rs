use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use volren_lib::{loading::VolumeSource, Preset};

/// Where the volume comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    File { path: PathBuf, mapped: bool },
    Url(String),
    /// Built-in sphere
    Demo,
}

impl SourceConfig {
    /// `None` for the demo volume, it is built in memory
    pub fn volume_source(&self) -> Option<VolumeSource> {
        match self {
            SourceConfig::File { path, mapped: true } => Some(VolumeSource::Mapped(path.clone())),
            SourceConfig::File { path, mapped: false } => Some(VolumeSource::File(path.clone())),
            SourceConfig::Url(url) => Some(VolumeSource::Url(url.clone())),
            SourceConfig::Demo => None,
        }
    }
}

/// App configuration
/// Built from args parsed by `clap`
#[derive(Debug)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub array: Option<String>,
    /// Scene preset with command line overrides applied
    pub preset: Preset,
    /// Render animation on the background thread
    pub background: bool,
    pub output: PathBuf,
    pub frames_dir: Option<PathBuf>,
}

fn parse_value<T>(args: &ArgMatches, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    args.value_of(key)
        .map(|v| {
            v.parse()
                .map_err(|_| anyhow!("cannot parse {key} value {v}"))
        })
        .transpose()
}

impl AppConfig {
    pub fn from_args(args: &ArgMatches) -> Result<AppConfig> {
        let source = if let Some(path) = args.value_of_os("file") {
            SourceConfig::File {
                path: path.into(),
                mapped: args.is_present("mmap"),
            }
        } else if let Some(url) = args.value_of("url") {
            SourceConfig::Url(url.into())
        } else if args.is_present("demo") {
            SourceConfig::Demo
        } else {
            bail!("no volume source given");
        };

        let mut preset = match args.value_of_os("preset-file") {
            Some(path) => Preset::from_file(path)
                .with_context(|| format!("cannot read preset {}", path.to_string_lossy()))?,
            None => {
                let name = args.value_of("preset").context("missing preset")?;
                Preset::by_name(name).with_context(|| format!("unknown preset {name}"))?
            }
        };

        if let Some(values) = args.values_of("resolution") {
            let res = values
                .map(|v| v.parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
                .context("cannot parse resolution")?;
            if let [w, h] = res[..] {
                preset.render.resolution = (w, h);
            } else {
                bail!("resolution needs 2 values");
            }
        }
        if let Some(steps) = parse_value(args, "steps")? {
            preset.animation.steps = steps;
        }
        if let Some(azimuth) = parse_value(args, "azimuth")? {
            preset.animation.azimuth = azimuth;
        }
        if let Some(elevation) = parse_value(args, "elevation")? {
            preset.animation.elevation = elevation;
        }

        // Preset file may name the array, command line wins
        let array = args
            .value_of("array")
            .map(String::from)
            .or_else(|| preset.array.clone());

        Ok(AppConfig {
            source,
            array,
            preset,
            background: args.is_present("background"),
            output: args
                .value_of_os("output")
                .context("missing output file")?
                .into(),
            frames_dir: args.value_of_os("frames-dir").map(PathBuf::from),
        })
    }

    pub fn animate(&self) -> bool {
        self.preset.animation.steps > 0
    }
}
