//! Command line of the demo app
//! Uses library `clap`

use std::ffi::OsStr;

use clap::{Arg, ArgGroup, Command, ValueHint};

pub fn is_positive_number(num: &str) -> Result<(), String> {
    match num.parse::<usize>() {
        Ok(n) if n > 0 => Ok(()),
        Ok(_) => Err("Number must be greater than 0".into()),
        Err(_) => Err("Number required".into()),
    }
}

pub fn is_number(num: &str) -> Result<(), String> {
    num.parse::<usize>()
        .map(|_| ())
        .map_err(|_| "Number required".into())
}

pub fn is_float(num: &str) -> Result<(), String> {
    match num.parse::<f32>() {
        Ok(n) if n.is_finite() => Ok(()),
        _ => Err("Finite number required".into()),
    }
}

pub const PRESET_NAMES: &[&str] = &["chest", "chest_ct", "fetus", "fetal_ultrasound"];

pub fn get_command<'a>() -> Command<'a> {
    Command::new("Volren")
        .author("Michal Majer")
        .version("0.1.0")
        .about("Renders a volume, then orbits the camera around it")
        .arg(
            Arg::new("file")
                .help("Volume file (.svol)")
                .long("file")
                .short('f')
                .takes_value(true)
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("url")
                .help("Download volume file")
                .long("url")
                .short('u')
                .takes_value(true)
                .value_name("URL")
                .value_hint(ValueHint::Url),
        )
        .arg(
            Arg::new("demo")
                .help("Render a built-in sphere volume")
                .long("demo"),
        )
        .group(
            ArgGroup::new("source")
                .args(&["file", "url", "demo"])
                .required(true),
        )
        .arg(
            Arg::new("mmap")
                .help("Map the file into memory instead of reading it")
                .long("mmap")
                .requires("file"),
        )
        .arg(
            Arg::new("array")
                .help("Name of scalar array, first array is used by default")
                .long("array")
                .short('a')
                .takes_value(true)
                .value_name("NAME"),
        )
        .arg(
            Arg::new("preset")
                .help("Built-in scene preset")
                .long("preset")
                .short('p')
                .takes_value(true)
                .possible_values(PRESET_NAMES)
                .default_value("chest"),
        )
        .arg(
            Arg::new("preset-file")
                .help("Scene preset in TOML, overrides --preset")
                .long("preset-file")
                .takes_value(true)
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("resolution")
                .help("Image size")
                .long("resolution")
                .short('r')
                .takes_value(true)
                .number_of_values(2)
                .value_names(&["W", "H"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("steps")
                .help("Number of animation frames, 0 skips the animation")
                .long("steps")
                .short('s')
                .takes_value(true)
                .value_name("N")
                .validator(is_number),
        )
        .arg(
            Arg::new("azimuth")
                .help("Degrees of azimuth per animation frame")
                .long("azimuth")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(is_float),
        )
        .arg(
            Arg::new("elevation")
                .help("Degrees of elevation per animation frame")
                .long("elevation")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(is_float),
        )
        .arg(
            Arg::new("background")
                .help("Animate on a background render thread")
                .long("background")
                .short('b'),
        )
        .arg(
            Arg::new("output")
                .help("Where the first frame is saved")
                .long("output")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath)
                .default_value_os(OsStr::new("first_frame.png")),
        )
        .arg(
            Arg::new("frames-dir")
                .help("Save every animation frame into this directory")
                .long("frames-dir")
                .takes_value(true)
                .value_name("DIR")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::DirPath),
        )
}
