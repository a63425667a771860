//! Argument parsing and validation
//! Uses library `clap`

use std::ffi::OsStr;

use clap::{Arg, Command, ValueHint};

// up to 32bit value
pub fn is_positive_number(num: &str) -> Result<(), String> {
    let n = num.parse::<u32>();
    match n {
        Ok(n) => {
            if n > 0 {
                Ok(())
            } else {
                Err("Number must be greater than 0".into())
            }
        }
        Err(_) => Err("Number required".into()),
    }
}

pub fn is_positive_float(num: &str) -> Result<(), String> {
    let n = num.parse::<f32>();
    match n {
        Ok(n) => {
            if n > 0.0 && n.is_finite() {
                Ok(())
            } else {
                Err("Number must be greater than 0.0".into())
            }
        }
        Err(_) => Err("Number required".into()),
    }
}

pub fn is_float(num: &str) -> Result<(), String> {
    match num.parse::<f32>() {
        Ok(n) if n.is_finite() => Ok(()),
        _ => Err("Finite number required".into()),
    }
}

pub const GENERATOR_NAMES: &[&str] = &["solid", "shapes", "phantom"];
pub const DATA_TYPE_NAMES: &[&str] = &["u8", "u16", "i16", "f32"];

pub fn get_command<'a>() -> Command<'a> {
    Command::new("Vol-gen")
        .author("Michal Majer")
        .version("0.1.0")
        .about("Generator of synthetic .svol volumes")
        .arg(
            Arg::new("dims")
                .help("Dimensions of volume")
                .long("dims")
                .short('d')
                .required(true)
                .takes_value(true)
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("spacing")
                .help("Distance between samples")
                .long("spacing")
                .short('s')
                .takes_value(true)
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .default_values(&["1", "1", "1"])
                .validator(is_positive_float),
        )
        .arg(
            Arg::new("origin")
                .help("World position of the first sample")
                .long("origin")
                .takes_value(true)
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .allow_hyphen_values(true)
                .default_values(&["0", "0", "0"])
                .validator(is_float),
        )
        .arg(
            Arg::new("generator")
                .help("Type of generator")
                .long("generator")
                .short('g')
                .required(true)
                .requires_ifs(&[
                    ("solid", "sample"), // if solid is set, require option sample
                    ("shapes", "n-of-shapes"),
                    ("shapes", "sample"),
                    ("shapes", "object-size"),
                ])
                .takes_value(true)
                .value_name("NAME")
                .possible_values(GENERATOR_NAMES),
        )
        .arg(
            Arg::new("data-type")
                .help("Type of stored samples")
                .long("data-type")
                .short('t')
                .takes_value(true)
                .value_name("TYPE")
                .default_value("u8")
                .possible_values(DATA_TYPE_NAMES),
        )
        .arg(
            Arg::new("array-name")
                .help("Name of the scalar array")
                .long("array-name")
                .takes_value(true)
                .value_name("NAME")
                .default_value("scalars"),
        )
        .arg(
            Arg::new("seed")
                .help("Seed for RNG, leave out for random seed")
                .long("seed")
                .takes_value(true)
                .value_name("SEED")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("sample")
                .help("Value of generated objects")
                .long("sample")
                .takes_value(true)
                .value_name("VALUE")
                .allow_hyphen_values(true)
                .validator(is_float),
        )
        .arg(
            Arg::new("object-size")
                .help("Size of individual generated objects")
                .long("object-size")
                .takes_value(true)
                .value_name("SIDE")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("n-of-shapes")
                .help("Number of shapes generated in volume")
                .long("n-of-shapes")
                .takes_value(true)
                .value_name("N")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("output-file")
                .help("File name to output")
                .long("output-file")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath)
                .default_value_os(OsStr::new("a.svol")),
        )
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn validators() {
        assert!(is_positive_number("12").is_ok());
        assert!(is_positive_number("0").is_err());
        assert!(is_positive_float("0.5").is_ok());
        assert!(is_positive_float("-1").is_err());
        assert!(is_float("-1024").is_ok());
        assert!(is_float("abc").is_err());
    }

    #[test]
    fn solid_requires_sample() {
        let res = get_command().try_get_matches_from(["vol_gen", "--dims=4,4,4", "-g", "solid"]);
        assert!(res.is_err());

        let res = get_command().try_get_matches_from([
            "vol_gen",
            "--dims=4,4,4",
            "-g",
            "solid",
            "--sample",
            "200",
        ]);
        assert!(res.is_ok());
    }
}
