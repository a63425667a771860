use byteorder::{LittleEndian, WriteBytesExt};
use volren_lib::volumetric::{
    parse::{MAGIC, VERSION},
    DataType,
};

use crate::config::Config;

/// `.svol` header with a single array
/// little-endian
/// 1. magic, version
/// 2. dims -- 3x u32, spacing -- 3x f32, origin -- 3x f32
/// 3. number of arrays (1)
/// 4. array name length, name, data type tag
/// Samples follow, x fastest
pub fn generate_header(cfg: &Config) -> std::io::Result<Vec<u8>> {
    let mut vec = Vec::with_capacity(64 + cfg.array_name.len());
    vec.extend_from_slice(MAGIC);
    vec.write_u16::<LittleEndian>(VERSION)?;

    for &d in cfg.dims.iter() {
        vec.write_u32::<LittleEndian>(d)?;
    }
    for &s in cfg.spacing.iter().chain(cfg.origin.iter()) {
        vec.write_f32::<LittleEndian>(s)?;
    }

    vec.write_u16::<LittleEndian>(1)?;
    vec.write_u16::<LittleEndian>(cfg.array_name.len() as u16)?;
    vec.extend_from_slice(cfg.array_name.as_bytes());
    vec.write_u8(cfg.data_type.tag())?;

    Ok(vec)
}

/// Appends samples to `out`, values are saturated into the type range
pub fn encode_samples(samples: &[f32], data_type: DataType, out: &mut Vec<u8>) -> std::io::Result<()> {
    out.reserve(samples.len() * data_type.size());
    for &v in samples {
        match data_type {
            DataType::U8 => out.write_u8(v as u8)?,
            DataType::U16 => out.write_u16::<LittleEndian>(v as u16)?,
            DataType::I16 => out.write_i16::<LittleEndian>(v as i16)?,
            DataType::F32 => out.write_f32::<LittleEndian>(v)?,
        }
    }
    Ok(())
}
