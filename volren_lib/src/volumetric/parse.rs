//! Parser of the `.svol` structured grid format.
//!
//! Little-endian layout:
//! 1. magic `SVOL`
//! 2. version -- u16
//! 3. dimensions -- 3x u32 (x,y,z)
//! 4. spacing -- 3x f32
//! 5. origin -- 3x f32
//! 6. number of arrays -- u16
//! 7. arrays -- name length (u16), name (UTF-8), data type (u8), `x*y*z` samples, x fastest

use nalgebra::{point, vector, Point3, Vector3};
use nom::{
    bytes::complete::{tag, take},
    multi::count,
    number::complete::{le_f32, le_i16, le_u16, le_u32, le_u8},
    sequence::tuple,
    IResult,
};

use crate::error::{Error, Result};

pub const MAGIC: &[u8; 4] = b"SVOL";
pub const VERSION: u16 = 1;

/// Header length in bytes, up to the first array
pub const HEADER_LEN: usize = 4 + 2 + 3 * 4 + 3 * 4 + 3 * 4 + 2;

/// Type of samples stored in an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    U16,
    I16,
    F32,
}

impl DataType {
    pub fn from_tag(tag: u8) -> Option<DataType> {
        match tag {
            1 => Some(DataType::U8),
            2 => Some(DataType::U16),
            3 => Some(DataType::I16),
            4 => Some(DataType::F32),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            DataType::U8 => 1,
            DataType::U16 => 2,
            DataType::I16 => 3,
            DataType::F32 => 4,
        }
    }

    /// Bytes per sample
    pub fn size(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::F32 => 4,
        }
    }
}

/// One named scalar array, converted to `f32`
#[derive(Debug, Clone)]
pub struct ScalarArray {
    pub name: String,
    pub data_type: DataType,
    pub values: Vec<f32>,
}

/// Parsed file content, before an array is picked for rendering
#[derive(Debug, Clone)]
pub struct StructuredGrid {
    pub dims: Vector3<usize>,
    pub spacing: Vector3<f32>,
    pub origin: Point3<f32>,
    pub arrays: Vec<ScalarArray>,
}

impl StructuredGrid {
    pub fn n_of_samples(&self) -> usize {
        self.dims.x * self.dims.y * self.dims.z
    }

    /// Array by name, or the first one if `name` is `None`
    pub fn array(&self, name: Option<&str>) -> Option<&ScalarArray> {
        match name {
            Some(name) => self.arrays.iter().find(|a| a.name == name),
            None => self.arrays.first(),
        }
    }
}

struct Header {
    dims: Vector3<usize>,
    spacing: Vector3<f32>,
    origin: Point3<f32>,
    n_of_arrays: u16,
}

fn header_inner(s: &[u8]) -> IResult<&[u8], (u16, (u32, u32, u32), (f32, f32, f32), (f32, f32, f32), u16)> {
    let (s, _) = tag(&MAGIC[..])(s)?;
    tuple((
        le_u16,
        tuple((le_u32, le_u32, le_u32)),
        tuple((le_f32, le_f32, le_f32)),
        tuple((le_f32, le_f32, le_f32)),
        le_u16,
    ))(s)
}

fn parse_header(s: &[u8]) -> Result<(&[u8], Header)> {
    if s.len() >= MAGIC.len() && &s[..MAGIC.len()] != MAGIC {
        return Err(Error::data_format("not a SVOL file (bad magic)"));
    }

    let (rest, (version, dims, spacing, origin, n_of_arrays)) = header_inner(s).map_err(|_| {
        Error::data_format(format!(
            "truncated header ({} bytes, {HEADER_LEN} needed)",
            s.len()
        ))
    })?;

    if version != VERSION {
        return Err(Error::data_format(format!("unsupported version {version}")));
    }

    let dims = vector![dims.0 as usize, dims.1 as usize, dims.2 as usize];
    if dims.iter().any(|&d| d == 0) {
        return Err(Error::data_format(format!("zero dimension in {dims:?}")));
    }

    let spacing = vector![spacing.0, spacing.1, spacing.2];
    if spacing.iter().any(|&s| !s.is_finite() || s <= 0.0) {
        return Err(Error::data_format(format!(
            "spacing must be positive, got {spacing:?}"
        )));
    }

    let origin = point![origin.0, origin.1, origin.2];
    if origin.iter().any(|v| !v.is_finite()) {
        return Err(Error::data_format("origin is not finite"));
    }

    if n_of_arrays == 0 {
        return Err(Error::data_format("no scalar arrays"));
    }

    Ok((
        rest,
        Header {
            dims,
            spacing,
            origin,
            n_of_arrays,
        },
    ))
}

fn array_prefix(s: &[u8]) -> IResult<&[u8], (&[u8], u8)> {
    let (s, name_len) = le_u16(s)?;
    let (s, name) = take(name_len)(s)?;
    let (s, data_type) = le_u8(s)?;
    Ok((s, (name, data_type)))
}

fn samples(data_type: DataType, n: usize) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<f32>> {
    move |s| match data_type {
        DataType::U8 => {
            let (s, bytes) = take(n)(s)?;
            Ok((s, bytes.iter().map(|&v| v as f32).collect()))
        }
        DataType::U16 => {
            let (s, v) = count(le_u16, n)(s)?;
            Ok((s, v.into_iter().map(|v| v as f32).collect()))
        }
        DataType::I16 => {
            let (s, v) = count(le_i16, n)(s)?;
            Ok((s, v.into_iter().map(|v| v as f32).collect()))
        }
        DataType::F32 => count(le_f32, n)(s),
    }
}

fn parse_array(s: &[u8], index: u16, n_of_samples: usize) -> Result<(&[u8], ScalarArray)> {
    let (s, (name, data_type)) = array_prefix(s)
        .map_err(|_| Error::data_format(format!("truncated header of array {index}")))?;

    let name = std::str::from_utf8(name)
        .map_err(|_| Error::data_format(format!("name of array {index} is not UTF-8")))?
        .to_owned();

    let data_type = DataType::from_tag(data_type).ok_or_else(|| {
        Error::data_format(format!("unknown data type {data_type} of array '{name}'"))
    })?;

    let needed = n_of_samples
        .checked_mul(data_type.size())
        .ok_or_else(|| Error::data_format("array size overflows"))?;
    if s.len() < needed {
        return Err(Error::data_format(format!(
            "array '{name}' truncated, {needed} bytes needed, {} available",
            s.len()
        )));
    }

    let (s, values) = samples(data_type, n_of_samples)(s)
        .map_err(|_| Error::data_format(format!("cannot read samples of array '{name}'")))?;

    Ok((
        s,
        ScalarArray {
            name,
            data_type,
            values,
        },
    ))
}

/// Parse whole `.svol` content
pub fn svol_parser(slice: &[u8]) -> Result<StructuredGrid> {
    let (mut rest, header) = parse_header(slice)?;

    let n_of_samples = header
        .dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::data_format("dimensions overflow"))?;

    let mut arrays = Vec::with_capacity(header.n_of_arrays as usize);
    for index in 0..header.n_of_arrays {
        let (r, array) = parse_array(rest, index, n_of_samples)?;
        rest = r;
        arrays.push(array);
    }

    if !rest.is_empty() {
        tracing::warn!("{} trailing bytes after last array ignored", rest.len());
    }

    Ok(StructuredGrid {
        dims: header.dims,
        spacing: header.spacing,
        origin: header.origin,
        arrays,
    })
}

/// Serialize grid into `.svol` bytes. Arrays are written with their recorded data type.
pub fn svol_writer(grid: &StructuredGrid) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + grid.n_of_samples() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    for d in grid.dims.iter() {
        out.extend_from_slice(&(*d as u32).to_le_bytes());
    }
    for s in grid.spacing.iter().chain(grid.origin.iter()) {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out.extend_from_slice(&(grid.arrays.len() as u16).to_le_bytes());

    for array in &grid.arrays {
        out.extend_from_slice(&(array.name.len() as u16).to_le_bytes());
        out.extend_from_slice(array.name.as_bytes());
        out.push(array.data_type.tag());
        for &v in &array.values {
            match array.data_type {
                DataType::U8 => out.push(v as u8),
                DataType::U16 => out.extend_from_slice(&(v as u16).to_le_bytes()),
                DataType::I16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
                DataType::F32 => out.extend_from_slice(&v.to_le_bytes()),
            }
        }
    }
    out
}
