use std::{fs::File, path::Path};

use memmap::{Mmap, MmapOptions};

use super::{parse::svol_parser, ScalarVolume};
use crate::error::{Error, Result};

/// Loads and parses a `.svol` file, selecting array `array` (first array if `None`).
pub fn from_file<P>(path: P, array: Option<&str>) -> Result<ScalarVolume>
where
    P: AsRef<Path>,
{
    let ds = DataSource::from_file(path)?;
    from_source(&ds, array)
}

/// Parses `.svol` content already held in memory
pub fn from_bytes(bytes: Vec<u8>, array: Option<&str>) -> Result<ScalarVolume> {
    let ds = DataSource::from_vec(bytes);
    from_source(&ds, array)
}

fn from_source(ds: &DataSource, array: Option<&str>) -> Result<ScalarVolume> {
    let grid = svol_parser(ds.get_slice())?;
    ScalarVolume::from_grid(grid, array)
}

/// Raw bytes of a volume file
pub enum DataSource {
    Vec(Vec<u8>),
    Mmap(Mmap),
}

impl DataSource {
    pub fn get_slice(&self) -> &[u8] {
        match self {
            DataSource::Vec(v) => v.as_slice(),
            DataSource::Mmap(m) => &m[..],
        }
    }

    pub fn from_vec(vec: Vec<u8>) -> DataSource {
        DataSource::Vec(vec)
    }

    pub fn from_file<P>(path: P) -> Result<DataSource>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::Fetch(format!(
                "path {} does not lead to a file",
                path.display()
            )));
        }

        let file = File::open(path)?;

        // Empty files cannot be mapped
        if file.metadata()?.len() == 0 {
            return Ok(DataSource::Vec(vec![]));
        }

        // Safety: the map is read only, file is not expected to change while loaded
        let mmap = unsafe { MmapOptions::new().map(&file) }?;
        Ok(DataSource::Mmap(mmap))
    }
}
