pub mod gradient;
pub mod parse;
mod vol_builder;
mod volume;

pub use gradient::{gradient_at, gradient_of, normal_from_gradient, GradientOpacity};
pub use parse::{DataType, ScalarArray, StructuredGrid};
pub use vol_builder::{from_bytes, from_file, DataSource};
pub use volume::{ScalarVolume, Volume};
