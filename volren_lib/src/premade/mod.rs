// Scene presets for datasets used in development.
// Presets can also be written by hand as TOML files,
// see `Preset::from_file`.

pub mod presets;

pub use presets::{CameraPreset, LightPreset, Preset, RenderPreset};
