mod scene_camera;

pub use scene_camera::{Camera, DEFAULT_VIEW_ANGLE};
