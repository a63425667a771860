mod compositor;
mod frame_driver;
mod render_front;
mod render_options;
mod renderer;

pub use compositor::{trace_ray, Accumulator, RayResult};
pub use frame_driver::{AnimationPlan, DriverState, FrameDriver, StopHandle, Tick, TimingLog};
pub use render_front::{RenderThread, RendererEvent, RendererFront, RendererMessage};
pub use render_options::{
    sample_distance_for, CompositeOrder, RenderSettings, RenderSettingsBuilder,
    DEFAULT_TERMINATION,
};
pub use renderer::{render_frame, Framebuffer, Scene};
