use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use volren_lib::render::Framebuffer;

pub fn to_image(framebuffer: &Framebuffer) -> Result<RgbaImage> {
    let (width, height) = framebuffer.resolution();
    RgbaImage::from_raw(width as u32, height as u32, framebuffer.as_bytes().to_vec())
        .context("framebuffer size does not match its resolution")
}

/// Save frame as PNG
pub fn save_frame(framebuffer: &Framebuffer, path: &Path) -> Result<()> {
    to_image(framebuffer)?
        .save(path)
        .with_context(|| format!("cannot save {}", path.display()))?;
    tracing::debug!("Saved {}", path.display());
    Ok(())
}

/// `frame_007.png` for step 7
pub fn frame_path(dir: &Path, step: usize) -> PathBuf {
    dir.join(format!("frame_{step:03}.png"))
}
