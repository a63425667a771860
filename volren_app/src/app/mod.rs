/*
    volren_app
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Loading, rendering and saving frames

mod loading;
mod output;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use volren_lib::{
    render::{RendererEvent, RendererFront, RendererMessage},
    Session,
};

use crate::config::AppConfig;

fn animation_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(ProgressStyle::default_bar().template("{prefix} [{bar:40}] {pos}/{len} frames"));
    bar.set_prefix("Animating");
    bar
}

pub struct App {
    config: AppConfig,
    session: Session,
    // Timing lines already printed
    printed: usize,
}

impl App {
    /// Loads the volume and builds the session, nothing is rendered yet
    pub fn new(config: AppConfig) -> Result<App> {
        let volume = match config.source.volume_source() {
            Some(source) => loading::load_volume(source, config.array.clone())?,
            None => loading::demo_volume()?,
        };
        tracing::info!(
            "Volume '{}' {:?}, scalar range {:?}",
            volume.name(),
            volume.dimensions().as_slice(),
            volume.scalar_range()
        );

        let session = Session::new(volume, &config.preset).context("cannot set up scene")?;
        Ok(App {
            config,
            session,
            printed: 0,
        })
    }

    pub fn run(mut self) -> Result<()> {
        self.session.render()?;
        self.print_timing();
        output::save_frame(self.session.framebuffer(), &self.config.output)?;
        println!("First frame saved to {}", self.config.output.display());

        if !self.config.animate() {
            return Ok(());
        }
        if let Some(dir) = &self.config.frames_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }

        if self.config.background {
            self.animate_in_background()
        } else {
            self.animate()?;
            self.print_timing();
            Ok(())
        }
    }

    fn print_timing(&mut self) {
        let lines = self.session.timing_log().lines();
        for line in &lines[self.printed..] {
            println!("{line}");
        }
        self.printed = lines.len();
    }

    /// Animation on this thread
    fn animate(&mut self) -> Result<()> {
        let bar = animation_bar(self.session.animation_plan().steps);
        let frames_dir = self.config.frames_dir.clone();
        let mut save_result = Ok(());

        self.session.animate(|step, _total, framebuffer| {
            bar.inc(1);
            // First failure is kept, the animation still finishes
            if let Some(dir) = &frames_dir {
                if save_result.is_ok() {
                    save_result = output::save_frame(framebuffer, &output::frame_path(dir, step));
                }
            }
        })?;
        bar.finish();
        save_result
    }

    /// Animation on the render thread, every event carries its own frame
    fn animate_in_background(self) -> Result<()> {
        let plan = self.session.animation_plan();
        let frames_dir = self.config.frames_dir;

        let mut front = RendererFront::new();
        front.start_rendering(self.session.into_render_thread())?;
        front.send_message(RendererMessage::Animate(plan))?;

        let bar = animation_bar(plan.steps);
        let res = loop {
            let (step, frame, finished) = match front.receive_event()? {
                RendererEvent::AnimationFrame { step, frame, .. } => (step, frame, false),
                RendererEvent::AnimationFinished { mean, frame } => {
                    bar.finish();
                    println!("Interactive Render Time: {:.1} ms", mean.as_secs_f64() * 1000.0);
                    (plan.steps, frame, true)
                }
                RendererEvent::AnimationCancelled { rendered } => {
                    tracing::warn!("Animation cancelled after {rendered} frames");
                    break Ok(());
                }
                RendererEvent::Failed(msg) => break Err(anyhow::anyhow!(msg)),
                RendererEvent::FrameReady { .. } => continue,
            };
            if !finished {
                bar.inc(1);
            }

            if let Some(dir) = &frames_dir {
                if let Err(e) = output::save_frame(&frame, &output::frame_path(dir, step)) {
                    break Err(e);
                }
            }
            if finished {
                break Ok(());
            }
        };

        front.finish();
        res
    }
}

#[cfg(test)]
mod test {

    use std::path::PathBuf;

    use volren_lib::Preset;

    use super::*;
    use crate::config::SourceConfig;

    fn small_config(dir: &std::path::Path, background: bool) -> AppConfig {
        let mut preset = Preset::fetal_ultrasound();
        preset.render.resolution = (16, 16);
        preset.camera.offset = [0.0, 0.0, -300.0];
        preset.light.offset = [0.0, 0.0, -100.0];
        preset.animation.steps = 3;
        AppConfig {
            source: SourceConfig::Demo,
            array: None,
            preset,
            background,
            output: dir.join("first.png"),
            frames_dir: Some(dir.join("frames")),
        }
    }

    fn saved_frames(dir: &std::path::Path) -> Vec<PathBuf> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir.join("frames"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        frames.sort();
        frames
    }

    #[test]
    fn foreground_run() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(small_config(dir.path(), false)).unwrap();
        app.run().unwrap();

        assert!(dir.path().join("first.png").exists());
        let frames = saved_frames(dir.path());
        assert_eq!(frames.len(), 3);
        assert!(frames[2].ends_with("frame_003.png"));
    }

    #[test]
    fn background_run() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(small_config(dir.path(), true)).unwrap();
        app.run().unwrap();

        assert!(dir.path().join("first.png").exists());
        assert_eq!(saved_frames(dir.path()).len(), 3);
    }

    #[test]
    fn background_frames_match_foreground() {
        let fg = tempfile::tempdir().unwrap();
        let bg = tempfile::tempdir().unwrap();
        App::new(small_config(fg.path(), false)).unwrap().run().unwrap();
        App::new(small_config(bg.path(), true)).unwrap().run().unwrap();

        let fg_frames = saved_frames(fg.path());
        let bg_frames = saved_frames(bg.path());
        assert_eq!(fg_frames.len(), bg_frames.len());
        for (a, b) in fg_frames.iter().zip(&bg_frames) {
            assert_eq!(a.file_name(), b.file_name());
            let a = image::open(a).unwrap().to_rgba8();
            let b = image::open(b).unwrap().to_rgba8();
            assert_eq!(a.as_raw(), b.as_raw(), "{:?}", bg_frames);
        }
    }
}
