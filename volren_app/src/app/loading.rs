use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{point, vector};
use volren_lib::{
    loading::{ProgressEvent, VolumeLoader, VolumeSource},
    volumetric::ScalarVolume,
};

/// Loading progress on the terminal
/// Percent bar when the size is known, byte counter otherwise
#[derive(Default)]
pub struct LoadProgress {
    bar: Option<ProgressBar>,
}

impl LoadProgress {
    fn create_bar(total: Option<u64>) -> ProgressBar {
        match total {
            Some(_) => {
                let bar = ProgressBar::new(100);
                bar.set_style(
                    ProgressStyle::default_bar().template("{prefix} [{bar:40}] {pos}% ({eta})"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(ProgressStyle::default_spinner().template("{prefix} {spinner} {msg}"));
                bar
            }
        }
    }

    pub fn update(&mut self, event: ProgressEvent) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = Self::create_bar(event.total);
            bar.set_prefix("Loading");
            bar
        });
        match event.percent() {
            Some(percent) => bar.set_position(percent.round().min(100.0) as u64),
            None => {
                bar.set_message(format!("{} bytes", event.loaded));
                bar.tick();
            }
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

/// Load on the loader thread, progress is drawn on this one
pub fn load_volume(source: VolumeSource, array: Option<String>) -> Result<ScalarVolume> {
    let handle = VolumeLoader::spawn(source, array)?;
    let mut progress = LoadProgress::default();
    let res = handle.wait_with_progress(|event| progress.update(event));
    progress.finish();
    res.context("cannot load volume")
}

pub const DEMO_SIDE: usize = 96;

/// Sphere with a dense shell and a softer core, values in 0..=255
pub fn demo_volume() -> Result<ScalarVolume> {
    let c = (DEMO_SIDE - 1) as f32 / 2.0;
    let mut data = Vec::with_capacity(DEMO_SIDE * DEMO_SIDE * DEMO_SIDE);
    for z in 0..DEMO_SIDE {
        for y in 0..DEMO_SIDE {
            for x in 0..DEMO_SIDE {
                let r = vector![x as f32 - c, y as f32 - c, z as f32 - c].magnitude() / c;
                let v = match r {
                    r if r > 1.0 => 0.0,
                    r if r > 0.8 => 255.0,
                    r => 120.0 * (1.0 - r),
                };
                data.push(v);
            }
        }
    }
    let volume = ScalarVolume::new(
        vector![DEMO_SIDE, DEMO_SIDE, DEMO_SIDE],
        vector![1.0, 1.0, 1.0],
        point![0.0, 0.0, 0.0],
        "demo",
        data,
    )?;
    Ok(volume)
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn demo_shell() {
        let volume = demo_volume().unwrap();
        let mid = DEMO_SIDE / 2;
        assert_eq!(volume.sample(0, 0, 0), 0.0);
        assert_eq!(volume.sample(1, mid, mid), 255.0);
        assert!(volume.sample(mid, mid, mid) > 100.0);
        assert!(volume.sample(mid, mid, mid) < 255.0);
    }

    #[test]
    fn progress_without_total() {
        let mut progress = LoadProgress::default();
        progress.update(ProgressEvent {
            loaded: 0,
            total: None,
        });
        progress.update(ProgressEvent {
            loaded: 4096,
            total: None,
        });
        assert!(progress.bar.is_some());
        progress.finish();
        assert!(progress.bar.is_none());
    }
}
