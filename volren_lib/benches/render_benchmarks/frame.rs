use crate::common::*;

fn bench_frame(c: &mut Criterion, name: &str, shadows: bool, early_termination: bool) {
    let session = bench_session(shadows, early_termination);
    let mut fb = Framebuffer::new(RESOLUTION);

    c.bench_function(name, |b| {
        b.iter(|| session.render_into(&mut fb).unwrap());
    });
}

pub fn render_frame_plain(c: &mut Criterion) {
    bench_frame(c, "frame", false, false);
}

pub fn render_frame_ert(c: &mut Criterion) {
    bench_frame(c, "frame ert", false, true);
}

pub fn render_frame_shadows(c: &mut Criterion) {
    bench_frame(c, "frame shadows", true, true);
}
