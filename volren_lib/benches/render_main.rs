use criterion::{criterion_group, criterion_main, Criterion};
use render_benchmarks::{animation::*, frame::*};

mod common;
mod render_benchmarks;

criterion_group! {
    name = frames;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = render_frame_plain, render_frame_ert, render_frame_shadows
}

criterion_group! {
    name = animation;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = render_orbit
}

criterion_main!(frames, animation);
