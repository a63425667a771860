use volren_lib::render::AnimationPlan;

use crate::common::*;

// Ten orbit steps, camera moves between frames
pub fn render_orbit(c: &mut Criterion) {
    let mut session = bench_session(false, true);
    let plan = AnimationPlan {
        steps: 10,
        ..Default::default()
    };

    c.bench_function("orbit 10 steps", |b| {
        b.iter(|| session.animate_with(plan, |_, _, _| {}).unwrap());
    });
}
