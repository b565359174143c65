//! Drive a scene without a window and log what happens.
//!
//! Run with: `RUST_LOG=debug cargo run --example headless [config.json]`
//!
//! With no argument the default tree is used. Every second of simulated time
//! prints the state, the group rotation and how many particles have settled.

use arbor::prelude::*;
use arbor::Result;

const DT: f32 = 1.0 / 60.0;

#[derive(Default)]
struct NullSink {
    bytes: usize,
}

impl InstanceSink for NullSink {
    fn upload_transforms(&mut self, transforms: &[InstanceTransform]) {
        self.bytes += std::mem::size_of_val(transforms);
    }

    fn upload_colors(&mut self, colors: &[InstanceColor]) {
        self.bytes += std::mem::size_of_val(colors);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("wgpu_core", log::LevelFilter::Off)
        .filter_module("wgpu_hal", log::LevelFilter::Off)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MorphConfig::load(path)?,
        None => MorphConfig::default(),
    };
    let mut scene = MorphScene::new(config)?;
    let mut sink = NullSink::default();
    log::info!("{} particles in {} populations", scene.particle_count(), scene.populations().len());

    // assembled -> dispersed -> (new text) -> assembled
    let script: [(u32, fn(&mut MorphScene) -> Result<()>); 3] = [
        (2, |scene| {
            scene.toggle();
            Ok(())
        }),
        (5, |scene| scene.set_display_text(&TextConfig::greeting("World"))),
        (8, |scene| {
            scene.toggle();
            Ok(())
        }),
    ];

    for second in 0..12u32 {
        for (at, action) in &script {
            if *at == second {
                action(&mut scene)?;
            }
        }

        let mut stats = FrameStats::default();
        for _ in 0..60 {
            stats = scene.tick(DT);
            for population in scene.populations_mut() {
                population.upload(&mut sink);
            }
        }

        log::info!(
            "t={:>2}s {:?} yaw={:+.3} settled={}/{} fully_assembled={}",
            second + 1,
            scene.state(),
            scene.group_rotation(),
            stats.settled,
            scene.particle_count(),
            scene.is_fully_assembled()
        );
    }

    log::info!("uploaded {} KiB of instance data", sink.bytes / 1024);
    Ok(())
}
