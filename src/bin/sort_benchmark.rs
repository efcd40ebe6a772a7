/// Splat Sort Benchmark Binary
///
/// Sorts a random splat cloud on the GPU for a number of frames while orbiting
/// the camera, validates the first frame against the host model and reports
/// per-pass timings when the adapter supports timestamp queries.
///
/// Usage: sort_benchmark [splat_count] [frames] [config.toml]

use std::time::Instant;

use anyhow::{bail, Context, Result};
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use splat_sort::{
    CameraUniforms, GpuContext, GpuPassTimer, HostRadixSorter, PassInstrumentation, SortConfig, SplatCloud,
    SplatSorter,
};

const DEFAULT_SPLAT_COUNT: usize = 1 << 20;
const DEFAULT_FRAMES: u32 = 60;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let splat_count = match args.get(1) {
        Some(arg) => arg.parse().context("splat count must be an integer")?,
        None => DEFAULT_SPLAT_COUNT,
    };
    let frames = match args.get(2) {
        Some(arg) => arg.parse().context("frame count must be an integer")?,
        None => DEFAULT_FRAMES,
    };
    let config = match args.get(3) {
        Some(path) => SortConfig::load(path)?,
        None => SortConfig::default(),
    };

    pollster::block_on(run(splat_count, frames, config))
}

fn orbit_camera(frame: u32) -> CameraUniforms {
    let angle = frame as f32 * std::f32::consts::TAU / 120.0;
    let eye = Vec3::new(angle.cos() * 250.0, 60.0, angle.sin() * 250.0);
    CameraUniforms::look_at(eye, Vec3::ZERO, 60f32.to_radians(), 16.0 / 9.0)
}

async fn run(splat_count: usize, frames: u32, config: SortConfig) -> Result<()> {
    println!("Splat Sort GPU Benchmark");
    println!("========================\n");

    let ctx = GpuContext::headless().await.context("failed to acquire a GPU")?;
    println!("Adapter: {} ({:?})", ctx.adapter_info.name, ctx.adapter_info.backend);
    println!("Timestamps: {}", if ctx.supports_timestamps() { "yes" } else { "no" });
    println!("Splats:  {}", splat_count);
    println!("Frames:  {}\n", frames);

    let mut rng = StdRng::seed_from_u64(42);
    let positions: Vec<Vec3> = (0..splat_count)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            )
        })
        .collect();

    let scene = SplatCloud::from_positions(&ctx.device, &positions)?;
    let camera_buffer = orbit_camera(0).create_buffer(&ctx.device);

    let init_start = Instant::now();
    let sorter = SplatSorter::new(&ctx.device, &camera_buffer, &scene, config.clone()).await?;
    println!("Sorter ready in {:?} ({} tiles)\n", init_start.elapsed(), sorter.tile_count());

    let timer = GpuPassTimer::new(&ctx.device, &ctx.queue);
    let instrumentation: Option<&dyn PassInstrumentation> = if timer.is_enabled() { Some(&timer) } else { None };

    let mut pass_totals_us = vec![0.0f64; splat_sort::SortEvent::all().len()];
    let mut timed_frames = 0u32;
    let run_start = Instant::now();

    for frame in 0..frames {
        let camera = orbit_camera(frame);
        camera.write(&ctx.queue, &camera_buffer);

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Sort Benchmark Encoder"),
        });
        sorter.record_sort(&mut encoder, instrumentation);
        ctx.queue.submit(Some(encoder.finish()));

        if frame == 0 {
            validate_frame(&ctx, &sorter, &camera, &positions, &config).await?;
        }

        if let Some(timings) = timer.read_durations_us(&ctx.device).await? {
            for (total, timing) in pass_totals_us.iter_mut().zip(&timings) {
                *total += timing.micros;
            }
            timed_frames += 1;
        }
    }

    ctx.device.poll(wgpu::Maintain::Wait);
    let elapsed = run_start.elapsed();
    println!(
        "Wall clock: {:.3} ms/frame over {} frames",
        elapsed.as_secs_f64() * 1000.0 / frames.max(1) as f64,
        frames
    );

    if timed_frames > 0 {
        println!("\nGPU pass timings (mean over {} frames):", timed_frames);
        let mut frame_total = 0.0;
        for (event, total) in splat_sort::SortEvent::all().into_iter().zip(&pass_totals_us) {
            let mean = total / timed_frames as f64;
            frame_total += mean;
            println!("  {:<14} {:>10.1} us", event.label(), mean);
        }
        println!("  {:<14} {:>10.1} us", "total", frame_total);
        if frame_total > 0.0 {
            println!("  {:.1} M splats/s", splat_count as f64 / frame_total);
        }
    } else {
        println!("\nTimestamp queries unavailable, no per-pass timings");
    }

    sorter.destroy();
    scene.destroy();
    Ok(())
}

async fn validate_frame(
    ctx: &GpuContext,
    sorter: &SplatSorter,
    camera: &CameraUniforms,
    positions: &[Vec3],
    config: &SortConfig,
) -> Result<()> {
    let entries = sorter.read_sorted_entries(&ctx.device, &ctx.queue).await?;
    let args = sorter.read_draw_args(&ctx.device, &ctx.queue).await?;

    if args.instance_count as usize != positions.len() {
        bail!("draw record holds {} instances, expected {}", args.instance_count, positions.len());
    }

    let mut seen = vec![false; positions.len()];
    for entry in &entries {
        let slot = seen
            .get_mut(entry.index as usize)
            .with_context(|| format!("entry index {} out of range", entry.index))?;
        if *slot {
            bail!("entry {} appears twice", entry.index);
        }
        *slot = true;
    }

    if let Some(pair) = entries.windows(2).find(|pair| pair[0].key > pair[1].key) {
        bail!("keys out of order: {:?}", pair);
    }

    let mut host = HostRadixSorter::new(config.clone(), positions.len())?;
    host.derive_keys(&camera.view_matrix(), positions);
    let report = host.sort();

    let matching = entries
        .iter()
        .zip(host.sorted())
        .filter(|(gpu, host)| gpu == host)
        .count();

    log::info!(
        "[sort_benchmark] Frame 0 valid: {} of {} entries identical to the host model ({} host lookback fallbacks)",
        matching,
        entries.len(),
        report.total_fallbacks()
    );

    Ok(())
}
