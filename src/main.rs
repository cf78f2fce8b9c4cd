use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use std::path::PathBuf;

use ocean_spectrum::prelude::*;

/// Command-line tool to synthesize FFT ocean displacement, slope and foam maps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grid resolution per cascade (power of two)
    #[arg(short, long, default_value_t = 256)]
    resolution: usize,

    /// Random seed for the initial spectrum
    #[arg(long, default_value_t = 42)]
    seed: u32,

    /// Wind speed in m/s for the wind sea of every cascade
    #[arg(long, default_value_t = 10.0)]
    wind_speed: f32,

    /// Fetch in meters
    #[arg(long, default_value_t = 100000.0)]
    fetch: f32,

    /// Wind direction in degrees
    #[arg(long, default_value_t = 22.0)]
    wind_direction: f32,

    /// Horizontal displacement (choppiness) on both axes
    #[arg(short, long, default_value_t = 1.0)]
    choppiness: f32,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 60)]
    frames: u32,

    /// Time step per frame in seconds
    #[arg(long, default_value_t = 1.0 / 30.0)]
    dt: f32,

    /// Randomize the largest cascade from a normalized wind strength (0.0-1.0)
    #[arg(long)]
    preset_wind: Option<f32>,

    /// Output directory for the PNG maps
    #[arg(short, long, default_value = "ocean_maps")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    println!("Synthesizing FFT ocean...");
    println!("Grid: {}x{} per cascade, {} cascades", args.resolution, args.resolution, ocean_spectrum::CASCADE_COUNT);
    println!(
        "Wind: speed={} m/s, direction={} deg, fetch={} m, choppiness={}",
        args.wind_speed, args.wind_direction, args.fetch, args.choppiness
    );

    let config = build_config(&args);
    let mut ocean = Ocean::new(config).context("Invalid ocean configuration")?;

    if let Some(layers) = ocean.spectrum_parameters(0) {
        for (i, layer) in layers.iter().filter(|l| l.is_enabled()).enumerate() {
            println!(
                "Largest cascade layer {}: alpha = {:.5}, peak frequency = {:.4} rad/s",
                i, layer.alpha, layer.peak_frequency
            );
        }
    }

    println!("Simulating {} frames with dt={:.4}s...", args.frames, args.dt);
    let mut skipped = 0;
    for _ in 0..args.frames {
        if let FrameStatus::Skipped { frame, reason } = ocean.update(args.dt)? {
            println!("Frame {frame} skipped: {reason}");
            skipped += 1;
        }
    }

    let frame = ocean.frame();
    let (min_height, max_height) = frame.cascades[0]
        .displacement
        .as_slice()
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d.y), hi.max(d.y)));
    println!(
        "Frame {} at t={:.3}s: largest cascade height range min = {:.4}, max = {:.4} ({} skipped)",
        frame.frame, frame.time, min_height, max_height, skipped
    );
    let center = frame.sample(Vec2::ZERO);
    println!(
        "Surface at origin: height = {:.4}, foam = {:.3}",
        center.displacement.y, center.foam
    );

    println!("Exporting to {}...", args.output.display());
    let written = export_frame(&frame, &args.output)
        .with_context(|| format!("Failed to export maps to {}", args.output.display()))?;

    println!("Done! Wrote {} images", written.len());
    Ok(())
}

/// Apply the command-line wind to every cascade's wind sea
fn build_config(args: &Args) -> OceanConfig {
    let mut config = OceanConfig {
        resolution: args.resolution,
        seed: args.seed,
        lambda: Vec2::splat(args.choppiness),
        ..OceanConfig::default()
    };

    for cascade in config.cascades.iter_mut() {
        let wind_sea = &mut cascade.layers[0];
        wind_sea.wind_speed = args.wind_speed;
        wind_sea.wind_direction = args.wind_direction;
        wind_sea.fetch = args.fetch;
    }

    if let Some(wind) = args.preset_wind {
        println!("Applying wind preset {wind:.2}");
        apply_wind_preset(&mut config, wind, args.seed as u64);
    }

    config
}
