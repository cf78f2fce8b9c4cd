use num_complex::Complex32;
use rayon::prelude::*;
use std::f32::consts::PI;

use crate::error::{OceanError, Result, Stage};
use crate::field::{wave_vector, PackedSample, PackedSpectrum};
use crate::grid::Grid;
use crate::params::CascadeConfig;
use crate::spectrum::WaveMedium;

/// The four packed fields of one cascade: frequency domain after evolution,
/// spatial domain once inverse transformed in place.
///
/// Each grid packs two real-valued quantities as `a + i b`; both are
/// Hermitian, so one inverse transform recovers `a` in the real part and `b`
/// in the imaginary part.
#[derive(Debug, Clone)]
pub struct PackedFields {
    pub displacement: Grid<Complex32>,      // Dx + i Dz
    pub height: Grid<Complex32>,            // Dy + i dDz/dx
    pub slope: Grid<Complex32>,             // dDy/dx + i dDy/dz
    pub displacement_slope: Grid<Complex32>, // dDx/dx + i dDz/dz
}

impl PackedFields {
    pub fn grids(&self) -> [&Grid<Complex32>; 4] {
        [&self.displacement, &self.height, &self.slope, &self.displacement_slope]
    }

    pub fn grids_mut(&mut self) -> [&mut Grid<Complex32>; 4] {
        [
            &mut self.displacement,
            &mut self.height,
            &mut self.slope,
            &mut self.displacement_slope,
        ]
    }
}

/// Seconds of game time with the number of frames advanced so far
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    elapsed: f64,
    frame: u64,
}

impl SimulationClock {
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt as f64;
        self.frame += 1;
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time(&self, speed: f32, repeat_time: f32) -> f32 {
        simulation_time(self.elapsed, speed, repeat_time)
    }
}

/// Scaled simulation time, wrapped into [0, repeat_time) when looping is enabled.
pub fn simulation_time(elapsed: f64, speed: f32, repeat_time: f32) -> f32 {
    let t = elapsed * speed as f64;
    if repeat_time > 0.0 {
        t.rem_euclid(repeat_time as f64) as f32
    } else {
        t as f32
    }
}

/// Dispersion frequency, snapped down to a multiple of `2 pi / repeat_time` so the animation loops.
pub fn angular_frequency(k: f32, medium: &WaveMedium, repeat_time: f32) -> f32 {
    let omega = medium.dispersion(k);
    if repeat_time > 0.0 {
        let base = 2.0 * PI / repeat_time;
        (omega / base).floor() * base
    } else {
        omega
    }
}

/// h~(k, t) = h0(k) e^{i w t} + conj(h0(-k)) e^{-i w t}
pub fn evolve_sample(sample: &PackedSample, omega: f32, time: f32) -> Complex32 {
    let (s, c) = (omega * time).sin_cos();
    let exponent = Complex32::new(c, s);
    sample.h0 * exponent + sample.h0_conj * exponent.conj()
}

/// Height spectrum h~(k, t) alone, without the derived components.
pub fn height_spectrum(
    packed: &PackedSpectrum,
    cascade: &CascadeConfig,
    medium: &WaveMedium,
    repeat_time: f32,
    time: f32,
) -> Result<Grid<Complex32>> {
    let n = packed.size();
    let delta_k = cascade.delta_k();
    Grid::from_fn(n, |x, z| {
        let k = wave_vector(x, z, n, delta_k).length();
        evolve_sample(&packed[(x, z)], angular_frequency(k, medium, repeat_time), time)
    })
}

/// Advance every bin of a cascade to `time` and expand it into the packed displacement and slope spectra.
pub fn evolve(
    cascade_index: usize,
    packed: &PackedSpectrum,
    cascade: &CascadeConfig,
    medium: &WaveMedium,
    repeat_time: f32,
    time: f32,
) -> Result<PackedFields> {
    let n = packed.size();
    let delta_k = cascade.delta_k();
    let zero = Complex32::new(0.0, 0.0);
    let i = Complex32::i();

    let mut evolved = PackedFields {
        displacement: Grid::new(n, zero)?,
        height: Grid::new(n, zero)?,
        slope: Grid::new(n, zero)?,
        displacement_slope: Grid::new(n, zero)?,
    };

    (
        evolved.displacement.par_rows_mut(),
        evolved.height.par_rows_mut(),
        evolved.slope.par_rows_mut(),
        evolved.displacement_slope.par_rows_mut(),
    )
        .into_par_iter()
        .enumerate()
        .for_each(|(z, (displacement, height, slope, displacement_slope))| {
            for x in 0..n {
                let k = wave_vector(x, z, n, delta_k);
                let k_length = k.length();
                let k_rcp = if k_length < 1e-4 { 1.0 } else { 1.0 / k_length };

                let omega = angular_frequency(k_length, medium, repeat_time);
                let h = evolve_sample(&packed[(x, z)], omega, time);
                let ih = i * h;

                let dx = ih * k.x * k_rcp;
                let dz = ih * k.y * k_rcp;
                let dy_dx = ih * k.x;
                let dy_dz = ih * k.y;
                let dx_dx = -h * k.x * k.x * k_rcp;
                let dz_dz = -h * k.y * k.y * k_rcp;
                let dz_dx = -h * k.x * k.y * k_rcp;

                displacement[x] = dx + i * dz;
                height[x] = h + i * dz_dx;
                slope[x] = dy_dx + i * dy_dz;
                displacement_slope[x] = dx_dx + i * dz_dz;
            }
        });

    for grid in evolved.grids() {
        if let Some((x, z)) = grid.first_non_finite() {
            return Err(OceanError::NumericDegeneracy {
                stage: Stage::TimeEvolution,
                cascade: cascade_index,
                x,
                z,
            });
        }
    }

    Ok(evolved)
}
