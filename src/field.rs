use glam::Vec2;
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::error::{OceanError, Result, Stage};
use crate::grid::{Finite, Grid};
use crate::params::{CascadeConfig, OceanConfig, LAYERS_PER_CASCADE};
use crate::spectrum::{layer_density, DerivedSpectrumParameters, WaveMedium};

/// Fraction of the cutoff band over which the window ramps to zero
const CUTOFF_TAPER: f32 = 0.05;

/// Initial amplitude of a bin and the conjugate of its mirrored bin
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PackedSample {
    pub h0: Complex32,      // h0(k)
    pub h0_conj: Complex32, // conj(h0(-k))
}

impl Finite for PackedSample {
    fn is_finite_value(&self) -> bool {
        self.h0.is_finite_value() && self.h0_conj.is_finite_value()
    }
}

/// Conjugate-packed initial spectrum of one cascade
pub type PackedSpectrum = Grid<PackedSample>;

/// Global inputs shared by every cascade's spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSettings {
    pub resolution: usize,
    pub seed: u32,
    pub low_cutoff: f32,
    pub high_cutoff: f32,
    pub medium: WaveMedium,
}

impl FieldSettings {
    pub fn from_config(config: &OceanConfig) -> Self {
        Self {
            resolution: config.resolution,
            seed: config.seed,
            low_cutoff: config.low_cutoff,
            high_cutoff: config.high_cutoff,
            medium: WaveMedium {
                gravity: config.gravity,
                depth: config.depth,
            },
        }
    }
}

/// Wave vector of bin `(x, z)` on a centered grid: bin N/2 holds k = 0.
pub fn wave_vector(x: usize, z: usize, resolution: usize, delta_k: f32) -> Vec2 {
    let half = (resolution / 2) as f32;
    Vec2::new((x as f32 - half) * delta_k, (z as f32 - half) * delta_k)
}

/// Band-pass weight: 1 inside [low, high], easing to 0 at both edges, 0 outside.
pub fn cutoff_window(k: f32, low: f32, high: f32) -> f32 {
    if k < low || k > high {
        return 0.0;
    }
    let rise = if low > 0.0 {
        smoothstep(low, low * (1.0 + CUTOFF_TAPER), k)
    } else {
        1.0
    };
    let fall = 1.0 - smoothstep(high * (1.0 - CUTOFF_TAPER), high, k);
    rise * fall
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Seed of the random stream for one grid row of one cascade (SplitMix64 finalizer).
fn row_seed(seed: u32, cascade: usize, row: usize) -> u64 {
    let mut z = (seed as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((cascade as u64) << 32)
        .wrapping_add(row as u64);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Evaluate the directional spectrum of one cascade and draw its random complex amplitudes.
///
/// Every bin consumes the same number of random draws whether or not it lies
/// inside the cutoff band, so a bin's phase depends only on the seed, the
/// cascade index and its position.
///
/// Row and column 0 (the self-mirrored Nyquist bins) stay empty; odd
/// derivative fields are anti-Hermitian there and would mix packed channels.
pub fn generate_initial_spectrum(
    cascade_index: usize,
    cascade: &CascadeConfig,
    layers: &[DerivedSpectrumParameters; LAYERS_PER_CASCADE],
    settings: &FieldSettings,
) -> Result<Grid<Complex32>> {
    let n = settings.resolution;
    let delta_k = cascade.delta_k();
    let mut grid = Grid::new(n, Complex32::new(0.0, 0.0))?;

    grid.par_rows_mut().enumerate().for_each(|(z, row)| {
        let mut rng = StdRng::seed_from_u64(row_seed(settings.seed, cascade_index, z));

        for (x, sample) in row.iter_mut().enumerate() {
            let xi_r: f32 = rng.sample(StandardNormal);
            let xi_i: f32 = rng.sample(StandardNormal);

            let k = wave_vector(x, z, n, delta_k);
            let k_length = k.length();
            let window = cutoff_window(k_length, settings.low_cutoff, settings.high_cutoff);
            if x == 0 || z == 0 || k_length <= 0.0 || window <= 0.0 {
                *sample = Complex32::new(0.0, 0.0);
                continue;
            }

            let density: f32 = layers
                .iter()
                .map(|layer| layer_density(k, layer, &settings.medium))
                .sum();
            let d_omega_dk = settings.medium.dispersion_derivative(k_length);
            let amplitude = (2.0 * density * d_omega_dk.abs() / k_length * delta_k * delta_k).sqrt() * window;

            *sample = Complex32::new(xi_r, xi_i) * amplitude;
        }
    });

    if let Some((x, z)) = grid.first_non_finite() {
        return Err(OceanError::NumericDegeneracy {
            stage: Stage::InitialSpectrum,
            cascade: cascade_index,
            x,
            z,
        });
    }

    Ok(grid)
}

/// Store next to every sample the conjugate of its point reflection.
///
/// The drawn phases are kept; evolving `h0(k) e^{iwt} + conj(h0(-k)) e^{-iwt}`
/// then yields a Hermitian field whose inverse transform is real.
pub fn pack_conjugate(initial: &Grid<Complex32>) -> Result<PackedSpectrum> {
    Grid::from_fn(initial.size(), |x, z| {
        let (mx, mz) = initial.mirror(x, z);
        PackedSample {
            h0: initial[(x, z)],
            h0_conj: initial[(mx, mz)].conj(),
        }
    })
}
