//! JONSWAP spectrum model.
//!
//! Converts the wind/fetch description of a layer into spectral parameters
//! and evaluates the directional energy density used to seed the initial
//! frequency field. The peak frequency follows `22 (g^2 / (U F))^0.33`, the
//! same quantity as `22 (U F / g^2)^-0.33`.

use glam::Vec2;
use std::f32::consts::PI;

use crate::error::{OceanError, Result};
use crate::params::LayerParameters;

/// Upper clamp on `tanh` arguments; `tanh(20)` is 1 to f32 precision
const TANH_CLAMP: f32 = 20.0;

/// JONSWAP energy scale from fetch and wind speed.
pub fn jonswap_alpha(fetch: f32, wind_speed: f32, gravity: f32) -> f32 {
    0.076 * (wind_speed * wind_speed / (fetch * gravity)).powf(0.22)
}

/// JONSWAP peak angular frequency from fetch and wind speed.
pub fn jonswap_peak_frequency(fetch: f32, wind_speed: f32, gravity: f32) -> f32 {
    22.0 * (gravity * gravity / (wind_speed * fetch)).powf(0.33)
}

/// Map a normalized wind strength in [0, 1] to a wind speed in m/s.
pub fn wind_speed_from_normalized(wind: f32) -> f32 {
    10.0 * wind.clamp(0.0, 1.0)
}

/// Wind direction in degrees folded into [0, 360).
pub fn normalize_direction(degrees: f32) -> f32 {
    degrees.rem_euclid(360.0)
}

/// Spectral parameters of one layer, ready for evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSpectrumParameters {
    pub scale: f32,
    pub angle: f32,           // Wind direction in radians
    pub spread_blend: f32,
    pub swell: f32,
    pub alpha: f32,
    pub peak_frequency: f32,
    pub gamma: f32,
    pub short_waves_fade: f32,
}

impl DerivedSpectrumParameters {
    /// Parameters of a layer that contributes nothing
    pub fn disabled() -> Self {
        Self {
            scale: 0.0,
            angle: 0.0,
            spread_blend: 0.0,
            swell: 0.01,
            alpha: 0.0,
            peak_frequency: 0.0,
            gamma: 1.0,
            short_waves_fade: 0.0,
        }
    }

    /// Derive spectral parameters, rejecting layers whose spectrum would not be finite.
    pub fn from_layer(layer: &LayerParameters, gravity: f32) -> Result<Self> {
        if !layer.is_enabled() {
            return Ok(Self::disabled());
        }
        if !(layer.wind_speed > 0.0) || !(layer.fetch > 0.0) || !(gravity > 0.0) {
            return Err(OceanError::config(
                "layer",
                format!(
                    "wind speed ({}), fetch ({}) and gravity ({gravity}) must all be positive",
                    layer.wind_speed, layer.fetch
                ),
            ));
        }

        let alpha = jonswap_alpha(layer.fetch, layer.wind_speed, gravity);
        let peak_frequency = jonswap_peak_frequency(layer.fetch, layer.wind_speed, gravity);
        if !alpha.is_finite() || !peak_frequency.is_finite() || peak_frequency <= 0.0 {
            return Err(OceanError::config(
                "layer",
                format!("degenerate JONSWAP parameters (alpha = {alpha}, peak frequency = {peak_frequency})"),
            ));
        }

        Ok(Self {
            scale: layer.scale,
            angle: normalize_direction(layer.wind_direction).to_radians(),
            spread_blend: layer.spread_blend,
            swell: layer.swell.clamp(0.01, 1.0),
            alpha,
            peak_frequency,
            gamma: layer.peak_enhancement,
            short_waves_fade: layer.short_waves_fade,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.scale > 0.0
    }
}

/// Gravity and depth of the water body, which fix the dispersion relation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveMedium {
    pub gravity: f32,
    pub depth: f32,
}

impl WaveMedium {
    /// Angular frequency of a wave with wavenumber `k` (finite depth)
    pub fn dispersion(&self, k: f32) -> f32 {
        (self.gravity * k * (k * self.depth).min(TANH_CLAMP).tanh()).sqrt()
    }

    /// d(omega)/dk, needed to convert the frequency spectrum into a wavenumber spectrum
    pub fn dispersion_derivative(&self, k: f32) -> f32 {
        let kd = (k * self.depth).min(TANH_CLAMP);
        let th = kd.tanh();
        let ch = kd.cosh();
        self.gravity * (self.depth * k / ch / ch + th) / self.dispersion(k) / 2.0
    }

    /// Kitaigorodskii depth attenuation (TMA correction)
    pub fn tma_correction(&self, omega: f32) -> f32 {
        let omega_h = omega * (self.depth / self.gravity).sqrt();
        if omega_h <= 1.0 {
            0.5 * omega_h * omega_h
        } else if omega_h < 2.0 {
            1.0 - 0.5 * (2.0 - omega_h) * (2.0 - omega_h)
        } else {
            1.0
        }
    }
}

/// JONSWAP frequency spectrum S(omega) with the TMA shallow-water correction.
pub fn jonswap(omega: f32, spectrum: &DerivedSpectrumParameters, medium: &WaveMedium) -> f32 {
    let peak = spectrum.peak_frequency;
    let sigma = if omega <= peak { 0.07 } else { 0.09 };
    let r = (-(omega - peak) * (omega - peak) / 2.0 / sigma / sigma / peak / peak).exp();

    let one_over_omega = 1.0 / omega;
    let peak_over_omega = peak / omega;

    spectrum.scale
        * medium.tma_correction(omega)
        * spectrum.alpha
        * medium.gravity
        * medium.gravity
        * one_over_omega.powi(5)
        * (-1.25 * peak_over_omega.powi(4)).exp()
        * spectrum.gamma.abs().powf(r)
}

/// Normalization of the cos-2s spreading function (polynomial fit of its Gamma-function form).
pub fn normalization_factor(s: f32) -> f32 {
    let s2 = s * s;
    let s3 = s2 * s;
    let s4 = s3 * s;
    if s < 5.0 {
        -0.000564 * s4 + 0.00776 * s3 - 0.044 * s2 + 0.192 * s + 0.163
    } else {
        -4.80e-08 * s4 + 1.07e-05 * s3 - 9.53e-04 * s2 + 5.90e-02 * s + 3.93e-01
    }
}

pub fn cosine_2s(theta: f32, s: f32) -> f32 {
    normalization_factor(s) * (0.5 * theta).cos().abs().powf(2.0 * s)
}

/// Spreading exponent, narrowest at the spectral peak
pub fn spread_power(omega: f32, peak_omega: f32) -> f32 {
    if omega > peak_omega {
        9.77 * (omega / peak_omega).abs().powf(-2.5)
    } else {
        6.97 * (omega / peak_omega).abs().powf(5.0)
    }
}

/// Directional spreading D(theta, omega) around the layer's wind angle.
pub fn direction_spectrum(theta: f32, omega: f32, spectrum: &DerivedSpectrumParameters) -> f32 {
    let ratio = (omega / spectrum.peak_frequency).min(TANH_CLAMP);
    let s = spread_power(omega, spectrum.peak_frequency) + 16.0 * ratio.tanh() * spectrum.swell * spectrum.swell;
    let relative = theta - spectrum.angle;

    let base = 2.0 / PI * relative.cos() * relative.cos();
    base + (cosine_2s(relative, s) - base) * spectrum.spread_blend
}

/// Damping of waves much shorter than the fade length
pub fn short_waves_fade(k: f32, spectrum: &DerivedSpectrumParameters) -> f32 {
    (-spectrum.short_waves_fade * spectrum.short_waves_fade * k * k).exp()
}

/// Directional energy density of one layer at wave vector `k` (|k| > 0).
pub fn layer_density(k: Vec2, spectrum: &DerivedSpectrumParameters, medium: &WaveMedium) -> f32 {
    if !spectrum.is_enabled() {
        return 0.0;
    }
    let k_length = k.length();
    let theta = k.y.atan2(k.x);
    let omega = medium.dispersion(k_length);

    jonswap(omega, spectrum, medium)
        * direction_spectrum(theta, omega, spectrum)
        * short_waves_fade(k_length, spectrum)
}
