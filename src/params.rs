use glam::Vec2;

use crate::error::{OceanError, Result};

/// Number of independently scaled spectral layers tiled over the surface
pub const CASCADE_COUNT: usize = 4;

/// Spectra blended into each cascade
pub const LAYERS_PER_CASCADE: usize = 2;

/// Wind and fetch description of one spectrum layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParameters {
    pub scale: f32,              // Energy gain, 0 disables the layer
    pub wind_speed: f32,         // Wind speed in m/s
    pub wind_direction: f32,     // Wind direction in degrees
    pub fetch: f32,              // Distance over which the wind has blown, in meters
    pub spread_blend: f32,       // 0 = plain cos^2 spread, 1 = frequency dependent cos-2s spread
    pub swell: f32,              // Narrows the directional spread
    pub peak_enhancement: f32,   // JONSWAP gamma
    pub short_waves_fade: f32,   // Damping length for short waves
}

impl Default for LayerParameters {
    fn default() -> Self {
        Self {
            scale: 1.0,
            wind_speed: 10.0,
            wind_direction: 22.0,
            fetch: 100000.0,
            spread_blend: 0.9,
            swell: 0.2,
            peak_enhancement: 3.3,
            short_waves_fade: 0.01,
        }
    }
}

impl LayerParameters {
    /// A layer that contributes no energy
    pub fn disabled() -> Self {
        Self {
            scale: 0.0,
            wind_speed: 0.0,
            ..Self::default()
        }
    }

    /// Long, narrow swell arriving from a different direction than the local wind sea
    pub fn swell() -> Self {
        Self {
            scale: 0.5,
            wind_speed: 4.0,
            wind_direction: 59.0,
            fetch: 100000.0,
            spread_blend: 1.0,
            swell: 1.0,
            peak_enhancement: 1.0,
            short_waves_fade: 0.5,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.scale > 0.0
    }

    fn validate(&self, field: &str) -> Result<()> {
        check_range(&format!("{field}.scale"), self.scale, 0.0, 5.0)?;
        check_range(&format!("{field}.wind_direction"), self.wind_direction, 0.0, 360.0)?;
        check_range(&format!("{field}.fetch"), self.fetch, 1.0, 100000.0)?;
        check_range(&format!("{field}.spread_blend"), self.spread_blend, 0.0, 1.0)?;
        check_range(&format!("{field}.swell"), self.swell, 0.01, 1.0)?;
        check_range(&format!("{field}.peak_enhancement"), self.peak_enhancement, 0.001, 7.0)?;
        check_min(&format!("{field}.short_waves_fade"), self.short_waves_fade, 0.0)?;
        check_min(&format!("{field}.wind_speed"), self.wind_speed, 0.0)?;

        if self.is_enabled() && self.wind_speed <= 0.0 {
            return Err(OceanError::config(
                format!("{field}.wind_speed"),
                "must be greater than 0 for an enabled layer",
            ));
        }
        Ok(())
    }
}

/// Foam seeding and decay controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoamParams {
    pub bias: f32,        // Jacobian level below which foam is seeded
    pub threshold: f32,   // Seed level that must be exceeded before foam is added
    pub add: f32,         // Gain applied to the seed above threshold
    pub decay_rate: f32,  // Exponential decay per second
}

impl Default for FoamParams {
    fn default() -> Self {
        Self {
            bias: -0.5,
            threshold: 0.0,
            add: 0.5,
            decay_rate: 0.05,
        }
    }
}

impl FoamParams {
    fn validate(&self) -> Result<()> {
        check_range("foam.bias", self.bias, -2.0, 2.0)?;
        check_range("foam.threshold", self.threshold, -10.0, 10.0)?;
        check_range("foam.add", self.add, 0.0, 1.0)?;
        check_range("foam.decay_rate", self.decay_rate, 0.0, 1.0)
    }
}

/// One cascade: its world-space tile and the spectra blended into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeConfig {
    pub length_scale: f32,             // World-space size of one tile in meters
    pub tile: f32,                     // Repetition factor applied when sampling
    pub contribute_displacement: bool, // Horizontal displacement enabled for this cascade
    pub layers: [LayerParameters; LAYERS_PER_CASCADE],
}

impl CascadeConfig {
    pub fn new(length_scale: f32, layers: [LayerParameters; LAYERS_PER_CASCADE]) -> Self {
        Self {
            length_scale,
            tile: 1.0,
            contribute_displacement: true,
            layers,
        }
    }

    /// Spacing between neighbouring wavenumbers on this cascade's grid
    pub fn delta_k(&self) -> f32 {
        2.0 * std::f32::consts::PI / self.length_scale
    }

    fn validate(&self, field: &str) -> Result<()> {
        check_range(&format!("{field}.length_scale"), self.length_scale, 0.0, 2048.0)?;
        if self.length_scale <= 0.0 {
            return Err(OceanError::config(format!("{field}.length_scale"), "must be greater than 0"));
        }
        check_range(&format!("{field}.tile"), self.tile, 0.01, 3.0)?;
        for (i, layer) in self.layers.iter().enumerate() {
            layer.validate(&format!("{field}.layers[{i}]"))?;
        }
        Ok(())
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OceanConfig {
    pub resolution: usize,                // Grid resolution N (N x N), power of two
    pub seed: u32,                        // Random seed for the initial spectrum
    pub low_cutoff: f32,                  // Smallest wavenumber kept
    pub high_cutoff: f32,                 // Largest wavenumber kept
    pub gravity: f32,                     // Gravity acceleration
    pub depth: f32,                       // Water depth in meters
    pub repeat_time: f32,                 // Animation period in seconds, 0 disables looping
    pub speed: f32,                       // Simulation time multiplier
    pub lambda: Vec2,                     // Horizontal displacement (choppiness) per axis
    pub displacement_depth_falloff: f32,  // Displacement attenuation with view depth
    pub normal_strength: f32,             // Slope gain used when building normals
    pub foam: FoamParams,
    pub cascades: [CascadeConfig; CASCADE_COUNT],
}

impl Default for OceanConfig {
    fn default() -> Self {
        let wind_sea = LayerParameters::default();
        let cascade = |length_scale: f32, contribute_displacement: bool, second: LayerParameters| CascadeConfig {
            length_scale,
            tile: 1.0,
            contribute_displacement,
            layers: [wind_sea, second],
        };

        Self {
            resolution: 256,
            seed: 0,
            low_cutoff: 0.0001,
            high_cutoff: 9000.0,
            gravity: 9.81,
            depth: 20.0,
            repeat_time: 200.0,
            speed: 1.0,
            lambda: Vec2::new(1.0, 1.0),
            displacement_depth_falloff: 1.0,
            normal_strength: 1.0,
            foam: FoamParams::default(),
            cascades: [
                cascade(1024.0, true, LayerParameters::swell()),
                cascade(256.0, true, LayerParameters::disabled()),
                cascade(64.0, false, LayerParameters::disabled()),
                cascade(16.0, false, LayerParameters::disabled()),
            ],
        }
    }
}

impl OceanConfig {
    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_power_of_two() || !(2..=4096).contains(&self.resolution) {
            return Err(OceanError::config(
                "resolution",
                format!("must be a power of two in [2, 4096], got {}", self.resolution),
            ));
        }
        if self.seed > 100000 {
            return Err(OceanError::config("seed", format!("must be in [0, 100000], got {}", self.seed)));
        }

        check_range("low_cutoff", self.low_cutoff, 0.0, 0.1)?;
        check_range("high_cutoff", self.high_cutoff, 0.1, 9000.0)?;
        check_range("gravity", self.gravity, 0.0, 20.0)?;
        if self.gravity <= 0.0 {
            return Err(OceanError::config("gravity", "must be greater than 0"));
        }
        check_range("depth", self.depth, 2.0, 20.0)?;
        check_range("repeat_time", self.repeat_time, 0.0, 200.0)?;
        check_range("speed", self.speed, 0.0, 5.0)?;
        check_range("displacement_depth_falloff", self.displacement_depth_falloff, 0.0, 10.0)?;
        check_range("normal_strength", self.normal_strength, 0.0, 20.0)?;
        check_min("lambda.x", self.lambda.x, 0.0)?;
        check_min("lambda.y", self.lambda.y, 0.0)?;
        self.foam.validate()?;

        for (i, cascade) in self.cascades.iter().enumerate() {
            cascade.validate(&format!("cascades[{i}]"))?;
        }
        Ok(())
    }

    /// Whether the configuration change requires regenerating the initial spectrum
    pub fn spectrum_changed(&self, other: &OceanConfig) -> bool {
        self.resolution != other.resolution
            || self.seed != other.seed
            || self.low_cutoff != other.low_cutoff
            || self.high_cutoff != other.high_cutoff
            || self.gravity != other.gravity
            || self.depth != other.depth
            || self
                .cascades
                .iter()
                .zip(other.cascades.iter())
                .any(|(a, b)| a.length_scale != b.length_scale || a.layers != b.layers)
    }
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<()> {
    // Written so that NaN fails the check
    if !(value >= min && value <= max) {
        return Err(OceanError::config(field, format!("must be in [{min}, {max}], got {value}")));
    }
    Ok(())
}

fn check_min(field: &str, value: f32, min: f32) -> Result<()> {
    if !(value >= min) || !value.is_finite() {
        return Err(OceanError::config(field, format!("must be a finite value >= {min}, got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: OceanError) -> String {
        match err {
            OceanError::Configuration { field, .. } => field,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        OceanConfig::default().validate().expect("default config should validate");
    }

    #[test]
    fn test_rejects_non_power_of_two_resolution() {
        let config = OceanConfig { resolution: 100, ..Default::default() };
        assert_eq!(field_of(config.validate().unwrap_err()), "resolution");
    }

    #[test]
    fn test_rejects_zero_fetch() {
        let mut config = OceanConfig::default();
        config.cascades[2].layers[0].fetch = 0.0;
        assert_eq!(field_of(config.validate().unwrap_err()), "cascades[2].layers[0].fetch");
    }

    #[test]
    fn test_rejects_zero_wind_on_enabled_layer() {
        let mut config = OceanConfig::default();
        config.cascades[0].layers[0].wind_speed = 0.0;
        assert_eq!(field_of(config.validate().unwrap_err()), "cascades[0].layers[0].wind_speed");

        // A disabled layer may be calm
        config.cascades[0].layers[0].scale = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_depth_and_gravity() {
        let config = OceanConfig { depth: 0.0, ..Default::default() };
        assert_eq!(field_of(config.validate().unwrap_err()), "depth");

        let config = OceanConfig { gravity: 0.0, ..Default::default() };
        assert_eq!(field_of(config.validate().unwrap_err()), "gravity");
    }

    #[test]
    fn test_rejects_nan() {
        let config = OceanConfig { speed: f32::NAN, ..Default::default() };
        assert_eq!(field_of(config.validate().unwrap_err()), "speed");
    }

    #[test]
    fn test_rejects_zero_length_scale() {
        let mut config = OceanConfig::default();
        config.cascades[1].length_scale = 0.0;
        assert_eq!(field_of(config.validate().unwrap_err()), "cascades[1].length_scale");
    }

    #[test]
    fn test_spectrum_changed() {
        let base = OceanConfig::default();
        let mut other = base.clone();
        other.speed = 2.0;
        other.foam.add = 0.1;
        assert!(!base.spectrum_changed(&other));

        other.cascades[3].layers[0].swell = 0.5;
        assert!(base.spectrum_changed(&other));
    }
}
