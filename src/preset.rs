use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::params::{LayerParameters, OceanConfig};
use crate::spectrum::wind_speed_from_normalized;

/// Random layer whose energy, spread and swell grow with the normalized wind strength.
pub fn randomize_layer<R: Rng>(wind: f32, rng: &mut R) -> LayerParameters {
    let wind = wind.clamp(0.0, 1.0);

    LayerParameters {
        scale: (rng.gen_range(1.0..10.0) * wind).min(5.0),
        wind_speed: wind_speed_from_normalized(wind),
        wind_direction: rng.gen_range(1.0..360.0),
        fetch: rng.gen_range(1.0..100000.0),
        spread_blend: rng.gen::<f32>() * wind,
        swell: (rng.gen::<f32>() * wind).clamp(0.01, 1.0),
        peak_enhancement: (rng.gen::<f32>() * wind).clamp(0.001, 7.0),
        short_waves_fade: rng.gen::<f32>() * wind,
    }
}

/// Replace both spectra of the largest cascade with a randomized weather preset.
pub fn apply_wind_preset(config: &mut OceanConfig, wind: f32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for layer in config.cascades[0].layers.iter_mut() {
        *layer = randomize_layer(wind, &mut rng);
    }
    log::debug!("Applied wind preset {wind:.2} (seed {seed}) to cascade 0");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_preset_is_valid_across_wind_range() {
        for i in 0..=10 {
            let mut config = OceanConfig::default();
            apply_wind_preset(&mut config, i as f32 / 10.0, 1234 + i);
            config.validate().expect("preset should produce a valid configuration");
        }
    }

    #[test]
    fn test_calm_preset_disables_layers() {
        let mut config = OceanConfig::default();
        apply_wind_preset(&mut config, 0.0, 9);
        assert!(config.cascades[0].layers.iter().all(|l| !l.is_enabled()));
    }

    #[test]
    fn test_preset_is_reproducible() {
        let mut a = OceanConfig::default();
        let mut b = OceanConfig::default();
        apply_wind_preset(&mut a, 0.6, 77);
        apply_wind_preset(&mut b, 0.6, 77);
        assert_eq!(a, b);
        assert_abs_diff_eq!(a.cascades[0].layers[0].wind_speed, 6.0, epsilon = 1e-5);
    }
}
