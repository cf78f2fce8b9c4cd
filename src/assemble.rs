use glam::{Vec2, Vec3};
use rayon::prelude::*;
use std::ops::{Add, Mul};

use crate::error::{OceanError, Result, Stage};
use crate::evolution::PackedFields;
use crate::grid::Grid;
use crate::params::CascadeConfig;

/// Per-cascade output of the assembler
#[derive(Debug, Clone)]
pub struct CascadeMaps {
    pub displacement: Grid<Vec3>, // (x, height, z)
    pub slope: Grid<Vec2>,        // (dh/dx, dh/dz)
    pub foam_seed: Grid<f32>,
}

/// Turn the inverse-transformed packed fields of one cascade into displacement, slope and foam seed maps.
///
/// The spectrum is stored centered (k = 0 at bin N/2), which shows up in the
/// spatial domain as a `(-1)^(x+z)` checkerboard; it is undone here.
pub fn assemble(cascade_index: usize, spatial: &PackedFields, lambda: Vec2, foam_bias: f32) -> Result<CascadeMaps> {
    let n = spatial.displacement.size();
    let mut maps = CascadeMaps {
        displacement: Grid::new(n, Vec3::ZERO)?,
        slope: Grid::new(n, Vec2::ZERO)?,
        foam_seed: Grid::new(n, 0.0)?,
    };

    (
        maps.displacement.par_rows_mut(),
        maps.slope.par_rows_mut(),
        maps.foam_seed.par_rows_mut(),
    )
        .into_par_iter()
        .enumerate()
        .for_each(|(z, (displacement, slope, foam_seed))| {
            for x in 0..n {
                let sign = if (x + z) % 2 == 0 { 1.0 } else { -1.0 };

                let dx_dz = spatial.displacement[(x, z)] * sign;
                let height = spatial.height[(x, z)] * sign;
                let slopes = spatial.slope[(x, z)] * sign;
                let dxx_dzz = spatial.displacement_slope[(x, z)] * sign;

                displacement[x] = Vec3::new(lambda.x * dx_dz.re, height.re, lambda.y * dx_dz.im);

                slope[x] = Vec2::new(
                    slopes.re / (1.0 + (lambda.x * dxx_dzz.re).abs()),
                    slopes.im / (1.0 + (lambda.y * dxx_dzz.im).abs()),
                );

                // Folding (J < bias) marks breaking crests
                let jacobian = (1.0 + lambda.x * dxx_dzz.re) * (1.0 + lambda.y * dxx_dzz.im)
                    - lambda.x * lambda.y * height.im * height.im;
                foam_seed[x] = (foam_bias - jacobian).max(0.0);
            }
        });

    let degenerate = maps
        .displacement
        .first_non_finite()
        .or_else(|| maps.slope.first_non_finite())
        .or_else(|| maps.foam_seed.first_non_finite());
    if let Some((x, z)) = degenerate {
        return Err(OceanError::NumericDegeneracy {
            stage: Stage::Assembly,
            cascade: cascade_index,
            x,
            z,
        });
    }

    Ok(maps)
}

/// Published fields of one cascade together with how it tiles the world
#[derive(Debug, Clone)]
pub struct CascadeOutput {
    pub length_scale: f32,
    pub tile: f32,
    pub contribute_displacement: bool,
    pub displacement: Grid<Vec3>,
    pub slope: Grid<Vec2>,
    pub foam: Grid<f32>,
}

impl CascadeOutput {
    pub fn new(config: &CascadeConfig, maps: CascadeMaps, foam: Grid<f32>) -> Self {
        Self {
            length_scale: config.length_scale,
            tile: config.tile,
            contribute_displacement: config.contribute_displacement,
            displacement: maps.displacement,
            slope: maps.slope,
            foam,
        }
    }

    /// Texture coordinate of a world position; one unit spans one repetition of the tile.
    pub fn uv(&self, world: Vec2) -> Vec2 {
        world * self.tile / self.length_scale
    }
}

/// Combined surface state at a world position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub displacement: Vec3,
    pub slope: Vec2,
    pub normal: Vec3,
    pub foam: f32,
}

/// Sum every cascade's contribution at `world`.
pub fn sample_surface(cascades: &[CascadeOutput], world: Vec2, normal_strength: f32) -> SurfaceSample {
    let mut displacement = Vec3::ZERO;
    let mut slope = Vec2::ZERO;
    let mut foam = 0.0;

    for cascade in cascades {
        let uv = cascade.uv(world);
        let d = bilinear(&cascade.displacement, uv);
        displacement += if cascade.contribute_displacement {
            d
        } else {
            Vec3::new(0.0, d.y, 0.0)
        };
        slope += bilinear(&cascade.slope, uv);
        foam += bilinear(&cascade.foam, uv);
    }

    let normal = Vec3::new(-slope.x * normal_strength, 1.0, -slope.y * normal_strength).normalize();

    SurfaceSample {
        displacement,
        slope,
        normal,
        foam: foam.clamp(0.0, 1.0),
    }
}

/// Like [`sample_surface`], with displacement fading out as `exp(-falloff * view_depth)`.
pub fn sample_surface_attenuated(
    cascades: &[CascadeOutput],
    world: Vec2,
    normal_strength: f32,
    falloff: f32,
    view_depth: f32,
) -> SurfaceSample {
    let mut sample = sample_surface(cascades, world, normal_strength);
    sample.displacement *= (-falloff * view_depth.max(0.0)).exp();
    sample
}

/// Bilinear lookup with repeat wrapping; uv (0, 0) is texel (0, 0) and uv 1 is one full tile.
pub fn bilinear<T>(grid: &Grid<T>, uv: Vec2) -> T
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
{
    let n = grid.size() as f32;
    let fx = uv.x * n;
    let fz = uv.y * n;
    let x0 = fx.floor();
    let z0 = fz.floor();
    let tx = fx - x0;
    let tz = fz - z0;
    let (x0, z0) = (x0 as isize, z0 as isize);

    let top = *grid.wrapped(x0, z0) * (1.0 - tx) + *grid.wrapped(x0 + 1, z0) * tx;
    let bottom = *grid.wrapped(x0, z0 + 1) * (1.0 - tx) + *grid.wrapped(x0 + 1, z0 + 1) * tx;
    top * (1.0 - tz) + bottom * tz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::params::LayerParameters;
    use num_complex::Complex32;

    fn constant_fields(n: usize, value: [Complex32; 4]) -> PackedFields {
        // Pre-apply the checkerboard so the assembled maps are constant
        let field = |c: Complex32| {
            Grid::from_fn(n, move |x, z| if (x + z) % 2 == 0 { c } else { -c }).unwrap()
        };
        PackedFields {
            displacement: field(value[0]),
            height: field(value[1]),
            slope: field(value[2]),
            displacement_slope: field(value[3]),
        }
    }

    #[test]
    fn test_checkerboard_is_removed() {
        let fields = constant_fields(
            8,
            [
                Complex32::new(0.2, -0.1),
                Complex32::new(1.5, 0.0),
                Complex32::new(0.3, 0.4),
                Complex32::new(0.0, 0.0),
            ],
        );
        let maps = assemble(0, &fields, Vec2::new(2.0, 1.0), -0.5).unwrap();
        for z in 0..8 {
            for x in 0..8 {
                assert_eq!(maps.displacement[(x, z)], Vec3::new(0.4, 1.5, -0.1));
                assert_eq!(maps.slope[(x, z)], Vec2::new(0.3, 0.4));
            }
        }
    }

    #[test]
    fn test_flat_sea_has_no_foam_seed() {
        let zero = Complex32::new(0.0, 0.0);
        let maps = assemble(0, &constant_fields(4, [zero; 4]), Vec2::ONE, -0.5).unwrap();
        // Jacobian is 1 everywhere
        assert!(maps.foam_seed.as_slice().iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_compression_seeds_foam() {
        let zero = Complex32::new(0.0, 0.0);
        // dDx/dx = dDz/dz = -1.5 gives J = (1 - 1.5)^2 = 0.25, below the 0.5 bias
        let fields = constant_fields(4, [zero, zero, zero, Complex32::new(-1.5, -1.5)]);
        let maps = assemble(0, &fields, Vec2::ONE, 0.5).unwrap();
        assert_abs_diff_eq!(maps.foam_seed[(1, 2)], 0.25, epsilon = 1e-6);

        // Stretching never seeds foam
        let fields = constant_fields(4, [zero, zero, zero, Complex32::new(0.5, 0.5)]);
        let maps = assemble(0, &fields, Vec2::ONE, 0.5).unwrap();
        assert_eq!(maps.foam_seed[(1, 2)], 0.0);
    }

    #[test]
    fn test_non_finite_input_is_reported() {
        let zero = Complex32::new(0.0, 0.0);
        let mut fields = constant_fields(4, [zero; 4]);
        fields.height[(2, 3)] = Complex32::new(f32::NAN, 0.0);
        match assemble(3, &fields, Vec2::ONE, 0.0) {
            Err(OceanError::NumericDegeneracy { stage, cascade, x, z }) => {
                assert_eq!((stage, cascade, x, z), (Stage::Assembly, 3, 2, 3));
            }
            other => panic!("expected degeneracy, got {other:?}"),
        }
    }

    #[test]
    fn test_bilinear_wraps_and_interpolates() {
        let grid = Grid::from_fn(4, |x, _| x as f32).unwrap();
        assert_eq!(bilinear(&grid, Vec2::new(0.25, 0.0)), 1.0);
        assert_eq!(bilinear(&grid, Vec2::new(1.25, 3.0)), 1.0);
        assert_abs_diff_eq!(bilinear(&grid, Vec2::new(0.125, 0.0)), 0.5, epsilon = 1e-6);
        // Between the last texel and the wrapped first one
        assert_abs_diff_eq!(bilinear(&grid, Vec2::new(0.875, 0.0)), 1.5, epsilon = 1e-6);
    }

    fn output(displacement: Vec3, slope: Vec2, foam: f32, contribute_displacement: bool) -> CascadeOutput {
        let mut config = CascadeConfig::new(64.0, [LayerParameters::default(), LayerParameters::disabled()]);
        config.contribute_displacement = contribute_displacement;
        let maps = CascadeMaps {
            displacement: Grid::new(8, displacement).unwrap(),
            slope: Grid::new(8, slope).unwrap(),
            foam_seed: Grid::new(8, 0.0).unwrap(),
        };
        CascadeOutput::new(&config, maps, Grid::new(8, foam).unwrap())
    }

    #[test]
    fn test_cascades_add_up() {
        let cascades = [
            output(Vec3::new(1.0, 2.0, 3.0), Vec2::new(0.1, 0.0), 0.7, true),
            output(Vec3::new(1.0, 0.5, 1.0), Vec2::new(0.1, 0.2), 0.6, false),
        ];
        let sample = sample_surface(&cascades, Vec2::new(10.0, -3.0), 1.0);

        // Second cascade only contributes height
        assert_eq!(sample.displacement, Vec3::new(1.0, 2.5, 3.0));
        assert!((sample.slope - Vec2::new(0.2, 0.2)).length() < 1e-6);
        assert_eq!(sample.foam, 1.0);
        let expected = Vec3::new(-0.2, 1.0, -0.2).normalize();
        assert!((sample.normal - expected).length() < 1e-6);
    }

    #[test]
    fn test_attenuation_with_depth() {
        let cascades = [output(Vec3::new(1.0, 2.0, 3.0), Vec2::ZERO, 0.0, true)];
        let near = sample_surface_attenuated(&cascades, Vec2::ZERO, 1.0, 2.0, 0.0);
        let far = sample_surface_attenuated(&cascades, Vec2::ZERO, 1.0, 2.0, 1.0);
        assert_eq!(near.displacement, Vec3::new(1.0, 2.0, 3.0));
        assert!((far.displacement - Vec3::new(1.0, 2.0, 3.0) * (-2.0f32).exp()).length() < 1e-6);
        assert_eq!(far.normal, Vec3::Y);
    }
}
