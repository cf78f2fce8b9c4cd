use glam::{Vec2, Vec3};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::grid::Grid;
use crate::ocean::OceanFrame;

/// Map a signed value in [-range, range] to a byte, with 0 at mid gray
fn encode_signed(value: f32, range: f32) -> u8 {
    if range <= 0.0 {
        return 128;
    }
    (((value / range) * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8
}

fn max_abs(values: impl Iterator<Item = f32>) -> f32 {
    values.fold(0.0f32, |acc, v| acc.max(v.abs()))
}

/// Displacement as RGB = (x, height, z), each channel scaled by the largest magnitude in the grid.
pub fn displacement_image(displacement: &Grid<Vec3>) -> RgbImage {
    let size = displacement.size() as u32;
    let data = displacement.as_slice();
    let range = max_abs(data.iter().flat_map(|d| d.to_array()));

    RgbImage::from_fn(size, size, |x, z| {
        let d = displacement[(x as usize, z as usize)];
        Rgb([
            encode_signed(d.x, range),
            encode_signed(d.y, range),
            encode_signed(d.z, range),
        ])
    })
}

/// Slope as a tangent-space style normal map: R = dh/dx, G = dh/dz, B = 255.
pub fn slope_image(slope: &Grid<Vec2>) -> RgbImage {
    let size = slope.size() as u32;
    let range = max_abs(slope.as_slice().iter().flat_map(|s| s.to_array()));

    RgbImage::from_fn(size, size, |x, z| {
        let s = slope[(x as usize, z as usize)];
        Rgb([encode_signed(s.x, range), encode_signed(s.y, range), 255])
    })
}

/// Foam intensity in [0, 1] as grayscale.
pub fn foam_image(foam: &Grid<f32>) -> GrayImage {
    let size = foam.size() as u32;
    GrayImage::from_fn(size, size, |x, z| {
        let f = foam[(x as usize, z as usize)];
        Luma([(f.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Write `displacement_<c>.png`, `slope_<c>.png` and `foam_<c>.png` for every cascade of `frame`.
///
/// Creates `dir` if needed and returns the written paths.
pub fn export_frame<P: AsRef<Path>>(frame: &OceanFrame, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(frame.cascades.len() * 3);
    for (index, cascade) in frame.cascades.iter().enumerate() {
        let path = dir.join(format!("displacement_{index}.png"));
        displacement_image(&cascade.displacement).save(&path)?;
        written.push(path);

        let path = dir.join(format!("slope_{index}.png"));
        slope_image(&cascade.slope).save(&path)?;
        written.push(path);

        let path = dir.join(format!("foam_{index}.png"));
        foam_image(&cascade.foam).save(&path)?;
        written.push(path);
    }

    log::debug!("Exported frame {} to {}", frame.frame, dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocean::Ocean;
    use crate::params::OceanConfig;
    use image::GenericImageView;
    use tempfile::tempdir;

    #[test]
    fn test_signed_encoding() {
        assert_eq!(encode_signed(0.0, 2.0), 128);
        assert_eq!(encode_signed(2.0, 2.0), 255);
        assert_eq!(encode_signed(-2.0, 2.0), 0);
        assert_eq!(encode_signed(5.0, 0.0), 128);
    }

    #[test]
    fn test_foam_image_levels() {
        let mut foam = Grid::new(4, 0.0).unwrap();
        foam[(1, 2)] = 1.0;
        foam[(3, 0)] = 0.5;
        let image = foam_image(&foam);
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(1, 2).0, [255]);
        assert_eq!(image.get_pixel(3, 0).0, [128]);
        assert_eq!(image.get_pixel(0, 0).0, [0]);
    }

    #[test]
    fn test_displacement_image_uses_shared_range() {
        let mut displacement = Grid::new(2, Vec3::ZERO).unwrap();
        displacement[(1, 0)] = Vec3::new(-4.0, 2.0, 0.0);
        let image = displacement_image(&displacement);
        assert_eq!(image.get_pixel(1, 0).0, [0, 191, 128]);
        assert_eq!(image.get_pixel(0, 1).0, [128, 128, 128]);
    }

    #[test]
    fn test_export_frame_writes_png_files() {
        let config = OceanConfig {
            resolution: 16,
            seed: 7,
            ..OceanConfig::default()
        };
        let mut ocean = Ocean::new(config).expect("Failed to create ocean");
        ocean.update(0.1).expect("Failed to advance ocean");

        let temp_dir = tempdir().expect("Failed to create temp directory");
        let out = temp_dir.path().join("maps");
        let written = export_frame(&ocean.frame(), &out).expect("Failed to export frame");

        assert_eq!(written.len(), 12);
        for path in &written {
            assert!(path.exists(), "{} was not created", path.display());
            let image = image::open(path).expect("Failed to read back PNG");
            assert_eq!(image.width(), 16);
        }
        assert!(out.join("foam_3.png").exists());
    }
}
