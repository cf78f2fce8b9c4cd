use glam::{Vec2, Vec3};
use log::{debug, info, warn};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::assemble::{assemble, sample_surface, sample_surface_attenuated, CascadeMaps, CascadeOutput, SurfaceSample};
use crate::error::{OceanError, Result, Stage};
use crate::evolution::{evolve, SimulationClock};
use crate::fft::Fft2d;
use crate::field::{generate_initial_spectrum, pack_conjugate, FieldSettings, PackedSpectrum};
use crate::foam::FoamAccumulator;
use crate::grid::Grid;
use crate::params::{CascadeConfig, OceanConfig, CASCADE_COUNT, LAYERS_PER_CASCADE};
use crate::spectrum::{DerivedSpectrumParameters, WaveMedium};

/// Immutable snapshot of the surface handed to consumers
#[derive(Debug, Clone)]
pub struct OceanFrame {
    pub frame: u64,
    pub time: f32,
    pub normal_strength: f32,
    pub displacement_depth_falloff: f32,
    pub cascades: Vec<CascadeOutput>,
}

impl OceanFrame {
    /// Calm surface shown before the first frame completes
    fn flat(config: &OceanConfig) -> Result<Self> {
        let n = config.resolution;
        let cascades = config
            .cascades
            .iter()
            .map(|cascade| {
                let maps = CascadeMaps {
                    displacement: Grid::new(n, Vec3::ZERO)?,
                    slope: Grid::new(n, Vec2::ZERO)?,
                    foam_seed: Grid::new(n, 0.0)?,
                };
                Ok(CascadeOutput::new(cascade, maps, Grid::new(n, 0.0)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            frame: 0,
            time: 0.0,
            normal_strength: config.normal_strength,
            displacement_depth_falloff: config.displacement_depth_falloff,
            cascades,
        })
    }

    pub fn resolution(&self) -> usize {
        self.cascades.first().map_or(0, |c| c.displacement.size())
    }

    /// Surface displacement, slope, normal and foam summed over all cascades.
    pub fn sample(&self, world: Vec2) -> SurfaceSample {
        sample_surface(&self.cascades, world, self.normal_strength)
    }

    /// Like [`OceanFrame::sample`], with displacement faded by a normalized view depth.
    pub fn sample_attenuated(&self, world: Vec2, view_depth: f32) -> SurfaceSample {
        sample_surface_attenuated(
            &self.cascades,
            world,
            self.normal_strength,
            self.displacement_depth_falloff,
            view_depth,
        )
    }
}

/// Shared handle to the most recently published frame
#[derive(Debug, Clone)]
pub struct FrameSlot {
    inner: Arc<RwLock<Arc<OceanFrame>>>,
}

impl FrameSlot {
    fn new(frame: OceanFrame) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(frame))),
        }
    }

    /// The latest complete frame; it stays valid for as long as the caller holds it.
    pub fn latest(&self) -> Arc<OceanFrame> {
        let guard = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn publish(&self, frame: Arc<OceanFrame>) {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = frame;
    }
}

/// Outcome of one simulation step
#[derive(Debug)]
pub enum FrameStatus {
    Published { frame: u64 },
    /// A stage produced NaN or infinity; the previous frame stays published
    Skipped { frame: u64, reason: OceanError },
}

/// One cascade's static spectrum and foam state
#[derive(Debug, Clone)]
struct Cascade {
    config: CascadeConfig,
    spectra: [DerivedSpectrumParameters; LAYERS_PER_CASCADE],
    initial: PackedSpectrum,
    foam: FoamAccumulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpectrumState {
    Ready,
    Dirty,
}

/// Multi-cascade FFT ocean.
///
/// Updating is split in two transitions: [`Ocean::prepare`] regenerates the
/// static initial spectrum when parameters changed, and [`Ocean::step`]
/// advances time and synthesizes a new frame. [`Ocean::update`] runs both.
#[derive(Debug)]
pub struct Ocean {
    config: OceanConfig,
    fft: Fft2d,
    cascades: Vec<Cascade>,
    spectrum: SpectrumState,
    clock: SimulationClock,
    pending_foam_dt: f32,
    slot: FrameSlot,
}

impl Ocean {
    pub fn new(config: OceanConfig) -> Result<Self> {
        config.validate()?;

        let fft = Fft2d::new(config.resolution)?;
        let cascades = build_cascades(&config)?;
        let slot = FrameSlot::new(OceanFrame::flat(&config)?);

        info!(
            "Ocean initialized: {} cascades at {}x{}",
            CASCADE_COUNT, config.resolution, config.resolution
        );

        Ok(Self {
            config,
            fft,
            cascades,
            spectrum: SpectrumState::Ready,
            clock: SimulationClock::default(),
            pending_foam_dt: 0.0,
            slot,
        })
    }

    pub fn config(&self) -> &OceanConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Replace the configuration between frames.
    ///
    /// Changes to the spectrum inputs mark the spectrum dirty; a new
    /// resolution also resets the FFT plan and foam state.
    pub fn set_config(&mut self, config: OceanConfig) -> Result<()> {
        config.validate()?;

        if config.resolution != self.config.resolution {
            self.fft = Fft2d::new(config.resolution)?;
            for cascade in &mut self.cascades {
                cascade.foam = FoamAccumulator::new(config.resolution)?;
            }
            self.slot.publish(Arc::new(OceanFrame::flat(&config)?));
        }
        if config.spectrum_changed(&self.config) {
            self.spectrum = SpectrumState::Dirty;
        }
        for (cascade, new_config) in self.cascades.iter_mut().zip(config.cascades.iter()) {
            cascade.config = *new_config;
        }

        self.config = config;
        Ok(())
    }

    /// Regenerate the initial spectrum on the next update even if no parameter changed.
    pub fn request_spectrum_update(&mut self) {
        self.spectrum = SpectrumState::Dirty;
    }

    pub fn spectrum_dirty(&self) -> bool {
        self.spectrum == SpectrumState::Dirty
    }

    /// Recompute the static spectrum if it is dirty. Returns whether it was recomputed.
    ///
    /// On failure the previous spectrum is kept and the dirty state remains.
    pub fn prepare(&mut self) -> Result<bool> {
        if self.spectrum == SpectrumState::Ready {
            return Ok(false);
        }

        let start = Instant::now();
        let settings = FieldSettings::from_config(&self.config);
        for (index, cascade) in self.config.cascades.iter().enumerate() {
            debug!("Regenerating spectrum of cascade {index} (L = {})", cascade.length_scale);
        }

        let spectra = self
            .config
            .cascades
            .iter()
            .enumerate()
            .map(|(index, cascade)| initial_spectrum(index, cascade, &settings))
            .collect::<Result<Vec<_>>>()?;

        for (cascade, (derived, initial)) in self.cascades.iter_mut().zip(spectra) {
            cascade.spectra = derived;
            cascade.initial = initial;
        }
        self.spectrum = SpectrumState::Ready;

        info!("Initial spectrum regenerated in {:.2?}", start.elapsed());
        Ok(true)
    }

    /// Advance time by `dt` seconds and publish a new frame.
    pub fn step(&mut self, dt: f32) -> Result<FrameStatus> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(OceanError::config("dt", format!("time step must be positive and finite, got {dt}")));
        }
        if self.spectrum == SpectrumState::Dirty {
            return Err(OceanError::config("spectrum", "initial spectrum is stale; call prepare() first"));
        }

        self.clock.advance(dt);
        let frame = self.clock.frame();
        let time = self.clock.time(self.config.speed, self.config.repeat_time);
        let foam_dt = dt + self.pending_foam_dt;

        let maps = match self.synthesize(time) {
            Ok(maps) => maps,
            Err(reason @ OceanError::NumericDegeneracy { .. }) => {
                warn!("Skipping frame {frame}: {reason}");
                self.pending_foam_dt = foam_dt;
                return Ok(FrameStatus::Skipped { frame, reason });
            }
            Err(other) => return Err(other),
        };

        let mut outputs = Vec::with_capacity(self.cascades.len());
        for (cascade, maps) in self.cascades.iter_mut().zip(maps) {
            cascade.foam.advance(frame, foam_dt, &maps.foam_seed, &self.config.foam)?;
            outputs.push(CascadeOutput::new(&cascade.config, maps, cascade.foam.foam().clone()));
        }
        self.pending_foam_dt = 0.0;

        self.slot.publish(Arc::new(OceanFrame {
            frame,
            time,
            normal_strength: self.config.normal_strength,
            displacement_depth_falloff: self.config.displacement_depth_falloff,
            cascades: outputs,
        }));

        debug!("Published frame {frame} at t = {time:.3}");
        Ok(FrameStatus::Published { frame })
    }

    /// Recompute the spectrum if needed, then advance one frame.
    pub fn update(&mut self, dt: f32) -> Result<FrameStatus> {
        self.prepare()?;
        self.step(dt)
    }

    /// The latest published frame
    pub fn frame(&self) -> Arc<OceanFrame> {
        self.slot.latest()
    }

    /// Handle that other threads can use to read published frames
    pub fn frame_slot(&self) -> FrameSlot {
        self.slot.clone()
    }

    /// Conjugate-packed initial spectrum of a cascade
    pub fn initial_spectrum(&self, cascade: usize) -> Option<&PackedSpectrum> {
        self.cascades.get(cascade).map(|c| &c.initial)
    }

    /// Derived spectral parameters of a cascade's two layers
    pub fn spectrum_parameters(&self, cascade: usize) -> Option<&[DerivedSpectrumParameters; LAYERS_PER_CASCADE]> {
        self.cascades.get(cascade).map(|c| &c.spectra)
    }

    /// Evolve, transform and assemble every cascade into fresh buffers.
    fn synthesize(&mut self, time: f32) -> Result<Vec<CascadeMaps>> {
        let medium = WaveMedium {
            gravity: self.config.gravity,
            depth: self.config.depth,
        };

        let mut maps = Vec::with_capacity(self.cascades.len());
        for (index, cascade) in self.cascades.iter().enumerate() {
            let mut fields = evolve(
                index,
                &cascade.initial,
                &cascade.config,
                &medium,
                self.config.repeat_time,
                time,
            )?;

            for grid in fields.grids_mut() {
                self.fft.inverse(grid)?;
                if let Some((x, z)) = grid.first_non_finite() {
                    return Err(OceanError::NumericDegeneracy {
                        stage: Stage::InverseFft,
                        cascade: index,
                        x,
                        z,
                    });
                }
            }

            maps.push(assemble(index, &fields, self.config.lambda, self.config.foam.bias)?);
        }
        Ok(maps)
    }
}

/// Derive a cascade's layer parameters, then generate and pack its initial spectrum.
fn initial_spectrum(
    index: usize,
    cascade: &CascadeConfig,
    settings: &FieldSettings,
) -> Result<([DerivedSpectrumParameters; LAYERS_PER_CASCADE], PackedSpectrum)> {
    let gravity = settings.medium.gravity;
    let derived = [
        DerivedSpectrumParameters::from_layer(&cascade.layers[0], gravity)?,
        DerivedSpectrumParameters::from_layer(&cascade.layers[1], gravity)?,
    ];
    let initial = generate_initial_spectrum(index, cascade, &derived, settings)?;
    Ok((derived, pack_conjugate(&initial)?))
}

fn build_cascades(config: &OceanConfig) -> Result<Vec<Cascade>> {
    let settings = FieldSettings::from_config(config);
    config
        .cascades
        .iter()
        .enumerate()
        .map(|(index, cascade)| {
            let (spectra, initial) = initial_spectrum(index, cascade, &settings)?;
            Ok(Cascade {
                config: *cascade,
                spectra,
                initial,
                foam: FoamAccumulator::new(config.resolution)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    fn small_config() -> OceanConfig {
        OceanConfig {
            resolution: 32,
            seed: 42,
            ..OceanConfig::default()
        }
    }

    #[test]
    fn test_new_publishes_flat_frame() {
        let ocean = Ocean::new(small_config()).unwrap();
        let frame = ocean.frame();
        assert_eq!(frame.frame, 0);
        assert_eq!(frame.cascades.len(), CASCADE_COUNT);
        assert_eq!(frame.resolution(), 32);
        assert_eq!(frame.sample(Vec2::new(3.0, 4.0)).displacement, Vec3::ZERO);
    }

    #[test]
    fn test_update_publishes_waves() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        let status = ocean.update(1.0 / 30.0).unwrap();
        assert!(matches!(status, FrameStatus::Published { frame: 1 }));

        let frame = ocean.frame();
        assert_eq!(frame.frame, 1);
        let heights = frame.cascades[0].displacement.as_slice().iter().map(|d| d.y.abs());
        assert!(heights.fold(0.0f32, f32::max) > 0.0);
    }

    #[test]
    fn test_snapshot_outlives_next_frame() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        ocean.update(0.1).unwrap();
        let held = ocean.frame();
        let slot = ocean.frame_slot();
        ocean.update(0.1).unwrap();

        assert_eq!(held.frame, 1);
        assert_eq!(slot.latest().frame, 2);
    }

    #[test]
    fn test_spectrum_update_is_two_phase() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        assert!(!ocean.spectrum_dirty());

        let mut config = small_config();
        config.cascades[0].layers[0].wind_speed = 20.0;
        ocean.set_config(config).unwrap();
        assert!(ocean.spectrum_dirty());
        assert!(ocean.step(0.1).is_err(), "stale spectrum must not be evolved");

        let calm_alpha = ocean.spectrum_parameters(0).unwrap()[0].alpha;
        assert!(ocean.prepare().unwrap());
        assert!(!ocean.prepare().unwrap());
        assert!(ocean.spectrum_parameters(0).unwrap()[0].alpha > calm_alpha);
        assert!(ocean.step(0.1).is_ok());

        ocean.request_spectrum_update();
        assert!(ocean.spectrum_dirty());
        ocean.update(0.1).unwrap();
        assert!(!ocean.spectrum_dirty());
    }

    #[test]
    fn test_non_spectral_change_keeps_spectrum() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        let mut config = small_config();
        config.speed = 2.0;
        config.cascades[1].tile = 2.0;
        ocean.set_config(config).unwrap();
        assert!(!ocean.spectrum_dirty());
        ocean.update(0.1).unwrap();
        assert_eq!(ocean.frame().cascades[1].tile, 2.0);
    }

    #[test]
    fn test_invalid_config_is_rejected_and_kept_out() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        let config = OceanConfig { depth: -1.0, ..small_config() };
        assert!(matches!(ocean.set_config(config), Err(OceanError::Configuration { .. })));
        assert_eq!(ocean.config().depth, small_config().depth);

        assert!(Ocean::new(OceanConfig { resolution: 48, ..small_config() }).is_err());
    }

    #[test]
    fn test_degenerate_frame_is_skipped() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        ocean.update(0.1).unwrap();
        let good = ocean.frame();

        ocean.cascades[2].initial[(5, 6)].h0 = Complex32::new(f32::NAN, 0.0);
        match ocean.update(0.1).unwrap() {
            FrameStatus::Skipped { frame, reason } => {
                assert_eq!(frame, 2);
                assert!(matches!(reason, OceanError::NumericDegeneracy { cascade: 2, .. }));
            }
            other => panic!("expected skipped frame, got {other:?}"),
        }
        assert_eq!(ocean.frame().frame, good.frame);
        assert_eq!(ocean.cascades[0].foam.last_frame(), Some(1));

        // Regenerating the spectrum recovers
        ocean.request_spectrum_update();
        assert!(matches!(ocean.update(0.1).unwrap(), FrameStatus::Published { frame: 3 }));
    }

    #[test]
    fn test_resolution_change_resets_buffers() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        ocean.update(0.1).unwrap();
        ocean.set_config(OceanConfig { resolution: 16, ..small_config() }).unwrap();
        assert_eq!(ocean.frame().resolution(), 16);
        ocean.update(0.1).unwrap();
        assert_eq!(ocean.frame().resolution(), 16);
        assert_eq!(ocean.initial_spectrum(0).unwrap().size(), 16);
    }

    #[test]
    fn test_rejects_bad_time_step() {
        let mut ocean = Ocean::new(small_config()).unwrap();
        assert!(ocean.update(0.0).is_err());
        assert!(ocean.update(f32::NAN).is_err());
        assert_eq!(ocean.clock().frame(), 0);
    }
}
