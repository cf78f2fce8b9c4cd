use rayon::prelude::*;

use crate::error::{OceanError, Result};
use crate::grid::Grid;
use crate::params::FoamParams;

/// Foam intensity of one cascade, carried from frame to frame
#[derive(Debug, Clone)]
pub struct FoamAccumulator {
    foam: Grid<f32>,
    last_frame: Option<u64>,
}

impl FoamAccumulator {
    pub fn new(size: usize) -> Result<Self> {
        Ok(Self {
            foam: Grid::new(size, 0.0)?,
            last_frame: None,
        })
    }

    pub fn foam(&self) -> &Grid<f32> {
        &self.foam
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Decay the stored foam over `dt` seconds, then add foam where the seed exceeds the threshold.
    ///
    /// Each frame index may be applied once; repeating one would decay twice for a single time step.
    pub fn advance(&mut self, frame: u64, dt: f32, seed: &Grid<f32>, params: &FoamParams) -> Result<()> {
        if let Some(last) = self.last_frame {
            if frame <= last {
                return Err(OceanError::FoamAlreadyAdvanced { frame, last });
            }
        }
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(OceanError::config("dt", format!("time step must be positive and finite, got {dt}")));
        }
        if seed.size() != self.foam.size() {
            return Err(OceanError::config(
                "resolution",
                format!("foam seed is {0}x{0}, foam state is {1}x{1}", seed.size(), self.foam.size()),
            ));
        }

        let decay = (-params.decay_rate * dt).exp();
        let threshold = params.threshold;
        let add = params.add;

        self.foam
            .as_mut_slice()
            .par_iter_mut()
            .zip(seed.as_slice().par_iter())
            .for_each(|(foam, &seed)| {
                *foam = (*foam * decay + (seed - threshold).max(0.0) * add).clamp(0.0, 1.0);
            });

        self.last_frame = Some(frame);
        Ok(())
    }
}
