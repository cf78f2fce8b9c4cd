// Export main modules
pub mod assemble;
pub mod error;
pub mod evolution;
pub mod export;
pub mod fft;
pub mod field;
pub mod foam;
pub mod grid;
pub mod ocean;
pub mod params;
pub mod preset;
pub mod spectrum;

// Re-export everything for public use
pub use assemble::{CascadeMaps, CascadeOutput, SurfaceSample};
pub use error::{OceanError, Result, Stage};
pub use export::export_frame;
pub use grid::Grid;
pub use ocean::{FrameSlot, FrameStatus, Ocean, OceanFrame};
pub use params::{CascadeConfig, FoamParams, LayerParameters, OceanConfig, CASCADE_COUNT};
pub use preset::apply_wind_preset;

pub mod prelude {
    pub use crate::assemble::{CascadeOutput, SurfaceSample};
    pub use crate::error::{OceanError, Result};
    pub use crate::export::export_frame;
    pub use crate::ocean::{FrameSlot, FrameStatus, Ocean, OceanFrame};
    pub use crate::params::{CascadeConfig, FoamParams, LayerParameters, OceanConfig};
    pub use crate::preset::apply_wind_preset;
}
