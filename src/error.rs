use thiserror::Error;

/// Pipeline stage that produced a non-finite value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InitialSpectrum,
    TimeEvolution,
    InverseFft,
    Assembly,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::InitialSpectrum => "initial spectrum",
            Stage::TimeEvolution => "time evolution",
            Stage::InverseFft => "inverse FFT",
            Stage::Assembly => "map assembly",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum OceanError {
    #[error("Invalid configuration for `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    #[error("Non-finite value in {stage} output (cascade {cascade}, bin {x},{z})")]
    NumericDegeneracy {
        stage: Stage,
        cascade: usize,
        x: usize,
        z: usize,
    },

    #[error("Failed to allocate {bytes} bytes for simulation buffers")]
    ResourceExhaustion { bytes: usize },

    #[error("Foam already advanced for frame {frame} (last advanced frame {last})")]
    FoamAlreadyAdvanced { frame: u64, last: u64 },

    #[error("Image export error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OceanError {
    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OceanError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OceanError>;
