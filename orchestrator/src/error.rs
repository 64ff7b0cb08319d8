use std::{fmt, io};

use machine_learning::MlErr;
use scene::SurfaceErr;

use crate::label::LabelErr;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before the loop starts.
    InvalidConfig(String),
    /// A scene or its surface failed.
    Surface(SurfaceErr),
    /// The two bitmaps of an episode couldn't be compared.
    Label(LabelErr),
    /// The regressor rejected its setup or a batch.
    Model(MlErr),
    /// Too many episodes in a row failed while generating a batch.
    EpisodeRetriesExhausted {
        attempts: usize,
        last: Box<OrchestratorError>,
    },
    /// The config file couldn't be read.
    Io(io::Error),
    /// The config file isn't valid JSON for a `PipelineConfig`.
    Json(serde_json::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Surface(e) => write!(f, "surface error: {e}"),
            Self::Label(e) => write!(f, "label error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::EpisodeRetriesExhausted { attempts, last } => {
                write!(f, "{attempts} consecutive episodes failed, last: {last}")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) => Some(e),
            Self::Label(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::EpisodeRetriesExhausted { last, .. } => Some(last.as_ref()),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::InvalidConfig(_) => None,
        }
    }
}

impl From<SurfaceErr> for OrchestratorError {
    fn from(e: SurfaceErr) -> Self {
        Self::Surface(e)
    }
}

impl From<LabelErr> for OrchestratorError {
    fn from(e: LabelErr) -> Self {
        Self::Label(e)
    }
}

impl From<MlErr> for OrchestratorError {
    fn from(e: MlErr) -> Self {
        Self::Model(e)
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
