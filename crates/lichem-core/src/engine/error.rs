use super::config::ConfigError;
use crate::core::models::charges::TruncationReport;
use crate::core::models::system::SystemError;
use crate::core::multipoles::frame::GeometryError;
use crate::core::multipoles::layout::SiteLayout;
use crate::core::multipoles::reduction::ReductionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectrostaticsError {
    #[error("Invalid embedding configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Inconsistent system: {0}")]
    System(#[from] SystemError),

    #[error("Failed to prepare the charge reducer: {0}")]
    ReducerSetup(#[source] ReductionError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(
        "Atom {atom}, replica {replica}: {quantity} deviates by {error:.3e} (tolerance {tolerance:.3e})"
    )]
    Tolerance {
        atom: usize,
        replica: usize,
        quantity: &'static str,
        error: f64,
        tolerance: f64,
    },

    #[error("Atom {atom}, replica {replica}: the {layout} layout is underdetermined: {report}")]
    UnderdeterminedReduction {
        atom: usize,
        replica: usize,
        layout: SiteLayout,
        report: TruncationReport,
    },
}

impl ElectrostaticsError {
    /// Maps a reduction failure for one atom and replica.
    pub(crate) fn from_reduction(atom: usize, replica: usize, err: ReductionError) -> Self {
        match err {
            ReductionError::Underdetermined { layout, report } => {
                ElectrostaticsError::UnderdeterminedReduction {
                    atom,
                    replica,
                    layout,
                    report,
                }
            }
            other => ElectrostaticsError::ReducerSetup(other),
        }
    }

    /// The `(atom, replica)` the failure belongs to, if it is tied to one.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            ElectrostaticsError::Geometry(e) => Some((e.atom, e.replica)),
            ElectrostaticsError::Tolerance { atom, replica, .. }
            | ElectrostaticsError::UnderdeterminedReduction { atom, replica, .. } => {
                Some((*atom, *replica))
            }
            _ => None,
        }
    }
}
