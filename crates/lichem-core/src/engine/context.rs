use super::config::EmbeddingConfig;
use super::error::ElectrostaticsError;
use super::progress::ProgressReporter;
use crate::core::models::system::QmmmSystem;
use crate::core::multipoles::frame::FrameRotator;
use crate::core::multipoles::reduction::ChargeReducer;

/// Everything a task needs to turn one system snapshot into an embedding field.
///
/// The reducer's pseudo-inverse is built once here and shared read-only by all workers.
pub struct EmbeddingContext<'a> {
    pub system: &'a QmmmSystem,
    pub config: &'a EmbeddingConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pub rotator: FrameRotator,
    pub reducer: ChargeReducer,
}

impl<'a> EmbeddingContext<'a> {
    pub fn new(
        system: &'a QmmmSystem,
        config: &'a EmbeddingConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Result<Self, ElectrostaticsError> {
        let reduction = &config.reduction;
        let reducer = ChargeReducer::new(reduction.layout, reduction.site_radius, reduction.max_order)
            .map_err(ElectrostaticsError::ReducerSetup)?
            .with_strictness(reduction.strict, config.checks.tolerance);
        let rotator = FrameRotator::new(config.frame.min_separation, config.frame.min_sine);
        Ok(Self {
            system,
            config,
            reporter,
            rotator,
            reducer,
        })
    }
}
