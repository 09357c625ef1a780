use lichem::core::io::poles::PoleUnits;
use lichem::core::simulation::settings::SimulationSettings;
use lichem::engine::config::EmbeddingConfig;

/// Fully merged configuration of one CLI run.
pub struct AppConfig {
    pub settings: SimulationSettings,
    pub embedding: EmbeddingConfig,
    pub pole_units: PoleUnits,
}
