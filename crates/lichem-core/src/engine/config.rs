use crate::core::models::reduced::ReducedMultipole;
use crate::core::multipoles::layout::SiteLayout;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// How global multipoles are reduced to point charges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionConfig {
    pub layout: SiteLayout,
    /// Distance of the charge sites from the atom centre, in bohr.
    pub site_radius: f64,
    /// Highest multipole order the sites must reproduce (0..=3).
    pub max_order: usize,
    /// Fail instead of reporting truncation when the layout cannot reproduce `max_order`.
    pub strict: bool,
}

/// Runtime conservation and reproduction checks on every reduced atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanityConfig {
    pub enabled: bool,
    pub tolerance: f64,
}

/// Thresholds below which a local frame is considered degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConfig {
    /// Minimum distance between an atom and its reference atoms, in Ångström.
    pub min_separation: f64,
    /// Minimum sine of the angle between the z and x reference bonds.
    pub min_sine: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingConfig {
    pub reduction: ReductionConfig,
    pub checks: SanityConfig,
    pub frame: FrameConfig,
}

#[derive(Default)]
pub struct EmbeddingConfigBuilder {
    layout: Option<SiteLayout>,
    site_radius: Option<f64>,
    max_order: Option<usize>,
    strict: Option<bool>,
    sanity_checks: Option<bool>,
    tolerance: Option<f64>,
    min_separation: Option<f64>,
    min_sine: Option<f64>,
}

impl EmbeddingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(mut self, layout: SiteLayout) -> Self {
        self.layout = Some(layout);
        self
    }
    pub fn site_radius(mut self, radius_bohr: f64) -> Self {
        self.site_radius = Some(radius_bohr);
        self
    }
    pub fn max_order(mut self, order: usize) -> Self {
        self.max_order = Some(order);
        self
    }
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
    pub fn sanity_checks(mut self, enabled: bool) -> Self {
        self.sanity_checks = Some(enabled);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn min_separation(mut self, angstroms: f64) -> Self {
        self.min_separation = Some(angstroms);
        self
    }
    pub fn min_sine(mut self, sine: f64) -> Self {
        self.min_sine = Some(sine);
        self
    }

    pub fn build(self) -> Result<EmbeddingConfig, ConfigError> {
        let reduction = ReductionConfig {
            layout: self
                .layout
                .ok_or(ConfigError::MissingParameter("layout"))?,
            site_radius: positive(
                "site_radius",
                self.site_radius
                    .ok_or(ConfigError::MissingParameter("site_radius"))?,
            )?,
            max_order: self
                .max_order
                .ok_or(ConfigError::MissingParameter("max_order"))?,
            strict: self.strict.unwrap_or(false),
        };
        if reduction.max_order > ReducedMultipole::MAX_ORDER {
            return Err(ConfigError::InvalidValue {
                parameter: "max_order",
                reason: format!(
                    "{} exceeds the octupole (order {})",
                    reduction.max_order,
                    ReducedMultipole::MAX_ORDER
                ),
            });
        }
        let checks = SanityConfig {
            enabled: self
                .sanity_checks
                .ok_or(ConfigError::MissingParameter("sanity_checks"))?,
            tolerance: positive(
                "tolerance",
                self.tolerance
                    .ok_or(ConfigError::MissingParameter("tolerance"))?,
            )?,
        };
        let frame = FrameConfig {
            min_separation: positive(
                "min_separation",
                self.min_separation
                    .ok_or(ConfigError::MissingParameter("min_separation"))?,
            )?,
            min_sine: positive(
                "min_sine",
                self.min_sine
                    .ok_or(ConfigError::MissingParameter("min_sine"))?,
            )?,
        };
        Ok(EmbeddingConfig {
            reduction,
            checks,
            frame,
        })
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: format!("must be positive and finite, got {}", value),
        })
    }
}
