use lichem::core::io::poles::PoleUnits;
use lichem::core::multipoles::layout::SiteLayout;

/// Values used when neither the settings file nor the command line provides one.
pub struct DefaultsConfig {
    pub layout: SiteLayout,
    /// Bohr.
    pub site_radius: f64,
    pub max_order: usize,
    pub strict: bool,
    pub sanity_checks: bool,
    pub tolerance: f64,
    /// Ångström.
    pub min_separation: f64,
    pub min_sine: f64,
    pub pole_units: PoleUnits,
    pub qm_cpus: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            layout: SiteLayout::Dodecahedron,
            site_radius: 0.5,
            max_order: 3,
            strict: false,
            sanity_checks: true,
            tolerance: 1e-8,
            min_separation: 1e-6,
            min_sine: 1e-6,
            pole_units: PoleUnits::Atomic,
            qm_cpus: 1,
        }
    }
}
