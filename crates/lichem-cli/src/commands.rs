pub mod check;
pub mod embed;
pub mod global_poles;

use crate::cli::SystemInputs;
use crate::config::builder;
use crate::config::models::AppConfig;
use crate::error::{CliError, Result};
use lichem::core::io::poles::PoleTable;
use lichem::core::io::traits::RecordFile;
use lichem::core::io::xyz::{self, XyzFile};
use lichem::core::models::system::QmmmSystem;
use lichem::core::simulation::settings::SimulationSettings;
use lichem::core::simulation::threads::ThreadBudget;
use lichem::workflows::embed::prepare_system;
use std::path::Path;
use tracing::info;

/// A system built from the command-line inputs together with the merged configuration.
pub struct LoadedSystem {
    pub system: QmmmSystem,
    pub config: AppConfig,
}

fn parse_error(path: &Path, source: impl Into<anyhow::Error>) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Reads the structure, pole table and optional bead structure and builds a validated system.
pub fn load_system(inputs: &SystemInputs) -> Result<LoadedSystem> {
    let config = builder::build_config(inputs)?;

    info!("Loading structure from {:?}", &inputs.xyz);
    let records = XyzFile
        .read_from_path(&inputs.xyz)
        .map_err(|e| parse_error(&inputs.xyz, e))?;
    let atoms = xyz::atoms_from_records(&records);

    info!(
        "Loading multipoles from {:?} ({} units)",
        &inputs.poles, config.pole_units
    );
    let poles = PoleTable::new(config.pole_units)
        .read_from_path(&inputs.poles)
        .map_err(|e| parse_error(&inputs.poles, e))?;

    let beads = match &inputs.beads {
        Some(path) => {
            info!("Loading bead structure from {:?}", path);
            let bead_records = XyzFile
                .read_from_path(path)
                .map_err(|e| parse_error(path, e))?;
            let per_atom = xyz::bead_positions(
                &bead_records,
                atoms.len(),
                config.settings.calculation.bead_count(),
            )
            .map_err(|e| parse_error(path, e))?;
            Some(per_atom)
        }
        None => None,
    };

    let system = prepare_system(atoms, poles, &config.settings, beads.as_deref())?;
    Ok(LoadedSystem { system, config })
}

/// Builds the pool the electrostatics sweep runs on, sized by the run's thread budget.
///
/// Path-integral runs keep `qm_cpus` CPUs free for every concurrent bead; other modes use all
/// `available_cpus`.
pub fn worker_pool(
    settings: &SimulationSettings,
    available_cpus: usize,
) -> Result<rayon::ThreadPool> {
    let budget = ThreadBudget::new(settings.qm_cpus, available_cpus, &settings.calculation);
    info!(
        "Using {} worker thread(s) with {} CPU(s) per QM call.",
        budget.worker_threads, budget.qm_cpus
    );
    rayon::ThreadPoolBuilder::new()
        .num_threads(budget.worker_threads)
        .build()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to build worker pool: {}", e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::cli::SystemInputs;
    use std::fs;
    use std::path::Path;

    pub const WATER_XYZ: &str = "3\nO 0.000 0.000 0.000\nH 0.757 0.586 0.000\nH -0.757 0.586 0.000\n";

    pub const WATER_POLES: &str = "atom,z_atom,x_atom,chiral_atom,charge,dx,dy,dz\n\
                                   0,1,2,,-0.8,0,0,0.3\n\
                                   1,,,,0.4,0,0,0\n\
                                   2,,,,0.4,0,0,0\n";

    pub const QMMM_SETTINGS: &str = r#"
        potential = "qmmm"

        [qm]
        wrapper = "psi4"
        method = "hf"
        basis = "cc-pvdz"

        [mm]
        wrapper = "tinker"
        potential = "amoeba"

        [regions]
        qm = [0]
        "#;

    /// Writes the water inputs into `dir` and returns matching system inputs.
    pub fn water_inputs(dir: &Path, settings: &str) -> SystemInputs {
        let xyz = dir.join("water.xyz");
        let poles = dir.join("water.csv");
        let config = dir.join("settings.toml");
        fs::write(&xyz, WATER_XYZ).unwrap();
        fs::write(&poles, WATER_POLES).unwrap();
        fs::write(&config, settings).unwrap();
        SystemInputs {
            xyz,
            poles,
            settings: config,
            beads: None,
            pole_units: None,
            layout: None,
            site_radius: None,
            max_order: None,
            strict: false,
            no_checks: false,
            set_values: vec![],
        }
    }
}
