use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileQmConfig {
    pub wrapper: Option<String>,
    pub method: Option<String>,
    pub basis: Option<String>,
    pub memory: Option<u64>,
    #[serde(rename = "memory-unit")]
    pub memory_unit: Option<String>,
    pub charge: Option<i32>,
    pub spin: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileMmConfig {
    pub wrapper: Option<String>,
    pub potential: Option<String>,
}

/// The `[calculation]` table. Only the keys the selected `type` uses are read.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileCalculationConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub step_scale: Option<f64>,
    pub max_step: Option<f64>,
    pub qm_tolerance: Option<f64>,
    pub mm_tolerance: Option<f64>,
    pub max_steps: Option<usize>,
    pub ensemble: Option<String>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub equilibration_steps: Option<usize>,
    pub production_steps: Option<usize>,
    pub beads: Option<usize>,
    pub acceptance_ratio: Option<f64>,
    pub print_frequency: Option<usize>,
    pub spring_constant: Option<f64>,
    pub frozen_ends: Option<bool>,
    pub time_step: Option<f64>,
    pub thermostat_tau: Option<f64>,
    pub md_steps: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRegionsConfig {
    #[serde(default)]
    pub qm: Vec<usize>,
    #[serde(default)]
    pub pseudo_bond: Vec<usize>,
    #[serde(default)]
    pub boundary: Vec<usize>,
    #[serde(default)]
    pub frozen: Vec<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEmbeddingConfig {
    pub layout: Option<String>,
    pub site_radius: Option<f64>,
    pub max_order: Option<usize>,
    pub strict: Option<bool>,
    pub sanity_checks: Option<bool>,
    pub tolerance: Option<f64>,
    pub min_separation: Option<f64>,
    pub min_sine: Option<f64>,
    pub pole_units: Option<String>,
}

/// A LICHEM settings file as written by the user.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub potential: Option<String>,
    pub qm_cpus: Option<usize>,
    pub qm: Option<FileQmConfig>,
    pub mm: Option<FileMmConfig>,
    pub calculation: Option<FileCalculationConfig>,
    /// Box lengths in Å.
    pub periodic_box: Option<[f64; 3]>,
    pub regions: Option<FileRegionsConfig>,
    pub embedding: Option<FileEmbeddingConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn full_settings_file_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
            potential = "qmmm"
            qm-cpus = 4
            periodic-box = [20.0, 20.0, 25.0]

            [qm]
            wrapper = "gaussian"
            method = "B3LYP"
            basis = "6-31G*"
            memory = 2
            memory-unit = "GB"

            [mm]
            wrapper = "tinker"
            potential = "amoeba"

            [calculation]
            type = "neb"
            beads = 7
            spring-constant = 0.5

            [regions]
            qm = [0, 1, 2]
            boundary = [3]

            [embedding]
            layout = "icosahedron"
            site-radius = 0.6
            "#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        assert_eq!(config.qm_cpus, Some(4));
        assert_eq!(config.periodic_box, Some([20.0, 20.0, 25.0]));
        let qm = config.qm.unwrap();
        assert_eq!(qm.memory_unit.as_deref(), Some("GB"));
        let calc = config.calculation.unwrap();
        assert_eq!(calc.kind.as_deref(), Some("neb"));
        assert_eq!(calc.beads, Some(7));
        let regions = config.regions.unwrap();
        assert_eq!(regions.boundary, vec![3]);
        assert!(regions.frozen.is_empty());
        assert_eq!(config.embedding.unwrap().site_radius, Some(0.6));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[qm]\nwrapper = \"psi4\"\nfunctional = \"b3lyp\"\n").unwrap();
        assert!(matches!(
            FileConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
