use super::defaults::DefaultsConfig;
use super::file::{
    FileCalculationConfig, FileConfig, FileEmbeddingConfig, FileMmConfig, FileQmConfig,
};
use super::models::AppConfig;
use crate::cli::SystemInputs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use lichem::core::simulation::mode::{
    CalculationKind, CalculationMode, EnsembleSamplingSettings, NativeOptimizerSettings,
    OptimizerSettings, PathIntegralSettings, ReactionPathSettings,
};
use lichem::core::simulation::settings::{
    MmSettings, PeriodicBox, QmMemory, QmSettings, Regions, SimulationSettings,
};
use lichem::engine::config::{EmbeddingConfig, EmbeddingConfigBuilder};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Merges defaults, the settings file, `-S` overrides and command-line flags for a command
/// that builds a system.
pub fn build_config(inputs: &SystemInputs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::from_file(&inputs.settings)?;
    let mut file_config = apply_set_values(file_config, &inputs.set_values)?;

    let embedding_file = file_config.embedding.take().unwrap_or_default();
    let pole_units = match inputs.pole_units {
        Some(units) => units,
        None => parse_keyword(embedding_file.pole_units.as_deref(), "embedding.pole-units")?
            .unwrap_or(defaults.pole_units),
    };
    let embedding = build_embedding(inputs, embedding_file, &defaults)?;
    let settings = build_settings(file_config, None, &defaults)?;

    Ok(AppConfig {
        settings,
        embedding,
        pole_units,
    })
}

/// Loads only the simulation settings, for commands that do not touch a structure.
pub fn load_settings(path: &Path, ncpus: Option<usize>) -> Result<SimulationSettings> {
    let defaults = DefaultsConfig::default();
    build_settings(FileConfig::from_file(path)?, ncpus, &defaults)
}

fn build_embedding(
    inputs: &SystemInputs,
    file: FileEmbeddingConfig,
    defaults: &DefaultsConfig,
) -> Result<EmbeddingConfig> {
    let layout = match inputs.layout {
        Some(layout) => layout,
        None => parse_keyword(file.layout.as_deref(), "embedding.layout")?
            .unwrap_or(defaults.layout),
    };
    EmbeddingConfigBuilder::new()
        .layout(layout)
        .site_radius(
            inputs
                .site_radius
                .or(file.site_radius)
                .unwrap_or(defaults.site_radius),
        )
        .max_order(
            inputs
                .max_order
                .or(file.max_order)
                .unwrap_or(defaults.max_order),
        )
        .strict(inputs.strict || file.strict.unwrap_or(defaults.strict))
        .sanity_checks(!inputs.no_checks && file.sanity_checks.unwrap_or(defaults.sanity_checks))
        .tolerance(file.tolerance.unwrap_or(defaults.tolerance))
        .min_separation(file.min_separation.unwrap_or(defaults.min_separation))
        .min_sine(file.min_sine.unwrap_or(defaults.min_sine))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn build_settings(
    file: FileConfig,
    ncpus: Option<usize>,
    defaults: &DefaultsConfig,
) -> Result<SimulationSettings> {
    let potential = parse_keyword(file.potential.as_deref(), "potential")?.unwrap_or_default();
    let qm = file.qm.map(build_qm).transpose()?;
    let mm = file.mm.map(build_mm).transpose()?;
    let calculation = build_calculation(file.calculation.unwrap_or_default())?;
    let periodic_box = file.periodic_box.map(|[x, y, z]| PeriodicBox::new(x, y, z));
    let regions = file
        .regions
        .map(|r| Regions {
            qm: r.qm,
            pseudo_bond: r.pseudo_bond,
            boundary: r.boundary,
            frozen: r.frozen,
        })
        .unwrap_or_default();

    Ok(SimulationSettings {
        potential,
        qm,
        mm,
        calculation,
        periodic_box,
        regions,
        qm_cpus: ncpus.or(file.qm_cpus).unwrap_or(defaults.qm_cpus),
    }
    .normalized())
}

fn build_qm(file: FileQmConfig) -> Result<QmSettings> {
    let wrapper = parse_keyword(file.wrapper.as_deref(), "qm.wrapper")?
        .ok_or_else(|| CliError::Config("`qm.wrapper` is required.".to_string()))?;
    let method = parse_keyword(file.method.as_deref(), "qm.method")?
        .ok_or_else(|| CliError::Config("`qm.method` is required.".to_string()))?;
    let default_memory = QmMemory::default();
    let memory = QmMemory {
        amount: file.memory.unwrap_or(default_memory.amount),
        unit: parse_keyword(file.memory_unit.as_deref(), "qm.memory-unit")?
            .unwrap_or(default_memory.unit),
    };
    Ok(QmSettings {
        wrapper,
        method,
        basis: file.basis,
        memory,
        charge: file.charge.unwrap_or(0),
        spin: file.spin.unwrap_or(1),
    })
}

fn build_mm(file: FileMmConfig) -> Result<MmSettings> {
    let wrapper = parse_keyword(file.wrapper.as_deref(), "mm.wrapper")?
        .ok_or_else(|| CliError::Config("`mm.wrapper` is required.".to_string()))?;
    let potential = parse_keyword(file.potential.as_deref(), "mm.potential")?
        .ok_or_else(|| CliError::Config("`mm.potential` is required.".to_string()))?;
    Ok(MmSettings { wrapper, potential })
}

fn build_calculation(file: FileCalculationConfig) -> Result<CalculationMode> {
    let kind = match file.kind.as_deref() {
        None => CalculationKind::SinglePoint,
        Some(keyword) => {
            let (kind, substituted) = CalculationKind::parse_with_substitution(keyword)
                .map_err(|e| CliError::Config(format!("calculation.type: {}", e)))?;
            if substituted {
                warn!("BFGS is not available; using the DFP optimizer instead.");
            }
            kind
        }
    };

    let optimizer = || {
        let d = OptimizerSettings::default();
        OptimizerSettings {
            step_scale: file.step_scale.unwrap_or(d.step_scale),
            max_step: file.max_step.unwrap_or(d.max_step),
            qm_tolerance: file.qm_tolerance.unwrap_or(d.qm_tolerance),
            mm_tolerance: file.mm_tolerance.unwrap_or(d.mm_tolerance),
            max_steps: file.max_steps.unwrap_or(d.max_steps),
        }
    };
    let path = || {
        let d = ReactionPathSettings::default();
        ReactionPathSettings {
            beads: file.beads.unwrap_or(d.beads),
            step_scale: file.step_scale.unwrap_or(d.step_scale),
            max_step: file.max_step.unwrap_or(d.max_step),
            spring_constant: file.spring_constant.unwrap_or(d.spring_constant),
            frozen_ends: file.frozen_ends.unwrap_or(d.frozen_ends),
            qm_tolerance: file.qm_tolerance.unwrap_or(d.qm_tolerance),
            mm_tolerance: file.mm_tolerance.unwrap_or(d.mm_tolerance),
            max_steps: file.max_steps.unwrap_or(d.max_steps),
        }
    };
    let sampling = || {
        let d = EnsembleSamplingSettings::default();
        EnsembleSamplingSettings {
            time_step: file.time_step.unwrap_or(d.time_step),
            temperature: file.temperature.unwrap_or(d.temperature),
            thermostat_tau: file.thermostat_tau.unwrap_or(d.thermostat_tau),
            md_steps: file.md_steps.unwrap_or(d.md_steps),
        }
    };

    Ok(match kind {
        CalculationKind::SinglePoint => CalculationMode::SinglePoint,
        CalculationKind::NativeOptimization => {
            let d = NativeOptimizerSettings::default();
            CalculationMode::NativeOptimization(NativeOptimizerSettings {
                max_step: file.max_step.unwrap_or(d.max_step),
                mm_tolerance: file.mm_tolerance.unwrap_or(d.mm_tolerance),
                max_steps: file.max_steps.unwrap_or(d.max_steps),
            })
        }
        CalculationKind::SteepestDescent => CalculationMode::SteepestDescent(optimizer()),
        CalculationKind::QuickMin => CalculationMode::QuickMin(optimizer()),
        CalculationKind::Dfp => CalculationMode::Dfp(optimizer()),
        CalculationKind::PathIntegral => {
            let d = PathIntegralSettings::default();
            CalculationMode::PathIntegral(PathIntegralSettings {
                ensemble: parse_keyword(file.ensemble.as_deref(), "calculation.ensemble")?
                    .unwrap_or(d.ensemble),
                temperature: file.temperature.unwrap_or(d.temperature),
                pressure: file.pressure.unwrap_or(d.pressure),
                equilibration_steps: file.equilibration_steps.unwrap_or(d.equilibration_steps),
                production_steps: file.production_steps.unwrap_or(d.production_steps),
                beads: file.beads.unwrap_or(d.beads),
                acceptance_ratio: file.acceptance_ratio.unwrap_or(d.acceptance_ratio),
                print_frequency: file.print_frequency.unwrap_or(d.print_frequency),
            })
        }
        CalculationKind::ReactionPath => CalculationMode::ReactionPath(path()),
        CalculationKind::EnsembleSteepestDescent => {
            CalculationMode::EnsembleSteepestDescent(optimizer(), sampling())
        }
        CalculationKind::EnsembleReactionPath => {
            CalculationMode::EnsembleReactionPath(path(), sampling())
        }
    })
}

fn parse_keyword<T>(value: Option<&str>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| CliError::Config(format!("{}: {}", key, e)))
        })
        .transpose()
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) =
            parser::split_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

        match key {
            "potential" => config.potential = Some(value_str.to_string()),
            "qm-cpus" => config.qm_cpus = Some(number(key, value_str)?),
            "qm.wrapper" => {
                config.qm.get_or_insert_with(Default::default).wrapper = Some(value_str.to_string())
            }
            "qm.method" => config.qm.get_or_insert_with(Default::default).method = Some(value_str.to_string()),
            "qm.basis" => config.qm.get_or_insert_with(Default::default).basis = Some(value_str.to_string()),
            "qm.memory" => config.qm.get_or_insert_with(Default::default).memory = Some(number(key, value_str)?),
            "qm.charge" => config.qm.get_or_insert_with(Default::default).charge = Some(number(key, value_str)?),
            "qm.spin" => config.qm.get_or_insert_with(Default::default).spin = Some(number(key, value_str)?),
            "mm.wrapper" => {
                config.mm.get_or_insert_with(Default::default).wrapper =
                    Some(value_str.to_string())
            }
            "mm.potential" => {
                config.mm.get_or_insert_with(Default::default).potential =
                    Some(value_str.to_string())
            }
            "calculation.type" => {
                config.calculation.get_or_insert_with(Default::default).kind =
                    Some(value_str.to_string())
            }
            "calculation.beads" => {
                config.calculation.get_or_insert_with(Default::default).beads =
                    Some(number(key, value_str)?)
            }
            "calculation.step-scale" => {
                config.calculation.get_or_insert_with(Default::default).step_scale =
                    Some(number(key, value_str)?)
            }
            "calculation.max-steps" => {
                config.calculation.get_or_insert_with(Default::default).max_steps =
                    Some(number(key, value_str)?)
            }
            "calculation.temperature" => {
                config.calculation.get_or_insert_with(Default::default).temperature =
                    Some(number(key, value_str)?)
            }
            "regions.qm" => {
                config.regions.get_or_insert_with(Default::default).qm = indices(value_str)?
            }
            "regions.pseudo-bond" => {
                config.regions.get_or_insert_with(Default::default).pseudo_bond =
                    indices(value_str)?
            }
            "regions.boundary" => {
                config.regions.get_or_insert_with(Default::default).boundary = indices(value_str)?
            }
            "regions.frozen" => {
                config.regions.get_or_insert_with(Default::default).frozen = indices(value_str)?
            }
            "embedding.layout" => {
                config.embedding.get_or_insert_with(Default::default).layout =
                    Some(value_str.to_string())
            }
            "embedding.site-radius" => {
                config.embedding.get_or_insert_with(Default::default).site_radius =
                    Some(number(key, value_str)?)
            }
            "embedding.max-order" => {
                config.embedding.get_or_insert_with(Default::default).max_order =
                    Some(number(key, value_str)?)
            }
            "embedding.strict" => {
                config.embedding.get_or_insert_with(Default::default).strict =
                    Some(flag(key, value_str)?)
            }
            "embedding.sanity-checks" => {
                config.embedding.get_or_insert_with(Default::default).sanity_checks =
                    Some(flag(key, value_str)?)
            }
            "embedding.tolerance" => {
                config.embedding.get_or_insert_with(Default::default).tolerance =
                    Some(number(key, value_str)?)
            }
            "embedding.pole-units" => {
                config.embedding.get_or_insert_with(Default::default).pole_units =
                    Some(value_str.to_string())
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

fn number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid numeric value for {}: {}", key, value)))
}

fn flag(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid boolean value for {}: {}", key, value)))
}

fn indices(value: &str) -> Result<Vec<usize>> {
    parser::parse_index_list(value).map_err(|e| CliError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lichem::core::io::poles::PoleUnits;
    use lichem::core::multipoles::layout::SiteLayout;
    use lichem::core::simulation::settings::PotentialKind;
    use lichem::core::simulation::wrappers::{MmPotential, QmMethod, QmWrapper};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    const SETTINGS: &str = r#"
        potential = "qmmm"

        [qm]
        wrapper = "g09"
        method = "sescf"
        memory = 4
        memory-unit = "gb"

        [mm]
        wrapper = "tinker"
        potential = "amoeba"

        [regions]
        qm = [0, 1]
        "#;

    fn write_settings(content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn inputs(settings: PathBuf) -> SystemInputs {
        SystemInputs {
            xyz: PathBuf::from("in.xyz"),
            poles: PathBuf::from("poles.csv"),
            settings,
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

    #[test]
    fn settings_file_maps_onto_typed_settings() {
        let (_dir, path) = write_settings(SETTINGS);
        let app = build_config(&inputs(path)).unwrap();

        assert_eq!(app.settings.potential, PotentialKind::QmMm);
        let qm = app.settings.qm.unwrap();
        assert_eq!(qm.wrapper, QmWrapper::Gaussian);
        assert_eq!(qm.method, QmMethod::SemiEmpirical);
        assert_eq!(qm.memory.amount, 4);
        assert_eq!(app.settings.mm.unwrap().potential, MmPotential::Amoeba);
        assert_eq!(app.settings.calculation, CalculationMode::SinglePoint);
        assert_eq!(app.settings.regions.qm, vec![0, 1]);
        assert_eq!(app.settings.qm_cpus, 1);
    }

    #[test]
    fn embedding_defaults_apply_when_absent() {
        let (_dir, path) = write_settings(SETTINGS);
        let app = build_config(&inputs(path)).unwrap();

        assert_eq!(app.embedding.reduction.layout, SiteLayout::Dodecahedron);
        assert_eq!(app.embedding.reduction.site_radius, 0.5);
        assert_eq!(app.embedding.reduction.max_order, 3);
        assert!(!app.embedding.reduction.strict);
        assert!(app.embedding.checks.enabled);
        assert_eq!(app.pole_units, PoleUnits::Atomic);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let (_dir, path) = write_settings(&format!(
            "{SETTINGS}\n[embedding]\nlayout = \"octahedron\"\nsite-radius = 0.8\npole-units = \"debye\"\n"
        ));
        let mut args = inputs(path);
        args.layout = Some(SiteLayout::Icosahedron);
        args.strict = true;
        args.no_checks = true;
        let app = build_config(&args).unwrap();

        assert_eq!(app.embedding.reduction.layout, SiteLayout::Icosahedron);
        assert_eq!(app.embedding.reduction.site_radius, 0.8);
        assert!(app.embedding.reduction.strict);
        assert!(!app.embedding.checks.enabled);
        assert_eq!(app.pole_units, PoleUnits::Debye);
    }

    #[test]
    fn set_values_override_file() {
        let (_dir, path) = write_settings(SETTINGS);
        let mut args = inputs(path);
        args.set_values = vec![
            "regions.qm=0-2".to_string(),
            "regions.boundary=3".to_string(),
            "calculation.type=pimc".to_string(),
            "calculation.beads=8".to_string(),
            "embedding.site-radius=0.7".to_string(),
        ];
        let app = build_config(&args).unwrap();

        assert_eq!(app.settings.regions.qm, vec![0, 1, 2]);
        assert_eq!(app.settings.regions.boundary, vec![3]);
        assert_eq!(app.settings.calculation.bead_count(), 8);
        assert_eq!(app.embedding.reduction.site_radius, 0.7);
    }

    #[test]
    fn bfgs_runs_dfp_and_step_scale_is_clamped() {
        let (_dir, path) = write_settings(&format!(
            "{SETTINGS}\n[calculation]\ntype = \"bfgs\"\nstep-scale = 1.5\n"
        ));
        let app = build_config(&inputs(path)).unwrap();
        match app.settings.calculation {
            CalculationMode::Dfp(opt) => assert_eq!(opt.step_scale, 1.0),
            other => panic!("expected DFP, got {:?}", other),
        }
    }

    #[test]
    fn eneb_bead_count_is_made_odd() {
        let (_dir, path) = write_settings(&format!(
            "{SETTINGS}\n[calculation]\ntype = \"eneb\"\nbeads = 4\n"
        ));
        let settings = load_settings(&path, Some(2)).unwrap();
        assert_eq!(settings.calculation.bead_count(), 5);
        assert_eq!(settings.qm_cpus, 2);
    }

    #[test]
    fn invalid_inputs_are_config_errors() {
        let (_dir, path) = write_settings("[qm]\nmethod = \"hf\"\n");
        assert!(matches!(
            load_settings(&path, None),
            Err(CliError::Config(msg)) if msg.contains("qm.wrapper")
        ));

        let (_dir, path) = write_settings(SETTINGS);
        let mut args = inputs(path.clone());
        args.set_values = vec!["embedding.site-radius=abc".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = inputs(path.clone());
        args.set_values = vec!["optimization.num-solutions=3".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = inputs(path);
        args.max_order = Some(5);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }
}
