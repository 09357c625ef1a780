use std::fmt;
use std::str::FromStr;

use super::wrappers::ParseKeywordError;
use phf::{Map, phf_map};

/// Parameters of a local optimizer driven by LICHEM (steepest descent, quick-min, DFP).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    /// Scale applied to each step; values above 1 are clamped.
    pub step_scale: f64,
    /// Largest allowed displacement of any atom per step, in Å.
    pub max_step: f64,
    /// RMS-force convergence threshold for the QM region.
    pub qm_tolerance: f64,
    /// RMS-force convergence threshold for the MM region.
    pub mm_tolerance: f64,
    pub max_steps: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            step_scale: 1.0,
            max_step: 0.1,
            qm_tolerance: 5e-3,
            mm_tolerance: 1e-1,
            max_steps: 200,
        }
    }
}

/// Parameters of an optimization handed to the external engine's own optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeOptimizerSettings {
    pub max_step: f64,
    pub mm_tolerance: f64,
    pub max_steps: usize,
}

impl Default for NativeOptimizerSettings {
    fn default() -> Self {
        Self {
            max_step: 0.1,
            mm_tolerance: 1e-1,
            max_steps: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ensemble {
    #[default]
    Nvt,
    Npt,
}

impl FromStr for Ensemble {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nvt" => Ok(Ensemble::Nvt),
            "npt" => Ok(Ensemble::Npt),
            _ => Err(ParseKeywordError {
                kind: "ensemble",
                value: s.to_string(),
            }),
        }
    }
}

/// Path-integral Monte Carlo parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathIntegralSettings {
    pub ensemble: Ensemble,
    /// Temperature in K.
    pub temperature: f64,
    /// Pressure in atm; only used for NPT.
    pub pressure: f64,
    pub equilibration_steps: usize,
    pub production_steps: usize,
    pub beads: usize,
    /// Target Monte Carlo acceptance ratio.
    pub acceptance_ratio: f64,
    pub print_frequency: usize,
}

impl Default for PathIntegralSettings {
    fn default() -> Self {
        Self {
            ensemble: Ensemble::Nvt,
            temperature: 298.15,
            pressure: 1.0,
            equilibration_steps: 1000,
            production_steps: 10000,
            beads: 1,
            acceptance_ratio: 0.5,
            print_frequency: 100,
        }
    }
}

/// Nudged elastic band parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionPathSettings {
    pub beads: usize,
    pub step_scale: f64,
    pub max_step: f64,
    /// Spring constant between neighbouring beads.
    pub spring_constant: f64,
    /// Keep the reactant and product beads fixed.
    pub frozen_ends: bool,
    pub qm_tolerance: f64,
    pub mm_tolerance: f64,
    pub max_steps: usize,
}

impl Default for ReactionPathSettings {
    fn default() -> Self {
        Self {
            beads: 3,
            step_scale: 1.0,
            max_step: 0.1,
            spring_constant: 1.0,
            frozen_ends: true,
            qm_tolerance: 5e-3,
            mm_tolerance: 1e-1,
            max_steps: 200,
        }
    }
}

/// Parameters of the MM sampling between ensemble optimization steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleSamplingSettings {
    /// MD time step in fs.
    pub time_step: f64,
    /// Thermostat temperature in K.
    pub temperature: f64,
    /// Thermostat relaxation time in fs.
    pub thermostat_tau: f64,
    pub md_steps: usize,
}

impl Default for EnsembleSamplingSettings {
    fn default() -> Self {
        Self {
            time_step: 1.0,
            temperature: 298.15,
            thermostat_tau: 1000.0,
            md_steps: 1000,
        }
    }
}

/// The kind of calculation, with the parameters only that kind uses.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalculationMode {
    #[default]
    SinglePoint,
    NativeOptimization(NativeOptimizerSettings),
    SteepestDescent(OptimizerSettings),
    /// Damped Verlet optimization.
    QuickMin(OptimizerSettings),
    Dfp(OptimizerSettings),
    PathIntegral(PathIntegralSettings),
    ReactionPath(ReactionPathSettings),
    EnsembleSteepestDescent(OptimizerSettings, EnsembleSamplingSettings),
    EnsembleReactionPath(ReactionPathSettings, EnsembleSamplingSettings),
}

impl CalculationMode {
    /// Number of replicas the system is expanded to for this calculation.
    pub fn bead_count(&self) -> usize {
        match self {
            CalculationMode::PathIntegral(p) => p.beads.max(1),
            CalculationMode::ReactionPath(p) | CalculationMode::EnsembleReactionPath(p, _) => {
                p.beads.max(1)
            }
            _ => 1,
        }
    }

    pub fn is_reaction_path(&self) -> bool {
        matches!(
            self,
            CalculationMode::ReactionPath(_) | CalculationMode::EnsembleReactionPath(..)
        )
    }

    /// Requires a structure file that already carries one geometry per bead.
    pub fn requires_bead_structure(&self) -> bool {
        self.is_reaction_path()
    }

    /// Index of the bead expected to hold the transition state on a reaction path.
    pub fn transition_state_bead(&self) -> Option<usize> {
        match self {
            CalculationMode::ReactionPath(p) => {
                if p.beads % 2 == 0 {
                    Some(p.beads / 2)
                } else {
                    Some((p.beads.saturating_sub(1)) / 2)
                }
            }
            CalculationMode::EnsembleReactionPath(p, _) => Some(p.beads.saturating_sub(1) / 2),
            _ => None,
        }
    }

    /// The step scale of optimizer-driven modes.
    pub fn step_scale_mut(&mut self) -> Option<&mut f64> {
        match self {
            CalculationMode::SteepestDescent(o)
            | CalculationMode::QuickMin(o)
            | CalculationMode::Dfp(o)
            | CalculationMode::EnsembleSteepestDescent(o, _) => Some(&mut o.step_scale),
            CalculationMode::ReactionPath(p) | CalculationMode::EnsembleReactionPath(p, _) => {
                Some(&mut p.step_scale)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> CalculationKind {
        match self {
            CalculationMode::SinglePoint => CalculationKind::SinglePoint,
            CalculationMode::NativeOptimization(_) => CalculationKind::NativeOptimization,
            CalculationMode::SteepestDescent(_) => CalculationKind::SteepestDescent,
            CalculationMode::QuickMin(_) => CalculationKind::QuickMin,
            CalculationMode::Dfp(_) => CalculationKind::Dfp,
            CalculationMode::PathIntegral(_) => CalculationKind::PathIntegral,
            CalculationMode::ReactionPath(_) => CalculationKind::ReactionPath,
            CalculationMode::EnsembleSteepestDescent(..) => {
                CalculationKind::EnsembleSteepestDescent
            }
            CalculationMode::EnsembleReactionPath(..) => CalculationKind::EnsembleReactionPath,
        }
    }
}

/// The parameter-free tag of a [`CalculationMode`], as written in settings files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationKind {
    SinglePoint,
    NativeOptimization,
    SteepestDescent,
    QuickMin,
    Dfp,
    PathIntegral,
    ReactionPath,
    EnsembleSteepestDescent,
    EnsembleReactionPath,
}

static CALCULATION_ALIASES: Map<&'static str, CalculationKind> = phf_map! {
    "sp" => CalculationKind::SinglePoint,
    "energy" => CalculationKind::SinglePoint,
    "single-point" => CalculationKind::SinglePoint,
    "opt" => CalculationKind::NativeOptimization,
    "steep" => CalculationKind::SteepestDescent,
    "sd" => CalculationKind::SteepestDescent,
    "quickmin" => CalculationKind::QuickMin,
    "dampedverlet" => CalculationKind::QuickMin,
    "dfp" => CalculationKind::Dfp,
    "bfgs" => CalculationKind::Dfp,
    "pimc" => CalculationKind::PathIntegral,
    "neb" => CalculationKind::ReactionPath,
    "esd" => CalculationKind::EnsembleSteepestDescent,
    "eneb" => CalculationKind::EnsembleReactionPath,
};

impl CalculationKind {
    /// Parses a calculation keyword, reporting whether a legacy alias was substituted.
    ///
    /// `bfgs` is accepted but runs the DFP optimizer, so callers should tell the user.
    pub fn parse_with_substitution(s: &str) -> Result<(Self, bool), ParseKeywordError> {
        let key = s.trim().to_ascii_lowercase();
        let kind = CALCULATION_ALIASES
            .get(key.as_str())
            .copied()
            .ok_or_else(|| ParseKeywordError {
                kind: "calculation type",
                value: s.to_string(),
            })?;
        Ok((kind, key == "bfgs"))
    }

    pub fn uses_beads(&self) -> bool {
        matches!(
            self,
            CalculationKind::PathIntegral
                | CalculationKind::ReactionPath
                | CalculationKind::EnsembleReactionPath
        )
    }
}

impl FromStr for CalculationKind {
    type Err = ParseKeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_substitution(s).map(|(kind, _)| kind)
    }
}

impl fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CalculationKind::SinglePoint => "single point",
            CalculationKind::NativeOptimization => "native optimization",
            CalculationKind::SteepestDescent => "steepest descent",
            CalculationKind::QuickMin => "damped Verlet (QuickMin)",
            CalculationKind::Dfp => "DFP",
            CalculationKind::PathIntegral => "PIMC",
            CalculationKind::ReactionPath => "NEB",
            CalculationKind::EnsembleSteepestDescent => "ensemble steepest descent",
            CalculationKind::EnsembleReactionPath => "ensemble NEB",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neb(beads: usize) -> CalculationMode {
        CalculationMode::ReactionPath(ReactionPathSettings {
            beads,
            ..Default::default()
        })
    }

    #[test]
    fn bead_count_depends_on_mode() {
        assert_eq!(CalculationMode::SinglePoint.bead_count(), 1);
        assert_eq!(neb(7).bead_count(), 7);
        let pimc = CalculationMode::PathIntegral(PathIntegralSettings {
            beads: 16,
            ..Default::default()
        });
        assert_eq!(pimc.bead_count(), 16);
        assert_eq!(
            CalculationMode::Dfp(OptimizerSettings::default()).bead_count(),
            1
        );
    }

    #[test]
    fn transition_state_bead_follows_parity() {
        assert_eq!(neb(8).transition_state_bead(), Some(4));
        assert_eq!(neb(7).transition_state_bead(), Some(3));
        let eneb = CalculationMode::EnsembleReactionPath(
            ReactionPathSettings {
                beads: 9,
                ..Default::default()
            },
            EnsembleSamplingSettings::default(),
        );
        assert_eq!(eneb.transition_state_bead(), Some(4));
        assert_eq!(CalculationMode::SinglePoint.transition_state_bead(), None);
    }

    #[test]
    fn keywords_resolve_aliases() {
        assert_eq!("SP".parse(), Ok(CalculationKind::SinglePoint));
        assert_eq!("Steep".parse(), Ok(CalculationKind::SteepestDescent));
        assert_eq!("ENEB".parse(), Ok(CalculationKind::EnsembleReactionPath));
        assert!("md".parse::<CalculationKind>().is_err());
    }

    #[test]
    fn bfgs_is_reported_as_a_substitution() {
        assert_eq!(
            CalculationKind::parse_with_substitution("BFGS"),
            Ok((CalculationKind::Dfp, true))
        );
        assert_eq!(
            CalculationKind::parse_with_substitution("dfp"),
            Ok((CalculationKind::Dfp, false))
        );
    }

    #[test]
    fn step_scale_is_exposed_for_optimizers_only() {
        let mut sd = CalculationMode::SteepestDescent(OptimizerSettings::default());
        *sd.step_scale_mut().unwrap() = 0.5;
        assert_eq!(sd.step_scale_mut().copied(), Some(0.5));
        assert!(CalculationMode::SinglePoint.step_scale_mut().is_none());
    }

    #[test]
    fn kind_round_trips_through_mode() {
        assert_eq!(neb(3).kind(), CalculationKind::ReactionPath);
        assert!(CalculationKind::PathIntegral.uses_beads());
        assert!(!CalculationKind::Dfp.uses_beads());
    }
}
