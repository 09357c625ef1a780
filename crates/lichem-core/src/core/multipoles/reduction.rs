use super::harmonics::{HARMONIC_ORDERS, coefficient_count, solid_harmonics};
use super::layout::SiteLayout;
use crate::core::models::charges::{PointChargeSet, PointChargeSite, TruncationReport};
use crate::core::models::reduced::ReducedMultipole;
use nalgebra::{DMatrix, DVector, Vector3};
use thiserror::Error;

const RANK_EPSILON: f64 = 1e-9;
const PSEUDO_INVERSE_EPSILON: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReductionError {
    #[error("The {layout} site layout cannot reproduce the multipole: {report}")]
    Underdetermined {
        layout: SiteLayout,
        report: TruncationReport,
    },
    #[error("Site radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("Failed to invert the {layout} site layout: {reason}")]
    Decomposition {
        layout: SiteLayout,
        reason: &'static str,
    },
}

/// Reduces global spherical-harmonic multipoles to point charges on a fixed polyhedron.
///
/// Each site first receives an equal share of the monopole. The remaining coefficients are
/// matched by the minimum-norm charge pattern over the sites, computed once per layout as the
/// pseudo-inverse of the site harmonics. That pattern has zero net charge on centrosymmetric
/// layouts, so total charge is conserved to rounding.
#[derive(Debug, Clone)]
pub struct ChargeReducer {
    layout: SiteLayout,
    radius: f64,
    max_order: usize,
    strict: bool,
    tolerance: f64,
    offsets: Vec<Vector3<f64>>,
    solver: Option<DMatrix<f64>>,
    layout_rank: usize,
}

impl ChargeReducer {
    /// Prepares a reducer for sites at `radius` bohr reproducing orders `0..=max_order`.
    ///
    /// Orders above the octupole are clamped.
    pub fn new(layout: SiteLayout, radius: f64, max_order: usize) -> Result<Self, ReductionError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ReductionError::InvalidRadius(radius));
        }
        let max_order = max_order.min(ReducedMultipole::MAX_ORDER);
        let directions = layout.directions();
        let required = coefficient_count(max_order);

        let harmonics: Vec<[f64; 16]> = directions.iter().map(solid_harmonics).collect();
        let full = DMatrix::from_fn(required, directions.len(), |i, k| harmonics[k][i]);
        let layout_rank = full.rank(RANK_EPSILON);

        let solver = if required > 1 {
            let design = full.rows(1, required - 1).into_owned();
            Some(
                design
                    .pseudo_inverse(PSEUDO_INVERSE_EPSILON)
                    .map_err(|reason| ReductionError::Decomposition { layout, reason })?,
            )
        } else {
            None
        };

        Ok(Self {
            layout,
            radius,
            max_order,
            strict: false,
            tolerance: 1e-8,
            offsets: directions.iter().map(|d| d * radius).collect(),
            solver,
            layout_rank,
        })
    }

    /// In strict mode a reduction whose error exceeds `tolerance` fails instead of returning
    /// a set with a truncation report.
    pub fn with_strictness(mut self, strict: bool, tolerance: f64) -> Self {
        self.strict = strict;
        self.tolerance = tolerance;
        self
    }

    pub fn layout(&self) -> SiteLayout {
        self.layout
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Number of independent moment constraints the layout can satisfy at `max_order`.
    pub fn layout_rank(&self) -> usize {
        self.layout_rank
    }

    pub fn is_exact_layout(&self) -> bool {
        self.layout_rank >= coefficient_count(self.max_order)
    }

    pub fn reduce(&self, multipole: &ReducedMultipole) -> Result<PointChargeSet, ReductionError> {
        let target = multipole.to_array();
        let required = coefficient_count(self.max_order);

        let share = target[0] / self.offsets.len() as f64;
        let mut charges = vec![share; self.offsets.len()];
        if let Some(solver) = &self.solver {
            let rhs = DVector::from_fn(required - 1, |i, _| {
                target[i + 1] / self.radius.powi(HARMONIC_ORDERS[i + 1] as i32)
            });
            let pattern = solver * rhs;
            let drift = pattern.mean();
            for (charge, delta) in charges.iter_mut().zip(pattern.iter()) {
                *charge += delta - drift;
            }
        }

        let mut set = PointChargeSet {
            sites: self
                .offsets
                .iter()
                .zip(charges)
                .map(|(offset, charge)| PointChargeSite {
                    offset: *offset,
                    charge,
                })
                .collect(),
            truncation: None,
        };

        if !self.is_exact_layout() {
            let report = TruncationReport {
                requested_order: self.max_order,
                layout_rank: self.layout_rank,
                required_rank: required,
                max_error: self.reproduction_error(&set, multipole),
            };
            if self.strict && !(report.max_error <= self.tolerance) {
                return Err(ReductionError::Underdetermined {
                    layout: self.layout,
                    report,
                });
            }
            set.truncation = Some(report);
        }
        Ok(set)
    }

    /// Largest absolute difference between the coefficients generated by `set` and those of
    /// `target`, over the orders this reducer reproduces. NaN if any coefficient is NaN.
    pub fn reproduction_error(&self, set: &PointChargeSet, target: &ReducedMultipole) -> f64 {
        let mut generated = [0.0; 16];
        for site in &set.sites {
            for (g, h) in generated.iter_mut().zip(solid_harmonics(&site.offset)) {
                *g += site.charge * h;
            }
        }
        generated
            .iter()
            .zip(target.to_array())
            .take(coefficient_count(self.max_order))
            .map(|(g, t)| (g - t).abs())
            .fold(0.0, |worst: f64, e| {
                if worst.is_nan() || e.is_nan() {
                    f64::NAN
                } else {
                    worst.max(e)
                }
            })
    }
}
