use super::mode::CalculationMode;
use tracing::warn;

/// How the available CPUs are split between the external QM engine and the replica workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadBudget {
    /// CPUs given to each QM engine invocation.
    pub qm_cpus: usize,
    /// Replicas processed concurrently.
    pub worker_threads: usize,
}

impl ThreadBudget {
    /// Splits `available` CPUs for `mode`.
    ///
    /// Bead-parallel modes (PIMC) run `available / qm_cpus` replicas side by side; reaction-path
    /// modes and single-replica modes use every CPU for one worker pool.
    pub fn new(requested_qm_cpus: usize, available: usize, mode: &CalculationMode) -> Self {
        let available = available.max(1);
        let mut qm_cpus = requested_qm_cpus;
        if qm_cpus < 1 {
            warn!("Requested {} QM CPUs; using 1.", requested_qm_cpus);
            qm_cpus = 1;
        }
        if qm_cpus > available {
            warn!(
                "Requested {} QM CPUs but only {} are available; clamping.",
                qm_cpus, available
            );
            qm_cpus = available;
        }
        let worker_threads = if mode.bead_count() > 1 && !mode.is_reaction_path() {
            (available / qm_cpus).max(1)
        } else {
            available
        };
        Self {
            qm_cpus,
            worker_threads,
        }
    }
}
