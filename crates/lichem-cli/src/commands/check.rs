use crate::cli::CheckArgs;
use crate::config::builder;
use crate::error::Result;
use lichem::core::simulation::threads::ThreadBudget;
use tracing::info;

/// Validates a settings file and prints the run it describes, including the CPU split.
pub fn run(args: CheckArgs, available_cpus: usize) -> Result<()> {
    let settings = builder::load_settings(&args.settings, args.ncpus)?;
    if let Some(atoms) = args.atoms {
        settings.validate(atoms)?;
        info!("Settings are valid for {} atoms.", atoms);
    }

    let budget = ThreadBudget::new(settings.qm_cpus, available_cpus, &settings.calculation);
    println!("{}", settings);
    println!(
        "Thread budget:    {} CPU(s) per QM call, {} worker thread(s)",
        budget.qm_cpus, budget.worker_threads
    );
    Ok(())
}
