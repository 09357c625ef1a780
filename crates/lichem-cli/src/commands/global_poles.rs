use super::{load_system, worker_pool};
use crate::cli::GlobalPolesArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::ProgressDisplay;
use lichem::core::io::embedding::write_global_poles;
use lichem::engine::progress::ProgressReporter;
use lichem::workflows::embed::SetupError;
use lichem::workflows;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;

pub fn run(args: GlobalPolesArgs, available_cpus: usize, display: ProgressDisplay) -> Result<()> {
    let loaded = load_system(&args.inputs)?;
    let replicas = loaded.system.replica_count().map_err(SetupError::from)?;
    if args.replica >= replicas {
        return Err(CliError::Argument(format!(
            "replica {} requested but the calculation has {} replica(s)",
            args.replica, replicas
        )));
    }

    let pool = worker_pool(&loaded.config.settings, available_cpus)?;
    let reporter = ProgressReporter::with_callback(display.callback());
    let field = pool.install(|| {
        workflows::embed::run(&loaded.system, &loaded.config.embedding, &reporter)
    })?;
    let records = field.global_pole_records(&loaded.system, args.replica);

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => {
            info!("Writing global multipoles to {:?}", path);
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(io::stdout().lock()),
    };
    write_global_poles(&mut writer, args.replica, &records)?;
    writer.flush()?;
    Ok(())
}
