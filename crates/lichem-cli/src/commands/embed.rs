use super::{load_system, worker_pool};
use crate::cli::EmbedArgs;
use crate::error::Result;
use crate::utils::progress::ProgressDisplay;
use lichem::core::io::embedding::write_charges;
use lichem::engine::progress::ProgressReporter;
use lichem::workflows;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn run(args: EmbedArgs, available_cpus: usize, display: ProgressDisplay) -> Result<()> {
    let loaded = load_system(&args.inputs)?;
    let system = &loaded.system;
    let pool = worker_pool(&loaded.config.settings, available_cpus)?;

    let reporter = ProgressReporter::with_callback(display.callback());
    println!("Computing the multipole embedding field...");
    let field =
        pool.install(|| workflows::embed::run(system, &loaded.config.embedding, &reporter))?;

    let truncated = field.truncations().count();
    if truncated > 0 {
        warn!(
            "{} atom replicas were reduced with a truncated multipole expansion.",
            truncated
        );
    }

    let replicas = field.replica_count();
    for replica in 0..replicas {
        let output_path = replica_output_path(&args.output, replica, replicas);
        let mut writer = BufWriter::new(File::create(&output_path)?);
        let written = write_charges(&mut writer, field.embedding_charges(system, replica))?;
        info!(
            replica,
            charges = written,
            total_charge = field.total_charge(replica),
            "Wrote embedding charges to {:?}",
            &output_path
        );
        println!(
            "✓ Replica {}: {} charges written to {}",
            replica,
            written,
            output_path.display()
        );
    }

    Ok(())
}

/// `embedding.chg` stays as is for one replica and becomes `embedding_3.chg` for replica 3 of
/// several.
fn replica_output_path(base: &Path, replica: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, replica, ext.to_string_lossy()),
        None => format!("{}_{}", stem, replica),
    };
    base.with_file_name(file_name)
}
