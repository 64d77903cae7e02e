use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::process;
use tokio::task::spawn_blocking;

mod blocks;
mod debugging;
mod markup;
mod migration;
mod network;
mod parsing;
mod settings;

use crate::migration::{load_export, run_migration, write_output, MigrationError};
use crate::network::FileFetcher;
use crate::settings::load_settings_with_fallback;

const SETTINGS_FILE_PATH: &str = "./settings.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        error!("Usage: legacy-body-migrate <export.json> <output-dir>");
        process::exit(1);
    }

    let export_path = PathBuf::from(&args[1]);
    let output_dir = PathBuf::from(&args[2]);
    info!(
        "Migrating {} into {}",
        export_path.display(),
        output_dir.display()
    );

    let settings = load_settings_with_fallback(SETTINGS_FILE_PATH).await;

    // The HTTP client is blocking, so the whole migration runs off the async workers
    let migration_result = spawn_blocking(move || {
        let pages = load_export(&export_path)?;
        let fetcher = FileFetcher::new(&settings.fetch)?;

        let mut report = run_migration(&pages, &fetcher, &settings.blocks);
        write_output(&output_dir, &mut report.pages)?;

        Ok::<_, MigrationError>(report)
    })
    .await?;

    let report = match migration_result {
        Ok(report) => report,
        Err(err) => {
            error!("Migration failed: {}", err);
            process::exit(1);
        }
    };

    info!(
        "Done: {} pages migrated, {} failed",
        report.pages.len(),
        report.failed_pages
    );
    if report.failed_pages > 0 {
        process::exit(1);
    }

    Ok(())
}
