mod cli;

use std::sync::Arc;

use bhav_index::index;
use bhav_index::render::{Renderer, TextRenderer};
use bhav_index::serving::{SearchOutcome, Service};
use bhav_index::{FileStore, LookupEngine, csv_processor, utils};
use bhav_index::config::Config;
use bhav_index::fetcher::Fetcher;
use bhav_index::pipeline::Pipeline;

/// Main entry point of the application.
///
/// This function orchestrates the entire workflow:
/// 1. Parses command-line arguments and installs the log subscriber.
/// 2. Determines the number of threads to use.
/// 3. Opens the store directory.
/// 4. Runs ingestion or serves a lookup against the last ingested generation.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    args.config.validate()?;

    let effective_threads = match args.threads {
        Some(n) => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                println!("⚠️ Warning: Limiting thread count to {} (max available)", max_threads);
                max_threads
            } else { n }
        }
        None => rayon::current_num_threads(),
    };
    tracing::debug!(threads = effective_threads, "thread pool sized");

    let local_pool = utils::configure_thread_pool(effective_threads)?;
    local_pool.install(|| run(&args))
}

fn run(args: &cli::Args) -> anyhow::Result<()> {
    let store = Arc::new(FileStore::open(&args.config.store_dir)?);

    match &args.command {
        cli::Command::Ingest { date } => ingest(&args.config, store, date.as_deref(), !args.quiet),
        cli::Command::Index { count } => {
            let service = service(&args.config, store)?;
            print!("{}", TextRenderer.render(&service.index(*count)?));
            Ok(())
        }
        cli::Command::Page { offset, limit } => {
            let service = service(&args.config, store)?;
            print!("{}", TextRenderer.render(&service.page(*offset, *limit)?));
            Ok(())
        }
        cli::Command::Search { query } => {
            let service = service(&args.config, store)?;
            match service.search(query)? {
                SearchOutcome::NoQuery => println!("No search query supplied."),
                SearchOutcome::NoMatches { query } => println!("No records match `{}`.", query),
                SearchOutcome::Matches(view) => print!("{}", TextRenderer.render(&view)),
            }
            Ok(())
        }
        cli::Command::Export { output } => export(&args.config, store, output),
    }
}

fn ingest(config: &Config, store: Arc<FileStore>, date: Option<&str>, show_progress: bool) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let date = match date {
        Some(d) => utils::parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    println!("Start ingestion for {}...", date.format("%Y-%m"));

    let fetcher = Fetcher::new(config.timeout, &config.user_agent)?;
    let report = Pipeline::new(&fetcher, store.as_ref(), config)
        .with_progress(show_progress)
        .run(date)?;

    let manifest = report.manifest(&config.id_field, chrono::Utc::now());
    index::save_manifest(store.dir(), &manifest)?;

    println!(
        "✅ Indexed {} records from {} (generation {}) in {:?} seconds",
        report.loaded,
        report.entry_name,
        report.generation,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Builds the lookup service from the last run's manifest.
///
/// A missing manifest, or one from another generation, makes the Name Set
/// fall back to the store's keys, sorted.
fn service(config: &Config, store: Arc<FileStore>) -> anyhow::Result<Service> {
    let manifest = index::load_manifest(store.dir())?;
    if let Some(manifest) = &manifest {
        if manifest.id_field != config.id_field {
            tracing::warn!(
                indexed_by = %manifest.id_field,
                requested = %config.id_field,
                "store was indexed by a different field"
            );
        }
        tracing::debug!(
            artifact = %manifest.artifact_url,
            ingested_at = %utils::format_timestamp(manifest.ingested_at),
            "serving manifest"
        );
    }
    let (schema, names) = index::resolve_names(store.as_ref(), manifest)?;
    if names.is_empty() {
        println!("⚠️ The index is empty; run `bhav-index ingest` first.");
    }

    let engine = LookupEngine::new(store, names);
    Ok(Service::new(engine, &schema, &config.display_fields, config.page_size))
}

fn export(config: &Config, store: Arc<FileStore>, output: &std::path::Path) -> anyhow::Result<()> {
    let manifest = index::load_manifest(store.dir())?
        .ok_or_else(|| anyhow::anyhow!("Nothing to export; run `bhav-index ingest` first"))?;
    let engine = LookupEngine::new(store, manifest.names.clone());
    let records = engine.page(0, manifest.names.len())?;
    let text = csv_processor::write_table(&manifest.schema, &records)?;
    std::fs::write(output, text)?;
    println!(
        "✅ Exported {} records keyed by {} to {}",
        records.len(),
        config.id_field,
        output.display()
    );
    Ok(())
}
