//! # CLI Module
//!
//! Command-line interface for the perceptual hash catalogue.
//!
//! ## Usage
//! ```bash
//! # Hash a directory into a store, appending as each image finishes
//! phash-catalog hash ~/Photos --store hashes.csv
//!
//! # Rewrite the store in enumeration order instead
//! phash-catalog hash ~/Photos --store hashes.csv --mode rewrite
//!
//! # Twenty nearest neighbours of an image
//! phash-catalog similar hashes.csv --image query.jpg --algorithm difference
//!
//! # Rename and remove exact duplicates without prompting
//! phash-catalog dedup ~/Downloads/batch --yes
//!
//! # JSON output
//! phash-catalog search hashes.csv beach --output json
//! ```

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use phash_catalog::core::dedup::{self, DedupConfig, RemovalSummary, RenameSummary};
use phash_catalog::core::hasher::{
    HashAlgorithmKind, HashBackend, HashRecord, HashString, HasherConfig, ImageHasherBackend,
};
use phash_catalog::core::pipeline::{catalogue, CatalogRun, HashPipeline};
use phash_catalog::core::scanner::{
    AssetDetails, AssetEnumerator, ScanConfig, Selection, WalkDirEnumerator,
};
use phash_catalog::core::similarity::{
    self, nearest_to_record, nearest_with, LengthPolicy, SearchOptions, SearchOutcome,
};
use phash_catalog::core::store::{self, LoadReport, PersistMode, RecordStore};
use phash_catalog::error::{CatalogError, Result};
use phash_catalog::events::{DedupEvent, Event, EventChannel, HashEvent, PipelineEvent, ScanEvent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;

/// Perceptual hash catalogue - hash, search and deduplicate images
#[derive(Parser, Debug)]
#[command(name = "phash-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash images into a record store
    Hash {
        /// Image files, or a single directory to walk
        #[arg(required_unless_present = "manifest")]
        paths: Vec<PathBuf>,

        /// Read the file list from a selection manifest instead
        #[arg(long, conflicts_with = "paths")]
        manifest: Option<PathBuf>,

        /// Hash algorithms to compute
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_value = "average,perceptual,difference"
        )]
        algorithms: Vec<Algorithm>,

        /// Worker threads (defaults to available parallelism)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Record store file
        #[arg(short, long, default_value = "hashes.csv")]
        store: PathBuf,

        /// How records are persisted
        #[arg(short, long, default_value = "append")]
        mode: Mode,

        /// Hash size in bits per side (8, 16 or 32)
        #[arg(long, default_value = "8")]
        hash_size: u32,

        /// Skip hidden files and directories
        #[arg(long)]
        skip_hidden: bool,
    },

    /// Find the stored records nearest to a query
    #[command(group(ArgGroup::new("query").required(true).args(["hash", "image", "record"])))]
    Similar {
        /// Record store file
        store: PathBuf,

        /// Query with a literal hash string
        #[arg(long)]
        hash: Option<String>,

        /// Query with the hash of an image file
        #[arg(long)]
        image: Option<PathBuf>,

        /// Query with the first stored record matching this text
        #[arg(long)]
        record: Option<String>,

        /// Algorithm column to compare
        #[arg(short, long, default_value = "difference")]
        algorithm: Algorithm,

        /// Maximum results
        #[arg(short, default_value = "20")]
        k: usize,

        /// Skip candidates whose hash length differs from the query
        #[arg(long)]
        strict: bool,

        /// Hash size used when hashing `--image`
        #[arg(long, default_value = "8")]
        hash_size: u32,

        /// Show file size and dimensions of each result
        #[arg(long)]
        details: bool,
    },

    /// List stored records whose path or hashes contain a term
    Search {
        /// Record store file
        store: PathBuf,

        /// Case-insensitive search term
        term: String,
    },

    /// Normalize file names and delete exact duplicates in one directory
    Dedup {
        /// Directory to process (not recursive)
        dir: PathBuf,

        /// Delete duplicates without asking
        #[arg(short, long)]
        yes: bool,

        /// Only remove duplicates, keep names as they are
        #[arg(long)]
        skip_rename: bool,
    },

    /// Save a selection as a timestamped manifest
    Manifest {
        /// Image files, or a single directory to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directory the manifest is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Average Hash - Fast, good for exact duplicates
    Average,
    /// Perceptual Hash - Most robust to edits
    Perceptual,
    /// Difference Hash - Good balance
    Difference,
    /// Wavelet Hash - needs a custom backend
    Wavelet,
    /// Color Hash - needs a custom backend
    Color,
}

impl From<Algorithm> for HashAlgorithmKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Average => HashAlgorithmKind::Average,
            Algorithm::Perceptual => HashAlgorithmKind::Perceptual,
            Algorithm::Difference => HashAlgorithmKind::Difference,
            Algorithm::Wavelet => HashAlgorithmKind::Wavelet,
            Algorithm::Color => HashAlgorithmKind::Color,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Append each record as it finishes
    Append,
    /// Rewrite the whole store at the end, in selection order
    Rewrite,
}

impl From<Mode> for PersistMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Append => PersistMode::StreamingAppend,
            Mode::Rewrite => PersistMode::BatchRewrite,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    phash_catalog::init_tracing(cli.verbose);
    let output = cli.output;

    match cli.command {
        Commands::Hash {
            paths,
            manifest,
            algorithms,
            concurrency,
            store,
            mode,
            hash_size,
            skip_hidden,
        } => run_hash(HashArgs {
            paths,
            manifest,
            algorithms: algorithms.into_iter().map(Into::into).collect(),
            concurrency,
            store,
            mode: mode.into(),
            hash_size,
            include_hidden: !skip_hidden,
            output,
            verbose: cli.verbose,
        }),
        Commands::Similar {
            store,
            hash,
            image,
            record,
            algorithm,
            k,
            strict,
            hash_size,
            details,
        } => {
            let query = match (hash, image, record) {
                (Some(hash), _, _) => Query::Hash(HashString::new(hash)),
                (_, Some(image), _) => Query::Image(image),
                (_, _, Some(term)) => Query::Record(term),
                _ => {
                    return Err(CatalogError::Config(
                        "one of --hash, --image or --record is required".to_string(),
                    ))
                }
            };
            let policy = if strict {
                LengthPolicy::Strict
            } else {
                LengthPolicy::Truncate
            };
            run_similar(
                &store,
                query,
                algorithm.into(),
                SearchOptions::new().k(k).length_policy(policy),
                hash_size,
                details,
                output,
            )
        }
        Commands::Search { store, term } => run_search(&store, &term, output),
        Commands::Dedup {
            dir,
            yes,
            skip_rename,
        } => run_dedup(
            &dir,
            DedupConfig::new()
                .skip_confirmation(yes)
                .skip_rename(skip_rename),
            output,
        ),
        Commands::Manifest { paths, out_dir } => run_manifest(paths, &out_dir, output),
    }
}

struct HashArgs {
    paths: Vec<PathBuf>,
    manifest: Option<PathBuf>,
    algorithms: Vec<HashAlgorithmKind>,
    concurrency: Option<usize>,
    store: PathBuf,
    mode: PersistMode,
    hash_size: u32,
    include_hidden: bool,
    output: OutputFormat,
    verbose: bool,
}

fn progress_bar(template: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template(template)
        .map(|s| s.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to encode output: {e}"),
    }
}

fn run_hash(args: HashArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    ImageHasherBackend::check_algorithms(&args.algorithms)?;

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Perceptual Hash Catalogue").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let selection = match &args.manifest {
        Some(manifest) => Selection::Files(store::read_manifest(manifest)?),
        None => Selection::from_paths(args.paths.clone()),
    };

    let mut builder = HashPipeline::builder()
        .algorithms(&args.algorithms)
        .backend(std::sync::Arc::new(
            HasherConfig::new().hash_size(args.hash_size).build(),
        ));
    if let Some(concurrency) = args.concurrency {
        builder = builder.concurrency(concurrency);
    }
    let pipeline = builder.build()?;

    let enumerator = WalkDirEnumerator::new(ScanConfig {
        include_hidden: args.include_hidden,
        ..ScanConfig::default()
    });

    let (sender, receiver) = EventChannel::new();
    let store = RecordStore::new(&args.store).with_events(sender.clone());

    let progress = pretty.then(|| progress_bar("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}"));
    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{phase}"));
                }
                Event::Scan(ScanEvent::Completed { total_assets }) => {
                    pb.set_length(total_assets as u64);
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    pb.set_position(p.processed as u64);
                    if verbose {
                        pb.set_message(
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy()
                                .into_owned(),
                        );
                    }
                }
                Event::Hash(HashEvent::Error { path, message }) if verbose => {
                    pb.println(format!("  {} {}: {}", style("✗").red(), path.display(), message));
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let run = catalogue(&enumerator, &selection, &pipeline, &store, args.mode, &sender);

    // Drop sender to signal event thread to finish
    drop(store);
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let run = run?;
    match args.output {
        OutputFormat::Pretty => print_hash_pretty(&term, &run, &args),
        OutputFormat::Json => print_hash_json(&run, &args),
    }
    Ok(())
}

fn print_hash_pretty(term: &Term, run: &CatalogRun, args: &HashArgs) {
    if run.empty_selection {
        term.write_line(&format!(
            "{} No images matched the selection; nothing to do.",
            style("○").dim()
        ))
        .ok();
        return;
    }

    let tally = run.result.tally;
    term.write_line(&format!("{} Hashing Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();
    term.write_line(&format!(
        "  {} images in {:.1}s",
        style(tally.total).cyan(),
        run.result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} hashed", style(tally.succeeded).green()))
        .ok();
    if tally.failed > 0 {
        term.write_line(&format!("  {} failed", style(tally.failed).red()))
            .ok();
    }
    if tally.cancelled > 0 {
        term.write_line(&format!("  {} cancelled", style(tally.cancelled).yellow()))
            .ok();
    }
    term.write_line(&format!(
        "  {} rows written to {} ({})",
        style(run.result.rows_written).cyan(),
        args.store.display(),
        args.mode
    ))
    .ok();

    if !run.scan_errors.is_empty() {
        term.write_line(&format!(
            "  {} entries could not be read",
            style(run.scan_errors.len()).yellow()
        ))
        .ok();
    }

    let failures: Vec<_> = run.result.failures().collect();
    if !failures.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Failures:").bold().underlined()))
            .ok();
        for (path, error) in failures {
            term.write_line(&format!("  {} {}", style("✗").red(), path.display()))
                .ok();
            if args.verbose {
                term.write_line(&format!("    {}", style(error).dim())).ok();
            }
        }
    }
}

fn print_hash_json(run: &CatalogRun, args: &HashArgs) {
    let output = serde_json::json!({
        "store": args.store,
        "mode": args.mode,
        "empty_selection": run.empty_selection,
        "summary": run.result.summary(),
        "scan_errors": run.scan_errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        "failures": run.result.failures().map(|(path, error)| {
            serde_json::json!({ "path": path, "error": error.to_string() })
        }).collect::<Vec<_>>(),
    });
    print_json(&output);
}

enum Query {
    Hash(HashString),
    Image(PathBuf),
    Record(String),
}

fn load_store(path: &Path, output: OutputFormat) -> Result<LoadReport> {
    let report = RecordStore::new(path).load()?;
    if matches!(output, OutputFormat::Pretty) && !report.malformed.is_empty() {
        let term = Term::stderr();
        for row in &report.malformed {
            term.write_line(&format!("{} {}", style("!").yellow(), row)).ok();
        }
    }
    Ok(report)
}

fn run_similar(
    store_path: &Path,
    query: Query,
    algorithm: HashAlgorithmKind,
    options: SearchOptions,
    hash_size: u32,
    details: bool,
    output: OutputFormat,
) -> Result<()> {
    let report = load_store(store_path, output)?;
    if !report.algorithms().contains(&algorithm) && !report.is_empty() {
        return Err(CatalogError::Config(format!(
            "{} has no {algorithm} column",
            store_path.display()
        )));
    }
    let records = &report.records;

    let outcome: SearchOutcome<'_> = match query {
        Query::Hash(hash) => nearest_with(records, &hash, algorithm, &options),
        Query::Image(image) => {
            let backend = HasherConfig::new().hash_size(hash_size).build();
            let decoded = backend.open(&image)?;
            let hash = backend.compute(&image, &decoded, algorithm)?;
            nearest_with(records, &hash, algorithm, &options)
        }
        Query::Record(term) => {
            let index = similarity::find_first(records, &term).ok_or_else(|| {
                CatalogError::Config(format!("no stored record matches '{term}'"))
            })?;
            nearest_to_record(records, index, algorithm, &options).ok_or_else(|| {
                CatalogError::Config(format!(
                    "{} has no {algorithm} value",
                    records[index].asset_path.display()
                ))
            })?
        }
    };

    match output {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Pretty => {
            let term = Term::stdout();
            if outcome.neighbors.is_empty() {
                term.write_line(&format!("{} No comparable records", style("○").dim()))
                    .ok();
            }
            for (rank, neighbor) in outcome.neighbors.iter().enumerate() {
                let mut line = format!(
                    "{:>3}. {} {}",
                    rank + 1,
                    style(format!("[{:>3}]", neighbor.distance)).yellow(),
                    neighbor.record.asset_path.display()
                );
                if details {
                    if let Ok(info) = AssetDetails::inspect(&neighbor.record.asset_path) {
                        line.push_str(&format!(
                            "  {}",
                            style(format!(
                                "{} {}",
                                format_bytes(info.size_bytes),
                                info.dimensions_display().unwrap_or_default()
                            ))
                            .dim()
                        ));
                    }
                }
                term.write_line(&line).ok();
            }
            if !outcome.skipped.is_empty() {
                term.write_line(&format!(
                    "{}",
                    style(format!("{} records could not be compared", outcome.skipped.len()))
                        .dim()
                ))
                .ok();
            }
        }
    }
    Ok(())
}

fn run_search(store_path: &Path, term_text: &str, output: OutputFormat) -> Result<()> {
    let report = load_store(store_path, output)?;
    let matches: Vec<&HashRecord> = similarity::filter(&report.records, term_text)
        .into_iter()
        .map(|i| &report.records[i])
        .collect();

    match output {
        OutputFormat::Json => print_json(&matches),
        OutputFormat::Pretty => {
            let term = Term::stdout();
            for record in &matches {
                term.write_line(&format!("{}", style(record.asset_path.display()).bold()))
                    .ok();
                for (algorithm, hash) in &record.hashes {
                    term.write_line(&format!("    {:<16} {}", algorithm.column_name(), hash))
                        .ok();
                }
            }
            term.write_line(&format!(
                "{}",
                style(format!("{} matching records", matches.len())).dim()
            ))
            .ok();
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct DedupSummary {
    rename: Option<RenameSummary>,
    removal: RemovalSummary,
}

fn run_dedup(dir: &Path, config: DedupConfig, output: OutputFormat) -> Result<()> {
    let pretty = matches!(output, OutputFormat::Pretty);
    let (sender, receiver) = EventChannel::new();

    let progress = pretty.then(|| progress_bar("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len}"));
    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Dedup(DedupEvent::Started { pass, total }) => {
                    pb.reset();
                    pb.set_length(total as u64);
                    pb.set_message(format!("{pass}"));
                }
                Event::Dedup(DedupEvent::Progress(p)) => {
                    pb.set_position(p.processed as u64);
                }
                Event::Dedup(DedupEvent::Error { path, message }) => {
                    pb.println(format!("  {} {}: {}", style("✗").red(), path.display(), message));
                }
                _ => {}
            }
        }
    });

    let prompt_bar = progress.clone();
    let mut confirm = |duplicate: &Path, original: &Path| {
        let ask = || {
            dialoguer::Confirm::new()
                .with_prompt(format!(
                    "Delete {} (same content as {})?",
                    duplicate.display(),
                    original.display()
                ))
                .default(false)
                .interact()
                .unwrap_or(false)
        };
        match &prompt_bar {
            Some(pb) => pb.suspend(ask),
            None => ask(),
        }
    };

    let report = dedup::run(dir, &config, &mut confirm, &sender);

    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let report = report?;

    let summary = DedupSummary {
        rename: report.rename.as_ref().map(RenameSummary::from),
        removal: RemovalSummary::from(&report.removal),
    };

    match output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Pretty => {
            let term = Term::stdout();
            if let Some(rename) = &summary.rename {
                term.write_line(&format!(
                    "{} {} of {} files renamed",
                    style("✓").green().bold(),
                    style(rename.renamed).cyan(),
                    rename.total
                ))
                .ok();
            }
            term.write_line(&format!(
                "{} {} duplicates removed, {} kept on request",
                style("✓").green().bold(),
                style(summary.removal.removed.len()).cyan(),
                summary.removal.declined.len()
            ))
            .ok();
            for removed in &summary.removal.removed {
                term.write_line(&format!(
                    "    {} {} {}",
                    style("−").red(),
                    removed.path.display(),
                    style(format!("(copy of {})", removed.original.display())).dim()
                ))
                .ok();
            }
            let errors = summary
                .rename
                .iter()
                .flat_map(|r| r.errors.iter())
                .chain(summary.removal.errors.iter());
            for error in errors {
                term.write_line(&format!("  {} {}", style("!").yellow(), error))
                    .ok();
            }
        }
    }
    Ok(())
}

fn run_manifest(paths: Vec<PathBuf>, out_dir: &Path, output: OutputFormat) -> Result<()> {
    let enumerator = WalkDirEnumerator::new(ScanConfig::default());
    let scan = enumerator.enumerate(&Selection::from_paths(paths))?;
    let manifest = store::write_manifest(out_dir, &scan.assets)?;

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "manifest": manifest,
            "entries": scan.assets.len(),
        })),
        OutputFormat::Pretty => {
            Term::stdout()
                .write_line(&format!(
                    "{} {} paths saved to {}",
                    style("✓").green().bold(),
                    style(scan.assets.len()).cyan(),
                    manifest.display()
                ))
                .ok();
        }
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
