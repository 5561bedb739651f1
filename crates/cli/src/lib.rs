use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use flatref_fetcher::{
    discover_sources, run_batch, BatchError, BatchOptions, FetchConfig, Fetcher,
};
use flatref_indexer::{dump_refs, CategoryIndex, DumpRequest, DumpSelection, IndexerError};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod appstream;
mod report;

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "flatref")]
#[command(about = "Build Flathub ref lists and download .flatpakref descriptors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the AppStream catalog and write per-category .refs lists
    Dump(DumpArgs),

    /// Download .flatpakref descriptors for every app listed in .refs files
    Download(DownloadArgs),
}

#[derive(Args)]
struct DumpArgs {
    /// Category to dump (repeatable)
    #[arg(short = 'c', long = "category", value_name = "CAT")]
    categories: Vec<String>,

    /// Dump every category found in the catalog
    #[arg(long)]
    all: bool,

    /// Print category counts and exit without writing any ref lists
    #[arg(long)]
    dump_categories: bool,

    /// Architecture used for the catalog and the ref lines
    #[arg(long, default_value = "x86_64")]
    arch: String,

    /// Branch used for the ref lines
    #[arg(long, default_value = "stable")]
    branch: String,

    /// Output directory for .refs files
    #[arg(long, default_value = "refs")]
    out: PathBuf,

    /// Merge the selected categories into a single file named NAME
    #[arg(long, value_name = "NAME")]
    merge_to: Option<String>,

    /// Read the catalog from a local file (plain or gzip) instead of downloading it
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Catalog URL template; {arch} is substituted
    #[arg(long, value_name = "TMPL", default_value = appstream::APPSTREAM_URL_TEMPLATE)]
    catalog_url: String,

    /// Catalog download timeout in seconds
    #[arg(long, default_value_t = 120, value_name = "SECS")]
    timeout: u64,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DownloadArgs {
    /// A .refs file to read (repeatable)
    #[arg(short = 'f', long = "refs-file", value_name = "FILE")]
    refs_files: Vec<PathBuf>,

    /// Directory scanned for *.refs files
    #[arg(long, value_name = "DIR")]
    refs_dir: Option<PathBuf>,

    /// Output root; descriptors land in <out>/<subject>/
    #[arg(long, default_value = "flatpakrefs")]
    out: PathBuf,

    /// Reuse descriptors that already exist (default)
    #[arg(long, overrides_with = "no_skip_existing")]
    skip_existing: bool,

    /// Always download, replacing existing descriptors
    #[arg(long, overrides_with = "skip_existing")]
    no_skip_existing: bool,

    /// Seconds to wait after every attempt
    #[arg(long, default_value = "0", value_name = "SECS", value_parser = parse_seconds)]
    throttle: Duration,

    /// Stop after this many successful downloads (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS", value_parser = parse_seconds)]
    timeout: Duration,

    /// Parallel downloads
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: u16,

    /// Endpoint template with {app_id}; repeatable, tried in order
    #[arg(long = "endpoint", value_name = "TMPL")]
    endpoints: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn parse_seconds(raw: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{raw}' is not a valid duration"))
}

#[derive(Serialize)]
struct DumpOutput<'a> {
    indexed_components: usize,
    skipped_components: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<flatref_indexer::CategoryCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a flatref_indexer::DumpReport>,
}

pub async fn main_entry() -> ExitCode {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Dump(args) => args.json,
        Commands::Download(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let outcome = match cli.command {
        Commands::Dump(args) => run_dump(args).await,
        Commands::Download(args) => run_download(args).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(batch) = cause.downcast_ref::<BatchError>() {
            if matches!(batch, BatchError::Configuration(_) | BatchError::NotFound(_)) {
                return EXIT_CONFIGURATION;
            }
        }
        if let Some(IndexerError::ConfigurationError(_)) = cause.downcast_ref::<IndexerError>() {
            return EXIT_CONFIGURATION;
        }
    }
    EXIT_FAILURE
}

fn dump_selection(args: &DumpArgs) -> Option<DumpSelection> {
    if args.all {
        Some(DumpSelection::All)
    } else if !args.categories.is_empty() {
        Some(DumpSelection::Categories(args.categories.clone()))
    } else {
        None
    }
}

async fn run_dump(args: DumpArgs) -> Result<ExitCode> {
    let selection = dump_selection(&args);
    if selection.is_none() && !args.dump_categories {
        return Err(IndexerError::configuration(
            "pass --dump-categories, --all or at least one -c/--category",
        )
        .into());
    }

    let xml = match &args.catalog {
        Some(path) => appstream::read_catalog(path).await?,
        None => {
            let url = appstream::catalog_url(&args.catalog_url, &args.arch);
            appstream::download_catalog(&url, Duration::from_secs(args.timeout)).await?
        }
    };

    let index = CategoryIndex::from_xml(&xml).context("Failed to index AppStream catalog")?;

    if args.dump_categories {
        let counts = index.counts();
        if args.json {
            print_json(&DumpOutput {
                indexed_components: index.indexed_components(),
                skipped_components: index.skipped_components(),
                categories: Some(counts),
                report: None,
            })?;
        } else {
            print_stdout(&report::render_category_counts(&counts))?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(selection) = selection else {
        return Ok(ExitCode::SUCCESS);
    };
    let request = DumpRequest {
        selection,
        arch: args.arch.clone(),
        branch: args.branch.clone(),
        out_dir: args.out.clone(),
        merge_to: args.merge_to.clone(),
    };
    let dump_report = dump_refs(&index, &request)?;

    if args.json {
        print_json(&DumpOutput {
            indexed_components: index.indexed_components(),
            skipped_components: index.skipped_components(),
            categories: None,
            report: Some(&dump_report),
        })?;
    } else {
        print_stdout(&report::render_dump_report(&dump_report))?;
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_download(args: DownloadArgs) -> Result<ExitCode> {
    let sources = discover_sources(args.refs_dir.as_deref(), &args.refs_files)?;

    let config = if args.endpoints.is_empty() {
        FetchConfig::default()
    } else {
        FetchConfig::default().with_endpoints(args.endpoints.clone())
    };
    let fetcher = Fetcher::new(config)?;

    let options = BatchOptions {
        output_root: args.out.clone(),
        skip_existing: !args.no_skip_existing,
        limit: args.limit,
        delay: args.throttle,
        timeout: args.timeout,
        concurrency: usize::from(args.concurrency),
    };
    log::info!(
        "Downloading from {} source(s) into {}",
        sources.len(),
        options.output_root.display()
    );

    let summary = run_batch(&fetcher, &sources, &options).await?;

    if args.json {
        print_json(&summary)?;
    } else {
        print_stdout(&report::render_batch_summary(&summary))?;
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILURE))
    }
}
