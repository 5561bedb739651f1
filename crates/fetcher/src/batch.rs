use crate::error::BatchError;
use crate::fetch::Fetcher;
use crate::FetchError;
use flatref_protocol::{find_refs_in_dir, parse_file, RefListError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Policies applied across a whole download run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Descriptors land in `<output_root>/<subject>/`
    pub output_root: PathBuf,

    /// Leave present, non-empty descriptors untouched
    pub skip_existing: bool,

    /// Stop once this many descriptors were obtained (0 = no limit)
    pub limit: usize,

    /// Pause after every attempt, whatever its outcome
    pub delay: Duration,

    /// Per-request timeout
    pub timeout: Duration,

    /// Attempts allowed in flight at once
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("flatpakrefs"),
            skip_existing: true,
            limit: 0,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(30),
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Sources that could not be read
    pub skipped_sources: Vec<PathBuf>,
    pub limit_reached: bool,
    /// Descriptor paths in completion order
    pub saved: Vec<PathBuf>,
}

impl BatchSummary {
    /// A run is useful as soon as one descriptor was obtained.
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }
}

struct Attempt {
    subject: String,
    app_id: String,
    result: Result<PathBuf, FetchError>,
}

/// Subject name of a refs source: its file name without extension.
pub fn subject_for(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "refs".to_string())
}

/// Sources from a directory scan (sorted) followed by explicit files (as given).
pub fn discover_sources(
    refs_dir: Option<&Path>,
    refs_files: &[PathBuf],
) -> Result<Vec<PathBuf>, BatchError> {
    let mut sources = Vec::new();
    if let Some(dir) = refs_dir {
        match find_refs_in_dir(dir) {
            Ok(found) => sources.extend(found),
            Err(RefListError::NotFound(path)) => return Err(BatchError::NotFound(path)),
            Err(err) => return Err(BatchError::Configuration(err.to_string())),
        }
    }
    sources.extend(refs_files.iter().cloned());

    if sources.is_empty() {
        return Err(BatchError::Configuration(
            "provide a refs file and/or a refs directory".to_string(),
        ));
    }
    Ok(sources)
}

/// Fetch every distinct id listed in `sources`.
///
/// Sources are processed in the given order and ids within a source in sorted order.
/// A (subject, id) pair is fetched at most once per run: it is reserved while its
/// attempt is in flight and released again if the attempt fails. New attempts are only
/// dispatched while `succeeded + in_flight < limit`, so the limit is never exceeded,
/// and the summary is built after every attempt has finished.
///
/// With `concurrency > 1` a pair that is still in flight when a later source with the
/// same subject lists it is skipped there; if that attempt then fails, the id is not
/// retried in this run. Sequential runs (the default) always retry failed pairs.
pub async fn run_batch(
    fetcher: &Fetcher,
    sources: &[PathBuf],
    options: &BatchOptions,
) -> Result<BatchSummary, BatchError> {
    if sources.is_empty() {
        return Err(BatchError::Configuration(
            "no refs sources to download from".to_string(),
        ));
    }

    let fetcher = Arc::new(fetcher.clone());
    let concurrency = options.concurrency.max(1);
    let limit = options.limit;

    let mut summary = BatchSummary::default();
    let mut attempted: HashSet<(String, String)> = HashSet::new();
    let mut in_flight: JoinSet<Attempt> = JoinSet::new();

    'sources: for source in sources {
        let subject = subject_for(source);
        let app_ids = match parse_file(source) {
            Ok(ids) => ids,
            Err(err) => {
                log::warn!("Skipping refs source: {err}");
                summary.skipped_sources.push(source.clone());
                continue;
            }
        };
        if app_ids.is_empty() {
            log::warn!("No app IDs found in refs file: {}", source.display());
            continue;
        }
        log::info!(
            "Subject '{subject}': {} app IDs from {}",
            app_ids.len(),
            source.display()
        );

        let subject_out = options.output_root.join(&subject);
        for app_id in app_ids {
            loop {
                if limit > 0 && summary.succeeded >= limit {
                    break 'sources;
                }
                let busy = in_flight.len();
                let has_slot =
                    busy < concurrency && (limit == 0 || summary.succeeded + busy < limit);
                if has_slot {
                    break;
                }
                match in_flight.join_next().await {
                    Some(joined) => record(&mut summary, &mut attempted, joined),
                    None => break,
                }
            }

            if !attempted.insert((subject.clone(), app_id.clone())) {
                continue;
            }

            let fetcher = Arc::clone(&fetcher);
            let subject = subject.clone();
            let subject_out = subject_out.clone();
            let skip_existing = options.skip_existing;
            let timeout = options.timeout;
            let delay = options.delay;
            in_flight.spawn(async move {
                let result = fetcher
                    .fetch(&app_id, &subject_out, skip_existing, timeout)
                    .await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Attempt {
                    subject,
                    app_id,
                    result,
                }
            });
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        record(&mut summary, &mut attempted, joined);
    }
    summary.limit_reached = limit > 0 && summary.succeeded >= limit;

    log::info!(
        "Download finished: {} succeeded, {} failed",
        summary.succeeded,
        summary.failed
    );
    Ok(summary)
}

fn record(
    summary: &mut BatchSummary,
    attempted: &mut HashSet<(String, String)>,
    joined: Result<Attempt, tokio::task::JoinError>,
) {
    match joined {
        Ok(Attempt {
            result: Ok(path), ..
        }) => {
            summary.succeeded += 1;
            log::info!("[{}] Saved {}", summary.succeeded, path.display());
            summary.saved.push(path);
        }
        Ok(Attempt {
            subject,
            app_id,
            result: Err(err),
        }) => {
            summary.failed += 1;
            log::warn!("Error downloading {app_id} (subject {subject}): {err}");
            attempted.remove(&(subject, app_id));
        }
        Err(err) => {
            summary.failed += 1;
            log::error!("Download task failed: {err}");
        }
    }
}
