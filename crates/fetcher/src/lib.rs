//! # flatref fetcher
//!
//! Resolves application ids into `.flatpakref` descriptors.
//!
//! [`Fetcher::fetch`] tries each configured endpoint template in order and stops
//! at the first success; an already present descriptor is reused when asked to.
//! [`run_batch`] drives the fetcher over `.refs` sources with per-subject
//! de-duplication, a global success limit and an inter-request delay.
//!
//! ```no_run
//! use flatref_fetcher::{run_batch, BatchOptions, FetchConfig, Fetcher};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = Fetcher::new(FetchConfig::default())?;
//!     let sources = vec![PathBuf::from("refs/Game.refs")];
//!     let summary = run_batch(&fetcher, &sources, &BatchOptions::default()).await?;
//!     println!("{} saved, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

mod batch;
mod config;
mod error;
mod fetch;

pub use batch::{discover_sources, run_batch, subject_for, BatchOptions, BatchSummary};
pub use config::{
    FetchConfig, APP_ID_PLACEHOLDER, DEFAULT_USER_AGENT, DESCRIPTOR_EXTENSION, FALLBACK_ENDPOINT,
    PRIMARY_ENDPOINT,
};
pub use error::{BatchError, FetchError, Result};
pub use fetch::Fetcher;
