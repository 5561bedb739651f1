//! # flatref indexer
//!
//! Turns an AppStream catalog into per-category `.refs` lists.
//!
//! ## Pipeline
//!
//! ```text
//! appstream.xml (bytes)
//!     │
//!     ├──> ComponentStream (pull parser, one record at a time)
//!     │      └─> ComponentRecord { id, type, categories }
//!     │
//!     ├──> CategoryIndex (dotted ids only, full scan first)
//!     │      └─> category -> {app ids}, category counts
//!     │
//!     └──> synthesize / dump_refs
//!            └─> <out>/<Category>.refs
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use flatref_indexer::{dump_refs, CategoryIndex, DumpRequest};
//!
//! fn main() -> flatref_indexer::Result<()> {
//!     let xml = std::fs::read("appstream.xml")?;
//!     let index = CategoryIndex::from_xml(&xml)?;
//!     let report = dump_refs(&index, &DumpRequest::default())?;
//!     println!("wrote {} files", report.written.len());
//!     Ok(())
//! }
//! ```

mod catalog;
mod categories;
mod dump;
mod error;
mod synth;

pub use catalog::{collect_components, stream_components, ComponentRecord, ComponentStream};
pub use categories::{normalize_category, CategoryCount, CategoryIndex};
pub use dump::{dump_refs, DumpReport, DumpRequest, DumpSelection, WrittenRefList};
pub use error::{IndexerError, Result};
pub use synth::{synthesize, write_ref_list};
