use crate::categories::{normalize_category, CategoryIndex};
use crate::synth::{synthesize, write_ref_list};
use crate::{IndexerError, Result};
use flatref_protocol::REFS_EXTENSION;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which categories to turn into ref lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpSelection {
    /// One file per category in the index
    All,
    /// Only these categories (normalized before lookup)
    Categories(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRequest {
    pub selection: DumpSelection,
    pub arch: String,
    pub branch: String,
    pub out_dir: PathBuf,
    /// Merge the selected categories into one file with this name
    pub merge_to: Option<String>,
}

impl Default for DumpRequest {
    fn default() -> Self {
        Self {
            selection: DumpSelection::All,
            arch: "x86_64".to_string(),
            branch: "stable".to_string(),
            out_dir: PathBuf::from("refs"),
            merge_to: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenRefList {
    pub path: PathBuf,
    /// Source category, `None` for a merged file
    pub category: Option<String>,
    pub refs: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpReport {
    /// Files in the order they were written
    pub written: Vec<WrittenRefList>,
    /// Requested categories that matched nothing in the catalog
    pub unknown_categories: Vec<String>,
    /// Categories whose names cannot be used as a file name under `out_dir`
    #[serde(default)]
    pub rejected_categories: Vec<String>,
}

impl DumpReport {
    pub fn total_refs(&self) -> usize {
        self.written.iter().map(|w| w.refs).sum()
    }
}

/// Write `.refs` files for the requested categories.
///
/// With [`DumpSelection::All`] every category gets its own file and `merge_to` is
/// ignored. Selected categories with no matches are reported and still produce an
/// empty file unless merging.
pub fn dump_refs(index: &CategoryIndex, request: &DumpRequest) -> Result<DumpReport> {
    let mut report = DumpReport::default();

    let selected = match &request.selection {
        DumpSelection::All => {
            for (category, ids) in index.iter() {
                if !is_plain_file_name(category) {
                    reject(&mut report, category);
                    continue;
                }
                let refs = synthesize(ids, &request.arch, &request.branch);
                let path = request.out_dir.join(format!("{category}.{REFS_EXTENSION}"));
                let written = write_ref_list(&path, refs)?;
                report.written.push(WrittenRefList {
                    path,
                    category: Some(category.to_string()),
                    refs: written,
                });
            }
            return Ok(report);
        }
        DumpSelection::Categories(raw) => normalize_selection(raw),
    };

    if selected.is_empty() {
        return Err(IndexerError::configuration(
            "no categories selected for the ref dump",
        ));
    }

    report.unknown_categories = selected
        .iter()
        .filter(|category| !index.contains(category))
        .cloned()
        .collect();
    if !report.unknown_categories.is_empty() {
        log::warn!(
            "No matches for categories: {}",
            report.unknown_categories.join(", ")
        );
    }

    if let Some(merge_to) = request.merge_to.as_deref() {
        let merge_to = merge_to.trim();
        if merge_to.is_empty() {
            return Err(IndexerError::configuration("merge target name is empty"));
        }
        if !is_plain_file_name(merge_to) {
            return Err(IndexerError::configuration(format!(
                "merge target '{merge_to}' must be a plain file name"
            )));
        }
        let ids = selected
            .iter()
            .filter_map(|category| index.ids(category))
            .flatten();
        let refs = synthesize(ids, &request.arch, &request.branch);
        let path = request.out_dir.join(merge_to);
        let written = write_ref_list(&path, refs)?;
        report.written.push(WrittenRefList {
            path,
            category: None,
            refs: written,
        });
        return Ok(report);
    }

    for category in &selected {
        if !is_plain_file_name(category) {
            reject(&mut report, category);
            continue;
        }
        let refs = match index.ids(category) {
            Some(ids) => synthesize(ids, &request.arch, &request.branch),
            None => Vec::new(),
        };
        if refs.is_empty() {
            log::warn!("{category} had 0 refs");
        }
        let path = request.out_dir.join(format!("{category}.{REFS_EXTENSION}"));
        let written = write_ref_list(&path, refs)?;
        report.written.push(WrittenRefList {
            path,
            category: Some(category.clone()),
            refs: written,
        });
    }

    Ok(report)
}

/// A single path component that stays inside the directory it is joined to.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\', '\0'][..])
}

fn reject(report: &mut DumpReport, category: &str) {
    log::warn!("Skipping category '{category}': not usable as a file name");
    report.rejected_categories.push(category.to_string());
}

/// Normalize, drop empties and repeats, keep first-seen order.
fn normalize_selection(raw: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::with_capacity(raw.len());
    for category in raw.iter().map(|c| normalize_category(c)) {
        if !category.is_empty() && !selected.contains(&category) {
            selected.push(category);
        }
    }
    selected
}
