use crate::Result;
use flatref_protocol::make_ref;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Reference lines for a set of ids, sorted and de-duplicated.
pub fn synthesize<I, S>(app_ids: I, arch: &str, branch: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    app_ids
        .into_iter()
        .map(|app_id| make_ref(app_id.as_ref(), arch, branch))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Write one reference per line and return how many were written.
///
/// An empty input still creates an (empty) file.
pub fn write_ref_list<I, S>(path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let unique: BTreeSet<String> = lines.into_iter().map(Into::into).collect();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    for line in &unique {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    if unique.is_empty() {
        log::warn!("{} has 0 refs", path.display());
    }
    log::debug!("Wrote {} ({} refs)", path.display(), unique.len());
    Ok(unique.len())
}
