use crate::error::{RefListError, Result};
use crate::refline::parse_line;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Conventional extension for reference-list files
pub const REFS_EXTENSION: &str = "refs";

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parse reference lines from in-memory text.
pub fn parse_str(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter(|line| !is_skippable(line))
        .filter_map(parse_line)
        .collect()
}

/// Read a `.refs` source line by line and collect the distinct identifiers.
pub fn parse_file(path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| RefListError::io(path, err))?;

    let mut app_ids = BTreeSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|err| RefListError::io(path, err))?;
        if is_skippable(&line) {
            continue;
        }
        match parse_line(&line) {
            Some(app_id) => {
                app_ids.insert(app_id);
            }
            None => log::debug!("Ignoring malformed ref line in {}: {line}", path.display()),
        }
    }
    Ok(app_ids)
}

/// Sorted union of identifiers across several sources; missing sources are skipped.
pub fn collect_app_ids<I, P>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut collected = BTreeSet::new();
    for path in paths {
        match parse_file(path.as_ref()) {
            Ok(ids) => collected.extend(ids),
            Err(RefListError::NotFound(missing)) => {
                log::warn!("refs file not found: {}", missing.display());
            }
            Err(err) => log::warn!("{err}"),
        }
    }
    collected.into_iter().collect()
}

/// `.refs` files directly inside `dir`, sorted by path.
pub fn find_refs_in_dir(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RefListError::NotFound(dir.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|err| RefListError::io(dir, err))? {
        let entry = entry.map_err(|err| RefListError::io(dir, err))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_refs = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(REFS_EXTENSION));
        if is_refs {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn duplicate_lines_collapse_to_one_identifier() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("Game.refs");
        fs::write(
            &path,
            "app/org.example.App/x86_64/stable\napp/org.example.App/x86_64/stable\n",
        )
        .unwrap();

        let ids = parse_file(&path).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["org.example.App"]);
    }

    #[test]
    fn skips_comments_blank_and_malformed_lines() {
        let text = "\
# games picked by hand

app/org.b.Two/x86_64/stable
   # indented comment
app/org.a.One/aarch64/beta
app/nodot/x86_64/stable
app/org.c.Three/x86_64
app/org.a.One/x86_64/stable
";
        let ids: Vec<_> = parse_str(text).into_iter().collect();
        assert_eq!(ids, vec!["org.a.One", "org.b.Two"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = tempdir().unwrap();
        let err = parse_file(temp.path().join("absent.refs")).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[test]
    fn collect_app_ids_merges_sources_and_skips_missing() {
        let temp = tempdir().unwrap();
        let a = temp.path().join("a.refs");
        let b = temp.path().join("b.refs");
        fs::write(&a, "app/org.z.Last/x86_64/stable\napp/org.a.First/x86_64/stable\n").unwrap();
        fs::write(&b, "app/org.a.First/x86_64/stable\n").unwrap();

        let ids = collect_app_ids([a, temp.path().join("missing.refs"), b]);
        assert_eq!(ids, vec!["org.a.First", "org.z.Last"]);
    }

    #[test]
    fn find_refs_in_dir_filters_and_sorts() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("Zeta.refs"), "").unwrap();
        fs::write(temp.path().join("alpha.REFS"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();
        fs::create_dir(temp.path().join("nested.refs")).unwrap();

        let found = find_refs_in_dir(temp.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Zeta.refs", "alpha.REFS"]);
    }

    #[test]
    fn find_refs_in_missing_dir_is_not_found() {
        let temp = tempdir().unwrap();
        let err = find_refs_in_dir(temp.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }
}
