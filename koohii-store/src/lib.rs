use std::path::Path;

use koohii_common::{models::Entry, Context as _, Report};
use serde::Serialize as _;

/// Writes every entry as an indented JSON array, replacing whatever `path` held before.
#[tracing::instrument(
    skip(path, entries),
    fields(path = %path.as_ref().display(), entries = entries.len()),
    err
)]
pub fn save(path: impl AsRef<Path>, entries: &[Entry]) -> Result<(), Report> {
    let path = path.as_ref();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);

    entries
        .serialize(&mut serializer)
        .context("unable to serialize entries")?;

    std::fs::write(path, buf)
        .with_context(|| format!("unable to write entries to `{}`", path.display()))?;

    tracing::debug!("entries written");

    Ok(())
}

#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()), err)]
pub fn load(path: impl AsRef<Path>) -> Result<Vec<Entry>, Report> {
    let path = path.as_ref();

    let data = std::fs::read(path)
        .with_context(|| format!("unable to read entries from `{}`", path.display()))?;

    let entries = serde_json::from_slice(&data)
        .with_context(|| format!("`{}` is not a valid entry list", path.display()))?;

    Ok(entries)
}

/// Reads one lookup key per non-empty line, keeping file order and duplicates.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()), err)]
pub fn load_lookups(path: impl AsRef<Path>) -> Result<Vec<String>, Report> {
    let path = path.as_ref();

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read lookups from `{}`", path.display()))?;

    Ok(data
        .lines()
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
