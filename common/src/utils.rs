use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use tempfile::NamedTempFile;

pub fn string_from_bytes(bytes: Bytes) -> anyhow::Result<String> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Name of the intermediate file map task `map_id` writes for `partition`.
pub fn intermediate_name(map_id: u32, partition: u32) -> String {
    format!("mr-{map_id}-{partition}")
}

/// Name of the final output of reduce partition `reduce_id`.
pub fn output_name(reduce_id: u32) -> String {
    format!("mr-out-{reduce_id}")
}

/// Write a file so that `path` is either absent, the previous content, or
/// the complete new content, never something half-written.
///
/// The content goes to a temporary file next to `path` which is renamed
/// over it once `fill` returns successfully.
pub fn write_atomic<F>(path: &Path, fill: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut dyn Write) -> anyhow::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create temp file in {}", dir.display()))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        fill(&mut writer)?;
        writer.flush()?;
    }

    temp.persist(path)
        .with_context(|| format!("cannot rename temp file to {}", path.display()))?;
    Ok(())
}
