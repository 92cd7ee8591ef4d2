//! SQLite snapshot format for [`VectorIndex`].
//!
//! A snapshot is a single SQLite file with a `meta` key/value table and an
//! `entries` table holding chunk text, metadata and the raw little-endian
//! `f32` bytes of each embedding. Writes go to a temp file in the target
//! directory which is renamed over the old snapshot once complete.

use super::{EntryMetadata, IndexEntry, Metric, VectorIndex};
use crate::error::{PolicyRagError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

const FORMAT_VERSION: u32 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE entries (
        id INTEGER PRIMARY KEY,
        source TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        page INTEGER NOT NULL,
        start_offset INTEGER NOT NULL,
        end_offset INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );
"#;

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Write a snapshot of `entries` to `path`.
#[instrument(skip(entries))]
pub(super) fn write<'a>(
    path: &Path,
    metric: Metric,
    dimensions: Option<usize>,
    entries: impl Iterator<Item = &'a IndexEntry>,
) -> Result<()> {
    let save_error = |reason: String| PolicyRagError::IndexSave {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| save_error(e.to_string()))?;

    let temp = tempfile::Builder::new()
        .prefix(".index-")
        .suffix(".sqlite.tmp")
        .tempfile_in(&dir)
        .map_err(|e| save_error(e.to_string()))?;

    let count = write_entries(temp.path(), metric, dimensions, entries)
        .map_err(|e| save_error(e.to_string()))?;

    temp.persist(path).map_err(|e| save_error(e.error.to_string()))?;

    info!("Saved index snapshot with {} entries to {:?}", count, path);
    Ok(())
}

fn write_entries<'a>(
    path: &Path,
    metric: Metric,
    dimensions: Option<usize>,
    entries: impl Iterator<Item = &'a IndexEntry>,
) -> Result<usize> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    let mut count = 0usize;
    {
        let mut insert = tx.prepare(
            r#"
            INSERT INTO entries
            (id, source, chunk_index, page, start_offset, end_offset, text, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;

        for entry in entries {
            let meta = &entry.metadata;
            insert.execute(params![
                entry.id as i64,
                meta.source,
                meta.chunk_index as i64,
                meta.page,
                meta.start as i64,
                meta.end as i64,
                entry.text,
                embedding_to_bytes(&entry.embedding),
                meta.indexed_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ])?;
            count += 1;
        }

        let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
        meta.execute(params!["format_version", FORMAT_VERSION.to_string()])?;
        meta.execute(params!["metric", metric.to_string()])?;
        meta.execute(params!["dimensions", dimensions.unwrap_or(0).to_string()])?;
        meta.execute(params!["entry_count", count.to_string()])?;
    }
    tx.commit()?;
    conn.close().map_err(|(_, e)| e)?;

    Ok(count)
}

/// Read a snapshot, mapping every failure to [`PolicyRagError::IndexLoad`].
#[instrument]
pub(super) fn read(path: &Path) -> Result<VectorIndex> {
    let load_error = |reason: String| PolicyRagError::IndexLoad {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(load_error("no snapshot file found".to_string()));
    }

    let index = read_entries(path).map_err(|e| load_error(e.to_string()))?;
    info!("Loaded index snapshot with {} entries from {:?}", index.len(), path);
    Ok(index)
}

fn read_entries(path: &Path) -> Result<VectorIndex> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut meta: HashMap<String, String> = HashMap::new();
    {
        let mut stmt = conn.prepare("SELECT key, value FROM meta")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            meta.insert(key, value);
        }
    }

    let field = |key: &str| -> Result<&String> {
        meta.get(key)
            .ok_or_else(|| PolicyRagError::InvalidInput(format!("snapshot is missing '{}'", key)))
    };
    let number = |key: &str| -> Result<usize> {
        field(key)?
            .parse::<usize>()
            .map_err(|_| PolicyRagError::InvalidInput(format!("snapshot has a malformed '{}'", key)))
    };

    let version = number("format_version")?;
    if version != FORMAT_VERSION as usize {
        return Err(PolicyRagError::InvalidInput(format!(
            "unsupported snapshot format version {}",
            version
        )));
    }
    let metric: Metric = field("metric")?.parse().map_err(PolicyRagError::InvalidInput)?;
    let dimensions = match number("dimensions")? {
        0 => None,
        d => Some(d),
    };
    let expected_count = number("entry_count")?;

    let mut stmt = conn.prepare(
        r#"
        SELECT id, source, chunk_index, page, start_offset, end_offset, text, embedding, indexed_at
        FROM entries
        ORDER BY id
        "#,
    )?;

    let rows = stmt.query_map([], |row| {
        let id: i64 = row.get(0)?;
        let chunk_index: i64 = row.get(2)?;
        let start: i64 = row.get(4)?;
        let end: i64 = row.get(5)?;
        let embedding: Vec<u8> = row.get(7)?;
        let indexed_at: String = row.get(8)?;
        Ok((
            id,
            row.get::<_, String>(1)?,
            chunk_index,
            row.get::<_, u32>(3)?,
            start,
            end,
            row.get::<_, String>(6)?,
            embedding,
            indexed_at,
        ))
    })?;

    let mut entries = Vec::with_capacity(expected_count);
    for row in rows {
        let (id, source, chunk_index, page, start, end, text, embedding, indexed_at) = row?;

        if id != entries.len() as i64 {
            return Err(PolicyRagError::InvalidInput(format!(
                "entry ids are not dense: expected {}, found {}",
                entries.len(),
                id
            )));
        }
        let dims = dimensions.unwrap_or(0);
        if embedding.len() != dims * 4 {
            return Err(PolicyRagError::InvalidInput(format!(
                "entry {} has {} embedding bytes, expected {}",
                id,
                embedding.len(),
                dims * 4
            )));
        }
        let indexed_at = DateTime::parse_from_rfc3339(&indexed_at)
            .map_err(|e| PolicyRagError::InvalidInput(format!("entry {} has a bad timestamp: {}", id, e)))?
            .with_timezone(&Utc);

        entries.push(IndexEntry {
            id: id as u64,
            embedding: bytes_to_embedding(&embedding),
            text,
            metadata: EntryMetadata {
                source,
                chunk_index: chunk_index as usize,
                page,
                start: start as usize,
                end: end as usize,
                indexed_at,
            },
        });
    }

    if entries.len() != expected_count {
        return Err(PolicyRagError::InvalidInput(format!(
            "snapshot declares {} entries but contains {}",
            expected_count,
            entries.len()
        )));
    }

    debug!("Read {} entries ({} dimensions, {} metric)", entries.len(), dimensions.unwrap_or(0), metric);
    Ok(VectorIndex::from_parts(metric, dimensions, entries))
}
