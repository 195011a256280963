//! JSONL entity store.
//!
//! One JSON object per line, each carrying a unique `id`. Blank lines and
//! lines starting with `#` are ignored. Children point at their parent
//! through `transform.parent`; the file stays flat and the hierarchy is
//! rebuilt when answering loads.
//!
//! Writes go to a hidden sibling file that is synced, renamed over the
//! store and followed by a sync of the containing directory.

use crate::guid::Guid;
use crate::json;
use crate::operation::{Completion, DatasourceOperation, OperationRequest};
use crate::query;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Errors from reading or writing a JSONL store.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("line {line}: {source}")]
    Read { line: usize, source: io::Error },

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("line {line}: {reason}")]
    InvalidEntity { line: usize, reason: String },

    #[error("line {line}: duplicate id {id}")]
    DuplicateId { line: usize, id: Guid },

    #[error("{}: corrupted store: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl JsonlError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Parse entity lines into records keyed by their id.
pub fn read_entities(reader: impl BufRead) -> Result<BTreeMap<Guid, Value>, JsonlError> {
    let mut entities = BTreeMap::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|source| JsonlError::Read {
            line: line_no,
            source,
        })?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let record: Value = serde_json::from_str(text).map_err(|source| JsonlError::Parse {
            line: line_no,
            source,
        })?;
        let id = entity_id(&record, line_no)?;
        if entities.insert(id, record).is_some() {
            return Err(JsonlError::DuplicateId { line: line_no, id });
        }
    }
    Ok(entities)
}

fn entity_id(record: &Value, line: usize) -> Result<Guid, JsonlError> {
    let invalid = |reason: String| JsonlError::InvalidEntity { line, reason };
    if !record.is_object() {
        return Err(invalid("entity must be a JSON object".to_string()));
    }
    match json::payload_id(record) {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(invalid(format!("entity has no `{}`", json::ID_FIELD))),
        Err(error) => Err(invalid(error.to_string())),
    }
}

/// Write one line per record.
pub fn write_entities<'a>(
    writer: &mut impl Write,
    records: impl IntoIterator<Item = &'a Value>,
) -> io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Read the store at `path`, rejecting files with NUL bytes or invalid
/// UTF-8 before parsing.
pub fn load_entities(path: &Path) -> Result<BTreeMap<Guid, Value>, JsonlError> {
    let bytes = fs::read(path).map_err(|source| JsonlError::io(path, source))?;
    let corrupt = |reason: String| JsonlError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    if let Some(offset) = bytes.iter().position(|byte| *byte == 0) {
        return Err(corrupt(format!("NUL byte at offset {offset}")));
    }
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| corrupt(format!("invalid UTF-8 at offset {}", e.valid_up_to())))?;
    read_entities(text.as_bytes())
}

/// Replace the store at `path` with `records`.
///
/// Either the old or the new contents survive a crash; the staging file is
/// removed on failure.
pub fn persist_entities<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a Value>,
) -> Result<(), JsonlError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| JsonlError::io(dir, source))?;

    let staging = staging_path(path);
    let replaced = write_staged(&staging, records).and_then(|()| {
        fs::rename(&staging, path).map_err(|source| JsonlError::io(path, source))
    });
    if let Err(error) = replaced {
        let _ = fs::remove_file(&staging);
        return Err(error);
    }
    sync_dir(dir)
}

fn write_staged<'a>(
    staging: &Path,
    records: impl IntoIterator<Item = &'a Value>,
) -> Result<(), JsonlError> {
    let fail = |source: io::Error| JsonlError::io(staging, source);
    let mut writer = BufWriter::new(File::create(staging).map_err(fail)?);
    write_entities(&mut writer, records).map_err(fail)?;
    let file = writer.into_inner().map_err(|e| fail(e.into_error()))?;
    file.sync_all().map_err(fail)
}

/// Hidden sibling of `path`, unique within this process.
fn staging_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    path.with_file_name(format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), JsonlError> {
    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(|source| JsonlError::io(dir, source))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), JsonlError> {
    Ok(())
}

/// File-backed [`DatasourceOperation`].
///
/// Records are cached in memory; every request that changes them rewrites
/// the whole file before completing. A failed write completes the request
/// as a failure and leaves both the file and the cache untouched.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    records: BTreeMap<Guid, Value>,
}

impl JsonlStore {
    /// Open `path`, treating a missing file as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JsonlError> {
        let path = path.into();
        let records = match load_entities(&path) {
            Ok(records) => records,
            Err(JsonlError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(error) => return Err(error),
        };
        debug!(path = %path.display(), records = records.len(), "opened jsonl store");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: Guid) -> Option<&Value> {
        self.records.get(&id)
    }

    pub fn flush(&self) -> Result<(), JsonlError> {
        persist_entities(&self.path, self.records.values())
    }
}

impl DatasourceOperation for JsonlStore {
    fn execute(&mut self, request: OperationRequest, completion: Completion) {
        let mut next = self.records.clone();
        let (result, changed) = query::respond(&mut next, &request);
        if changed {
            if let Err(error) = persist_entities(&self.path, next.values()) {
                warn!(path = %self.path.display(), %error, kind = %request.kind(), "jsonl write failed");
                completion.fail();
                return;
            }
            self.records = next;
        }
        completion.complete(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    const ONE: &str = "{\"id\":\"00000000-0000-0000-0000-000000000001\"}\n";

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "depiction-jsonl-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("temp dir should be created");
        dir
    }

    #[test]
    fn nul_bytes_mark_the_store_corrupt() {
        let dir = temp_dir("nul");
        let path = dir.join("entities.jsonl");
        fs::write(&path, format!("{ONE}\0garbage")).expect("fixture should write");

        match load_entities(&path) {
            Err(JsonlError::Corrupt { reason, .. }) => {
                assert_eq!(reason, format!("NUL byte at offset {}", ONE.len()));
            }
            other => panic!("expected corrupt store error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn reader_skips_comments_and_keys_by_id() {
        let text = format!("# header\n\n{ONE}");
        let entities = read_entities(text.as_bytes()).expect("valid store");
        assert_eq!(entities.len(), 1);
        assert!(entities.contains_key(&Guid::from_u128(1)));
    }

    #[test]
    fn reader_rejects_entities_without_a_usable_id() {
        for (text, line) in [
            (format!("{ONE}42\n"), 2),
            ("{\"name\":\"no id\"}\n".to_string(), 1),
            ("\n{\"id\":7}\n".to_string(), 2),
            ("{\"id\":\"not-a-guid\"}\n".to_string(), 1),
        ] {
            match read_entities(text.as_bytes()) {
                Err(JsonlError::InvalidEntity { line: at, .. }) => assert_eq!(at, line, "{text}"),
                other => panic!("expected invalid entity for {text:?}, got {other:?}"),
            }
        }
        assert!(matches!(
            read_entities("{oops\n".as_bytes()),
            Err(JsonlError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn duplicate_ids_report_the_second_line() {
        match read_entities(ONE.repeat(2).as_bytes()) {
            Err(JsonlError::DuplicateId { line, id }) => {
                assert_eq!(line, 2);
                assert_eq!(id, Guid::from_u128(1));
            }
            other => panic!("expected duplicate id, got {other:?}"),
        }
    }

    #[test]
    fn persist_replaces_the_file_and_cleans_up_staging() {
        let dir = temp_dir("persist");
        let path = dir.join("entities.jsonl");
        let first = json!({"id": Guid::from_u128(1)});
        let second = json!({"id": Guid::from_u128(2)});
        persist_entities(&path, [&first]).expect("first write should succeed");
        persist_entities(&path, [&second]).expect("second write should succeed");

        let entities = load_entities(&path).expect("store should reload");
        assert_eq!(entities.keys().copied().collect::<Vec<_>>(), vec![Guid::from_u128(2)]);
        let names: Vec<_> = fs::read_dir(&dir)
            .expect("dir should list")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("entities.jsonl")]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_opens_empty_but_corrupt_file_does_not() {
        let dir = temp_dir("open");
        let store = JsonlStore::open(dir.join("missing.jsonl")).expect("missing file is empty");
        assert!(store.is_empty());

        let path = dir.join("broken.jsonl");
        fs::write(&path, ONE.repeat(2)).expect("fixture should write");
        assert!(matches!(
            JsonlStore::open(&path),
            Err(JsonlError::DuplicateId { .. })
        ));
        let _ = fs::remove_dir_all(dir);
    }
}
