//! Durable journal-backed document store
//!
//! Layout: `<data_dir>/data/documents.journal`, append-only.
//!
//! - One framed record per committed batch (see `record`)
//! - fsync before the batch becomes visible to readers
//! - Replay on open rebuilds the in-memory view; latest write wins and
//!   deletes are tombstones in the journal
//! - A torn final record is discarded and the file truncated
//! - A bad record followed by more data is corruption (fatal)
//! - A failed append is truncated away; if that truncate fails too the
//!   store is poisoned and refuses every later write
//!
//! Appends run on tokio's blocking pool while the state lock is held, so
//! records are written in commit order without stalling runtime workers.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::batch::WriteBatch;
use super::document::{Document, DocumentPath};
use super::errors::{StoreError, StoreResult};
use super::record::{decode_frame, encode_batch, FrameError};
use super::DocumentStore;
use crate::observability::{log_event_with_fields, Event};

struct JournalState {
    file: Arc<File>,
    offset: u64,
    documents: BTreeMap<DocumentPath, Document>,
    /// Set when a failed append could not be rolled back
    poisoned: Option<String>,
}

/// Append and truncate primitives of the journal file.
trait JournalSink {
    /// Writes the whole record and syncs it to disk.
    fn append(&self, record: &[u8]) -> io::Result<()>;

    /// Cuts the file back to `len` bytes and syncs.
    fn truncate(&self, len: u64) -> io::Result<()>;
}

impl JournalSink for File {
    fn append(&self, record: &[u8]) -> io::Result<()> {
        let mut file = self;
        file.write_all(record)?;
        file.sync_all()
    }

    fn truncate(&self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_all()
    }
}

#[derive(Debug)]
enum AppendError {
    /// Append failed; the partial record was truncated away
    RolledBack(io::Error),
    /// Append failed and the truncate failed too
    Unrecoverable { append: io::Error, truncate: io::Error },
    /// Append task did not finish; the file state is unknown
    Interrupted(String),
}

/// Appends `record` at `offset`, truncating back to `offset` on failure.
fn append_record<F: JournalSink + ?Sized>(
    file: &F,
    offset: u64,
    record: &[u8],
) -> Result<(), AppendError> {
    match file.append(record) {
        Ok(()) => Ok(()),
        Err(append) => match file.truncate(offset) {
            Ok(()) => Err(AppendError::RolledBack(append)),
            Err(truncate) => Err(AppendError::Unrecoverable { append, truncate }),
        },
    }
}

/// Result of replaying a journal image.
struct Replay {
    documents: BTreeMap<DocumentPath, Document>,
    valid_len: usize,
    torn_tail: bool,
}

/// File-backed store. Each batch is a single checksummed journal record,
/// which is what makes `batch_write` all-or-nothing across crashes.
pub struct FileStore {
    journal_path: PathBuf,
    state: RwLock<JournalState>,
}

impl FileStore {
    /// Opens or creates the journal under `data_dir` and replays it.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let data_subdir = data_dir.join("data");
        let journal_path = data_subdir.join("documents.journal");

        if !data_subdir.exists() {
            fs::create_dir_all(&data_subdir).map_err(|e| {
                StoreError::io(
                    format!("Failed to create data directory: {}", data_subdir.display()),
                    e,
                )
            })?;
        }

        let image = match fs::read(&journal_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(StoreError::io(
                    format!("Failed to read journal: {}", journal_path.display()),
                    e,
                ))
            }
        };

        let replay = replay(&image)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&journal_path)
            .map_err(|e| {
                StoreError::io(
                    format!("Failed to open journal: {}", journal_path.display()),
                    e,
                )
            })?;

        if replay.torn_tail {
            file.set_len(replay.valid_len as u64).map_err(|e| {
                StoreError::io("Failed to truncate torn journal tail", e)
            })?;
            log_event_with_fields(
                Event::JournalTailDiscarded,
                &[
                    ("discarded_bytes", &(image.len() - replay.valid_len).to_string()),
                    ("path", &journal_path.display().to_string()),
                ],
            );
        }

        Ok(Self {
            journal_path,
            state: RwLock::new(JournalState {
                file: Arc::new(file),
                offset: replay.valid_len as u64,
                documents: replay.documents,
                poisoned: None,
            }),
        })
    }

    /// Returns the journal file path.
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    fn append_failed(&self, state: &mut JournalState, err: AppendError) -> StoreError {
        let reason = match err {
            AppendError::RolledBack(source) => {
                return StoreError::io(
                    format!("Failed to append batch to {}", self.journal_path.display()),
                    source,
                )
            }
            AppendError::Unrecoverable { append, truncate } => format!(
                "append to {} failed ({}) and rollback to offset {} failed ({})",
                self.journal_path.display(),
                append,
                state.offset,
                truncate
            ),
            AppendError::Interrupted(cause) => format!(
                "append to {} interrupted: {}",
                self.journal_path.display(),
                cause
            ),
        };

        log_event_with_fields(
            Event::JournalPoisoned,
            &[("offset", &state.offset.to_string()), ("reason", &reason)],
        );
        state.poisoned = Some(reason.clone());
        StoreError::Poisoned { reason }
    }
}

fn replay(image: &[u8]) -> StoreResult<Replay> {
    let mut documents = BTreeMap::new();
    let mut offset = 0usize;

    while offset < image.len() {
        match decode_frame(&image[offset..]) {
            Ok((payload, consumed)) => {
                let batch: WriteBatch =
                    serde_json::from_slice(payload).map_err(|e| StoreError::Corruption {
                        offset: offset as u64,
                        reason: format!("undecodable batch: {}", e),
                    })?;
                for op in batch.into_ops() {
                    op.apply(&mut documents);
                }
                offset += consumed;
            }
            Err(FrameError::Truncated { .. }) => {
                return Ok(Replay {
                    documents,
                    valid_len: offset,
                    torn_tail: true,
                });
            }
            Err(FrameError::ChecksumMismatch { length }) if offset + length == image.len() => {
                return Ok(Replay {
                    documents,
                    valid_len: offset,
                    torn_tail: true,
                });
            }
            Err(err) => {
                return Err(StoreError::Corruption {
                    offset: offset as u64,
                    reason: format!("{:?}", err),
                });
            }
        }
    }

    Ok(Replay {
        documents,
        valid_len: offset,
        torn_tail: false,
    })
}

impl DocumentStore for FileStore {
    async fn read_document(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        Ok(self.state.read().await.documents.get(path).cloned())
    }

    async fn batch_write(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let record = encode_batch(&batch)?;
        let mut state = self.state.write().await;

        if let Some(reason) = &state.poisoned {
            return Err(StoreError::Poisoned {
                reason: reason.clone(),
            });
        }

        let file = Arc::clone(&state.file);
        let offset = state.offset;
        let record_len = record.len() as u64;
        let appended = tokio::task::spawn_blocking(move || append_record(file.as_ref(), offset, &record))
            .await
            .unwrap_or_else(|e| Err(AppendError::Interrupted(e.to_string())));

        if let Err(err) = appended {
            return Err(self.append_failed(&mut state, err));
        }

        state.offset += record_len;
        for op in batch.into_ops() {
            op.apply(&mut state.documents);
        }
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .filter(|(path, _)| path.collection == collection)
            .map(|(path, doc)| (path.id.clone(), doc.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;
    use tempfile::TempDir;

    fn batch_with(id: &str, name: &str) -> WriteBatch {
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from(name));
        let mut batch = WriteBatch::new();
        batch.set(DocumentPath::new("products", id), doc);
        batch
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.batch_write(batch_with("p1", "shirt")).await.unwrap();
            store.batch_write(batch_with("p1", "coat")).await.unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        let doc = store
            .read_document(&DocumentPath::new("products", "p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["name"], Value::from("coat"));
    }

    #[tokio::test]
    async fn test_torn_tail_discarded_and_truncated() {
        let dir = TempDir::new().unwrap();
        let path;
        let good_len;
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.batch_write(batch_with("p1", "shirt")).await.unwrap();
            path = store.journal_path().to_path_buf();
            good_len = fs::metadata(&path).unwrap().len();
        }

        // Append half of a second record.
        let partial = encode_batch(&batch_with("p2", "coat")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&partial[..partial.len() / 2]).unwrap();
        drop(file);

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), good_len);
        assert!(store
            .read_document(&DocumentPath::new("products", "p2"))
            .await
            .unwrap()
            .is_none());
        assert!(store
            .read_document(&DocumentPath::new("products", "p1"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_corruption_before_tail_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path;
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.batch_write(batch_with("p1", "shirt")).await.unwrap();
            store.batch_write(batch_with("p2", "coat")).await.unwrap();
            path = store.journal_path().to_path_buf();
        }

        let mut bytes = fs::read(&path).unwrap();
        bytes[8] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let err = FileStore::open(dir.path()).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_replay_empty_image() {
        let replay = replay(&[]).unwrap();
        assert!(replay.documents.is_empty());
        assert_eq!(replay.valid_len, 0);
        assert!(!replay.torn_tail);
    }

    /// Sink whose append always fails; truncate fails when told to.
    struct FailingSink {
        truncate_fails: bool,
        truncated_to: std::cell::Cell<Option<u64>>,
    }

    impl JournalSink for FailingSink {
        fn append(&self, _record: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn truncate(&self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::new(io::ErrorKind::Other, "read-only filesystem"));
            }
            self.truncated_to.set(Some(len));
            Ok(())
        }
    }

    #[test]
    fn test_failed_append_is_truncated_back() {
        let sink = FailingSink {
            truncate_fails: false,
            truncated_to: std::cell::Cell::new(None),
        };
        let err = append_record(&sink, 42, b"record").unwrap_err();
        assert!(matches!(err, AppendError::RolledBack(_)));
        assert_eq!(sink.truncated_to.get(), Some(42));
    }

    #[test]
    fn test_failed_rollback_is_unrecoverable() {
        let sink = FailingSink {
            truncate_fails: true,
            truncated_to: std::cell::Cell::new(None),
        };
        let err = append_record(&sink, 42, b"record").unwrap_err();
        assert!(matches!(err, AppendError::Unrecoverable { .. }));
    }

    #[tokio::test]
    async fn test_poisoned_store_refuses_writes() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.batch_write(batch_with("p1", "shirt")).await.unwrap();
        let len = fs::metadata(store.journal_path()).unwrap().len();

        let err = {
            let mut state = store.state.write().await;
            store.append_failed(
                &mut state,
                AppendError::Unrecoverable {
                    append: io::Error::new(io::ErrorKind::Other, "disk full"),
                    truncate: io::Error::new(io::ErrorKind::Other, "read-only filesystem"),
                },
            )
        };
        assert!(err.is_fatal());
        assert_eq!(err.code(), "STORE_JOURNAL_POISONED");

        let err = store.batch_write(batch_with("p2", "coat")).await.unwrap_err();
        assert!(matches!(err, StoreError::Poisoned { .. }));
        assert_eq!(fs::metadata(store.journal_path()).unwrap().len(), len);
        assert!(store
            .read_document(&DocumentPath::new("products", "p2"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_non_finite_number_never_reaches_journal() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.batch_write(batch_with("p1", "shirt")).await.unwrap();

            let mut doc = Document::new();
            doc.insert("price".into(), Value::Number(f64::NAN));
            let mut batch = WriteBatch::new();
            batch.set(DocumentPath::new("products", "p2"), doc);

            let err = store.batch_write(batch).await.unwrap_err();
            assert!(matches!(err, StoreError::Encoding(_)));
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store
            .read_document(&DocumentPath::new("products", "p1"))
            .await
            .unwrap()
            .is_some());
        assert!(store
            .read_document(&DocumentPath::new("products", "p2"))
            .await
            .unwrap()
            .is_none());
    }
}
