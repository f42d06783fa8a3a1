//! Write batches
//!
//! A batch is an ordered list of full-document upserts and deletes that a
//! store must apply all-or-nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentPath, Value};

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Replaces the whole document at `path`
    Set { path: DocumentPath, document: Document },
    /// Removes the document at `path`; a no-op when absent
    Delete { path: DocumentPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Delete { path } => path,
        }
    }

    /// Whether the written document holds a NaN or infinite number.
    pub fn has_non_finite_number(&self) -> bool {
        match self {
            WriteOp::Set { document, .. } => document.values().any(Value::has_non_finite_number),
            WriteOp::Delete { .. } => false,
        }
    }

    /// Applies the write to an ordered document map.
    pub(crate) fn apply(self, documents: &mut BTreeMap<DocumentPath, Document>) {
        match self {
            WriteOp::Set { path, document } => {
                documents.insert(path, document);
            }
            WriteOp::Delete { path } => {
                documents.remove(&path);
            }
        }
    }
}

/// Ordered, atomic set of writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an upsert. Later writes to the same path win.
    pub fn set(&mut self, path: DocumentPath, document: Document) -> &mut Self {
        self.ops.push(WriteOp::Set { path, document });
        self
    }

    /// Queues a delete.
    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_preserves_order() {
        let mut batch = WriteBatch::new();
        batch
            .set(DocumentPath::new("a", "1"), Document::new())
            .set(DocumentPath::new("b", "2"), Document::new());

        let paths: Vec<String> = batch.ops().iter().map(|op| op.path().to_string()).collect();
        assert_eq!(paths, vec!["a/1", "b/2"]);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_delete_after_set_removes() {
        let path = DocumentPath::new("a", "1");
        let mut batch = WriteBatch::new();
        batch.set(path.clone(), Document::new()).delete(path.clone());

        let mut documents = BTreeMap::new();
        for op in batch.into_ops() {
            op.apply(&mut documents);
        }
        assert!(!documents.contains_key(&path));
    }

    #[test]
    fn test_batch_serializes() {
        let mut doc = Document::new();
        doc.insert("version".into(), Value::Number(2.0));
        let mut batch = WriteBatch::new();
        batch
            .set(DocumentPath::new("_system", "schema"), doc)
            .delete(DocumentPath::new("_identity", "u1"));

        let bytes = serde_json::to_vec(&batch).unwrap();
        let decoded: WriteBatch = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, batch);
    }
}
