//! Journal record framing
//!
//! Every committed batch is written as one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record incl. this field and checksum)
//! +------------------+
//! | Batch Payload    | (JSON-encoded WriteBatch)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers the length field and the payload.

use serde::ser::Error as _;

use super::batch::WriteBatch;
use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StoreError, StoreResult};

const HEADER_SIZE: usize = 4;
const CHECKSUM_SIZE: usize = 4;

/// Smallest possible record: length + empty payload + checksum.
pub const MIN_RECORD_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Why a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes remain than the frame needs
    Truncated { needed: usize, available: usize },
    /// Length field is smaller than any valid record
    InvalidLength(usize),
    /// Frame is complete but its checksum does not match
    ChecksumMismatch { length: usize },
}

/// Encodes a batch into a framed journal record.
///
/// NaN and infinities are refused: JSON would write them as `null`, which
/// replay cannot read back.
pub fn encode_batch(batch: &WriteBatch) -> StoreResult<Vec<u8>> {
    if let Some(op) = batch.ops().iter().find(|op| op.has_non_finite_number()) {
        return Err(StoreError::Encoding(serde_json::Error::custom(format!(
            "non-finite number in {}",
            op.path()
        ))));
    }

    let payload = serde_json::to_vec(batch)?;
    let record_length = (HEADER_SIZE + payload.len() + CHECKSUM_SIZE) as u32;

    let mut record = Vec::with_capacity(record_length as usize);
    record.extend_from_slice(&record_length.to_le_bytes());
    record.extend_from_slice(&payload);

    let checksum = compute_checksum(&record);
    record.extend_from_slice(&checksum.to_le_bytes());

    Ok(record)
}

/// Decodes the frame at the start of `data`.
///
/// Returns the payload bytes and the number of bytes consumed.
pub fn decode_frame(data: &[u8]) -> Result<(&[u8], usize), FrameError> {
    if data.len() < MIN_RECORD_SIZE {
        return Err(FrameError::Truncated {
            needed: MIN_RECORD_SIZE,
            available: data.len(),
        });
    }

    let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if record_length < MIN_RECORD_SIZE {
        return Err(FrameError::InvalidLength(record_length));
    }
    if record_length > data.len() {
        return Err(FrameError::Truncated {
            needed: record_length,
            available: data.len(),
        });
    }

    let body_end = record_length - CHECKSUM_SIZE;
    let stored = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);

    if !verify_checksum(&data[..body_end], stored) {
        return Err(FrameError::ChecksumMismatch {
            length: record_length,
        });
    }

    Ok((&data[HEADER_SIZE..body_end], record_length))
}
