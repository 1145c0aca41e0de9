//! Container records and the expander boundary.
//!
//! Category 0 records are containers: one record whose payload itself
//! encodes several named sub-records. Splitting that payload is the job of
//! an [`ArchiveExpander`] implementation supplied by the embedding
//! application; this crate fixes only the input/output contract.

use crate::Result;

/// One sub-record of a container, or a whole record wrapped as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRecord {
    pub payload: Vec<u8>,
    pub sub_id: u32,
    /// Hash of the sub-record's name, when the container carries names.
    pub name_hash: Option<u32>,
    /// Byte offset of the payload within the parent record.
    pub offset: u32,
    pub size: u32,
}

impl SubRecord {
    /// Wraps a whole record as its own single sub-record: id 0, offset 0,
    /// no name hash.
    pub fn whole(payload: Vec<u8>) -> Self {
        let size = payload.len() as u32;
        Self {
            payload,
            sub_id: 0,
            name_hash: None,
            offset: 0,
            size,
        }
    }
}

/// Splits a container record's raw bytes into its sub-records.
///
/// Implementierungen kommen von außen; der Store reicht Category-0-Records
/// unverändert hinein und die Zerlegung unverändert hinaus.
pub trait ArchiveExpander {
    fn expand(&self, raw: &[u8]) -> Result<Vec<SubRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_wraps_without_name_hash() {
        let sub = SubRecord::whole(vec![1, 2, 3]);
        assert_eq!(sub.sub_id, 0);
        assert_eq!(sub.offset, 0);
        assert_eq!(sub.size, 3);
        assert_eq!(sub.name_hash, None);
        assert_eq!(sub.payload, vec![1, 2, 3]);
    }
}
