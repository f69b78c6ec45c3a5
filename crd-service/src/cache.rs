//! In-memory snapshot of the last acknowledged registry fetch.
//!
//! Two rules keep the cache consistent with the store:
//!
//! 1. Fetches are numbered, and a response is applied only if no newer
//!    response has been applied, so a slow, older fetch can never
//!    overwrite fresher rows.
//! 2. A field update touches the cache only after the registry
//!    acknowledges the write, so the cache never holds an unconfirmed
//!    value.

use crd_sdk::records::{ClientRecord, FieldPatch};

#[derive(Debug, Default)]
pub struct RecordCache {
    rows: Vec<ClientRecord>,
    issued_seq: u64,
    applied_seq: u64,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rows of the last applied fetch, in load order.
    pub fn rows(&self) -> &[ClientRecord] {
        &self.rows
    }

    /// Reserve a sequence number for a fetch about to be issued.
    pub fn begin_fetch(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Apply a fetch response. Returns false (leaving the cache alone)
    /// if a response from a later fetch has already been applied.
    pub fn apply_fetch(&mut self, seq: u64, rows: Vec<ClientRecord>) -> bool {
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.rows = rows;
        true
    }

    /// Apply an acknowledged single-field update to the cached row, if
    /// the record is currently cached. Other fields and other records
    /// are untouched.
    pub fn apply_patch(&mut self, id: &str, patch: &FieldPatch) -> Option<&ClientRecord> {
        let row = self.rows.iter_mut().find(|r| r.id == id)?;
        row.set_field(patch.field, patch.value.clone());
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crd_sdk::records::EditableField;

    fn record(id: &str) -> ClientRecord {
        ClientRecord {
            id: id.to_string(),
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            first_name: Some("Ada".into()),
            last_name: None,
            phone: None,
            email: None,
            called_on: None,
            bop_date: None,
            bop_status: None,
            followup_date: None,
            follow_up_status: None,
            product: Some("Term Life".into()),
            issued: None,
            comment: None,
            remark: None,
        }
    }

    #[test]
    fn test_fetches_apply_in_order() {
        let mut cache = RecordCache::new();
        let first = cache.begin_fetch();
        let second = cache.begin_fetch();

        assert!(cache.apply_fetch(first, vec![record("old")]));
        assert!(cache.apply_fetch(second, vec![record("new")]));
        assert_eq!(cache.rows()[0].id, "new");
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut cache = RecordCache::new();
        let slow = cache.begin_fetch();
        let fast = cache.begin_fetch();

        // The later fetch returns first
        assert!(cache.apply_fetch(fast, vec![record("fresh")]));
        assert!(!cache.apply_fetch(slow, vec![record("stale")]));
        assert_eq!(cache.rows().len(), 1);
        assert_eq!(cache.rows()[0].id, "fresh");
    }

    #[test]
    fn test_patch_updates_only_target_field() {
        let mut cache = RecordCache::new();
        let seq = cache.begin_fetch();
        cache.apply_fetch(seq, vec![record("r1"), record("r2")]);

        let patch = FieldPatch {
            field: EditableField::BopStatus,
            value: Some("Confirmed".into()),
        };
        let updated = cache.apply_patch("r1", &patch).cloned().unwrap();
        assert_eq!(updated.bop_status.as_deref(), Some("Confirmed"));
        assert_eq!(updated.product.as_deref(), Some("Term Life"));

        let untouched = &cache.rows()[1];
        assert_eq!(untouched.id, "r2");
        assert!(untouched.bop_status.is_none());
    }

    #[test]
    fn test_patch_on_uncached_record_is_noop() {
        let mut cache = RecordCache::new();
        let patch = FieldPatch {
            field: EditableField::Comment,
            value: Some("hello".into()),
        };
        assert!(cache.apply_patch("ghost", &patch).is_none());
    }
}
