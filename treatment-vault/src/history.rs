// Record history: batch opening and supersession chains
use crate::cipher::RecordCipher;
use crate::outcome::OpenOutcome;
use crate::payload::RecordPayload;
use crate::record::{Credentials, EncryptedRecord};
use rayon::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

impl RecordCipher {
    /// Open a patient's records in parallel. Outcomes are in input order.
    ///
    /// Key derivation dominates the cost of an open, so a history of dozens
    /// of records is spread across the rayon pool.
    pub fn open_many<P>(&self, records: &[EncryptedRecord], credentials: &Credentials) -> Vec<OpenOutcome<P>>
    where
        P: RecordPayload + Send,
    {
        records
            .par_iter()
            .map(|record| self.decrypt_record(record, credentials))
            .collect()
    }
}

/// Records that no other record in `records` supersedes, in input order
pub fn authoritative(records: &[EncryptedRecord]) -> Vec<&EncryptedRecord> {
    let superseded: HashSet<Uuid> = records.iter().filter_map(|r| r.supersedes).collect();

    records
        .iter()
        .filter(|r| !superseded.contains(&r.record_id))
        .collect()
}

/// Follow `supersedes` links back from `record_id`, newest first.
///
/// Stops at the first id missing from `records`, and at any cycle.
pub fn lineage(records: &[EncryptedRecord], record_id: Uuid) -> Vec<&EncryptedRecord> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(record_id);

    while let Some(id) = next {
        if !seen.insert(id) {
            break;
        }
        let Some(record) = records.iter().find(|r| r.record_id == id) else {
            break;
        };
        chain.push(record);
        next = record.supersedes;
    }

    chain
}
