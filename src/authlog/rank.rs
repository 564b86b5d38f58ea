use serde::Serialize;

use super::FailureCounts;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FailureRecord {
    pub source_address: String,
    pub attempt_count: u64,
}

/// Orders records by attempt count, highest first.
///
/// Records with equal counts come out in no particular order; callers must
/// not rely on it.
pub fn rank(counts: FailureCounts) -> Vec<FailureRecord> {
    let mut records: Vec<FailureRecord> = counts
        .into_iter()
        .map(|(source_address, attempt_count)| FailureRecord {
            source_address,
            attempt_count,
        })
        .collect();
    records.sort_unstable_by(|a, b| b.attempt_count.cmp(&a.attempt_count));
    records
}
