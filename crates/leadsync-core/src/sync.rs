//! Reconciliation of filter rejections and upstream outcomes into a summary.
//!
//! This module is pure bookkeeping: it never talks to the CRM or the
//! database. [`Aggregator`] is additive, so feeding it the same chunk
//! outcomes in any order yields the same counts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::models::{Record, UpsertAction, UpsertResult};

/// Why a record did not make it into the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionGroup {
    /// Same email as an earlier record in the batch.
    #[serde(rename = "duplicates")]
    Duplicate,
    /// Email empty or whitespace.
    EmptyEmail,
    /// Email does not look like `local@domain.tld`.
    InvalidEmail,
    /// The chunk containing the record got no usable answer from the CRM.
    UpstreamError,
    /// The CRM answered the chunk but returned no result for this record.
    MissingResult,
}

impl RejectionGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionGroup::Duplicate => "duplicates",
            RejectionGroup::EmptyEmail => "empty_email",
            RejectionGroup::InvalidEmail => "invalid_email",
            RejectionGroup::UpstreamError => "upstream_error",
            RejectionGroup::MissingResult => "missing_result",
        }
    }
}

impl std::fmt::Display for RejectionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry under a [`RejectionGroup`] in [`SyncSummary::errors`].
///
/// Serializes as the bare record, or as `{"error": ..., "data": [...]}` for
/// upstream failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    Rejected(Record),
    Upstream { error: Value, data: Vec<Record> },
}

impl ErrorEntry {
    /// Number of input records this entry accounts for.
    pub fn record_count(&self) -> usize {
        match self {
            ErrorEntry::Rejected(_) => 1,
            ErrorEntry::Upstream { data, .. } => data.len(),
        }
    }
}

/// Result of sending one chunk upstream.
///
/// Both variants carry the chunk that was sent, so outcomes can be attributed
/// no matter in which order concurrent calls complete.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// The CRM returned a `results` list.
    Success {
        chunk: Vec<Record>,
        results: Vec<UpsertResult>,
    },
    /// No `results` list: error body, garbage, transport error or timeout.
    Failure { chunk: Vec<Record>, payload: Value },
}

impl ChunkOutcome {
    pub fn success(chunk: Vec<Record>, results: Vec<UpsertResult>) -> Self {
        ChunkOutcome::Success { chunk, results }
    }

    pub fn failure(chunk: Vec<Record>, payload: Value) -> Self {
        ChunkOutcome::Failure { chunk, payload }
    }

    /// The records that were submitted for this outcome.
    pub fn chunk(&self) -> &[Record] {
        match self {
            ChunkOutcome::Success { chunk, .. } | ChunkOutcome::Failure { chunk, .. } => chunk,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChunkOutcome::Success { .. })
    }
}

/// Raw upstream results, kept for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncDetails {
    pub response: Vec<UpsertResult>,
}

/// Aggregate result of one batch sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub created_count: usize,
    pub updated_count: usize,
    pub error_count: usize,
    pub details: SyncDetails,
    pub errors: BTreeMap<RejectionGroup, Vec<ErrorEntry>>,
}

impl SyncSummary {
    /// Entries recorded under `group`, empty if none.
    pub fn errors_in(&self, group: RejectionGroup) -> &[ErrorEntry] {
        self.errors.get(&group).map(Vec::as_slice).unwrap_or_default()
    }

    /// `created + updated + errors`.
    ///
    /// Equals the number of input records unless the CRM returned results for
    /// emails that were never submitted.
    pub fn total_accounted(&self) -> usize {
        self.created_count + self.updated_count + self.error_count
    }
}

/// Accumulates rejections and chunk outcomes into a [`SyncSummary`].
///
/// # Examples
///
/// ```
/// use leadsync_core::sync::{Aggregator, ChunkOutcome, RejectionGroup};
/// use leadsync_core::Record;
/// use serde_json::json;
///
/// let mut aggregator = Aggregator::new();
/// aggregator.reject(RejectionGroup::EmptyEmail, vec![Record::new("")]);
/// aggregator.record(ChunkOutcome::failure(
///     vec![Record::new("a@x.com"), Record::new("b@x.com")],
///     json!({"message": "rate limited"}),
/// ));
///
/// let summary = aggregator.finish();
/// assert_eq!(summary.error_count, 3);
/// assert_eq!(summary.errors_in(RejectionGroup::UpstreamError).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Aggregator {
    summary: SyncSummary,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds records rejected before dispatch. Empty groups leave no trace.
    pub fn reject(&mut self, group: RejectionGroup, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        self.summary.error_count += records.len();
        self.summary
            .errors
            .entry(group)
            .or_default()
            .extend(records.into_iter().map(ErrorEntry::Rejected));
    }

    /// Adds the outcome of one chunk.
    pub fn record(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Success { chunk, results } => {
                for result in &results {
                    match result.action() {
                        UpsertAction::Created => self.summary.created_count += 1,
                        UpsertAction::Updated => self.summary.updated_count += 1,
                    }
                }
                let missing = unmatched_records(chunk, &results);
                if !missing.is_empty() {
                    warn!(
                        "Upstream returned no result for {} submitted record(s)",
                        missing.len()
                    );
                    self.reject(RejectionGroup::MissingResult, missing);
                }
                self.summary.details.response.extend(results);
            }
            ChunkOutcome::Failure { chunk, payload } => {
                self.summary.error_count += chunk.len();
                self.summary
                    .errors
                    .entry(RejectionGroup::UpstreamError)
                    .or_default()
                    .push(ErrorEntry::Upstream {
                        error: payload,
                        data: chunk,
                    });
            }
        }
    }

    pub fn finish(self) -> SyncSummary {
        self.summary
    }
}

/// Combines pre-dispatch rejections and chunk outcomes into one summary.
pub fn aggregate<R, O>(rejections: R, outcomes: O) -> SyncSummary
where
    R: IntoIterator<Item = (RejectionGroup, Vec<Record>)>,
    O: IntoIterator<Item = ChunkOutcome>,
{
    let mut aggregator = Aggregator::new();
    for (group, records) in rejections {
        aggregator.reject(group, records);
    }
    for outcome in outcomes {
        aggregator.record(outcome);
    }
    aggregator.finish()
}

/// Records of `chunk` that no result accounts for.
///
/// Results are matched by email, ignoring ASCII case since the CRM stores
/// emails lowercased. Each result accounts for one record. Results that carry
/// no email at all are used for whatever records remain unmatched.
fn unmatched_records(chunk: Vec<Record>, results: &[UpsertResult]) -> Vec<Record> {
    let mut by_email: HashMap<String, usize> = HashMap::new();
    let mut anonymous = 0usize;
    for result in results {
        match result.email() {
            Some(email) => *by_email.entry(email.to_ascii_lowercase()).or_default() += 1,
            None => anonymous += 1,
        }
    }

    chunk
        .into_iter()
        .filter(|record| {
            if let Some(left) = by_email.get_mut(&record.email.to_ascii_lowercase()) {
                if *left > 0 {
                    *left -= 1;
                    return false;
                }
            }
            if anonymous > 0 {
                anonymous -= 1;
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(email: &str, is_new: bool) -> UpsertResult {
        serde_json::from_value(json!({"email": email, "new": is_new})).unwrap()
    }

    fn records(emails: &[&str]) -> Vec<Record> {
        emails.iter().map(|e| Record::new(*e)).collect()
    }

    #[test]
    fn test_empty_aggregation() {
        let summary = Aggregator::new().finish();
        assert_eq!(summary, SyncSummary::default());
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_reject_skips_empty_groups() {
        let summary = aggregate(
            vec![
                (RejectionGroup::Duplicate, vec![]),
                (RejectionGroup::EmptyEmail, records(&[""])),
            ],
            vec![],
        );
        assert_eq!(summary.error_count, 1);
        assert!(!summary.errors.contains_key(&RejectionGroup::Duplicate));
        assert_eq!(
            summary.errors_in(RejectionGroup::EmptyEmail),
            &[ErrorEntry::Rejected(Record::new(""))]
        );
    }

    #[test]
    fn test_success_tallies_created_and_updated() {
        let outcome = ChunkOutcome::success(
            records(&["a@x.com", "b@x.com", "c@x.com"]),
            vec![
                result("a@x.com", true),
                result("b@x.com", false),
                result("c@x.com", true),
            ],
        );
        let summary = aggregate(vec![], vec![outcome]);
        assert_eq!(summary.created_count, 2);
        assert_eq!(summary.updated_count, 1);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.details.response.len(), 3);
    }

    #[test]
    fn test_single_created_result() {
        let outcome = ChunkOutcome::success(records(&["a@x.com"]), vec![result("a@x.com", true)]);
        let summary = aggregate(vec![], vec![outcome]);
        assert_eq!(summary.created_count, 1);
        assert_eq!(summary.updated_count, 0);
    }

    #[test]
    fn test_failure_attributes_whole_chunk() {
        let chunk = records(&["a@x.com", "b@x.com", "c@x.com"]);
        let payload = json!({"data": "rate limited"});
        let summary = aggregate(
            vec![],
            vec![ChunkOutcome::failure(chunk.clone(), payload.clone())],
        );

        assert_eq!(summary.error_count, 3);
        assert_eq!(
            summary.errors_in(RejectionGroup::UpstreamError),
            &[ErrorEntry::Upstream {
                error: payload,
                data: chunk,
            }]
        );
    }

    #[test]
    fn test_missing_results_are_errors() {
        let outcome = ChunkOutcome::success(
            records(&["a@x.com", "b@x.com", "c@x.com"]),
            vec![result("A@X.com", false)],
        );
        let summary = aggregate(vec![], vec![outcome]);

        assert_eq!(summary.updated_count, 1);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.total_accounted(), 3);
        assert_eq!(
            summary.errors_in(RejectionGroup::MissingResult),
            &[
                ErrorEntry::Rejected(Record::new("b@x.com")),
                ErrorEntry::Rejected(Record::new("c@x.com")),
            ]
        );
    }

    #[test]
    fn test_results_without_email_cover_remaining_records() {
        let anonymous: UpsertResult = serde_json::from_value(json!({"id": "9", "new": true})).unwrap();
        let outcome = ChunkOutcome::success(
            records(&["a@x.com", "b@x.com"]),
            vec![result("a@x.com", false), anonymous],
        );
        let summary = aggregate(vec![], vec![outcome]);
        assert_eq!(summary.created_count, 1);
        assert_eq!(summary.updated_count, 1);
        assert_eq!(summary.error_count, 0);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let outcomes = vec![
            ChunkOutcome::success(
                records(&["a@x.com", "b@x.com"]),
                vec![result("a@x.com", true), result("b@x.com", false)],
            ),
            ChunkOutcome::failure(records(&["c@x.com", "d@x.com"]), json!("boom")),
            ChunkOutcome::success(records(&["e@x.com", "f@x.com"]), vec![result("e@x.com", true)]),
        ];

        let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let reference = aggregate(vec![], outcomes.clone());

        for order in permutations {
            let shuffled: Vec<ChunkOutcome> = order.iter().map(|&i| outcomes[i].clone()).collect();
            let summary = aggregate(vec![], shuffled);
            assert_eq!(summary.created_count, reference.created_count);
            assert_eq!(summary.updated_count, reference.updated_count);
            assert_eq!(summary.error_count, reference.error_count);
        }

        assert_eq!(reference.created_count, 2);
        assert_eq!(reference.updated_count, 1);
        assert_eq!(reference.error_count, 3);
    }

    #[test]
    fn test_summary_serialization_shape() {
        let summary = aggregate(
            vec![
                (RejectionGroup::Duplicate, records(&["a@x.com"])),
                (RejectionGroup::InvalidEmail, records(&["bad"])),
            ],
            vec![
                ChunkOutcome::success(records(&["a@x.com"]), vec![result("a@x.com", true)]),
                ChunkOutcome::failure(records(&["b@x.com"]), json!({"data": "rate limited"})),
            ],
        );

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            json!({
                "created_count": 1,
                "updated_count": 0,
                "error_count": 3,
                "details": {"response": [{"email": "a@x.com", "new": true}]},
                "errors": {
                    "duplicates": [{"email": "a@x.com"}],
                    "invalid_email": [{"email": "bad"}],
                    "upstream_error": [
                        {"error": {"data": "rate limited"}, "data": [{"email": "b@x.com"}]}
                    ]
                }
            })
        );

        let parsed: SyncSummary = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_error_entry_record_count() {
        assert_eq!(ErrorEntry::Rejected(Record::new("a")).record_count(), 1);
        let entry = ErrorEntry::Upstream {
            error: Value::Null,
            data: records(&["a", "b"]),
        };
        assert_eq!(entry.record_count(), 2);
    }

    #[test]
    fn test_rejection_group_names() {
        assert_eq!(RejectionGroup::Duplicate.to_string(), "duplicates");
        assert_eq!(
            serde_json::to_value(RejectionGroup::MissingResult).unwrap(),
            json!("missing_result")
        );
    }
}
