//! Record filters applied before anything is sent upstream.
//!
//! Every filter splits its input into `(kept, rejected)` without reordering,
//! and the orchestrator only feeds the `kept` half to the next filter, so a
//! record is rejected for at most one reason.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::EmailMatching;
use crate::models::Record;

/// `local@domain.tld`, loosely: something without `@`, an `@`, something
/// without `@`, a dot, then anything.
///
/// This is a plausibility check, not RFC 5322 validation. It accepts some
/// addresses the CRM will refuse; those come back as upstream errors.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\..+$").expect("email pattern is valid"));

/// Splits `records` into those matching `keep` and those that don't.
///
/// Both halves preserve input order.
///
/// # Examples
///
/// ```
/// use leadsync_core::validation::{has_email, partition};
/// use leadsync_core::Record;
///
/// let (kept, rejected) = partition(
///     vec![Record::new("a@x.com"), Record::new(""), Record::new("b@x.com")],
///     has_email,
/// );
/// assert_eq!(kept.len(), 2);
/// assert_eq!(rejected, vec![Record::new("")]);
/// ```
pub fn partition<F>(records: Vec<Record>, keep: F) -> (Vec<Record>, Vec<Record>)
where
    F: Fn(&Record) -> bool,
{
    records.into_iter().partition(|r| keep(r))
}

/// False when the email is empty or only whitespace.
///
/// Whitespace-only emails count as empty, not as malformed, so they land in
/// the `empty_email` group rather than `invalid_email`.
pub fn has_email(record: &Record) -> bool {
    !record.email.trim().is_empty()
}

/// True when the email looks like `local@domain.tld`. See [`EMAIL_SHAPE`].
pub fn is_plausible_email(record: &Record) -> bool {
    EMAIL_SHAPE.is_match(&record.email)
}

/// Splits `records` into first occurrences and repeats, keyed on email.
///
/// The first record seen for an email is kept even if a later one carries
/// more data.
pub fn dedupe(records: Vec<Record>, matching: EmailMatching) -> (Vec<Record>, Vec<Record>) {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut first_seen = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();

    for record in records {
        let key = match matching {
            EmailMatching::Exact => record.email.clone(),
            EmailMatching::CaseInsensitive => record.email.to_ascii_lowercase(),
        };
        if seen.insert(key) {
            first_seen.push(record);
        } else {
            duplicates.push(record);
        }
    }

    (first_seen, duplicates)
}
