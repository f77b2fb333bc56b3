use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::resolve::normalize_handle;

/// Placeholder identifiers that some collectors emit instead of a real value.
/// They are never worth indexing.
const SENTINEL_VALUES: [&str; 2] = ["unknown", "none@none"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vcs,
    CodeHost,
    IssueTracker,
    Forum,
    MailingList,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vcs => "vcs",
            Self::CodeHost => "code_host",
            Self::IssueTracker => "issue_tracker",
            Self::Forum => "forum",
            Self::MailingList => "mailing_list",
        }
    }
}

/// One raw identity as reported by the identity-management service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub source: SourceKind,
    pub canonical_id: String,
    pub email: Option<String>,
    pub handle: Option<String>,
}

/// Email addresses excluded from indexing (service-side blocklist).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    entries: HashSet<String>,
}

impl ExclusionList {
    pub fn new(emails: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: emails
                .into_iter()
                .map(|email| email.trim().to_owned())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lookup table from a normalized identifier to a canonical id.
///
/// Keys are unique. Inserting an identifier that is already mapped to a
/// different canonical id overwrites the old mapping (last write wins) and
/// bumps the conflict counter; conflicts are diagnostic, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierIndex {
    entries: HashMap<String, String>,
    conflicts: u64,
}

impl IdentifierIndex {
    pub fn insert(&mut self, identifier: String, canonical_id: &str) {
        if let Some(existing) = self.entries.get(&identifier)
            && existing != canonical_id
        {
            self.conflicts += 1;
            debug!(
                identifier = identifier.as_str(),
                previous = existing.as_str(),
                next = canonical_id,
                "conflicting identifier mapping overwritten"
            );
        }

        self.entries.insert(identifier, canonical_id.to_owned());
    }

    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three per-source-class indices a resolution run works against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityIndices {
    pub email: IdentifierIndex,
    pub handle: IdentifierIndex,
    pub secondary_email: IdentifierIndex,
}

/// Builds the email, handle and secondary-email indices from one pass over
/// the raw identity stream.
///
/// Every record's email feeds the primary email index. Code-host records
/// additionally contribute their handle, and issue-tracker records their
/// email as the secondary lookup. Missing or sentinel fields are skipped,
/// never an error.
pub fn build_indices(
    records: &[IdentityRecord],
    exclusions: &ExclusionList,
) -> IdentityIndices {
    let mut indices = IdentityIndices::default();

    for record in records {
        if let Some(email) = admissible_email(record.email.as_deref(), exclusions) {
            indices.email.insert(email.to_owned(), &record.canonical_id);
        }

        match record.source {
            SourceKind::CodeHost => {
                if let Some(handle) = admissible_handle(record.handle.as_deref(), exclusions) {
                    indices.handle.insert(handle, &record.canonical_id);
                }
            }
            SourceKind::IssueTracker => {
                if let Some(email) = admissible_email(record.email.as_deref(), exclusions) {
                    indices
                        .secondary_email
                        .insert(email.to_owned(), &record.canonical_id);
                }
            }
            _ => {}
        }
    }

    debug!(
        email_entries = indices.email.len(),
        email_conflicts = indices.email.conflicts(),
        handle_entries = indices.handle.len(),
        handle_conflicts = indices.handle.conflicts(),
        secondary_entries = indices.secondary_email.len(),
        secondary_conflicts = indices.secondary_email.conflicts(),
        "identity indices built"
    );

    indices
}

fn is_sentinel(value: &str) -> bool {
    value.is_empty() || SENTINEL_VALUES.contains(&value)
}

/// Emails are trimmed but kept case-sensitive: address local parts are case
/// significant in the raw data and the collectors do not fold them either.
pub(crate) fn admissible_email<'a>(
    email: Option<&'a str>,
    exclusions: &ExclusionList,
) -> Option<&'a str> {
    let email = email?.trim();
    if is_sentinel(email) || exclusions.contains(email) {
        return None;
    }
    Some(email)
}

/// Handles go through [`normalize_handle`] (URL stripping plus lowercasing)
/// before the sentinel and exclusion checks.
pub(crate) fn admissible_handle(
    handle: Option<&str>,
    exclusions: &ExclusionList,
) -> Option<String> {
    let handle = normalize_handle(handle?);
    if is_sentinel(&handle) || exclusions.contains(&handle) {
        return None;
    }
    Some(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        source: SourceKind,
        canonical_id: &str,
        email: Option<&str>,
        handle: Option<&str>,
    ) -> IdentityRecord {
        IdentityRecord {
            source,
            canonical_id: canonical_id.to_owned(),
            email: email.map(str::to_owned),
            handle: handle.map(str::to_owned),
        }
    }

    #[test]
    fn emails_are_indexed_under_their_canonical_id() {
        let records = vec![
            record(SourceKind::Vcs, "uuid-1", Some("ada@example.org"), None),
            record(SourceKind::Forum, "uuid-2", Some("bob@example.org"), None),
        ];

        let indices = build_indices(&records, &ExclusionList::default());

        assert_eq!(indices.email.lookup("ada@example.org"), Some("uuid-1"));
        assert_eq!(indices.email.lookup("bob@example.org"), Some("uuid-2"));
        assert_eq!(indices.email.conflicts(), 0);
    }

    #[test]
    fn sentinel_and_excluded_identifiers_are_never_indexed() {
        let exclusions = ExclusionList::new(["spam@example.org".to_owned()]);
        let records = vec![
            record(SourceKind::Vcs, "uuid-1", Some(""), None),
            record(SourceKind::Vcs, "uuid-1", Some("unknown"), None),
            record(SourceKind::Vcs, "uuid-1", Some("none@none"), None),
            record(SourceKind::Vcs, "uuid-1", Some("spam@example.org"), None),
            record(SourceKind::CodeHost, "uuid-1", None, Some("unknown")),
        ];

        let indices = build_indices(&records, &exclusions);

        assert!(indices.email.is_empty());
        assert!(indices.handle.is_empty());
    }

    #[test]
    fn conflicting_mapping_overwrites_and_counts() {
        let records = vec![
            record(SourceKind::Vcs, "uuid-1", Some("ada@example.org"), None),
            record(SourceKind::Vcs, "uuid-2", Some("ada@example.org"), None),
            record(SourceKind::Vcs, "uuid-2", Some("ada@example.org"), None),
        ];

        let indices = build_indices(&records, &ExclusionList::default());

        // Last write wins; the repeat with the same id is not a conflict.
        assert_eq!(indices.email.lookup("ada@example.org"), Some("uuid-2"));
        assert_eq!(indices.email.conflicts(), 1);
    }

    #[test]
    fn only_code_host_records_feed_the_handle_index() {
        let records = vec![
            record(SourceKind::CodeHost, "uuid-1", None, Some("Ada")),
            record(SourceKind::Vcs, "uuid-2", None, Some("ghost")),
        ];

        let indices = build_indices(&records, &ExclusionList::default());

        // Handles are lowercased on the way in.
        assert_eq!(indices.handle.lookup("ada"), Some("uuid-1"));
        assert!(!indices.handle.contains("ghost"));
    }

    #[test]
    fn issue_tracker_emails_feed_both_email_indices() {
        let records = vec![record(
            SourceKind::IssueTracker,
            "uuid-1",
            Some("ada@example.org"),
            None,
        )];

        let indices = build_indices(&records, &ExclusionList::default());

        assert_eq!(indices.email.lookup("ada@example.org"), Some("uuid-1"));
        assert_eq!(
            indices.secondary_email.lookup("ada@example.org"),
            Some("uuid-1")
        );
    }
}
