use std::collections::HashSet;

use forgelens_core::{CellValue, LayoutError, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::index::{IdentifierIndex, IdentityIndices};
use crate::resolve::{
    COLUMN_CANONICAL_ID, COLUMN_HANDLE, COLUMN_PRIMARY_EMAIL, COLUMN_SECONDARY_EMAIL,
    IdentifierSet,
};

/// One record from a survey or reference export: a stable key, the raw
/// identifiers, and pass-through attribute columns preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub key: String,
    pub identifiers: IdentifierSet,
    pub attributes: Vec<(String, String)>,
}

/// A survey response annotated with the canonical id it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub key: String,
    pub canonical_id: String,
    pub identifiers: IdentifierSet,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub resolved: usize,
    pub not_found: usize,
    pub duplicate_inputs: usize,
    pub distinct_canonical_ids: usize,
}

/// Outcome of a batch resolution run. Unresolved records are listed, never
/// silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResolution {
    pub matches: Vec<ResolvedRecord>,
    pub not_found_keys: Vec<String>,
    pub report: ResolutionReport,
}

/// Resolves a batch of survey responses against the given indices.
///
/// Records whose key was already seen earlier in the batch are counted as
/// duplicates and skipped; match order follows input order.
pub fn resolve_batch(
    responses: Vec<SurveyResponse>,
    indices: &IdentityIndices,
) -> BatchResolution {
    let mut seen_keys = HashSet::new();
    let mut canonical_ids = HashSet::new();
    let mut result = BatchResolution::default();

    for response in responses {
        if !seen_keys.insert(response.key.clone()) {
            result.report.duplicate_inputs += 1;
            continue;
        }

        match indices.resolve(&response.identifiers) {
            Some(canonical_id) => {
                canonical_ids.insert(canonical_id.to_owned());
                result.matches.push(ResolvedRecord {
                    key: response.key,
                    canonical_id: canonical_id.to_owned(),
                    identifiers: response.identifiers,
                    attributes: response.attributes,
                });
            }
            None => {
                warn!(
                    key = response.key.as_str(),
                    email = response.identifiers.email.as_deref().unwrap_or(""),
                    handle = response.identifiers.handle.as_deref().unwrap_or(""),
                    "no index matched record"
                );
                result.not_found_keys.push(response.key);
            }
        }
    }

    result.report.resolved = result.matches.len();
    result.report.not_found = result.not_found_keys.len();
    result.report.distinct_canonical_ids = canonical_ids.len();

    debug!(
        resolved = result.report.resolved,
        not_found = result.report.not_found,
        duplicates = result.report.duplicate_inputs,
        distinct = result.report.distinct_canonical_ids,
        "batch resolution finished"
    );

    result
}

/// Single-identifier flow: resolves a plain email list against the primary
/// email index. Duplicate input emails are counted once and skipped.
pub fn resolve_emails(
    emails: impl IntoIterator<Item = String>,
    email_index: &IdentifierIndex,
) -> BatchResolution {
    let mut seen = HashSet::new();
    let mut canonical_ids = HashSet::new();
    let mut result = BatchResolution::default();

    for email in emails {
        let email = email.trim().to_owned();
        if !seen.insert(email.clone()) {
            result.report.duplicate_inputs += 1;
            continue;
        }

        match email_index.lookup(&email) {
            Some(canonical_id) => {
                canonical_ids.insert(canonical_id.to_owned());
                result.matches.push(ResolvedRecord {
                    key: email.clone(),
                    canonical_id: canonical_id.to_owned(),
                    identifiers: IdentifierSet {
                        email: Some(email),
                        ..IdentifierSet::default()
                    },
                    attributes: Vec::new(),
                });
            }
            None => result.not_found_keys.push(email),
        }
    }

    result.report.resolved = result.matches.len();
    result.report.not_found = result.not_found_keys.len();
    result.report.distinct_canonical_ids = canonical_ids.len();
    result
}

/// Shapes resolved records into an export table over a caller-chosen column
/// set. Identifier columns are addressed by the `COLUMN_*` names; any other
/// requested column is looked up among the record's pass-through attributes.
pub fn resolved_rows(records: &[ResolvedRecord], columns: &[&str]) -> Result<Table, LayoutError> {
    let mut table = Table::new(columns.iter().map(|column| (*column).to_owned()).collect());

    for record in records {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            let cell = match *column {
                COLUMN_CANONICAL_ID => record.canonical_id.as_str(),
                COLUMN_PRIMARY_EMAIL => record.identifiers.email.as_deref().unwrap_or(""),
                COLUMN_HANDLE => record.identifiers.handle.as_deref().unwrap_or(""),
                COLUMN_SECONDARY_EMAIL => {
                    record.identifiers.secondary_email.as_deref().unwrap_or("")
                }
                name => record
                    .attributes
                    .iter()
                    .find(|(attribute, _)| attribute == name)
                    .map(|(_, value)| value.as_str())
                    .ok_or_else(|| LayoutError::UnknownColumn(name.to_owned()))?,
            };
            row.push(CellValue::from(cell));
        }
        table.push(row);
    }

    Ok(table)
}
