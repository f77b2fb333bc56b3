use serde::{Deserialize, Serialize};

use crate::index::{IdentifierIndex, IdentityIndices};

pub const COLUMN_CANONICAL_ID: &str = "canonical_id";
pub const COLUMN_PRIMARY_EMAIL: &str = "primary_email";
pub const COLUMN_HANDLE: &str = "handle";
pub const COLUMN_SECONDARY_EMAIL: &str = "secondary_email";

/// Host-URL prefixes people paste instead of a bare code-host handle.
const CODE_HOST_PREFIXES: [&str; 4] = [
    "https://www.github.com",
    "http://www.github.com",
    "https://github.com",
    "http://github.com",
];

/// The raw identifiers carried by one survey or reference record. All three
/// are optional; resolution works with whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSet {
    pub email: Option<String>,
    pub handle: Option<String>,
    pub secondary_email: Option<String>,
}

/// One step of the resolution plan: which index to consult and how to pull
/// the matching identifier out of a record.
pub struct LookupStep<'a> {
    pub index: &'a IdentifierIndex,
    pub extract: fn(&IdentifierSet) -> Option<String>,
}

impl IdentityIndices {
    /// The fixed resolution order: primary email, then handle, then
    /// secondary email. Kept as data so the precedence rule is inspectable
    /// and testable on its own.
    pub fn lookup_plan(&self) -> [LookupStep<'_>; 3] {
        [
            LookupStep {
                index: &self.email,
                extract: |ids| {
                    ids.email
                        .as_deref()
                        .map(str::trim)
                        .filter(|email| !email.is_empty())
                        .map(str::to_owned)
                },
            },
            LookupStep {
                index: &self.handle,
                extract: |ids| {
                    ids.handle
                        .as_deref()
                        .map(normalize_handle)
                        .filter(|handle| !handle.is_empty())
                },
            },
            LookupStep {
                index: &self.secondary_email,
                extract: |ids| {
                    ids.secondary_email
                        .as_deref()
                        .map(str::trim)
                        .filter(|email| !email.is_empty())
                        .map(str::to_owned)
                },
            },
        ]
    }

    /// Resolves a record to its canonical id, or `None` when no identifier
    /// matches any index. The first index with a hit wins; later steps are
    /// not consulted.
    pub fn resolve(&self, identifiers: &IdentifierSet) -> Option<&str> {
        for step in self.lookup_plan() {
            if let Some(key) = (step.extract)(identifiers)
                && let Some(canonical_id) = step.index.lookup(&key)
            {
                return Some(canonical_id);
            }
        }
        None
    }
}

/// Reduces a pasted code-host reference to a bare handle: strips a known
/// host-URL prefix, removes slash characters, strips a leading `@`, and
/// lowercases. `"https://github.com/@jdoe/"` becomes `"jdoe"`.
pub fn normalize_handle(raw: &str) -> String {
    let mut value = raw.trim().to_ascii_lowercase();

    for prefix in CODE_HOST_PREFIXES {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest.to_owned();
            break;
        }
    }

    value
        .chars()
        .filter(|ch| *ch != '/')
        .collect::<String>()
        .trim_start_matches('@')
        .to_owned()
}
