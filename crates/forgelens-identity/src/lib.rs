mod batch;
mod index;
mod resolve;

pub use batch::{
    BatchResolution, ResolutionReport, ResolvedRecord, SurveyResponse, resolve_batch,
    resolve_emails, resolved_rows,
};
pub use index::{
    ExclusionList, IdentifierIndex, IdentityIndices, IdentityRecord, SourceKind, build_indices,
};
pub use resolve::{
    COLUMN_CANONICAL_ID, COLUMN_HANDLE, COLUMN_PRIMARY_EMAIL, COLUMN_SECONDARY_EMAIL,
    IdentifierSet, LookupStep, normalize_handle,
};
