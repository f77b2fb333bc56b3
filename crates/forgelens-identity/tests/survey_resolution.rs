use forgelens_core::CellValue;
use forgelens_identity::{
    COLUMN_CANONICAL_ID, COLUMN_HANDLE, COLUMN_PRIMARY_EMAIL, COLUMN_SECONDARY_EMAIL,
    ExclusionList, IdentifierSet, IdentityRecord, SourceKind, SurveyResponse, build_indices,
    resolve_batch, resolved_rows,
};

fn identity_stream() -> Vec<IdentityRecord> {
    let record = |source, canonical_id: &str, email: Option<&str>, handle: Option<&str>|
        IdentityRecord {
            source,
            canonical_id: canonical_id.to_owned(),
            email: email.map(str::to_owned),
            handle: handle.map(str::to_owned),
        };

    vec![
        record(SourceKind::Vcs, "uuid-ada", Some("ada@example.org"), None),
        record(SourceKind::CodeHost, "uuid-ada", Some("unknown"), Some("adal")),
        record(SourceKind::IssueTracker, "uuid-bob", Some("bob@tracker.example.org"), None),
        record(SourceKind::MailingList, "uuid-eve", Some("eve@example.org"), None),
        // Excluded address that must never become resolvable.
        record(SourceKind::Vcs, "uuid-spam", Some("noreply@example.org"), None),
    ]
}

#[test]
fn survey_responses_resolve_and_export_end_to_end() {
    let exclusions = ExclusionList::new(["noreply@example.org".to_owned()]);
    let indices = build_indices(&identity_stream(), &exclusions);

    let responses = vec![
        SurveyResponse {
            key: "1".to_owned(),
            identifiers: IdentifierSet {
                email: Some("ada@example.org".to_owned()),
                handle: Some("https://github.com/@AdaL/".to_owned()),
                secondary_email: None,
            },
            attributes: vec![("role".to_owned(), "maintainer".to_owned())],
        },
        SurveyResponse {
            key: "2".to_owned(),
            identifiers: IdentifierSet {
                email: Some("bob@elsewhere.example.org".to_owned()),
                handle: None,
                secondary_email: Some("bob@tracker.example.org".to_owned()),
            },
            attributes: vec![("role".to_owned(), "reporter".to_owned())],
        },
        SurveyResponse {
            key: "3".to_owned(),
            identifiers: IdentifierSet {
                email: Some("noreply@example.org".to_owned()),
                handle: None,
                secondary_email: None,
            },
            attributes: Vec::new(),
        },
    ];

    let outcome = resolve_batch(responses, &indices);

    assert_eq!(outcome.report.resolved, 2);
    assert_eq!(outcome.report.not_found, 1);
    assert_eq!(outcome.not_found_keys, vec!["3".to_owned()]);
    assert_eq!(outcome.matches[0].canonical_id, "uuid-ada");
    assert_eq!(outcome.matches[1].canonical_id, "uuid-bob");

    let table = resolved_rows(
        &outcome.matches,
        &[
            COLUMN_CANONICAL_ID,
            COLUMN_PRIMARY_EMAIL,
            COLUMN_HANDLE,
            COLUMN_SECONDARY_EMAIL,
        ],
    )
    .expect("export table");

    assert_eq!(
        table.rows()[0][0..2],
        [
            CellValue::from("uuid-ada"),
            CellValue::from("ada@example.org"),
        ]
    );

    let with_attributes =
        resolved_rows(&outcome.matches, &[COLUMN_CANONICAL_ID, "role"]).expect("attribute table");
    assert_eq!(
        with_attributes.rows()[1],
        vec![CellValue::from("uuid-bob"), CellValue::from("reporter")]
    );
}
