//! End-to-end tests for the reconciliation pipeline

use chrono::{Duration, TimeZone, Utc};
use forcediff_core::{
    Dataset, FieldPair, ForceDiffError, Highlight, ReconcileConfig, Reconciler, RecencyStamp,
    Record, SchemaWarning,
};

mod common;
use common::{fixed_now, TestFixtures};

fn aware(text: &str) -> RecencyStamp {
    RecencyStamp::parse(text).expect("valid timestamp")
}

fn user(id: &str, last_used: &str, email: &str, email_forced: &str) -> Record {
    Record::new()
        .with_id(id)
        .with_last_used(aware(last_used))
        .with_field("email", Some(email))
        .with_field("email-forced", Some(email_forced))
}

fn csv_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).expect("CSV output is UTF-8")
}

/// bob is recent with differing emails, amy is stale with matching ones
#[test]
fn test_recent_mismatch_is_reported() {
    let dataset = Dataset::new(["username", "lastused", "email", "email-forced"]).with_records(vec![
        user("bob", "2024-06-20T10:00:00Z", "a@x.com", "b@x.com"),
        user("amy", "2024-03-01T10:00:00Z", "c@x.com", "c@x.com"),
    ]);

    let reconciler = Reconciler::new(ReconcileConfig::default()).unwrap();
    let report = reconciler.run(&dataset, fixed_now()).unwrap();

    assert_eq!(
        csv_text(&report.csv.bytes),
        "username,field,original_value,forced_value\nbob,email,a@x.com,b@x.com\n"
    );

    let grid = &report.annotated_table;
    assert_eq!(grid.row_count(), 1);
    assert_eq!(grid.cell(0, 0), Some("bob"));
    let email = grid.column_index("email").unwrap();
    let email_forced = grid.column_index("email-forced").unwrap();
    assert_eq!(grid.highlight(0, email_forced), Some(Highlight::Forced));
    assert_eq!(grid.highlight(0, email), Some(Highlight::Original));
    assert_eq!(grid.highlights.len(), 2);
}

#[test]
fn test_forced_only_highlighting() {
    let dataset = Dataset::new(["username", "lastused", "email", "email-forced"])
        .with_records(vec![user("bob", "2024-06-20T10:00:00Z", "a@x.com", "b@x.com")]);

    let mut config = ReconcileConfig::default();
    config.report.highlight_original = false;
    let report = Reconciler::new(config).unwrap().run(&dataset, fixed_now()).unwrap();

    let grid = &report.annotated_table;
    let email_forced = grid.column_index("email-forced").unwrap();
    assert_eq!(grid.highlights.len(), 1);
    assert_eq!(grid.highlight(0, email_forced), Some(Highlight::Forced));
}

#[test]
fn test_fixture_users() {
    let fixtures = TestFixtures::new();
    let reconciler = Reconciler::new(ReconcileConfig::default()).unwrap();
    let report = reconciler
        .run_csv(&fixtures.read_data("users.csv"), fixed_now())
        .unwrap();

    assert_eq!(
        csv_text(&report.csv.bytes),
        "username,field,original_value,forced_value\n\
         alice,name,Alice,Alice W\n\
         bob,email,a@x.com,b@x.com\n\
         bob,title,Manager,\n\
         zoe,phone,555-0100,555-0199\n"
    );

    let summary = &report.summary;
    assert_eq!(summary.input_rows, 5);
    assert_eq!(summary.kept_rows, 3);
    assert_eq!(summary.dropped_without_timestamp, 1);
    assert_eq!(summary.dropped_stale, 1);
    assert_eq!(summary.mismatches, 4);
    assert_eq!(summary.cutoff, "2024-05-01T12:00:00Z");
    assert!(report.warnings.is_empty());

    let grid = &report.annotated_table;
    let ids: Vec<Option<&str>> = (0..grid.row_count()).map(|row| grid.cell(row, 0)).collect();
    assert_eq!(ids, vec![Some("zoe"), Some("bob"), Some("alice")]);
    assert_eq!(grid.column_count(), 11);
    assert!(grid.column_index("department").is_none());
}

#[test]
fn test_null_timestamps_never_reach_output() {
    let fixtures = TestFixtures::new();
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run_csv(&fixtures.read_data("users.csv"), fixed_now())
        .unwrap();

    // cid has differing emails but no lastused value
    assert!(report.diff_table.entries.iter().all(|e| e.id.as_deref() != Some("cid")));
    let grid = &report.annotated_table;
    assert!((0..grid.row_count()).all(|row| grid.cell(row, 0) != Some("cid")));
}

#[test]
fn test_cutoff_boundary_is_inclusive() {
    let now = fixed_now();
    let at_cutoff = now - Duration::days(60);
    let just_before = at_cutoff - Duration::seconds(1);

    let dataset = Dataset::new(["username", "lastused", "email", "email-forced"]).with_records(vec![
        Record::new()
            .with_id("edge")
            .with_last_used(RecencyStamp::Aware(at_cutoff))
            .with_field("email", Some("a"))
            .with_field("email-forced", Some("b")),
        Record::new()
            .with_id("older")
            .with_last_used(RecencyStamp::Aware(just_before))
            .with_field("email", Some("a"))
            .with_field("email-forced", Some("b")),
    ]);

    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run(&dataset, now)
        .unwrap();
    let ids: Vec<_> = report.diff_table.entries.iter().map(|e| e.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("edge")]);
    assert_eq!(report.summary.dropped_stale, 1);
}

#[test]
fn test_runs_are_reproducible() {
    let fixtures = TestFixtures::new();
    let input = fixtures.read_data("users.csv");
    let reconciler = Reconciler::new(ReconcileConfig::default()).unwrap();

    let first = reconciler.run_csv(&input, fixed_now()).unwrap();
    let second = reconciler.run_csv(&input, fixed_now()).unwrap();

    assert_eq!(first.csv.bytes, second.csv.bytes);
    assert_eq!(first.excel.bytes, second.excel.bytes);
    assert_eq!(first.csv.digest, second.csv.digest);
    assert_eq!(first.excel.digest, second.excel.digest);
    assert_eq!(first.csv.name, "output2_20240630_120000.csv");
    assert_eq!(first.excel.name, "output2_20240630_120000.xlsx");
}

#[test]
fn test_concurrent_runs_share_a_reconciler() {
    let fixtures = TestFixtures::new();
    let input = fixtures.read_data("users.csv");
    let reconciler = Reconciler::new(ReconcileConfig::default()).unwrap();
    let expected = reconciler.run_csv(&input, fixed_now()).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| reconciler.run_csv(&input, fixed_now()).unwrap()))
            .collect();
        for handle in handles {
            let report = handle.join().unwrap();
            assert_eq!(report.csv.digest, expected.csv.digest);
            assert_eq!(report.excel.digest, expected.excel.digest);
        }
    });
}

#[test]
fn test_diff_rows_sorted_by_identifier() {
    let dataset = Dataset::new(["username", "lastused", "email", "email-forced"]).with_records(vec![
        user("bob", "2024-06-20T10:00:00Z", "a", "b"),
        user("alice", "2024-06-21T10:00:00Z", "c", "d"),
    ]);
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run(&dataset, fixed_now())
        .unwrap();

    let ids: Vec<_> = report.diff_table.entries.iter().map(|e| e.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("alice"), Some("bob")]);
    // the grid keeps input order
    assert_eq!(report.annotated_table.cell(0, 0), Some("bob"));
}

#[test]
fn test_blank_and_missing_values_are_equal() {
    let dataset = Dataset::new(["username", "lastused", "email", "email-forced"]).with_records(vec![
        Record::new()
            .with_id("empty-vs-null")
            .with_last_used(aware("2024-06-20T10:00:00Z"))
            .with_field("email", Some(""))
            .with_field("email-forced", None),
        Record::new()
            .with_id("null-vs-empty")
            .with_last_used(aware("2024-06-20T10:00:00Z"))
            .with_field("email", None)
            .with_field("email-forced", Some("")),
        Record::new()
            .with_id("blank-vs-value")
            .with_last_used(aware("2024-06-20T10:00:00Z"))
            .with_field("email", None)
            .with_field("email-forced", Some("x@y.z")),
    ]);
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run(&dataset, fixed_now())
        .unwrap();

    assert_eq!(report.diff_table.len(), 1);
    let entry = &report.diff_table.entries[0];
    assert_eq!(entry.id.as_deref(), Some("blank-vs-value"));
    assert_eq!(entry.original_value, None);
    assert_eq!(entry.forced_value.as_deref(), Some("x@y.z"));
    assert_eq!(report.annotated_table.highlights.len(), 2);
}

#[test]
fn test_missing_forced_column_warns_and_skips_pair() {
    let fixtures = TestFixtures::new();
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run_csv(&fixtures.read_data("no_title_forced.csv"), fixed_now())
        .unwrap();

    assert!(report.diff_table.is_empty());
    assert!(report.warnings.contains(&SchemaWarning::MissingPairColumn {
        pair: "title".to_string(),
        column: "title-forced".to_string(),
    }));
    assert!(report.annotated_table.highlights.is_empty());
    assert_eq!(
        csv_text(&report.csv.bytes),
        "username,field,original_value,forced_value\n"
    );
    assert_eq!(&report.excel.bytes[..2], b"PK");
}

#[test]
fn test_missing_identifier_column_keeps_input_order() {
    let fixtures = TestFixtures::new();
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run_csv(&fixtures.read_data("no_username.csv"), fixed_now())
        .unwrap();

    assert!(!report.diff_table.sorted);
    assert!(report.warnings.contains(&SchemaWarning::MissingIdentifierColumn {
        column: "username".to_string(),
    }));
    let values: Vec<_> = report
        .diff_table
        .entries
        .iter()
        .map(|e| e.original_value.as_deref())
        .collect();
    assert_eq!(values, vec![Some("z@x.com"), Some("a@x.com")]);
}

#[test]
fn test_empty_dataset_still_produces_both_artifacts() {
    let dataset = Dataset::new(["username", "lastused", "email", "email-forced"]);
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run(&dataset, fixed_now())
        .unwrap();

    assert!(report.diff_table.is_empty());
    assert!(!report.csv.is_empty());
    assert!(!report.excel.is_empty());
}

#[test]
fn test_naive_timestamps_with_naive_convention() {
    let fixtures = TestFixtures::new();
    let config = fixtures.load_config("naive.toml");
    let report = Reconciler::new(config)
        .unwrap()
        .run_csv(&fixtures.read_data("naive.csv"), fixed_now())
        .unwrap();

    assert_eq!(
        csv_text(&report.csv.bytes),
        "username,field,original_value,forced_value\nbob,email,a@x.com,b@x.com\n"
    );
    assert_eq!(report.summary.cutoff, "2024-05-01 12:00:00");
}

#[test]
fn test_timestamp_convention_mismatch_fails() {
    let fixtures = TestFixtures::new();
    let reconciler = Reconciler::new(ReconcileConfig::default()).unwrap();

    let result = reconciler.run_csv(&fixtures.read_data("naive.csv"), fixed_now());
    assert!(matches!(result, Err(ForceDiffError::Configuration(_))));

    let result = reconciler.run_csv(&fixtures.read_data("mixed_timezones.csv"), fixed_now());
    assert!(matches!(result, Err(ForceDiffError::Configuration(_))));
}

#[test]
fn test_unparseable_timestamp_is_malformed_input() {
    let fixtures = TestFixtures::new();
    let result = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run_csv(&fixtures.read_data("bad_timestamp.csv"), fixed_now());

    match result {
        Err(ForceDiffError::MalformedInput(msg)) => assert!(msg.contains("last tuesday")),
        other => panic!("Expected MalformedInput, got {other:?}"),
    }
}

#[test]
fn test_custom_columns_and_pairs() {
    let fixtures = TestFixtures::new();
    let config = fixtures.load_config("departments.toml");
    assert_eq!(
        config.pairs,
        vec![FieldPair::named("department", "dept", "dept-override")]
    );

    let report = Reconciler::new(config)
        .unwrap()
        .run_csv(&fixtures.read_data("departments.csv"), fixed_now())
        .unwrap();

    assert_eq!(
        csv_text(&report.csv.bytes),
        "login;field;original_value;forced_value\nu2;department;Sales;Marketing\n"
    );
    assert_eq!(report.csv.name, "departments_20240630_120000.csv");
    assert_eq!(report.summary.kept_rows, 2);
    assert_eq!(report.summary.window_days, 90);
    assert_eq!(report.annotated_table.highlights.len(), 1);
}

#[test]
fn test_reference_instant_drives_names() {
    let dataset = Dataset::new(["username", "lastused"]);
    let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let report = Reconciler::new(ReconcileConfig::default())
        .unwrap()
        .run(&dataset, now)
        .unwrap();
    assert_eq!(report.csv.name, "output2_20250102_030405.csv");
    assert_eq!(report.excel.name, "output2_20250102_030405.xlsx");
}

#[test]
fn test_pair_on_identifier_column_is_rejected() {
    let mut config = ReconcileConfig::default();
    config.pairs = vec![FieldPair::new("username", "username-forced")];
    assert!(matches!(
        Reconciler::new(config),
        Err(ForceDiffError::Configuration(_))
    ));
}

#[test]
fn test_case_only_column_collision_is_a_configuration_error() {
    let mut config = ReconcileConfig::default();
    config.pairs = vec![FieldPair::new("Email", "email")];
    assert!(matches!(
        Reconciler::new(config),
        Err(ForceDiffError::Configuration(_))
    ));
}
