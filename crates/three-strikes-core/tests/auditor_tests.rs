mod common;

use common::{ad, file_events, recorder, recorder_with_warehouse, FakeAdsApi, FakeWarehouse};
use std::sync::Arc;
use tempfile::tempdir;
use three_strikes_core::auditor::AdAuditor;
use three_strikes_core::model::{AccountRecord, RemovalStatus};
use three_strikes_core::policy::TopicPolicy;
use three_strikes_core::sink::Table;
use three_strikes_core::Error;

fn account() -> AccountRecord {
    AccountRecord::root("100").child("200")
}

fn api_with_ads() -> FakeAdsApi {
    FakeAdsApi::new().with_ads(
        "200",
        vec![
            ad("200", "1", &["Guns, gun parts and related products"]),
            ad("200", "2", &["Tobacco"]),
            ad("200", "3", &["Destination not working"]),
        ],
    )
}

#[test]
fn test_audit_only_stages_without_removing() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let api = api_with_ads();
    let policy = TopicPolicy::new(vec![], vec!["destination".to_string()]);

    let audit = AdAuditor::new(&api, &policy, &recorder)
        .process_account(&account())
        .unwrap();

    assert_eq!(audit.ads_to_remove_count, 2);
    assert_eq!(audit.removed_count, 0);
    assert!(audit
        .candidates
        .iter()
        .all(|c| c.status == RemovalStatus::Scanned));
    assert_eq!(api.mutate_call_count(), 0);

    let events = file_events(&recorder, Table::AdsToRemove);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].len(), 2);
    assert_eq!(events[0][0]["removal_status"], "SCANNED");
    assert_eq!(events[0][0]["hierarchy"], "100_200");
    assert_eq!(
        events[0][0]["session_id"],
        recorder.session().session_id.as_str()
    );

    let summaries = file_events(&recorder, Table::PerAccountSummary);
    assert_eq!(summaries[0][0]["account_id"], "200");
    assert_eq!(summaries[0][0]["ads_to_remove_count"], 2);
}

#[test]
fn test_audit_only_is_idempotent() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let api = api_with_ads();
    let policy = TopicPolicy::default();
    let auditor = AdAuditor::new(&api, &policy, &recorder);

    let first = auditor.process_account(&account()).unwrap();
    let second = auditor.process_account(&account()).unwrap();
    assert_eq!(first.ads_to_remove_count, 3);
    assert_eq!(first.ads_to_remove_count, second.ads_to_remove_count);
    assert_eq!(*api.fetch_calls.lock().unwrap(), 2);
}

#[test]
fn test_allow_list_drops_other_topics_silently() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let api = api_with_ads();
    let policy = TopicPolicy::new(vec!["guns".to_string()], vec![]);

    let audit = AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .process_account(&account())
        .unwrap();

    assert_eq!(audit.ads_to_remove_count, 1);
    assert_eq!(audit.candidates[0].ad.ad_id, "1");
    let calls = api.mutate_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, vec!["customers/200/adGroupAds/800~1".to_string()]);
}

#[test]
fn test_no_eligible_ads_writes_only_the_summary() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let api = api_with_ads();
    let policy = TopicPolicy::new(vec!["counterfeit".to_string()], vec![]);

    let audit = AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .process_account(&account())
        .unwrap();

    assert_eq!(audit.ads_to_remove_count, 0);
    assert_eq!(api.mutate_call_count(), 0);
    assert!(file_events(&recorder, Table::AdsToRemove).is_empty());
    assert_eq!(file_events(&recorder, Table::PerAccountSummary).len(), 1);
}

#[test]
fn test_partial_failure_is_reconciled_and_persisted_twice() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let api = api_with_ads().failing_at(&[1]);
    let policy = TopicPolicy::default();

    let audit = AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .process_account(&account())
        .unwrap();

    assert_eq!(audit.ads_to_remove_count, 3);
    assert_eq!(audit.candidates.len(), 3);
    assert_eq!(audit.removed_count, 2);
    assert_eq!(audit.failed_count, 1);

    let failed = audit
        .candidates
        .iter()
        .find(|c| c.status == RemovalStatus::FailedToRemove)
        .unwrap();
    assert_eq!(failed.ad.ad_id, "2");
    assert_eq!(
        failed.removal_error.as_deref(),
        Some("mutateError.RESOURCE_NOT_FOUND: Resource customers/200/adGroupAds/800~2 was not found.")
    );

    let events = file_events(&recorder, Table::AdsToRemove);
    assert_eq!(events.len(), 2, "staged write, then reconciled write");
    assert!(events[0].iter().all(|r| r["removal_status"] == "SCANNED"));
    let statuses: Vec<&str> = events[1]
        .iter()
        .map(|r| r["removal_status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses.iter().filter(|s| **s == "REMOVED").count(), 2);
    assert_eq!(statuses.iter().filter(|s| **s == "FAILED_TO_REMOVE").count(), 1);
}

#[test]
fn test_removal_is_chunked() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let ads = (1..=5)
        .map(|i| ad("200", &i.to_string(), &["Tobacco"]))
        .collect();
    let api = FakeAdsApi::new().with_ads("200", ads).failing_at(&[0]);
    let policy = TopicPolicy::default();

    let audit = AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .with_batch_size(2)
        .process_account(&account())
        .unwrap();

    let calls = api.mutate_calls.lock().unwrap();
    let sizes: Vec<usize> = calls.iter().map(|(_, ops)| ops.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);

    // Index 0 of each chunk fails: ads 1, 3 and 5.
    let mut failed: Vec<&str> = audit
        .candidates
        .iter()
        .filter(|c| c.status == RemovalStatus::FailedToRemove)
        .map(|c| c.ad.ad_id.as_str())
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["1", "3", "5"]);
    assert_eq!(audit.removed_count, 2);

    // One staged write plus one per chunk.
    assert_eq!(file_events(&recorder, Table::AdsToRemove).len(), 4);
}

#[test]
fn test_mutate_error_aborts_after_staging() {
    let tmp = tempdir().unwrap();
    let recorder = recorder(tmp.path());
    let api = api_with_ads().failing_mutates(1);
    let policy = TopicPolicy::default();

    let result = AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .process_account(&account());

    assert!(matches!(result, Err(Error::AdsApi(_))));
    let events = file_events(&recorder, Table::AdsToRemove);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].len(), 3);
    assert!(file_events(&recorder, Table::PerAccountSummary).is_empty());
}

#[test]
fn test_in_place_updates_go_to_the_warehouse() {
    let tmp = tempdir().unwrap();
    let warehouse = Arc::new(FakeWarehouse::default());
    let recorder = recorder_with_warehouse(tmp.path(), warehouse.clone(), true);
    let api = api_with_ads();
    let policy = TopicPolicy::default();

    AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .process_account(&account())
        .unwrap();

    // Staged rows go in by DML so the reconciled rows can update them.
    assert!(warehouse.rows(Table::AdsToRemove).is_empty());
    let staged = warehouse.rows_by_query(Table::AdsToRemove);
    assert_eq!(staged.len(), 3);
    assert!(staged.iter().all(|r| r["removal_status"] == "SCANNED"));
    let updated = warehouse.updated.lock().unwrap();
    assert_eq!(updated.len(), 3);
    for (table, keys, row) in updated.iter() {
        assert_eq!(*table, Table::AdsToRemove);
        assert_eq!(keys, &vec!["session_id".to_string(), "ad_id".to_string()]);
        assert_eq!(row["removal_status"], "REMOVED");
    }

    // The file still records both events.
    assert_eq!(file_events(&recorder, Table::AdsToRemove).len(), 2);
}

#[test]
fn test_appended_status_rows_without_in_place_updates() {
    let tmp = tempdir().unwrap();
    let warehouse = Arc::new(FakeWarehouse::default());
    let recorder = recorder_with_warehouse(tmp.path(), warehouse.clone(), false);
    let api = api_with_ads();
    let policy = TopicPolicy::default();

    AdAuditor::new(&api, &policy, &recorder)
        .with_removal(true)
        .process_account(&account())
        .unwrap();

    let rows = warehouse.rows(Table::AdsToRemove);
    assert_eq!(rows.len(), 6);
    assert!(warehouse.rows_by_query(Table::AdsToRemove).is_empty());
    assert!(warehouse.updated.lock().unwrap().is_empty());
}
