//! Integration tests for template record storage.

mod common;

use std::collections::HashSet;

use assert_matches::assert_matches;
use auditstore::templates::{TemplateDraft, TemplateStore};
use auditstore::{Error, ErrorKind};
use common::TestHarness;
use serde_json::json;

fn report_draft() -> TemplateDraft {
    TemplateDraft {
        template_code: "TR-01".into(),
        template_name: "Traceability Report".into(),
        version: "01".into(),
        header_config: json!({"title": "Traceability", "logo": true}),
        info_fields: vec![json!({"key": "lot", "label": "Lot number"})],
        columns: vec![json!({"key": "step"}), json!({"key": "result"})],
        default_sections: vec![json!({"name": "Incoming", "items": []})],
    }
}

// ---------------------------------------------------------------------------
// Save scenarios
// ---------------------------------------------------------------------------

#[test]
fn save_then_resave_keeps_saved_at() {
    let h = TestHarness::new();

    let first = h.templates.save(report_draft(), None).unwrap();
    assert_eq!(first.file_name, "Traceability_Report_01.json");
    assert!(h.roots.templates.join("Traceability_Report_01.json").is_file());

    let mut changed = report_draft();
    changed.columns.push(json!({"key": "inspector"}));
    let second = h
        .templates
        .save(changed, Some(&first.file_name))
        .unwrap();

    assert_eq!(second.file_name, first.file_name);
    assert_eq!(second.record.saved_at, first.record.saved_at);
    assert!(second.record.updated_at > first.record.updated_at);

    let on_disk = h.templates.read(&first.file_name).unwrap().unwrap();
    assert_eq!(on_disk.draft.columns.len(), 3);
    assert_eq!(on_disk.saved_at, first.record.saved_at);

    let raw: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(h.roots.templates.join(&first.file_name)).unwrap(),
    )
    .unwrap();
    assert_eq!(raw["templateCode"], "TR-01");
    assert!(raw["savedAt"].is_string());
    assert!(raw["updatedAt"].is_string());
}

#[test]
fn updated_at_strictly_advances_across_rapid_saves() {
    let h = TestHarness::new();
    let mut saved = h.templates.save(report_draft(), None).unwrap();
    for _ in 0..20 {
        let next = h
            .templates
            .save(report_draft(), Some(&saved.file_name))
            .unwrap();
        assert!(next.record.updated_at > saved.record.updated_at);
        saved = next;
    }
}

#[test]
fn distinct_records_never_share_a_file() {
    let h = TestHarness::new();
    let a = h.templates.save(report_draft(), None).unwrap();
    let b = h.templates.save(report_draft(), None).unwrap();
    assert_ne!(a.file_name, b.file_name);
    assert_eq!(b.file_name, "Traceability_Report_01_1.json");
    assert_eq!(h.templates.list().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_creations_get_distinct_names() {
    let h = TestHarness::new();
    let store = &h.templates;
    const WRITERS: usize = 16;

    let names: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| s.spawn(move || store.save(report_draft(), None).unwrap().file_name))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), WRITERS);
    assert_eq!(h.file_count(&h.roots.templates), WRITERS);
    for name in &names {
        assert!(store.read(name).unwrap().is_some());
    }
}

#[test]
fn concurrent_backups_never_overwrite() {
    let h = TestHarness::new();
    let saved = h.templates.save(report_draft(), None).unwrap();
    let store = &h.templates;
    let file = saved.file_name.as_str();

    let names: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(move || store.backup(file).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 8);
    assert_eq!(store.list_backups().unwrap().len(), 8);
}

// ---------------------------------------------------------------------------
// Update / rename safety
// ---------------------------------------------------------------------------

#[test]
fn rename_moves_record_and_removes_old_file() {
    let h = TestHarness::new();
    let saved = h.templates.save(report_draft(), None).unwrap();

    let updated = h
        .templates
        .update(&saved.file_name, "Traceability Report", "02", report_draft())
        .unwrap();

    assert!(updated.renamed);
    assert_eq!(updated.file_name, "Traceability_Report_02.json");
    assert_eq!(updated.record.draft.version, "02");
    assert_eq!(updated.record.saved_at, saved.record.saved_at);
    assert!(h.templates.read(&saved.file_name).unwrap().is_none());
    assert_eq!(h.file_count(&h.roots.templates), 1);
}

#[test]
fn failed_rename_leaves_original_untouched() {
    let h = TestHarness::new();
    let store = TemplateStore::new(&h.roots.templates).with_max_attempts(1);

    let original = store.save(report_draft(), None).unwrap();
    let blocker = store
        .save(TemplateDraft::named("Final Audit", "A"), None)
        .unwrap();
    let before = std::fs::read(h.roots.templates.join(&original.file_name)).unwrap();

    // The only candidate name is taken and the search may not go further.
    let err = store
        .update(&original.file_name, "Final Audit", "A", report_draft())
        .unwrap_err();
    assert_matches!(err, Error::Exhausted { .. });

    let after = std::fs::read(h.roots.templates.join(&original.file_name)).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        store.read(&blocker.file_name).unwrap().unwrap().draft.template_name,
        "Final Audit"
    );
    assert_eq!(h.file_count(&h.roots.templates), 2);
}

#[test]
fn invalid_rename_is_rejected_before_writing() {
    let h = TestHarness::new();
    let saved = h.templates.save(report_draft(), None).unwrap();

    let err = h
        .templates
        .update(&saved.file_name, "  ?? ", "03", report_draft())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.templates.read(&saved.file_name).unwrap().is_some());
    assert_eq!(h.file_count(&h.roots.templates), 1);
}

#[test]
fn update_of_missing_record_is_not_found() {
    let h = TestHarness::new();
    let err = h
        .templates
        .update("Ghost_1.json", "Ghost", "2", TemplateDraft::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.http_status(), 404);
}

// ---------------------------------------------------------------------------
// Listing and backups
// ---------------------------------------------------------------------------

#[test]
fn listing_survives_corrupt_files_and_skips_backups() {
    let h = TestHarness::new();
    let saved = h.templates.save(report_draft(), None).unwrap();
    h.templates.backup(&saved.file_name).unwrap();
    std::fs::write(h.roots.templates.join("Half_Written_9.json"), "{\"templateName\":").unwrap();

    let list = h.templates.list().unwrap();
    assert_eq!(list.len(), 2);

    let broken = list.iter().find(|s| s.file_name == "Half_Written_9.json").unwrap();
    assert!(!broken.readable);
    assert_eq!(broken.template_name, "Half Written 9");

    let good = list.iter().find(|s| s.file_name == saved.file_name).unwrap();
    assert_eq!(good.template_name, "Traceability Report");
    assert_eq!(good.saved_at, Some(saved.record.saved_at));
}

#[test]
fn backup_is_an_independent_copy() {
    let h = TestHarness::new();
    let saved = h.templates.save(report_draft(), None).unwrap();
    let backup = h.templates.backup(&saved.file_name).unwrap();

    assert!(backup.starts_with("Traceability_Report_01_backup_"));
    assert!(backup.ends_with(".json"));
    assert!(!backup.contains(':'));

    h.templates.delete(&saved.file_name).unwrap();
    assert!(h.roots.template_backups.join(&backup).is_file());
}
