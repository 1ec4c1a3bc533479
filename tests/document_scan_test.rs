//! Integration tests for the document reference scanner working against a
//! real image store.

mod common;

use std::collections::BTreeSet;

use auditstore::scanner::{
    collect_references, diff_removed, extract_references, materialize_embedded_images,
    prune_removed, DocumentShape,
};
use common::{data_uri, TestHarness};
use serde_json::{json, Value};

fn flat_audit(photo_a: Value, photo_b: Value) -> Value {
    json!([
        {"checkpoint": "Incoming inspection", "result": "OK", "photo": photo_a},
        {"checkpoint": "Torque check", "result": "NG", "value": 41.5, "photo": photo_b},
        {"checkpoint": "Label", "result": "OK"}
    ])
}

fn staged_audit(photo_a: Value, photo_b: Value) -> Value {
    json!({
        "stages": [
            {"stage": "Receiving", "items": [
                {"checkpoint": "Incoming inspection", "result": "OK", "photo": photo_a}
            ]},
            {"stage": "Assembly", "items": [
                {"checkpoint": "Torque check", "result": "NG", "value": 41.5, "photo": photo_b},
                {"checkpoint": "Label", "result": "OK"}
            ]}
        ]
    })
}

#[test]
fn both_schema_generations_yield_the_same_references() {
    let flat = flat_audit(json!("a.jpg"), json!("b.png"));
    let staged = staged_audit(json!("a.jpg"), json!("b.png"));

    assert_eq!(DocumentShape::detect(&flat), DocumentShape::Flat);
    assert_eq!(DocumentShape::detect(&staged), DocumentShape::Staged);
    assert_eq!(extract_references(&flat), extract_references(&staged));
    assert_eq!(extract_references(&flat).len(), 2);
}

fn sectioned_audit(photo_a: Value, photo_b: Value) -> Value {
    json!({
        "sections": [
            {"section": "Line 1", "stages": [
                {"stage": "Receiving", "checkpoints": [
                    {"checkpoint": "Incoming inspection", "result": "OK", "photo": photo_a}
                ]}
            ]},
            {"section": "Line 2", "stages": [
                {"stage": "Assembly", "checkpoints": [
                    {"checkpoint": "Torque check", "result": "NG", "value": 41.5, "photo": photo_b},
                    {"checkpoint": "Label", "result": "OK"}
                ]}
            ]}
        ]
    })
}

#[test]
fn sectioned_documents_yield_the_same_references() {
    let flat = flat_audit(json!("a.jpg"), json!("b.png"));
    let sectioned = sectioned_audit(json!("a.jpg"), json!("b.png"));

    assert_eq!(DocumentShape::detect(&sectioned), DocumentShape::Sectioned);
    assert_eq!(extract_references(&sectioned), extract_references(&flat));
}

#[test]
fn pruning_a_sectioned_document_keeps_live_artifacts() {
    let h = TestHarness::new();
    let out = materialize_embedded_images(
        sectioned_audit(
            json!({"data": data_uri("image/jpeg", b"kept"), "name": "kept.jpg"}),
            json!({"data": data_uri("image/png", b"gone"), "name": "gone.png"}),
        ),
        &h.images,
        None,
    );
    assert_eq!(out.manifest.len(), 2);
    assert_eq!(out.manifest[0].pointer, "/sections/0/stages/0/checkpoints/0/photo");

    let kept = out.manifest[0].file_name.clone();
    let gone = out.manifest[1].file_name.clone();
    let edited = sectioned_audit(json!(kept.clone()), Value::Null);

    let report = prune_removed(&out.document, &edited, &BTreeSet::new(), &h.images);
    assert_eq!(report.attempted, 1);
    assert!(h.images.stat(&kept).unwrap().is_some());
    assert!(h.images.stat(&gone).unwrap().is_none());
    assert!(h
        .images
        .list_orphans(&collect_references([&edited]))
        .unwrap()
        .is_empty());
}

#[test]
fn materialized_documents_reference_existing_artifacts() {
    let h = TestHarness::new();

    for doc in [
        flat_audit(
            json!({"data": data_uri("image/jpeg", b"jpeg-a"), "name": "a.jpg"}),
            json!({"data": data_uri("image/png", b"png-b"), "name": "b.png"}),
        ),
        staged_audit(
            json!({"data": data_uri("image/jpeg", b"jpeg-a"), "name": "a.jpg"}),
            json!({"data": data_uri("image/png", b"png-b"), "name": "b.png"}),
        ),
    ] {
        let out = materialize_embedded_images(doc, &h.images, Some("RPT-9"));
        assert_eq!(out.manifest.len(), 2);
        assert!(out.failures.is_empty());

        let refs = extract_references(&out.document);
        assert_eq!(refs.len(), 2);
        for name in &refs {
            assert!(h.images.stat(name).unwrap().is_some(), "dangling {name}");
            assert!(name.starts_with("RPT-9_"));
        }
        for entry in &out.manifest {
            assert_eq!(
                out.document.pointer(&entry.pointer),
                Some(&Value::String(entry.file_name.clone()))
            );
        }
    }

    assert_eq!(h.images.list().unwrap().len(), 4);
}

#[test]
fn one_bad_payload_does_not_block_the_document() {
    let h = TestHarness::new();
    let doc = staged_audit(
        json!({"data": "data:image/png;base64,!!!not-base64!!!", "name": "broken.png"}),
        json!({"data": data_uri("image/png", b"fine"), "name": "fine.png"}),
    );

    let out = materialize_embedded_images(doc, &h.images, None);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].pointer, "/stages/0/items/0/photo");
    assert_eq!(out.document.pointer("/stages/0/items/0/photo"), Some(&Value::Null));
    assert_eq!(out.manifest.len(), 1);
    assert_eq!(h.images.list().unwrap().len(), 1);
}

#[test]
fn edit_then_prune_removes_only_unreferenced_artifacts() {
    let h = TestHarness::new();

    let original = materialize_embedded_images(
        flat_audit(
            json!({"data": data_uri("image/jpeg", b"first"), "name": "first.jpg"}),
            json!({"data": data_uri("image/jpeg", b"second"), "name": "second.jpg"}),
        ),
        &h.images,
        None,
    )
    .document;
    let refs: Vec<String> = extract_references(&original).into_iter().collect();
    let (first, second) = (refs[0].clone(), refs[1].clone());

    // Another live report shares `first`.
    let other_report = json!([{"checkpoint": "Copy", "photo": first.clone()}]);

    // The edit drops both photos from this report and moves nothing.
    let edited = flat_audit(Value::Null, Value::Null);
    assert_eq!(
        diff_removed(&original, &edited),
        BTreeSet::from([first.clone(), second.clone()])
    );

    let still_live = collect_references([&other_report]);
    let report = prune_removed(&original, &edited, &still_live, &h.images);

    assert_eq!(report.attempted, 1);
    assert_eq!(report.deleted, 1);
    assert!(h.images.stat(&first).unwrap().is_some());
    assert!(h.images.stat(&second).unwrap().is_none());

    let orphans = h
        .images
        .list_orphans(&collect_references([&edited, &other_report]))
        .unwrap();
    assert!(orphans.is_empty());
}

#[test]
fn moving_a_photo_between_stages_is_not_a_removal() {
    let before = staged_audit(json!("x.jpg"), json!("y.jpg"));
    let after = staged_audit(json!("y.jpg"), json!("x.jpg"));
    assert!(diff_removed(&before, &after).is_empty());
}
