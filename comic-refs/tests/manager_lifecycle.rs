//! End-to-end tests for the reference manager against a real directory.

mod common;

use comic_refs::{
    CharacterUpdate, LocationType, LocationUpdate, RefError, Reference, ReferenceType,
    ReferenceUpdate,
};
use common::{backdate, create, edit_on_disk, jpeg, png, store, store_with, store_with_cache};
use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration;

// =============================================================================
// Creation
// =============================================================================

#[test]
fn test_create_twice_fails_with_already_exists() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");

    let err = store
        .manager
        .create_reference(
            ReferenceType::Character,
            "Hero",
            "A different hero entirely",
            ReferenceUpdate::empty(ReferenceType::Character),
        )
        .unwrap_err();
    assert!(matches!(err, RefError::AlreadyExists(_)), "got {err:?}");

    // Same name, different type is fine.
    create(&store.manager, ReferenceType::Location, "Hero");
}

#[test]
fn test_create_rejects_names_storage_would_rewrite() {
    let store = store();

    for name in ["Hero\nX", "Hero\tX", "Hero\u{2003}X"] {
        let err = store
            .manager
            .create_reference(
                ReferenceType::Character,
                name,
                "A hero with an awkward name",
                ReferenceUpdate::empty(ReferenceType::Character),
            )
            .unwrap_err();
        assert!(matches!(err, RefError::InvalidName { .. }), "got {err:?}");
    }

    let listing = store
        .manager
        .list_references(Some(ReferenceType::Character), None)
        .unwrap();
    assert!(listing[&ReferenceType::Character].is_empty());

    // The plain spelling is still free.
    create(&store.manager, ReferenceType::Character, "Hero_X");
}

#[test]
fn test_create_writes_expected_layout() {
    let store = store();
    create(&store.manager, ReferenceType::StyleGuide, "Noir");

    let base = store.manager.storage().base_path();
    assert!(base.join("styles").join("Noir.json").is_file());
    assert!(base.join("styles").join("Noir_images").is_dir());

    let text = std::fs::read_to_string(base.join("styles").join("Noir.json")).unwrap();
    let record: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(record["type"], "styleguide");
    assert_eq!(record["name"], "Noir");
    for field in ["description", "style_notes", "created_at", "updated_at", "tags"] {
        assert!(record.get(field).is_some(), "missing {field}");
    }
}

#[test]
fn test_create_with_fields() {
    let store = store();
    let fields = ReferenceUpdate::Location(LocationUpdate {
        location_type: Some(LocationType::Exterior),
        angles: Some(vec!["wide-shot".into()]),
        tags: Some(vec!["act-one".into()]),
        ..Default::default()
    });
    store
        .manager
        .create_reference(
            ReferenceType::Location,
            "Forest",
            "A dark and ancient forest",
            fields,
        )
        .unwrap();

    let forest = store
        .manager
        .get_reference(ReferenceType::Location, "Forest", false)
        .unwrap()
        .expect("forest should exist");
    let Reference::Location(forest) = forest.as_ref() else {
        panic!("expected a location");
    };
    assert_eq!(forest.location_type, Some(LocationType::Exterior));
    assert_eq!(forest.angles, vec!["wide-shot"]);
    assert_eq!(forest.header.tags, vec!["act-one"]);
}

// =============================================================================
// Cache coherence
// =============================================================================

#[test]
fn test_update_invalidates_cached_copy() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    let before = store
        .manager
        .get_reference(ReferenceType::Character, "Hero", true)
        .unwrap()
        .unwrap();
    sleep(Duration::from_millis(2));

    let update = ReferenceUpdate::from_fields(
        ReferenceType::Character,
        serde_json::json!({ "description": "Now wears a long red cape", "poses": ["flying"] }),
    )
    .unwrap();
    let updated = store
        .manager
        .update_reference(ReferenceType::Character, "Hero", update)
        .unwrap();
    assert!(updated.header().updated_at > before.header().updated_at);
    assert_eq!(updated.header().created_at, before.header().created_at);

    let after = store
        .manager
        .get_reference(ReferenceType::Character, "Hero", true)
        .unwrap()
        .unwrap();
    assert_eq!(after.header().description, "Now wears a long red cape");
    let Reference::Character(hero) = after.as_ref() else {
        panic!("expected a character");
    };
    assert_eq!(hero.poses, vec!["flying"]);
}

#[test]
fn test_delete_invalidates_cached_copy() {
    let store = store();
    create(&store.manager, ReferenceType::Object, "Sword");
    assert!(store
        .manager
        .get_reference(ReferenceType::Object, "Sword", true)
        .unwrap()
        .is_some());

    store
        .manager
        .delete_reference(ReferenceType::Object, "Sword")
        .unwrap();

    assert!(store
        .manager
        .get_reference(ReferenceType::Object, "Sword", true)
        .unwrap()
        .is_none());
    assert!(store
        .manager
        .delete_reference(ReferenceType::Object, "Sword")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_writes_through_another_spelling_invalidate_cached_copy() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    create(&store.manager, ReferenceType::Character, "Sidekick");
    for name in ["Hero", "Sidekick"] {
        store
            .manager
            .get_reference(ReferenceType::Character, name, true)
            .unwrap();
    }

    // "Hero " and " Hero" resolve to the same file as "Hero".
    let update = ReferenceUpdate::from_fields(
        ReferenceType::Character,
        serde_json::json!({ "description": "Changed description" }),
    )
    .unwrap();
    store
        .manager
        .update_reference(ReferenceType::Character, "Hero ", update)
        .unwrap();
    let hero = store
        .manager
        .get_reference(ReferenceType::Character, "Hero", true)
        .unwrap()
        .unwrap();
    assert_eq!(hero.header().description, "Changed description");

    store
        .manager
        .attach_image(ReferenceType::Character, " Hero", "front", &png(512, 512), "png")
        .unwrap();
    let hero = store
        .manager
        .get_reference(ReferenceType::Character, "Hero", true)
        .unwrap()
        .unwrap();
    assert!(hero.images().is_some_and(|images| images.contains_key("front")));

    store
        .manager
        .delete_reference(ReferenceType::Character, "Sidekick.")
        .unwrap();
    assert!(store
        .manager
        .get_reference(ReferenceType::Character, "Sidekick", true)
        .unwrap()
        .is_none());
}

#[test]
fn test_stale_entry_is_reloaded_after_ttl() {
    let store = store_with_cache(10, Duration::from_millis(100));
    create(&store.manager, ReferenceType::Character, "Hero");

    edit_on_disk(
        &store.manager,
        ReferenceType::Character,
        "Hero",
        "description",
        serde_json::json!("Edited outside the manager"),
    );

    // Still fresh: the cached copy wins.
    let cached = store
        .manager
        .get_reference(ReferenceType::Character, "Hero", true)
        .unwrap()
        .unwrap();
    assert_eq!(cached.header().description, "Reference sheet for Hero");

    sleep(Duration::from_millis(150));

    let reloaded = store
        .manager
        .get_reference(ReferenceType::Character, "Hero", true)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.header().description, "Edited outside the manager");
}

#[test]
fn test_cache_evicts_least_recently_accessed() {
    let store = store_with_cache(2, Duration::from_secs(60));
    let manager = &store.manager;

    create(manager, ReferenceType::Character, "Alpha");
    sleep(Duration::from_millis(5));
    create(manager, ReferenceType::Character, "Bravo");
    sleep(Duration::from_millis(5));

    manager
        .get_reference(ReferenceType::Character, "Alpha", true)
        .unwrap();
    sleep(Duration::from_millis(5));

    create(manager, ReferenceType::Character, "Charlie");

    let cache = manager.cache();
    assert_eq!(cache.len(), 2);
    assert!(cache.contains(ReferenceType::Character, "Alpha"));
    assert!(!cache.contains(ReferenceType::Character, "Bravo"));
    assert!(cache.contains(ReferenceType::Character, "Charlie"));

    // The evicted reference is still on disk.
    assert!(manager
        .get_reference(ReferenceType::Character, "Bravo", true)
        .unwrap()
        .is_some());
}

#[test]
fn test_corrupt_record_is_an_error_not_absent() {
    let store = store();
    let path = store
        .manager
        .storage()
        .reference_path(ReferenceType::Character, "Broken");
    std::fs::write(path, "{ \"type\": \"character\", ").unwrap();

    let err = store
        .manager
        .get_reference(ReferenceType::Character, "Broken", true)
        .unwrap_err();
    assert!(err.is_storage());
}

// =============================================================================
// Lookup
// =============================================================================

#[test]
fn test_find_in_text() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    create(&store.manager, ReferenceType::Location, "Forest");
    create(&store.manager, ReferenceType::Object, "Lantern");

    let found = store
        .manager
        .find_in_text("Hero enters the Forest at dawn", None)
        .unwrap();

    let expected = BTreeMap::from([
        (ReferenceType::Character, vec!["Hero".to_string()]),
        (ReferenceType::Location, vec!["Forest".to_string()]),
    ]);
    assert_eq!(found, expected);
}

#[test]
fn test_find_in_text_first_word_and_type_filter() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Alex the Hero");
    create(&store.manager, ReferenceType::StyleGuide, "Noir");

    let found = store
        .manager
        .find_in_text("alex draws in a noir mood", None)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[&ReferenceType::Character], vec!["Alex the Hero"]);

    let styles = store
        .manager
        .find_in_text("alex draws in a noir mood", Some([ReferenceType::StyleGuide].as_slice()))
        .unwrap();
    assert_eq!(styles[&ReferenceType::StyleGuide], vec!["Noir"]);
}

// =============================================================================
// Images
// =============================================================================

#[test]
fn test_attach_validated_images_and_fetch_in_bulk() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    create(&store.manager, ReferenceType::Location, "Forest");

    let portrait = png(512, 768);
    let filename = store
        .manager
        .attach_image(
            ReferenceType::Character,
            "Hero",
            &comic_refs::CharacterReference::image_key("standing", None, None),
            &portrait,
            "png",
        )
        .unwrap();
    assert_eq!(filename, "standing_neutral_default.png");

    let vista = jpeg(1024, 576);
    store
        .manager
        .attach_image(
            ReferenceType::Location,
            "Forest",
            &comic_refs::LocationReference::image_key("wide-shot", None, None),
            &vista,
            "jpg",
        )
        .unwrap();

    let characters = store
        .manager
        .get_character_images(&["Hero".to_string(), "Nobody".to_string()])
        .unwrap();
    assert_eq!(characters.len(), 1);
    assert_eq!(characters["Hero"]["standing_neutral_default"], portrait);

    let locations = store
        .manager
        .get_location_images(&["Forest".to_string()])
        .unwrap();
    assert_eq!(locations["Forest"]["wide-shot_natural_day"], vista);
}

#[test]
fn test_attach_rejects_tiny_image() {
    let store = store();
    create(&store.manager, ReferenceType::Object, "Sword");

    let err = store
        .manager
        .attach_image(ReferenceType::Object, "Sword", "front_new", &png(64, 64), "png")
        .unwrap_err();
    assert!(matches!(err, RefError::Validation(_)));

    let sword = store
        .manager
        .get_reference(ReferenceType::Object, "Sword", false)
        .unwrap()
        .unwrap();
    assert!(sword.images().unwrap().is_empty());
}

#[test]
fn test_attach_skips_validation_when_disabled() {
    let store = store_with(|config| config.with_validate_images(false));
    create(&store.manager, ReferenceType::Object, "Sword");

    store
        .manager
        .attach_image(ReferenceType::Object, "Sword", "front_new", &png(64, 64), "png")
        .unwrap();
}

#[test]
fn test_delete_removes_images() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    store
        .manager
        .attach_image(ReferenceType::Character, "Hero", "sitting", &png(300, 300), "png")
        .unwrap();
    let image_dir = store
        .manager
        .storage()
        .image_dir(ReferenceType::Character, "Hero");
    assert!(image_dir.join("sitting.png").is_file());

    store
        .manager
        .delete_reference(ReferenceType::Character, "Hero")
        .unwrap();
    assert!(!image_dir.exists());
}

// =============================================================================
// Cleanup
// =============================================================================

#[test]
fn test_cleanup_unused_removes_only_old_references() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Veteran");
    create(&store.manager, ReferenceType::Character, "Rookie");
    backdate(&store.manager, ReferenceType::Character, "Veteran", 40);
    backdate(&store.manager, ReferenceType::Character, "Rookie", 10);

    // Make sure the cache is not what decides.
    store
        .manager
        .get_reference(ReferenceType::Character, "Veteran", true)
        .unwrap();

    let report = store.manager.cleanup_unused(30).unwrap();
    assert_eq!(
        report.removed,
        vec![(ReferenceType::Character, "Veteran".to_string())]
    );
    assert!(report.failures.is_empty());

    assert!(store
        .manager
        .get_reference(ReferenceType::Character, "Veteran", true)
        .unwrap()
        .is_none());
    assert!(store
        .manager
        .get_reference(ReferenceType::Character, "Rookie", true)
        .unwrap()
        .is_some());
}

#[test]
fn test_cleanup_unused_records_unreadable_and_continues() {
    let store = store();
    create(&store.manager, ReferenceType::Object, "Relic");
    backdate(&store.manager, ReferenceType::Object, "Relic", 90);
    let broken = store
        .manager
        .storage()
        .reference_path(ReferenceType::Object, "Broken");
    std::fs::write(&broken, "not json").unwrap();

    let report = store.manager.cleanup_unused(30).unwrap();
    assert_eq!(report.removed, vec![(ReferenceType::Object, "Relic".to_string())]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].1, "Broken");
    assert!(broken.exists());
}

#[test]
fn test_orphaned_image_directories_are_removed() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    create(&store.manager, ReferenceType::Character, "Ghost");
    store
        .manager
        .attach_image(ReferenceType::Character, "Ghost", "floating", &png(300, 300), "png")
        .unwrap();

    let storage = store.manager.storage();
    std::fs::remove_file(storage.reference_path(ReferenceType::Character, "Ghost")).unwrap();

    let report = store.manager.cleanup_orphaned_images();
    assert_eq!(report.removed, vec![storage.image_dir(ReferenceType::Character, "Ghost")]);
    assert!(report.failures.is_empty());
    assert!(storage.image_dir(ReferenceType::Character, "Hero").is_dir());
}

// =============================================================================
// Statistics and validation
// =============================================================================

#[test]
fn test_statistics_and_report() {
    let store = store();
    create(&store.manager, ReferenceType::Character, "Hero");
    create(&store.manager, ReferenceType::Location, "Forest");
    store
        .manager
        .attach_image(ReferenceType::Character, "Hero", "standing", &png(512, 512), "png")
        .unwrap();

    let stats = store.manager.statistics().unwrap();
    assert_eq!(stats.total_references, 2);
    assert_eq!(stats.storage.total_images, 1);
    assert!(stats.storage.storage_bytes > 0);

    let report = store.manager.validation_report(false).unwrap();
    let summary = report.summary();
    assert!(summary.is_valid);
    assert_eq!(summary.references.total, 2);
    assert_eq!(summary.images.total, 1);
    assert_eq!(summary.images.valid, 1);

    let update = ReferenceUpdate::Character(CharacterUpdate {
        tags: Some(vec!["main".into()]),
        ..Default::default()
    });
    store
        .manager
        .update_reference(ReferenceType::Character, "Hero", update)
        .unwrap();
    assert!(store.manager.validate_all_references().unwrap().is_empty());
}
