//! Integration tests for key record storage.

use std::sync::Arc;
use std::thread;

use compvault::errors::CompVaultError;
use compvault::record::{
    FileKeyRecordStore, KeyRecord, KeyRecordPatch, KeyRecordStore, MemoryKeyRecordStore,
};
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> FileKeyRecordStore {
    FileKeyRecordStore::privileged(&dir.path().join("keys"), "compensation").unwrap()
}

#[test]
fn empty_store_has_no_record() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    assert!(store.get().unwrap().is_none());
    assert!(!store.path().exists());
}

#[test]
fn put_then_get_returns_same_record() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let record = KeyRecord::new("user-copy".into(), "recovery-copy".into());

    store.put(&record).unwrap();

    let loaded = store.get().unwrap().expect("record present");
    assert_eq!(loaded, record);
    assert_eq!(loaded.user_wrapped(), Some("user-copy"));
    assert_eq!(loaded.recovery_wrapped(), Some("recovery-copy"));
}

#[test]
fn record_file_is_named_after_domain_and_uses_camel_case() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store
        .put(&KeyRecord::new("u".into(), "r".into()))
        .unwrap();

    let path = dir.path().join("keys").join("compensation.keyrecord.json");
    assert_eq!(store.path(), path.as_path());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["userWrapped"], "u");
    assert_eq!(json["recoveryWrapped"], "r");
    assert!(json.get("createdAt").is_some());
    assert!(json.get("updatedAt").is_some());
}

#[test]
fn patch_replaces_user_copy_only() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let original = KeyRecord::new("old-user".into(), "recovery".into());
    store.put(&original).unwrap();

    let patched = store
        .patch(KeyRecordPatch::user_wrapped("new-user".into()))
        .unwrap();

    assert_eq!(patched.user_wrapped(), Some("new-user"));
    assert_eq!(patched.recovery_wrapped(), Some("recovery"));
    assert_eq!(patched.created_at, original.created_at);
    assert!(patched.updated_at >= original.updated_at);
    assert_eq!(store.get().unwrap().unwrap(), patched);
}

#[test]
fn patch_without_record_is_not_setup() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    let result = store.patch(KeyRecordPatch::user_wrapped("x".into()));
    assert!(matches!(result, Err(CompVaultError::NotSetup)));
}

#[test]
fn writes_leave_no_temp_files_behind() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.put(&KeyRecord::new("u".into(), "r".into())).unwrap();
    store
        .patch(KeyRecordPatch::user_wrapped("u2".into()))
        .unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join("keys"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["compensation.keyrecord.json".to_string()]);
}

#[test]
fn unreadable_document_is_a_store_error() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    std::fs::create_dir_all(dir.path().join("keys")).unwrap();
    std::fs::write(store.path(), b"{ not json").unwrap();

    let err = store.get().unwrap_err();
    assert!(matches!(err, CompVaultError::Store(_)));
    assert!(err.is_retryable());
}

#[test]
fn stores_are_isolated_per_domain() {
    let dir = TempDir::new().unwrap();
    let comp = FileKeyRecordStore::privileged(dir.path(), "compensation").unwrap();
    let payroll = FileKeyRecordStore::privileged(dir.path(), "payroll").unwrap();

    comp.put(&KeyRecord::new("u".into(), "r".into())).unwrap();

    assert!(comp.get().unwrap().is_some());
    assert!(payroll.get().unwrap().is_none());
}

#[test]
fn invalid_domain_names_are_refused() {
    let dir = TempDir::new().unwrap();
    for bad in ["", "../etc", "Payroll", "-comp", "comp-", "a b"] {
        assert!(
            matches!(
                FileKeyRecordStore::privileged(dir.path(), bad),
                Err(CompVaultError::Configuration(_))
            ),
            "domain {bad:?} should be refused"
        );
    }
}

#[cfg(unix)]
#[test]
fn record_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.put(&KeyRecord::new("u".into(), "r".into())).unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    store
        .patch(KeyRecordPatch::user_wrapped("u2".into()))
        .unwrap();
    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn concurrent_patches_never_lose_the_recovery_copy() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(file_store(&dir));
    store
        .put(&KeyRecord::new("u0".into(), "recovery".into()))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .patch(KeyRecordPatch::user_wrapped(format!("u{i}")))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.get().unwrap().unwrap();
    assert_eq!(record.recovery_wrapped(), Some("recovery"));
    assert!(record.user_wrapped().unwrap().starts_with('u'));
}

#[test]
fn concurrent_puts_through_separate_stores_all_succeed() {
    let dir = TempDir::new().unwrap();
    let keys = dir.path().join("keys");

    for round in 0..20 {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let keys = keys.clone();
                thread::spawn(move || {
                    let store = FileKeyRecordStore::privileged(&keys, "compensation").unwrap();
                    store.put(&KeyRecord::new(
                        format!("u{round}-{i}"),
                        format!("r{round}-{i}"),
                    ))
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    }

    let store = FileKeyRecordStore::privileged(&keys, "compensation").unwrap();
    let record = store.get().unwrap().unwrap();
    let user = record.user_wrapped().unwrap().trim_start_matches('u');
    let recovery = record.recovery_wrapped().unwrap().trim_start_matches('r');
    assert_eq!(user, recovery, "published record mixes two writers");

    let names: Vec<String> = std::fs::read_dir(&keys)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["compensation.keyrecord.json".to_string()]);
}

#[test]
fn memory_store_behaves_like_file_store() {
    let store = MemoryKeyRecordStore::new("compensation").unwrap();
    assert!(store.get().unwrap().is_none());
    assert!(matches!(
        store.patch(KeyRecordPatch::user_wrapped("x".into())),
        Err(CompVaultError::NotSetup)
    ));

    store.put(&KeyRecord::new("u".into(), "r".into())).unwrap();
    let patched = store
        .patch(KeyRecordPatch::user_wrapped("u2".into()))
        .unwrap();
    assert_eq!(patched.user_wrapped(), Some("u2"));
    assert_eq!(patched.recovery_wrapped(), Some("r"));
}
