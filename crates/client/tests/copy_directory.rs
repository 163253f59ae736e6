//! Integration tests for the directory copy orchestrator.
//!
//! Properties covered:
//! - Concurrency stays under the configured ceiling (and defaults to
//!   sequential)
//! - Default failure policy aborts on the first failed object with a
//!   single-object error
//! - continue_on_error attempts everything and names the failed references
//! - Predicate-filtered objects are skipped, not failed
//! - A mapper target renames objects on copy
//! - The progress callback can cancel the run

mod support;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rusty_object_storage_client::{
    CopyOptions, CopyProgress, CopyTarget, ObjectDirectory, ObjectReference, ObjectStorage,
    ProgressCallback, StorageError,
};
use support::MemoryStorageClient;

fn source_directory() -> ObjectDirectory {
    ObjectDirectory::new("bucket", Some("source".to_string())).unwrap()
}

fn target_directory() -> ObjectDirectory {
    ObjectDirectory::new("bucket", Some("target".to_string())).unwrap()
}

/// Seed `count` objects named obj-01..obj-NN under source/.
fn seed_objects(client: &MemoryStorageClient, count: usize) -> Vec<ObjectReference> {
    let directory: ObjectDirectory = source_directory();
    (1..=count)
        .map(|i| {
            let reference: ObjectReference =
                directory.object(format!("obj-{:02}", i)).unwrap();
            client.seed(&reference, format!("payload {}", i).as_bytes());
            reference
        })
        .collect()
}

#[tokio::test]
async fn test_copy_respects_concurrency_ceiling() {
    let client = Arc::new(MemoryStorageClient::new().with_copy_delay_ms(10));
    seed_objects(&client, 12);
    let storage = ObjectStorage::new(client.clone());

    let stats = storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::new().with_max_concurrency(3),
        )
        .await
        .unwrap();

    assert_eq!(stats.objects_copied, 12);
    let high_water: u64 = client.max_in_flight_copies.load(Ordering::SeqCst);
    assert!(high_water <= 3, "ceiling exceeded: {} in flight", high_water);
    assert!(high_water >= 2, "copies never actually overlapped");
}

#[tokio::test]
async fn test_copy_defaults_to_sequential() {
    let client = Arc::new(MemoryStorageClient::new().with_copy_delay_ms(2));
    seed_objects(&client, 6);
    let storage = ObjectStorage::new(client.clone());

    storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(client.max_in_flight_copies.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_continue_on_error_names_failed_references() {
    let client = Arc::new(MemoryStorageClient::new());
    let references: Vec<ObjectReference> = seed_objects(&client, 5);
    client.fail_copy_for(&references[2]);
    let storage = ObjectStorage::new(client.clone());

    let result = storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::new().with_continue_on_error(true),
        )
        .await;

    let Err(StorageError::PartialFailure { failures }) = result else {
        panic!("expected an aggregate partial-failure error");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].reference, references[2]);

    // Every other object made it across.
    let target: ObjectDirectory = target_directory();
    for (index, reference) in references.iter().enumerate() {
        let copied: ObjectReference = target.object(reference.object_name()).unwrap();
        assert_eq!(client.object_data(&copied).is_some(), index != 2);
    }
}

#[tokio::test]
async fn test_default_policy_aborts_on_first_failure() {
    let client = Arc::new(MemoryStorageClient::new());
    let references: Vec<ObjectReference> = seed_objects(&client, 5);
    client.fail_copy_for(&references[2]);
    let storage = ObjectStorage::new(client.clone());

    let result = storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::default(),
        )
        .await;

    // Single-object error, not an aggregate.
    let Err(error) = result else {
        panic!("expected the copy to fail");
    };
    assert!(matches!(error, StorageError::NetworkError { .. }));

    // Sequential run: the two objects before the failure were copied, and
    // nothing after the failure was scheduled.
    assert_eq!(client.copy_calls.load(Ordering::SeqCst), 3);
    let target: ObjectDirectory = target_directory();
    let copied: usize = references
        .iter()
        .filter(|reference| {
            let target_ref: ObjectReference = target.object(reference.object_name()).unwrap();
            client.object_data(&target_ref).is_some()
        })
        .count();
    assert_eq!(copied, 2);
}

#[tokio::test]
async fn test_predicate_skips_without_failing() {
    let client = Arc::new(MemoryStorageClient::new());
    seed_objects(&client, 4);
    let storage = ObjectStorage::new(client.clone());

    let stats = storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            Some(&|reference: &ObjectReference| !reference.object_name().ends_with("2")),
            CopyOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(stats.objects_listed, 4);
    assert_eq!(stats.objects_copied, 3);
    assert_eq!(stats.objects_skipped, 1);
    assert_eq!(client.copy_calls.load(Ordering::SeqCst), 3);

    let skipped: ObjectReference = target_directory().object("obj-02").unwrap();
    assert!(client.object_data(&skipped).is_none());
}

#[tokio::test]
async fn test_mapper_renames_on_copy() {
    let client = Arc::new(MemoryStorageClient::new());
    seed_objects(&client, 2);
    let storage = ObjectStorage::new(client.clone());

    let target = CopyTarget::Mapper(Box::new(|reference: &ObjectReference| {
        ObjectReference::new(
            reference.base_directory(),
            Some("renamed".to_string()),
            format!("{}.bak", reference.object_name()),
        )
        .unwrap()
    }));

    let stats = storage
        .copy_directory(&source_directory(), &target, None, CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(stats.objects_copied, 2);

    let renamed =
        ObjectReference::new("bucket", Some("renamed".to_string()), "obj-01.bak").unwrap();
    assert_eq!(
        client.object_data(&renamed).as_deref(),
        Some(b"payload 1".as_slice())
    );
}

#[tokio::test]
async fn test_copy_walks_every_listing_page() {
    let client = Arc::new(MemoryStorageClient::new());
    seed_objects(&client, 5);
    let storage = ObjectStorage::new(client.clone());

    let stats = storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::new().with_max_page_size(2),
        )
        .await
        .unwrap();

    assert_eq!(stats.objects_copied, 5);
    assert_eq!(client.list_calls.load(Ordering::SeqCst), 3);
}

struct CancelAfter {
    seen: AtomicU64,
    limit: u64,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, _progress: &CopyProgress) -> bool {
        self.seen.fetch_add(1, Ordering::SeqCst) < self.limit
    }
}

#[tokio::test]
async fn test_progress_callback_cancels_run() {
    let client = Arc::new(MemoryStorageClient::new());
    seed_objects(&client, 6);
    let storage = ObjectStorage::new(client.clone());

    let progress = CancelAfter {
        seen: AtomicU64::new(0),
        limit: 2,
    };
    let result = storage
        .copy_directory_with_progress(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::default(),
            &progress,
        )
        .await;

    assert!(matches!(result, Err(StorageError::Cancelled)));
    // The two copies scheduled before cancellation ran to completion.
    assert_eq!(client.copy_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_copy_of_empty_directory_succeeds() {
    let client = Arc::new(MemoryStorageClient::new());
    let storage = ObjectStorage::new(client.clone());

    let stats = storage
        .copy_directory(
            &source_directory(),
            &CopyTarget::Directory(target_directory()),
            None,
            CopyOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(stats.objects_listed, 0);
    assert_eq!(stats.objects_copied, 0);
    assert_eq!(client.copy_calls.load(Ordering::SeqCst), 0);
}
