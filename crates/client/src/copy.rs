//! Directory copy orchestration.
//!
//! Walks a source directory page by page, maps each object to a target
//! reference, and fans the per-object copy calls out under a fixed
//! concurrency ceiling. Failure policy is configurable:
//!
//! - Default: the first failed copy aborts the run. Copies already in
//!   flight finish (they are not cancelled), no new copies are scheduled,
//!   and the first error is returned once the pool settles.
//! - `continue_on_error`: every eligible object is attempted and failures
//!   are aggregated as (reference, error) pairs.
//!
//! No ordering is guaranteed between concurrently copied objects, and there
//! is no resumability: a partially completed run leaves no checkpoint.

use std::collections::VecDeque;

use futures::stream::{FuturesUnordered, StreamExt};
use log::warn;

use rusty_object_storage_common::{ObjectDirectory, ObjectReference};

use crate::error::{StorageError, TransferError};
use crate::list;
use crate::traits::{CopyProgress, ProgressCallback, StorageClient};
use crate::types::{CopyOptions, CopyStatistics};

/// Where copied objects land.
pub enum CopyTarget {
    /// A fixed target directory; object names are preserved.
    Directory(ObjectDirectory),
    /// A mapper computing each target reference from its source reference,
    /// allowing rename or relocation on copy.
    Mapper(Box<dyn Fn(&ObjectReference) -> ObjectReference + Send + Sync>),
}

impl CopyTarget {
    fn target_for(&self, source: &ObjectReference) -> Result<ObjectReference, StorageError> {
        match self {
            CopyTarget::Directory(directory) => Ok(directory.object(source.object_name())?),
            CopyTarget::Mapper(mapper) => Ok(mapper(source)),
        }
    }
}

/// Filter deciding which enumerated objects get copied.
/// Returning false skips the object; a skip is not a failure.
pub type CopyPredicate = dyn Fn(&ObjectReference) -> bool + Send + Sync;

/// High-level directory copy over any [`StorageClient`] implementation.
pub struct CopyOrchestrator<'a, C: StorageClient + ?Sized> {
    /// The storage client whose copy primitive is fanned out.
    client: &'a C,
    /// Copy options.
    options: CopyOptions,
    /// Optional progress callback; returning false cancels the run.
    progress: Option<&'a dyn ProgressCallback>,
}

impl<'a, C: StorageClient + ?Sized> CopyOrchestrator<'a, C> {
    /// Create a new copy orchestrator.
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            options: CopyOptions::default(),
            progress: None,
        }
    }

    /// Set copy options.
    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    /// Set a progress callback.
    pub fn with_progress(mut self, progress: &'a dyn ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Copy every object under `source` to the target.
    ///
    /// # Arguments
    /// * `source` - Directory to enumerate
    /// * `target` - Fixed directory or per-object mapper
    /// * `predicate` - Optional filter; objects it rejects are skipped
    ///
    /// # Returns
    /// Statistics of the completed run.
    ///
    /// # Errors
    /// The first object error under the default policy;
    /// [`StorageError::PartialFailure`] naming every failed reference under
    /// `continue_on_error`; [`StorageError::Cancelled`] when the progress
    /// callback cancelled the run.
    pub async fn copy_directory(
        &self,
        source: &ObjectDirectory,
        target: &CopyTarget,
        predicate: Option<&CopyPredicate>,
    ) -> Result<CopyStatistics, StorageError> {
        enum Event {
            Page(Option<Result<Vec<ObjectReference>, StorageError>>),
            Completion(Option<(ObjectReference, Result<(), StorageError>)>),
        }

        let ceiling: usize = self.options.max_concurrency.max(1);
        let max_page_size: usize = self.options.max_page_size;
        let client: &C = self.client;

        let pages = list::pages(move |continuation: Option<String>| async move {
            client
                .list_page(source, continuation.as_deref(), max_page_size)
                .await
        });
        futures::pin_mut!(pages);

        let mut in_flight = FuturesUnordered::new();
        let mut pending: VecDeque<ObjectReference> = VecDeque::new();
        let mut stats = CopyStatistics::default();
        let mut failures: Vec<TransferError> = Vec::new();
        let mut failed_count: u64 = 0;
        let mut first_error: Option<StorageError> = None;
        let mut listing_error: Option<StorageError> = None;
        let mut listing_done = false;
        let mut cancelled = false;

        loop {
            let mut aborting: bool = cancelled || first_error.is_some();

            // Top up the pool from already-listed references.
            while !aborting && in_flight.len() < ceiling {
                let Some(source_ref) = pending.pop_front() else {
                    break;
                };

                if let Some(predicate) = predicate {
                    if !predicate(&source_ref) {
                        stats.objects_skipped += 1;
                        continue;
                    }
                }

                if !self.report_progress(&stats, failed_count) {
                    cancelled = true;
                    aborting = true;
                    break;
                }

                let target_ref: ObjectReference = match target.target_for(&source_ref) {
                    Ok(target_ref) => target_ref,
                    Err(error) => {
                        failed_count += 1;
                        if self.options.continue_on_error {
                            failures.push(TransferError::new(source_ref, error));
                            continue;
                        }
                        first_error = Some(error);
                        aborting = true;
                        break;
                    }
                };

                in_flight.push(async move {
                    let result: Result<(), StorageError> =
                        client.copy_object(&source_ref, &target_ref).await;
                    (source_ref, result)
                });
            }

            let want_page: bool =
                pending.is_empty() && !listing_done && listing_error.is_none() && !aborting;

            if in_flight.is_empty() && !want_page {
                break;
            }

            // In-flight copies keep being driven while the next page is
            // fetched; neither starves the other.
            let event: Event = if want_page && !in_flight.is_empty() {
                tokio::select! {
                    page = pages.next() => Event::Page(page),
                    completion = in_flight.next() => Event::Completion(completion),
                }
            } else if want_page {
                Event::Page(pages.next().await)
            } else {
                Event::Completion(in_flight.next().await)
            };

            match event {
                Event::Page(Some(Ok(references))) => {
                    stats.objects_listed += references.len() as u64;
                    pending.extend(references);
                }
                Event::Page(Some(Err(error))) => {
                    listing_error = Some(error);
                }
                Event::Page(None) => {
                    listing_done = true;
                }
                Event::Completion(Some((reference, result))) => match result {
                    Ok(()) => stats.objects_copied += 1,
                    Err(error) => {
                        failed_count += 1;
                        if self.options.continue_on_error {
                            warn!("Copy failed for {}: {}", reference, error);
                            failures.push(TransferError::new(reference, error));
                        } else if first_error.is_none() {
                            first_error = Some(error);
                        }
                    }
                },
                Event::Completion(None) => {}
            }
        }

        if cancelled {
            return Err(StorageError::Cancelled);
        }
        if let Some(error) = first_error {
            return Err(error);
        }
        if let Some(error) = listing_error {
            return Err(error);
        }
        if !failures.is_empty() {
            return Err(StorageError::PartialFailure { failures });
        }
        Ok(stats)
    }

    fn report_progress(&self, stats: &CopyStatistics, failed: u64) -> bool {
        match self.progress {
            Some(callback) => callback.on_progress(&CopyProgress {
                objects_listed: stats.objects_listed,
                objects_copied: stats.objects_copied,
                objects_skipped: stats.objects_skipped,
                objects_failed: failed,
            }),
            None => true,
        }
    }
}
