//! Patch execution
//!
//! A batched patch is a scatter of independent single-document patches over
//! the rayon pool. Each key gets its own all-or-nothing attempt; one key's
//! failure is recorded for that key and never aborts the others.

use crate::index::MapIndex;
use linkdb_core::{DocKey, Error, Result, Scalar};
use linkdb_script::{Bindings, BoundScript, Script};
use linkdb_storage::{DocumentStore, PatchStatus};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Outcome of a patch-by-index request.
#[derive(Debug)]
pub struct BatchPatchResult {
    /// Index the keys were resolved through
    pub index: String,
    /// Value looked up
    pub query: Scalar,
    /// Number of keys the index returned
    pub matched: usize,
    /// Per-key outcome, sorted by key
    pub results: Vec<(DocKey, Result<PatchStatus>)>,
}

impl BatchPatchResult {
    /// Documents that were changed and committed.
    pub fn patched(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(s) if s.is_patched()))
            .count()
    }

    /// Keys whose patch failed.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count()
    }

    /// Failures with their keys.
    pub fn errors(&self) -> impl Iterator<Item = (&DocKey, &Error)> {
        self.results
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k, e)))
    }

    /// True when no key failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Runs patch scripts against the document store.
#[derive(Debug, Clone, Copy)]
pub struct PatchExecutor<'a> {
    store: &'a DocumentStore,
}

impl<'a> PatchExecutor<'a> {
    /// Executor over `store`.
    pub fn new(store: &'a DocumentStore) -> Self {
        PatchExecutor { store }
    }

    /// Patch one document. A missing key is `DocumentDoesNotExist`, not an
    /// error.
    pub fn patch_by_key(
        &self,
        key: &DocKey,
        script: &Script,
        bindings: &Bindings,
    ) -> Result<PatchStatus> {
        self.store.apply_patch(key, script, bindings)
    }

    /// Resolve `value` through `index` and patch every key it returns.
    ///
    /// The caller has already bound the script and waited for whatever
    /// freshness it needs.
    pub fn patch_resolved(
        &self,
        index: &MapIndex,
        value: &Scalar,
        script: &BoundScript,
    ) -> BatchPatchResult {
        let keys = index.query(value);
        debug!(
            index = index.name(),
            query = %value,
            matched = keys.len(),
            "patching by index"
        );
        let results = self.patch_keys(&keys, script);
        BatchPatchResult {
            index: index.name().to_string(),
            query: value.clone(),
            matched: keys.len(),
            results,
        }
    }

    /// Patch each key independently and concurrently.
    pub fn patch_keys(
        &self,
        keys: &[DocKey],
        script: &BoundScript,
    ) -> Vec<(DocKey, Result<PatchStatus>)> {
        keys.par_iter()
            .map(|key| {
                let outcome = self.store.apply_bound(key, script);
                if let Err(e) = &outcome {
                    warn!(key = %key, error = %e, "patch failed for document");
                }
                (key.clone(), outcome)
            })
            .collect()
    }
}
