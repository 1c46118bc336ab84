use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::errors::PlanError;
use crate::plan::PlanDocument;
use crate::variables::{CacheKey, VariableSet};

pub type PlanResult = Result<Arc<PlanDocument>, PlanError>;

/// Plan results memoized by variable set, shared by every test of a run.
///
/// Single flight: for a given key only the first caller computes, concurrent callers block on the same
/// cell and get the same result, failures included. Distinct keys compute in parallel since the map lock
/// is only held to fetch the cell.
#[derive(Default)]
pub struct PlanCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<PlanResult>>>>,
    computations: AtomicUsize,
}

impl PlanCache {
    pub fn new() -> PlanCache {
        PlanCache::default()
    }

    fn cell(&self, key: &CacheKey) -> Arc<OnceCell<PlanResult>> {
        // a poisoned map is still consistent: cells are inserted whole
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.entry(key.clone()).or_default().clone()
    }

    pub fn get_or_compute<F>(&self, variables: &VariableSet, compute: F) -> PlanResult
    where
        F: FnOnce(&VariableSet) -> Result<PlanDocument, PlanError>,
    {
        let key = variables.cache_key();
        let cell = self.cell(&key);

        if let Some(result) = cell.get() {
            debug!("plan cache hit for variables {}", key);
            return result.clone();
        }

        cell.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::SeqCst);
            info!("computing plan for variables {}", key);
            let result = compute(variables).map(Arc::new);
            if let Err(err) = &result {
                error!("plan for variables {} failed: {}", key, err);
            }
            result
        })
        .clone()
    }

    /// Cached result for `variables`, without computing anything.
    pub fn get(&self, variables: &VariableSet) -> Option<PlanResult> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(&variables.cache_key()).and_then(|cell| cell.get().cloned())
    }

    /// Number of distinct keys requested so far.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times a compute function actually ran.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }
}
