//! Per-credential budget sharing.

use super::{RateBudget, RequestPacer};
use crate::config::AppSettings;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

/// Hands out one [`RateBudget`] per credential.
///
/// Every scan started with the same token, in any category, gates on the
/// same quota. Tokens are keyed by hash and never stored.
#[derive(Debug)]
pub struct BudgetRegistry {
    floor: u32,
    rate: u32,
    budgets: Mutex<HashMap<u64, Arc<RateBudget>>>,
}

impl BudgetRegistry {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            floor: settings.quota_floor,
            rate: settings.max_requests_per_second,
            budgets: Mutex::new(HashMap::new()),
        }
    }

    /// Budget for `token`, created on first use.
    pub fn for_token(&self, token: &str) -> Arc<RateBudget> {
        let mut budgets = self.budgets.lock().unwrap_or_else(PoisonError::into_inner);
        let (floor, rate) = (self.floor, self.rate);
        Arc::clone(
            budgets
                .entry(token_key(token))
                .or_insert_with(|| Arc::new(RateBudget::new(floor).with_pacer(RequestPacer::new(rate)))),
        )
    }

    pub fn len(&self) -> usize {
        self.budgets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn token_key(token: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}
