use guardcore::model::DashboardSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// Snapshot shared between the refresh tasks and the HTTP routes.
pub type SharedSnapshot = Arc<RwLock<DashboardSnapshot>>;

pub fn read_snapshot(shared: &SharedSnapshot) -> DashboardSnapshot {
    shared
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn update_snapshot<F>(shared: &SharedSnapshot, apply: F)
where
    F: FnOnce(&mut DashboardSnapshot),
{
    let mut guard = shared.write().unwrap_or_else(PoisonError::into_inner);
    apply(&mut guard);
}

/// Body of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
