// Single-flight registry
// At most one humanization in flight per report when enabled

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct InFlightReports {
    active: Mutex<HashSet<String>>,
}

impl InFlightReports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `report_id`. Returns `None` when another request holds it.
    /// The claim is released when the guard drops, including on cancellation.
    pub fn try_claim(self: &Arc<Self>, report_id: &str) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(report_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            registry: Arc::clone(self),
            report_id: report_id.to_string(),
        })
    }

    pub fn is_active(&self, report_id: &str) -> bool {
        self.active
            .lock()
            .map(|a| a.contains(report_id))
            .unwrap_or(false)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlightReports>,
    report_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut active = self.registry.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.report_id);
    }
}
