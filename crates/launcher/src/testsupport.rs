//! Scripted cluster client for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use gantry_core::id::ApplicationId;
use parking_lot::Mutex;

use crate::client::{ApplicationReport, ClusterClient, ClusterError};
use crate::spec::SubmissionSpec;

/// A [`ClusterClient`] driven by scripted responses, recording every
/// call it receives.
#[derive(Default)]
pub struct MockCluster {
    /// Responses for `submit_application`, consumed in order.
    pub submit_results: Mutex<Vec<Result<ApplicationId, ClusterError>>>,
    /// Response per handle for `report`.
    pub reports: Mutex<HashMap<ApplicationId, Result<ApplicationReport, ClusterError>>>,
    /// Every submitted spec, in order.
    pub submitted: Mutex<Vec<SubmissionSpec>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_submit(&self, result: Result<ApplicationId, ClusterError>) {
        self.submit_results.lock().push(result);
    }

    pub fn script_report(&self, id: ApplicationId, result: Result<ApplicationReport, ClusterError>) {
        self.reports.lock().insert(id, result);
    }
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn submit_application(
        &self,
        spec: &SubmissionSpec,
    ) -> Result<ApplicationId, ClusterError> {
        self.submitted.lock().push(spec.clone());
        let mut results = self.submit_results.lock();
        if results.is_empty() {
            return Err(ClusterError::Io("no scripted submit result".to_owned()));
        }
        results.remove(0)
    }

    async fn report(&self, id: ApplicationId) -> Result<ApplicationReport, ClusterError> {
        self.reports
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or(Err(ClusterError::NotFound(id)))
    }

    async fn kill_application(&self, _id: ApplicationId) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn applications_by_tag(&self, _tag: &str) -> Result<Vec<ApplicationId>, ClusterError> {
        Ok(Vec::new())
    }
}

/// A report for a running application.
pub fn running_report() -> ApplicationReport {
    ApplicationReport {
        state: crate::client::AppState::Running,
        final_status: crate::client::FinalStatus::Undefined,
        tracking_url: Some("http://cluster.test/app".to_owned()),
        diagnostics: None,
    }
}

/// A terminal report with the given final status.
pub fn finished_report(final_status: crate::client::FinalStatus) -> ApplicationReport {
    ApplicationReport {
        state: crate::client::AppState::Finished,
        final_status,
        tracking_url: Some("http://cluster.test/app".to_owned()),
        diagnostics: None,
    }
}
