//! Bounded pool running gathering passes for many subjects.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use super::invoker::Subject;
use super::service::{ExtensionService, PluginReport};

/// Results of one subject's passes.
#[derive(Debug)]
pub struct SubjectReport {
    pub subject: Subject,
    pub plugins: Vec<PluginReport>,
}

/// Runs [`ExtensionService::update_player`] for many subjects with at
/// most `workers` passes in flight.
#[derive(Debug, Clone)]
pub struct GatherPool {
    service: Arc<ExtensionService>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl GatherPool {
    /// Create a pool. A worker count of zero is raised to one.
    pub fn new(service: Arc<ExtensionService>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            service,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn service(&self) -> &Arc<ExtensionService> {
        &self.service
    }

    /// Gather every subject, one pass per subject.
    ///
    /// Reports come back in input order. A subject whose task failed is
    /// logged and left out.
    pub async fn update_players(&self, subjects: Vec<Subject>) -> Vec<SubjectReport> {
        let mut tasks = JoinSet::new();
        for (index, subject) in subjects.into_iter().enumerate() {
            let service = Arc::clone(&self.service);
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let plugins = service.update_player(&subject).await;
                (index, SubjectReport { subject, plugins })
            });
        }

        let mut reports = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "gathering task failed"),
            }
        }
        reports.sort_by_key(|(index, _)| *index);

        debug!(subjects = reports.len(), workers = self.workers, "gathering batch complete");
        reports.into_iter().map(|(_, report)| report).collect()
    }
}
