use crate::model::WorkerTaskSpec;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::future::Future;
use tracing::{info, warn};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// Opaque identifier handed out by the orchestrator once a worker is running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(transparent)]
pub struct TaskId(pub String);

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub network: String,
    pub task: WorkerTaskSpec,
}

/// Starts one indexing worker per request.
pub trait TaskSink: Send + Sync {
    fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> impl Future<Output = anyhow::Result<TaskId>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct StartedTask {
    pub task_id: TaskId,
    pub task: WorkerTaskSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct FailedTask {
    pub task: WorkerTaskSpec,
    pub error: String,
}

/// Outcome of handing a plan to a [`TaskSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct DispatchReport {
    pub started: Vec<StartedTask>,
    pub failed: Vec<FailedTask>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Hands every task to `sink`, one after another.
///
/// A failed task does not stop the remaining ones and is not retried; it is reported back.
pub async fn dispatch_all<S: TaskSink>(
    sink: &S,
    network: &str,
    tasks: Vec<WorkerTaskSpec>,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    for task in tasks {
        let request = DispatchRequest {
            network: network.to_owned(),
            task: task.clone(),
        };
        match sink.dispatch(request).await {
            Ok(task_id) => {
                info!(network, %task_id, from = task.from, to = task.to, "Worker task started");
                report.started.push(StartedTask { task_id, task });
            }
            Err(err) => {
                warn!(network, from = task.from, to = task.to, %err, "Worker task failed to start");
                report.failed.push(FailedTask {
                    task,
                    error: format!("{err:#}"),
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;
    use anyhow::bail;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        requests: Mutex<Vec<DispatchRequest>>,
        reject_from: Option<u64>,
    }

    impl TaskSink for RecordingSink {
        async fn dispatch(&self, request: DispatchRequest) -> anyhow::Result<TaskId> {
            if Some(request.task.from) == self.reject_from {
                bail!("capacity exceeded");
            }
            let mut requests = self.requests.lock();
            requests.push(request);
            Ok(TaskId(format!("task-{}", requests.len())))
        }
    }

    #[tokio::test]
    async fn every_task_dispatched() {
        let sink = RecordingSink::default();
        let report = dispatch_all(&sink, "sepolia", plan(0, 10, 3).unwrap()).await;
        assert!(report.is_complete());
        assert_eq!(report.started.len(), 3);
        assert_eq!(report.started[2].task_id, TaskId("task-3".into()));
        let requests = sink.requests.lock();
        assert!(requests.iter().all(|request| request.network == "sepolia"));
        assert_eq!(requests[1].task.from, 4);
    }

    #[tokio::test]
    async fn partial_failure_is_reported() {
        let sink = RecordingSink {
            reject_from: Some(4),
            ..Default::default()
        };
        let report = dispatch_all(&sink, "sepolia", plan(0, 10, 3).unwrap()).await;
        assert!(!report.is_complete());
        assert_eq!(report.started.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].task.from, 4);
        assert_eq!(report.failed[0].error, "capacity exceeded");
    }
}
