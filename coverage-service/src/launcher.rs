use anyhow::{anyhow, bail};
use coverage_lib::{DispatchRequest, TaskId, TaskSink};
use tokio::sync::oneshot;
use tracing::{error, info};

#[derive(Debug)]
pub enum LauncherCommand {
    Launch {
        request: DispatchRequest,
        response_channel: oneshot::Sender<anyhow::Result<TaskId>>,
    },
    Shutdown,
}

/// [`TaskSink`] handing requests to a running [`TaskLauncher`].
#[derive(Clone)]
pub struct QueueTaskSink {
    command_tx: flume::Sender<LauncherCommand>,
}

impl QueueTaskSink {
    pub fn new(command_tx: flume::Sender<LauncherCommand>) -> Self {
        Self { command_tx }
    }
}

impl TaskSink for QueueTaskSink {
    async fn dispatch(&self, request: DispatchRequest) -> anyhow::Result<TaskId> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send_async(LauncherCommand::Launch {
                request,
                response_channel: tx,
            })
            .await
            .map_err(|_| anyhow!("task launcher is not running"))?;
        rx.await
            .map_err(|_| anyhow!("task launcher dropped the request"))?
    }
}

/// Starts indexing workers for launch commands, one at a time.
///
/// Stand-in for the container orchestrator: it assigns the task id and records the start.
pub struct TaskLauncher {
    command_rx: flume::Receiver<LauncherCommand>,
    launched: u64,
}

impl TaskLauncher {
    pub fn new(command_rx: flume::Receiver<LauncherCommand>) -> Self {
        Self {
            command_rx,
            launched: 0,
        }
    }

    pub async fn process(mut self) -> anyhow::Result<()> {
        info!("Task launcher started");
        loop {
            match self.command_rx.recv_async().await {
                Ok(LauncherCommand::Launch {
                    request,
                    response_channel,
                }) => {
                    let result = self.launch(&request);
                    _ = response_channel
                        .send(result)
                        .inspect_err(|_| error!("Launch requester went away"));
                }
                Ok(LauncherCommand::Shutdown) => {
                    info!(launched = self.launched, "Task launcher received shutdown signal");
                    return Ok(());
                }
                Err(_) => {
                    info!(launched = self.launched, "Task launcher channel closed");
                    return Ok(());
                }
            }
        }
    }

    fn launch(&mut self, request: &DispatchRequest) -> anyhow::Result<TaskId> {
        let task = &request.task;
        let Ok(log_level) = task.log_level.parse::<tracing::Level>() else {
            bail!("unsupported worker log level {:?}", task.log_level);
        };
        self.launched += 1;
        let task_id = TaskId(format!(
            "{}-{}-{}-{}",
            request.network, task.from, task.to, self.launched
        ));
        info!(
            %task_id,
            network = %request.network,
            from = task.from,
            to = task.to,
            force_mode = task.force_mode,
            %log_level,
            "Starting indexing worker"
        );
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverage_lib::{dispatch_all, plan, plan_with, PlanOptions};

    fn spawn_launcher() -> (
        flume::Sender<LauncherCommand>,
        tokio::task::JoinHandle<anyhow::Result<()>>,
    ) {
        let (command_tx, command_rx) = flume::bounded(16);
        let handle = tokio::spawn(TaskLauncher::new(command_rx).process());
        (command_tx, handle)
    }

    #[tokio::test]
    async fn launches_every_planned_task() {
        let (command_tx, handle) = spawn_launcher();
        let sink = QueueTaskSink::new(command_tx.clone());

        let report = dispatch_all(&sink, "mainnet", plan(0, 10, 3).unwrap()).await;
        assert!(report.is_complete());
        let ids: Vec<_> = report
            .started
            .iter()
            .map(|started| started.task_id.to_string())
            .collect();
        assert_eq!(ids, vec!["mainnet-0-3-1", "mainnet-4-7-2", "mainnet-8-10-3"]);

        command_tx.send_async(LauncherCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bad_log_level_is_refused() {
        let (command_tx, _handle) = spawn_launcher();
        let sink = QueueTaskSink::new(command_tx);
        let options = PlanOptions::builder().log_level("loud").build();

        let report = dispatch_all(&sink, "mainnet", plan_with(0, 9, 2, &options).unwrap()).await;
        assert!(report.started.is_empty());
        assert_eq!(report.failed.len(), 2);
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_fails() {
        let (command_tx, handle) = spawn_launcher();
        command_tx.send_async(LauncherCommand::Shutdown).await.unwrap();
        handle.await.unwrap().unwrap();

        let sink = QueueTaskSink::new(command_tx);
        let task = plan(0, 0, 1).unwrap().remove(0);
        let result = sink
            .dispatch(DispatchRequest {
                network: "mainnet".to_owned(),
                task,
            })
            .await;
        assert!(result.is_err());
    }
}
