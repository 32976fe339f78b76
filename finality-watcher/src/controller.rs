//! Controller: validates control commands and owns the active run.
//!
//! The controller is shared with the HTTP layer behind an
//! `Arc<tokio::sync::Mutex<_>>`. The lock is held only while controller
//! state changes; a `run` command releases it before awaiting the verdict so
//! that `stop` can get through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use finality_core::{CoreError, NodeRegistry, RunReport};
use finality_types::{Command, Reply, RunRequest};
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio::task::AbortHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::node_api::NodeApi;
use crate::scheduler::{spawn_run, RunHandle, RunParams, Schedule};
use crate::submit::Submitter;

/// Acknowledgement of a `watches` command.
pub const WATCHES_ACK: &str = "watches config succeed";

/// Acknowledgement of a `stop` command.
pub const STOP_ACK: &str = "stopped";

/// Command validation errors.
#[derive(Debug, Error)]
pub enum ControlError {
    /// `run` arrived before any `watches`.
    #[error("no nodes configured, send watches first")]
    NotConfigured,

    /// The node list was rejected.
    #[error("invalid node list: {0}")]
    InvalidNodes(#[from] CoreError),

    /// `amount` was zero.
    #[error("amount must be positive")]
    InvalidAmount,

    /// `freq` was not a positive number of seconds.
    #[error("freq must be a positive number of seconds, got {0}")]
    InvalidFreq(f64),

    /// A run is already active.
    #[error("a run is already in progress")]
    RunInProgress,
}

/// Result of handling one command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// A reply to send back.
    Reply(Reply),
    /// The run was cancelled before it produced a verdict.
    Cancelled,
}

/// Owner of the node configuration and the active run.
pub struct Controller {
    api: Arc<dyn NodeApi>,
    submitter: Arc<dyn Submitter>,
    schedule: Schedule,
    default_submit_url: String,
    nodes: Option<NodeRegistry>,
    active: Option<RunHandle>,
    started: Instant,
}

impl Controller {
    /// Create a controller with no nodes configured.
    pub fn new(
        api: Arc<dyn NodeApi>,
        submitter: Arc<dyn Submitter>,
        schedule: Schedule,
        default_submit_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            submitter,
            schedule,
            default_submit_url: default_submit_url.into(),
            nodes: None,
            active: None,
            started: Instant::now(),
        }
    }

    /// Replace the node configuration, cancelling any active run.
    ///
    /// On error, the previous configuration and run are left untouched.
    pub fn configure(&mut self, urls: &[String]) -> Result<usize, ControlError> {
        let nodes = NodeRegistry::new(urls)?;
        let count = nodes.len();
        if self.stop() {
            info!("Active run cancelled by reconfiguration");
        }
        self.nodes = Some(nodes);
        info!(nodes = count, "Nodes configured");
        Ok(count)
    }

    /// Start a run.
    ///
    /// Returns the run id and a receiver for its report.
    pub fn start(
        &mut self,
        request: &RunRequest,
    ) -> Result<(Uuid, oneshot::Receiver<RunReport>), ControlError> {
        let nodes = self.nodes.clone().ok_or(ControlError::NotConfigured)?;
        if request.amount == 0 {
            return Err(ControlError::InvalidAmount);
        }
        let freq = Duration::try_from_secs_f64(request.freq)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(ControlError::InvalidFreq(request.freq))?;
        if self.is_running() {
            return Err(ControlError::RunInProgress);
        }

        let params = RunParams {
            nodes,
            amount: request.amount,
            freq,
            submit_url: request
                .url
                .clone()
                .unwrap_or_else(|| self.default_submit_url.clone()),
            users: request.users.clone(),
            debug: request.debug.clone(),
        };
        let (handle, rx) = spawn_run(
            Arc::clone(&self.api),
            Arc::clone(&self.submitter),
            self.schedule,
            params,
        );
        let id = handle.id();
        self.active = Some(handle);
        Ok((id, rx))
    }

    /// Cancel the active run. Returns true if one was running.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                if was_running {
                    info!(run = %handle.id(), "Run stopped");
                }
                was_running
            }
            None => false,
        }
    }

    fn abort_handle(&self) -> Option<AbortHandle> {
        self.active.as_ref().map(RunHandle::abort_handle)
    }

    /// Forget a run that delivered its report.
    pub fn finish(&mut self, run_id: Uuid) {
        if self.active.as_ref().is_some_and(|h| h.id() == run_id) {
            self.active = None;
        }
    }

    /// True while a run is active.
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of configured nodes (0 before `watches`).
    pub fn node_count(&self) -> usize {
        self.nodes.as_ref().map_or(0, NodeRegistry::len)
    }

    /// Time since the controller was created.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Aborts a run whose caller stopped waiting for the verdict.
struct AbandonGuard(Option<AbortHandle>);

impl AbandonGuard {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            if !handle.is_finished() {
                handle.abort();
                info!("Run abandoned by its caller");
            }
        }
    }
}

/// Handle one control command.
///
/// `run` blocks until the run settles, without holding the controller lock.
/// Dropping the returned future while a run is pending cancels that run.
pub async fn handle_command(controller: &Mutex<Controller>, command: Command) -> CommandOutcome {
    let name = command.name();
    let reply = match command {
        Command::Watches(request) => match controller.lock().await.configure(&request.nodes) {
            Ok(_) => Reply::ack(WATCHES_ACK),
            Err(e) => Reply::error(e.to_string()),
        },
        Command::Stop => {
            controller.lock().await.stop();
            Reply::ack(STOP_ACK)
        }
        Command::Run(request) => {
            let started = {
                let mut controller = controller.lock().await;
                controller
                    .start(&request)
                    .map(|(run_id, rx)| (run_id, rx, AbandonGuard(controller.abort_handle())))
            };
            match started {
                Err(e) => Reply::error(e.to_string()),
                Ok((run_id, rx, guard)) => {
                    let report = rx.await;
                    guard.disarm();
                    match report {
                        Ok(report) => {
                            controller.lock().await.finish(run_id);
                            Reply::verdict(report.verdict, report.diagnosis)
                        }
                        Err(_) => return CommandOutcome::Cancelled,
                    }
                }
            }
        }
    };

    if reply.is_error() {
        warn!(command = name, error = %reply.message, "Command rejected");
    }
    CommandOutcome::Reply(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_api::MockNodeApi;
    use crate::submit::MockSubmitter;
    use finality_types::{ReplyKind, WatchesRequest};

    fn controller(api: &MockNodeApi) -> Controller {
        Controller::new(
            Arc::new(api.clone()),
            Arc::new(MockSubmitter::new()),
            Schedule::default(),
            "http://submit",
        )
    }

    fn run_request(freq: f64, amount: u32) -> RunRequest {
        RunRequest {
            freq,
            amount,
            url: None,
            users: None,
            debug: None,
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn run_before_watches_is_rejected() {
        let mut c = controller(&MockNodeApi::new());
        assert!(matches!(
            c.start(&run_request(1.0, 1)),
            Err(ControlError::NotConfigured)
        ));
        assert!(!c.is_running());
    }

    #[tokio::test]
    async fn invalid_node_lists_leave_state_untouched() {
        let mut c = controller(&MockNodeApi::new());
        assert!(c.configure(&[]).is_err());
        assert!(c.configure(&urls(&["http://a", "http://a/"])).is_err());
        assert_eq!(c.node_count(), 0);

        assert_eq!(c.configure(&urls(&["http://a", "http://b"])).unwrap(), 2);
        assert!(c.configure(&urls(&[" "])).is_err());
        assert_eq!(c.node_count(), 2);
    }

    #[tokio::test]
    async fn run_parameters_are_validated() {
        let mut c = controller(&MockNodeApi::new());
        c.configure(&urls(&["http://a"])).unwrap();

        assert!(matches!(
            c.start(&run_request(1.0, 0)),
            Err(ControlError::InvalidAmount)
        ));
        for freq in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                c.start(&run_request(freq, 1)),
                Err(ControlError::InvalidFreq(_))
            ));
        }
        assert!(!c.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_is_rejected_while_active() {
        let mut c = controller(&MockNodeApi::new());
        c.configure(&urls(&["http://a"])).unwrap();

        let (_id, _rx) = c.start(&run_request(1.0, 1)).unwrap();
        assert!(c.is_running());
        assert!(matches!(
            c.start(&run_request(1.0, 1)),
            Err(ControlError::RunInProgress)
        ));

        assert!(c.stop());
        assert!(!c.is_running());
        assert!(!c.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn watches_cancels_active_run() {
        let mut c = controller(&MockNodeApi::new());
        c.configure(&urls(&["http://a"])).unwrap();
        let (_id, rx) = c.start(&run_request(1.0, 1)).unwrap();

        c.configure(&urls(&["http://b"])).unwrap();
        assert!(!c.is_running());
        assert!(rx.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn handle_command_run_returns_verdict() {
        let api = MockNodeApi::new();
        api.set_chain_info("http://a", 100);
        api.locate_all("http://a", 90, "blk");
        let c = Mutex::new(controller(&api));

        let outcome = handle_command(
            &c,
            Command::Watches(WatchesRequest {
                nodes: urls(&["http://a"]),
            }),
        )
        .await;
        assert!(matches!(outcome, CommandOutcome::Reply(r) if r.message == WATCHES_ACK));

        let outcome = handle_command(&c, Command::Run(run_request(0.5, 3))).await;
        let CommandOutcome::Reply(reply) = outcome else {
            panic!("Expected a reply");
        };
        assert_eq!(reply.kind, ReplyKind::Verdict);
        assert_eq!(reply.message, "Success");
        assert!(!c.lock().await.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_blocked_run() {
        let c = Arc::new(Mutex::new(controller(&MockNodeApi::new())));
        c.lock().await.configure(&urls(&["http://a"])).unwrap();

        let runner = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { handle_command(&c, Command::Run(run_request(1.0, 5))).await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;

        let outcome = handle_command(&c, Command::Stop).await;
        assert!(matches!(outcome, CommandOutcome::Reply(r) if r.message == STOP_ACK));
        assert!(matches!(runner.await.unwrap(), CommandOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_run_is_cancelled() {
        let c = Arc::new(Mutex::new(controller(&MockNodeApi::new())));
        c.lock().await.configure(&urls(&["http://a"])).unwrap();

        let runner = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { handle_command(&c, Command::Run(run_request(1.0, 5))).await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(c.lock().await.is_running());

        // The caller goes away without sending stop.
        runner.abort();
        assert!(runner.await.unwrap_err().is_cancelled());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut c = c.lock().await;
        assert!(!c.is_running());
        assert!(c.start(&run_request(1.0, 1)).is_ok());
    }
}
