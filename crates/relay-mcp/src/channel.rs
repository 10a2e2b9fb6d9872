//! Line-delimited JSON-RPC over a child process's stdio.
//!
//! [`ToolChannel`] is the request/response seam the connection state machine
//! drives; [`Launcher`] produces channels from a [`LaunchSpec`]. The stdio
//! implementations keep one reader task per child that routes responses to
//! waiting requests by id.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};

use crate::error::{Error, Result};
use crate::launch::LaunchSpec;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Grace period for a child to exit after being killed.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// An open request/response channel to one tool process.
#[async_trait]
pub trait ToolChannel: Send {
    /// Send a request and wait up to `timeout` for its response.
    ///
    /// A JSON-RPC error object comes back as [`Error::Rpc`].
    async fn request(&mut self, method: &str, params: Value, timeout: Duration) -> Result<Value>;

    /// Send a notification; no response is expected.
    async fn notify(&mut self, method: &str, params: Value) -> Result<()>;

    /// Whether the process behind the channel is still running.
    fn is_alive(&mut self) -> bool;

    /// Stop the process and release its pipes.
    async fn close(&mut self);
}

/// Starts tool processes.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ToolChannel>>;
}

/// Launches real child processes with piped stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioLauncher;

#[async_trait]
impl Launcher for StdioLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ToolChannel>> {
        Ok(Box::new(StdioChannel::spawn(spec)?))
    }
}

/// A running child process speaking JSON-RPC on stdin/stdout.
pub struct StdioChannel {
    agent: String,
    child: Child,
    stdin: Option<ChildStdin>,
    pending: Pending,
    alive: Arc<AtomicBool>,
    next_id: u64,
}

impl StdioChannel {
    /// Spawn the process described by `spec`.
    ///
    /// The child sees only the variables in `spec.env`; nothing is inherited
    /// from this process.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.working_dir.as_ref().filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| Error::Spawn {
            agent: spec.agent.clone(),
            source,
        })?;
        tracing::debug!(agent = %spec.agent, pid = ?child.id(), "Spawned tool process");

        let missing_pipe = |name: &str| Error::Transport {
            agent: spec.agent.clone(),
            reason: format!("child {name} unavailable"),
        };
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        tokio::spawn(read_responses(
            spec.agent.clone(),
            stdout,
            Arc::clone(&pending),
            Arc::clone(&alive),
        ));

        let agent = spec.agent.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    tracing::debug!(agent = %agent, "stderr: {}", line);
                }
            }
        });

        Ok(Self {
            agent: spec.agent.clone(),
            child,
            stdin: Some(stdin),
            pending,
            alive,
            next_id: 1,
        })
    }

    async fn write_line(&mut self, message: &JsonRpcRequest) -> Result<()> {
        let mut payload = serde_json::to_string(message)?;
        payload.push('\n');

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(Error::Transport {
                agent: self.agent.clone(),
                reason: "channel closed".to_string(),
            });
        };

        let written = async {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.flush().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        written.map_err(|e| {
            self.alive.store(false, Ordering::SeqCst);
            Error::Transport {
                agent: self.agent.clone(),
                reason: format!("write failed: {e}"),
            }
        })
    }
}

#[async_trait]
impl ToolChannel for StdioChannel {
    async fn request(&mut self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // The reader clears `alive` before draining `pending`, so checking
        // after the insert cannot miss an exit.
        if !self.alive.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(Error::ProcessExited {
                agent: self.agent.clone(),
            });
        }

        if let Err(e) = self.write_line(&JsonRpcRequest::new(id, method, params)).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(Error::ProcessExited {
                    agent: self.agent.clone(),
                });
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                tracing::warn!(agent = %self.agent, method, id, "Request timed out");
                return Err(Error::Timeout {
                    agent: self.agent.clone(),
                    method: method.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        };

        match (response.result, response.error) {
            (_, Some(error)) => Err(Error::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::Protocol {
                agent: self.agent.clone(),
                reason: format!("response {id} has neither result nor error"),
            }),
        }
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        self.write_line(&JsonRpcRequest::notification(method, params))
            .await
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst) && matches!(self.child.try_wait(), Ok(None))
    }

    async fn close(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        drop(self.stdin.take());
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(agent = %self.agent, error = %e, "Tool process already gone");
        }
        if tokio::time::timeout(KILL_GRACE, self.child.wait())
            .await
            .is_err()
        {
            tracing::warn!(agent = %self.agent, "Tool process did not exit after kill");
        }
        tracing::debug!(agent = %self.agent, "Tool process closed");
    }
}

/// Route each response line to the request waiting on its id.
///
/// Lines that are not responses (server notifications, log noise) are
/// skipped. On EOF every waiting request is failed by dropping its sender.
async fn read_responses(agent: String, stdout: ChildStdout, pending: Pending, alive: Arc<AtomicBool>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(agent = %agent, error = %e, "Failed reading tool process stdout");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcResponse>(&line) {
            Ok(r) if r.result.is_some() || r.error.is_some() => r,
            Ok(_) => {
                tracing::debug!(agent = %agent, "Ignoring non-response message: {}", line);
                continue;
            }
            Err(e) => {
                tracing::warn!(agent = %agent, error = %e, "Unparseable line on stdout");
                continue;
            }
        };

        let Some(id) = response.id.as_ref().and_then(Value::as_u64) else {
            tracing::warn!(agent = %agent, "Response without a numeric id");
            continue;
        };

        match pending.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => tracing::debug!(agent = %agent, id, "Dropping late response"),
        }
    }

    alive.store(false, Ordering::SeqCst);
    pending.lock().await.clear();
    tracing::debug!(agent = %agent, "Tool process stdout closed");
}
