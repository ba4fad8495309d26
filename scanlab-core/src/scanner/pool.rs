//! Scanner process pool: one long-lived worker process per scanning module.
//!
//! The pool amortizes the fixed cost of starting a module's runtime across
//! many scan requests within one run. Communication is pure message passing
//! over the worker's stdio — a hung or crashing module cannot corrupt
//! orchestrator state, only fail its own requests.
//!
//! The worker's stdout is drained on a dedicated thread into an mpsc channel
//! so both the READY handshake and per-request reads can enforce timeouts
//! with `recv_timeout`. stderr is drained on its own thread straight into
//! tracing diagnostics, never parsed.

use super::protocol::{ScanRequest, ScanResponse, PERSISTENT_FLAG, READY_LINE};
use super::{ScanError, Scanner};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for one pool instance.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Program that hosts the scanning module (e.g. a script runtime).
    pub program: String,
    /// Arguments placed before the module path.
    pub args: Vec<String>,
    /// Path of the scanning module the worker executes.
    pub module_path: PathBuf,
    /// Wait for the first `READY` line at most this long.
    pub startup_timeout: Duration,
    /// Wait for a response + `READY` pair at most this long per request.
    pub scan_timeout: Duration,
    /// Transparent respawns allowed per run before the pool turns fatal.
    pub max_respawns: usize,
    /// How long cleanup waits for a graceful exit before killing.
    pub kill_grace: Duration,
}

impl PoolConfig {
    pub fn new(program: impl Into<String>, module_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            module_path: module_path.into(),
            startup_timeout: Duration::from_secs(10),
            scan_timeout: Duration::from_secs(30),
            max_respawns: 1,
            kill_grace: Duration::from_secs(2),
        }
    }
}

#[derive(Debug)]
struct Worker {
    child: Child,
    stdin: Option<ChildStdin>,
    /// Lines from the worker's stdout; disconnect means the worker is gone.
    lines: Receiver<String>,
}

/// One long-lived worker process, serialized request/response, bounded
/// respawn on crash, graceful cleanup.
///
/// `scan()` takes `&mut self`: the protocol has no pipelining, so concurrent
/// callers must queue, and the borrow checker enforces exactly that.
#[derive(Debug)]
pub struct ScannerPool {
    config: PoolConfig,
    worker: Option<Worker>,
    spawn_count: usize,
    respawns_used: usize,
}

impl ScannerPool {
    /// Spawn the worker and block until its first `READY` line.
    pub fn initialize(config: PoolConfig) -> Result<Self, ScanError> {
        let mut pool = Self {
            config,
            worker: None,
            spawn_count: 0,
            respawns_used: 0,
        };
        pool.spawn_worker()?;
        Ok(pool)
    }

    /// Processes spawned over the pool's lifetime (1 unless respawns happened).
    pub fn spawn_count(&self) -> usize {
        self.spawn_count
    }

    /// Send one request and block for its response + `READY` pair.
    pub fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
        self.ensure_worker()?;

        let line = request
            .encode_line()
            .map_err(ScanError::MalformedResponse)?;
        let scan_timeout = self.config.scan_timeout;
        let worker = match self.worker.as_mut() {
            Some(w) => w,
            None => return Err(ScanError::WorkerCrashed { request_id: request.request_id }),
        };

        let write_result = worker.stdin.as_mut().map(|stdin| {
            stdin
                .write_all(line.as_bytes())
                .and_then(|_| stdin.write_all(b"\n"))
                .and_then(|_| stdin.flush())
        });
        match write_result {
            Some(Ok(())) => {}
            _ => {
                // Broken pipe: the worker died between requests.
                self.discard_worker();
                return Err(ScanError::WorkerCrashed {
                    request_id: request.request_id,
                });
            }
        }

        let deadline = Instant::now() + scan_timeout;

        // First line back is the response.
        let response_line = match self.next_line(deadline) {
            Ok(l) => l,
            Err(e) => return Err(self.classify_read_failure(e, request.request_id)),
        };

        let decoded = ScanResponse::decode_line(&response_line);

        // Resync on the trailing READY regardless of whether the response
        // parsed — a worker that produced one garbage line may be healthy.
        loop {
            match self.next_line(deadline) {
                Ok(l) if l == READY_LINE => break,
                Ok(other) => {
                    debug!(line = %other, "skipping unexpected line while waiting for READY");
                }
                Err(e) => return Err(self.classify_read_failure(e, request.request_id)),
            }
        }

        match decoded {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(request_id = request.request_id, error = %err, "malformed worker response");
                Err(ScanError::MalformedResponse(err))
            }
        }
    }

    /// Gracefully terminate the worker: close stdin (EOF ends the worker's
    /// read loop), wait out the grace period, then kill. Safe to call twice.
    pub fn cleanup(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        drop(worker.stdin.take());

        let deadline = Instant::now() + self.config.kill_grace;
        loop {
            match worker.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "worker exited gracefully");
                    return;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("worker did not exit within grace period; killing");
                        let _ = worker.child.kill();
                        let _ = worker.child.wait();
                        return;
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                Err(_) => return,
            }
        }
    }

    fn spawn_worker(&mut self) -> Result<(), ScanError> {
        let module = self.config.module_path.clone();
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(&module)
            .arg(PERSISTENT_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| startup_failed(&module, format!("spawn failed: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| startup_failed(&module, "stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| startup_failed(&module, "stderr not captured".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| startup_failed(&module, "stdin not captured".into()))?;

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line.trim_end_matches('\r').to_string()).is_err() {
                    break;
                }
            }
            // Sender drops here; the receiver sees Disconnected.
        });

        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                debug!(target: "scanlab::worker", "{line}");
            }
        });

        self.worker = Some(Worker {
            child,
            stdin: Some(stdin),
            lines: rx,
        });
        self.spawn_count += 1;

        // Handshake: skip stray stdout noise, require READY before use.
        let deadline = Instant::now() + self.config.startup_timeout;
        loop {
            match self.next_line(deadline) {
                Ok(l) if l == READY_LINE => {
                    info!(module = %module.display(), spawn = self.spawn_count, "scanner worker ready");
                    return Ok(());
                }
                Ok(other) => {
                    warn!(line = %other, "unexpected stdout line before READY");
                }
                Err(_) => {
                    self.discard_worker();
                    return Err(startup_failed(
                        &module,
                        format!(
                            "no READY within {}ms",
                            self.config.startup_timeout.as_millis()
                        ),
                    ));
                }
            }
        }
    }

    /// Respawn a dead worker within the bounded retry budget.
    fn ensure_worker(&mut self) -> Result<(), ScanError> {
        if self.worker.is_some() {
            return Ok(());
        }
        if self.respawns_used >= self.config.max_respawns {
            return Err(ScanError::RespawnExhausted {
                respawns: self.respawns_used,
            });
        }
        self.respawns_used += 1;
        warn!(
            respawn = self.respawns_used,
            max = self.config.max_respawns,
            "respawning crashed scanner worker"
        );
        self.spawn_worker()
    }

    /// Receive one stdout line before `deadline`.
    fn next_line(&mut self, deadline: Instant) -> Result<String, RecvTimeoutError> {
        let worker = match self.worker.as_ref() {
            Some(w) => w,
            None => return Err(RecvTimeoutError::Disconnected),
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        worker.lines.recv_timeout(remaining)
    }

    /// Map a failed read to the crash/timeout taxonomy, discarding the worker
    /// so the next `scan()` attempts a respawn.
    fn classify_read_failure(&mut self, err: RecvTimeoutError, request_id: u64) -> ScanError {
        self.discard_worker();
        match err {
            RecvTimeoutError::Disconnected => ScanError::WorkerCrashed { request_id },
            RecvTimeoutError::Timeout => ScanError::ScanTimeout {
                request_id,
                timeout_ms: self.config.scan_timeout.as_millis() as u64,
            },
        }
    }

    fn discard_worker(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            let _ = worker.child.kill();
            let _ = worker.child.wait();
        }
    }
}

impl Scanner for ScannerPool {
    fn scan(&mut self, request: &ScanRequest) -> Result<ScanResponse, ScanError> {
        ScannerPool::scan(self, request)
    }
}

impl Drop for ScannerPool {
    fn drop(&mut self) {
        // No orphaned workers if the host unwinds or exits a run early.
        self.cleanup();
    }
}

fn startup_failed(module: &Path, reason: String) -> ScanError {
    ScanError::WorkerStartupFailed {
        module: module.display().to_string(),
        reason,
    }
}
