use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::progress::{ProgressParser, is_progress_record};
use super::{TranscodeEngine, TranscodeError, TranscodeJob};
use crate::config::settings::TranscodeConfig;

/// Lines of diagnostic stderr kept for the failure message.
const STDERR_TAIL_LINES: usize = 12;

/// Drives the `ffmpeg` binary as a child process.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(config: &TranscodeConfig) -> Self {
        Self::with_program(config.ffmpeg_path.clone(), config.timeout)
    }

    pub fn with_program(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn args(job: &TranscodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-nostats", "-progress", "pipe:2", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(job.input.clone().into_os_string());
        args.push("-vf".into());
        args.push(job.scaling.filter().into());
        args.push(job.output.clone().into_os_string());
        args
    }

    /// Spawns the engine and returns a handle that resolves exactly once.
    pub fn start(&self, job: &TranscodeJob) -> Result<TranscodeHandle, TranscodeError> {
        info!(
            job_id = %job.job_id,
            input = %job.input.display(),
            output = %job.output.display(),
            filter = %job.scaling.filter(),
            "Starting transcode"
        );

        let mut child = Command::new(&self.program)
            .args(Self::args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::Io(std::io::Error::other("stderr was not captured")))?;

        let (progress_tx, progress_rx) = watch::channel(None);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(supervise(
            child,
            stderr,
            self.timeout,
            job.job_id,
            progress_tx,
            done_tx,
        ));

        Ok(TranscodeHandle {
            progress: progress_rx,
            done: done_rx,
        })
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        self.start(job)?.wait().await
    }
}

/// Pending outcome of one engine run.
pub struct TranscodeHandle {
    progress: watch::Receiver<Option<f64>>,
    done: oneshot::Receiver<Result<(), TranscodeError>>,
}

impl TranscodeHandle {
    /// Latest completion percentage, advisory only.
    pub fn progress(&self) -> watch::Receiver<Option<f64>> {
        self.progress.clone()
    }

    pub async fn wait(self) -> Result<(), TranscodeError> {
        self.done.await.unwrap_or(Err(TranscodeError::Abandoned))
    }
}

/// Owns the child until it exits and delivers the single outcome.
///
/// `done` is consumed by `send`, so a run can never report both success
/// and failure.
async fn supervise(
    mut child: Child,
    stderr: ChildStderr,
    limit: Duration,
    job_id: Uuid,
    progress_tx: watch::Sender<Option<f64>>,
    done: oneshot::Sender<Result<(), TranscodeError>>,
) {
    let mut parser = ProgressParser::default();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();

    let run = async {
        // Banner metadata is printed verbatim and need not be UTF-8.
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string();
            if let Some(percent) = parser.feed(&line) {
                info!(%job_id, "Processing: {:.1}% done", percent);
                progress_tx.send_replace(Some(percent));
            } else if !is_progress_record(&line) && !line.trim().is_empty() {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        child.wait().await
    };
    let result = tokio::time::timeout(limit, run).await;

    let outcome = match result {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(TranscodeError::Failed {
            status: status.to_string(),
            message: if tail.is_empty() {
                "no diagnostic output".to_string()
            } else {
                tail.into_iter().collect::<Vec<_>>().join("\n")
            },
        }),
        Ok(Err(e)) => Err(TranscodeError::Io(e)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(%job_id, error = %e, "Failed to kill timed out transcoder");
            }
            Err(TranscodeError::TimedOut(limit))
        }
    };

    match &outcome {
        Ok(()) => info!(%job_id, "Transcoding finished"),
        Err(e) => error!(%job_id, error = %e, "An error occurred while transcoding"),
    }

    if done.send(outcome).is_err() {
        debug!(%job_id, "Transcode outcome dropped, caller stopped waiting");
    }
}
