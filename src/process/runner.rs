use super::{CommandSpec, ProcessOutput, ProcessRunner};
use crate::error::ProcessError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Runs commands as real child processes on the tokio runtime
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

fn drain<R>(reader: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            reader.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collect(
    handle: &mut JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, ProcessError> {
    let bytes = handle
        .await
        .map_err(|e| ProcessError::Io(std::io::Error::new(ErrorKind::Other, e)))??;
    Ok(bytes)
}

/// Kill everything spawned under the child's process group
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        trace!(
            "Process group {} already gone: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        debug!("Spawning: {}", command.display());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers the extractor forks die with it
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ProcessError::NotFound {
                    program: command.program.clone(),
                },
                _ => ProcessError::Spawn {
                    program: command.program.clone(),
                    source: e,
                },
            })?;

        let pid = child.id();
        let mut stdout = drain(child.stdout.take());
        let mut stderr = drain(child.stderr.take());

        // The deadline covers exit and end-of-output: a forked helper can hold
        // the pipes open long after the child itself has exited
        let finished = timeout(command.timeout, async {
            let status = child.wait().await?;
            let stdout = collect(&mut stdout).await?;
            let stderr = collect(&mut stderr).await?;
            Ok::<_, ProcessError>(ProcessOutput {
                code: status.code(),
                success: status.success(),
                stdout,
                stderr,
            })
        })
        .await;

        match finished {
            Ok(output) => {
                let output = output?;
                trace!(
                    "{} exited with {:?} ({} stdout bytes)",
                    command.program,
                    output.code,
                    output.stdout.len()
                );
                Ok(output)
            }
            Err(_) => {
                warn!(
                    program = %command.program,
                    timeout = ?command.timeout,
                    "Process deadline reached, killing child"
                );
                #[cfg(unix)]
                kill_group(pid);
                #[cfg(not(unix))]
                let _ = pid;
                if let Err(e) = child.kill().await {
                    debug!("Failed to kill {}: {}", command.program, e);
                }
                stdout.abort();
                stderr.abort();
                Err(ProcessError::Timeout {
                    program: command.program.clone(),
                    after: command.timeout,
                })
            }
        }
    }
}
