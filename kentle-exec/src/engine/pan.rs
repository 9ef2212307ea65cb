use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::engine::summary::{check_exit_code, is_error_line, summarize};
use crate::engine::{
    BootstrapError, Engine, EngineConfig, EngineError, EngineInfo, EngineOutcome,
    ExecutionRequest,
};
use crate::job::JobSource;
use crate::log::{LogLevel, LogWriter};

/// Runs transformations through Kettle's `pan` command-line launcher.
pub struct PanEngine {
    config: EngineConfig,
    info: OnceCell<EngineInfo>,
}

impl PanEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            info: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn initialise(&self) -> Result<EngineInfo, BootstrapError> {
        let home = self.config.resolve_home();
        let launcher = self
            .config
            .resolve_launcher(home.as_deref())
            .ok_or(BootstrapError::NoInstallation)?;
        if !launcher_exists(&launcher) {
            return Err(BootstrapError::LauncherNotFound { path: launcher });
        }

        let plugin_count = match &home {
            Some(home) => count_plugins(&home.join("plugins")).await?,
            None => 0,
        };

        let version = if self.config.version_check {
            Some(self.check_version(&launcher).await?)
        } else {
            None
        };

        info!(
            launcher = %launcher.display(),
            plugins = plugin_count,
            version = version.as_deref().unwrap_or("unknown"),
            "Kettle environment initialised"
        );
        Ok(EngineInfo {
            engine: self.name().to_string(),
            launcher: Some(launcher),
            home,
            plugin_count,
            version,
        })
    }

    async fn check_version(&self, launcher: &Path) -> Result<String, BootstrapError> {
        let timeout = self.config.version_check_timeout();
        let check_error = |source| BootstrapError::VersionCheck {
            launcher: launcher.to_path_buf(),
            source,
        };
        let child = self
            .command(launcher)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(check_error)?;
        let group = ProcessGroup::new(child.id());
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(check_error)?,
            Err(_) => return Err(BootstrapError::VersionCheckTimedOut { timeout }),
        };
        group.release();
        if !output.status.success() {
            return Err(BootstrapError::VersionCheckFailed {
                code: output.status.code(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("unknown");
        Ok(version.to_string())
    }

    fn command(&self, launcher: &Path) -> Command {
        let mut cmd = Command::new(launcher);
        cmd.args(&self.config.program_args)
            .envs(&self.config.env)
            .kill_on_drop(true);
        // pan.sh starts the JVM as its own child; a fresh group lets both be killed together.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

#[async_trait]
impl Engine for PanEngine {
    fn name(&self) -> &str {
        "pan"
    }

    async fn bootstrap(&self) -> Result<EngineInfo, BootstrapError> {
        self.info
            .get_or_try_init(|| self.initialise())
            .await
            .cloned()
    }

    async fn execute(
        &self,
        request: ExecutionRequest,
        log: LogWriter,
    ) -> Result<EngineOutcome, EngineError> {
        let launcher = self
            .info
            .get()
            .and_then(|i| i.launcher.clone())
            .ok_or(EngineError::NotBootstrapped)?;

        let args = pan_args(&request);
        debug!(
            launcher = %launcher.display(),
            args = ?redacted(&args),
            channel = %log.channel(),
            "launching pan"
        );

        let mut child = self
            .command(&launcher)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                launcher: launcher.clone(),
                source,
            })?;
        let group = ProcessGroup::new(child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("pan stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("pan stderr was not captured"))?;

        let (out_lines, err_lines, status) =
            tokio::join!(pump(stdout, &log), pump(stderr, &log), child.wait());
        group.release();
        let status = status?;
        let mut lines = out_lines?;
        lines.extend(err_lines?);

        let Some(code) = status.code() else {
            warn!(channel = %log.channel(), "pan was terminated by a signal");
            return Err(EngineError::Terminated);
        };
        check_exit_code(code)?;

        let outcome = summarize(code, lines.iter().map(String::as_str));
        debug!(
            exit_code = code,
            errors = outcome.nr_errors,
            steps = outcome.steps.len(),
            "pan finished"
        );
        Ok(outcome)
    }
}

/// Builds pan's arguments for `request`.
pub(crate) fn pan_args(request: &ExecutionRequest) -> Vec<String> {
    let mut args = Vec::new();
    match &request.source {
        JobSource::File { path } => args.push(format!("-file={}", path.display())),
        JobSource::Repository(repo) => {
            args.push(format!("-rep={}", repo.repository));
            args.push(format!("-dir={}", repo.directory));
            args.push(format!("-trans={}", repo.transformation));
            if let Some(user) = &repo.username {
                args.push(format!("-user={user}"));
            }
            if let Some(password) = &repo.password {
                args.push(format!("-pass={}", password.expose_secret()));
            }
        }
    }
    args.push(format!("-level={}", request.log_level.as_str()));
    for (name, value) in &request.parameters {
        args.push(format!("-param:{name}={value}"));
    }
    args
}

fn redacted(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(|a| {
            if a.starts_with("-pass=") {
                "-pass=***"
            } else {
                a.as_str()
            }
        })
        .collect()
}

/// Bare names such as `sh` are left to the `PATH` lookup at spawn time.
fn launcher_exists(launcher: &Path) -> bool {
    if launcher.components().count() > 1 || launcher.is_absolute() {
        launcher.is_file()
    } else {
        true
    }
}

async fn count_plugins(dir: &Path) -> Result<usize, BootstrapError> {
    if !tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        return Err(BootstrapError::PluginsMissing {
            path: dir.to_path_buf(),
        });
    }
    let scan_err = |source: std::io::Error| BootstrapError::PluginScan {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(scan_err)?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        if entry.file_type().await.map_err(scan_err)?.is_dir() {
            count += 1;
        }
    }
    Ok(count)
}

/// Copies every line of `reader` into the job's log, returning the lines.
async fn pump<R>(reader: R, log: &LogWriter) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut lines = Vec::new();
    while let Some(raw) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
        let level = if is_error_line(&line) {
            LogLevel::Error
        } else {
            LogLevel::Minimal
        };
        log.log(level, line.clone()).await;
        lines.push(line);
    }
    Ok(lines)
}

/// Kills the launcher's process group when dropped, unless released after pan
/// exited on its own. Dropping happens when the run is stopped or times out.
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    leader: Option<u32>,
}

impl ProcessGroup {
    fn new(leader: Option<u32>) -> Self {
        Self { leader }
    }

    fn release(mut self) {
        self.leader = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(leader) = self.leader.take() {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Ok(raw) = i32::try_from(leader) else {
                return;
            };
            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) => debug!(pgid = raw, "killed pan process group"),
                Err(Errno::ESRCH) => {}
                Err(err) => warn!(pgid = raw, error = %err, "could not kill pan process group"),
            }
        }
    }
}
