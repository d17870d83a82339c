//! Batch orchestration.
//!
//! One batch runs the same command list against every host of the host
//! table. Each host gets its own session and artifact; whatever happens to
//! one host never stops the others. Only failures of the artifact store
//! itself abort the batch.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use futures_util::{StreamExt, TryStreamExt, stream};
use log::{error, info, warn};

use crate::channel::SessionSink;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::inventory::{CommandList, HostRecord};
use crate::outcome::RunOutcome;
use crate::probe::{ProbeVerdict, Prober};
use crate::recorder::{RunRecorder, batch_stamp};
use crate::session::SessionFactory;

/// Log target of the operator-facing lines.
pub const LOG_TARGET: &str = "netsweep::batch";

/// One executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Prompt the command was typed at.
    pub prompt: String,
    pub command: String,
    pub output: String,
    /// Set when the device rejected the command.
    pub failure: Option<String>,
}

/// Commands and responses of one host run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.command.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `<prompt><command>` followed by the output, per entry.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}{}", entry.prompt, entry.command);
            let _ = writeln!(out, "{}", entry.output);
        }
        out
    }
}

/// Result of one host run.
#[derive(Debug)]
pub struct HostReport {
    pub host: HostRecord,
    pub outcome: RunOutcome,
    /// Dialect the session was bound to, if it got that far.
    pub platform: Option<String>,
    pub transcript: Transcript,
    /// Only probed on failure.
    pub probe: Option<ProbeVerdict>,
    pub error: Option<String>,
    /// Final artifact path, after renaming.
    pub artifact: PathBuf,
}

/// Knobs of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Hosts run at the same time. 1 runs the batch strictly in order.
    pub jobs: usize,

    /// Tee the raw session into the artifact ahead of the transcript.
    pub session_log: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            session_log: true,
        }
    }
}

/// Operator log of one batch.
#[derive(Debug)]
pub struct BatchLog {
    stamp: String,
}

impl BatchLog {
    pub fn new(stamp: impl Into<String>) -> Self {
        Self {
            stamp: stamp.into(),
        }
    }

    fn started(&self, hosts: usize, commands: usize, dir: &Path) {
        info!(
            target: LOG_TARGET,
            "batch {}: {} hosts, {} commands, logs in {}",
            self.stamp,
            hosts,
            commands,
            dir.display()
        );
    }

    fn progress(&self, host: &str, index: usize, total: usize, command: &str) {
        info!(target: LOG_TARGET, "{} [{}/{}] {}", host, index + 1, total, command);
    }

    fn rejected(&self, host: &str, command: &str, failure: &str) {
        warn!(target: LOG_TARGET, "{}: '{}' rejected by device ({})", host, command, failure);
    }

    fn close_failed(&self, host: &str, err: &Error) {
        warn!(target: LOG_TARGET, "{}: disconnect failed: {}", host, err);
    }

    fn success(&self, host: &str) {
        info!(target: LOG_TARGET, "{}: {}", host, RunOutcome::Success);
    }

    fn failure(&self, host: &str, outcome: RunOutcome, verdict: &ProbeVerdict, err: &Error) {
        error!(
            target: LOG_TARGET,
            "{}: {} [{}] {}",
            host,
            outcome,
            verdict,
            err
        );
    }

    fn finished(&self, reports: &[HostReport]) {
        let failed = reports.iter().filter(|r| !r.outcome.is_success()).count();
        info!(
            target: LOG_TARGET,
            "batch {}: {} succeeded, {} failed",
            self.stamp,
            reports.len() - failed,
            failed
        );
    }
}

/// Runs batches with a session factory and a diagnostic prober.
pub struct BatchOrchestrator<F, P> {
    factory: F,
    prober: P,
    log_root: PathBuf,
    options: BatchOptions,
}

impl<F: SessionFactory, P: Prober> BatchOrchestrator<F, P> {
    pub fn new(factory: F, prober: P, log_root: impl Into<PathBuf>) -> Self {
        Self {
            factory,
            prober,
            log_root: log_root.into(),
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run one batch stamped with the current local time.
    pub async fn run(
        &self,
        hosts: Vec<HostRecord>,
        commands: &CommandList,
    ) -> Result<Vec<HostReport>> {
        self.run_stamped(hosts, commands, &batch_stamp()).await
    }

    /// Run one batch under an explicit stamp.
    ///
    /// Reports come back in host order whatever the concurrency. An `Err`
    /// means an artifact could not be created, written or renamed.
    pub async fn run_stamped(
        &self,
        hosts: Vec<HostRecord>,
        commands: &CommandList,
        stamp: &str,
    ) -> Result<Vec<HostReport>> {
        let recorder = RunRecorder::new(&self.log_root, stamp);
        recorder.prepare()?;

        let log = BatchLog::new(stamp);
        log.started(hosts.len(), commands.len(), recorder.dir());

        let reports: Vec<HostReport> = stream::iter(hosts)
            .map(|host| self.run_host(host, commands, &recorder, &log))
            .buffered(self.options.jobs.max(1))
            .try_collect()
            .await?;

        log.finished(&reports);
        Ok(reports)
    }

    async fn run_host(
        &self,
        host: HostRecord,
        commands: &CommandList,
        recorder: &RunRecorder,
        log: &BatchLog,
    ) -> Result<HostReport> {
        let mut artifact = recorder.open(&host.host)?;
        let session_log = if self.options.session_log {
            Some(artifact.session_log()?)
        } else {
            None
        };

        let mut transcript = Transcript::default();
        let mut platform = None;
        let result = self
            .drive(&host, commands, session_log, &mut transcript, &mut platform, log)
            .await;

        let (outcome, probe, error) = match result {
            Ok(()) => {
                log.success(&host.host);
                (RunOutcome::Success, None, None)
            }
            Err(e) => {
                let outcome = RunOutcome::from_kind(e.kind());
                let verdict = self.prober.probe(&host.host).await;
                log.failure(&host.host, outcome, &verdict, &e);
                (outcome, Some(verdict), Some(e.to_string()))
            }
        };

        let mut body = String::new();
        if self.options.session_log {
            body.push_str("\n===== transcript =====\n");
        }
        body.push_str(&transcript.render());
        if let (Some(verdict), Some(message)) = (&probe, &error) {
            let _ = writeln!(body, "{}: {}", outcome, host.host);
            let _ = writeln!(body, "error: {}", message);
            let _ = writeln!(body, "probe: {}", verdict);
        }
        artifact.write(body.as_bytes())?;
        let artifact = artifact.finalize(outcome)?;

        Ok(HostReport {
            host,
            outcome,
            platform,
            transcript,
            probe,
            error,
            artifact,
        })
    }

    /// Open the session, run the commands and always close it again.
    async fn drive(
        &self,
        host: &HostRecord,
        commands: &CommandList,
        session_log: Option<SessionSink>,
        transcript: &mut Transcript,
        platform: &mut Option<String>,
        log: &BatchLog,
    ) -> Result<()> {
        let mut session = self.factory.open(host, session_log).await?;
        *platform = Some(session.platform_name().to_string());

        let result = run_commands(&mut session, &host.host, commands, transcript, log).await;

        if let Err(e) = session.close().await {
            log.close_failed(&host.host, &e);
        }
        result
    }
}

/// Run every command in order, re-asserting privilege before each one.
///
/// A rejected command is recorded and the list continues; a session error
/// stops the list and is returned.
async fn run_commands<D: Driver>(
    session: &mut D,
    host: &str,
    commands: &CommandList,
    transcript: &mut Transcript,
    log: &BatchLog,
) -> Result<()> {
    let total = commands.len();
    for (index, command) in commands.iter().enumerate() {
        session.elevate().await?;
        let prompt = session.prompt().to_string();
        let response = session.send_command(command).await?;

        log.progress(host, index, total, command);
        if let Some(failure) = &response.failure_message {
            log.rejected(host, command, failure);
        }

        transcript.push(TranscriptEntry {
            prompt,
            command: command.to_string(),
            output: response.result,
            failure: response.failure_message,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_transcript() {
        let mut transcript = Transcript::default();
        transcript.push(TranscriptEntry {
            prompt: "edge1#".into(),
            command: "show clock".into(),
            output: "*10:15:00.000 UTC Mon Oct 19 2026".into(),
            failure: None,
        });
        transcript.push(TranscriptEntry {
            prompt: "edge1#".into(),
            command: "show bogus".into(),
            output: "% Invalid input detected at '^' marker.".into(),
            failure: Some("% Invalid input detected".into()),
        });

        assert_eq!(
            transcript.render(),
            "edge1#show clock\n*10:15:00.000 UTC Mon Oct 19 2026\n\
             edge1#show bogus\n% Invalid input detected at '^' marker.\n"
        );
        assert_eq!(
            transcript.commands().collect::<Vec<_>>(),
            vec!["show clock", "show bogus"]
        );
    }

    #[test]
    fn test_default_options_are_sequential() {
        let options = BatchOptions::default();
        assert_eq!(options.jobs, 1);
        assert!(options.session_log);
    }
}
