//! Batch orchestrator behaviour against scripted sessions.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netsweep::batch::{BatchOptions, BatchOrchestrator};
use netsweep::channel::SessionSink;
use netsweep::driver::{Driver, Response};
use netsweep::error::{ChannelError, DriverError, TransportError};
use netsweep::probe::{ProbeVerdict, Prober};
use netsweep::session::SessionFactory;
use netsweep::{CommandList, Error, HostRecord, Result, RunOutcome};

const STAMP: &str = "20261019-101500";

/// What a scripted host does.
#[derive(Clone)]
enum Script {
    /// Every command succeeds.
    Healthy,
    /// Login is rejected.
    BadPassword,
    /// TCP connect never completes.
    Silent,
    /// The session drops after this many commands.
    DropAfter(usize),
    /// The device rejects this command but stays up.
    Rejects(&'static str),
    /// The device stops answering after this many commands.
    StallAfter(usize),
    /// Everything works but tearing the session down fails.
    CloseFails,
}

#[derive(Default)]
struct Events {
    opened: Vec<String>,
    closed: Vec<String>,
    elevations: HashMap<String, usize>,
}

#[derive(Clone, Default)]
struct FakeFactory {
    scripts: HashMap<&'static str, Script>,
    events: Arc<Mutex<Events>>,
}

impl FakeFactory {
    fn new(scripts: &[(&'static str, Script)]) -> Self {
        Self {
            scripts: scripts.iter().cloned().collect(),
            events: Arc::default(),
        }
    }
}

impl SessionFactory for FakeFactory {
    type Session = FakeDriver;

    async fn open(&self, host: &HostRecord, session_log: Option<SessionSink>) -> Result<FakeDriver> {
        let script = self
            .scripts
            .get(host.host.as_str())
            .cloned()
            .unwrap_or(Script::Healthy);

        match script {
            Script::BadPassword => {
                return Err(TransportError::AuthenticationFailed {
                    user: host.username.clone(),
                }
                .into());
            }
            Script::Silent => return Err(TransportError::Timeout(Duration::from_secs(5)).into()),
            _ => {}
        }

        let mut session_log = session_log;
        if let Some(sink) = session_log.as_mut() {
            sink.write_all(format!("banner of {}\n", host.host).as_bytes())
                .unwrap();
        }

        self.events.lock().unwrap().opened.push(host.host.clone());
        Ok(FakeDriver {
            host: host.host.clone(),
            script,
            sent: 0,
            prompt: format!("{}#", host.host),
            events: self.events.clone(),
        })
    }
}

struct FakeDriver {
    host: String,
    script: Script,
    sent: usize,
    prompt: String,
    events: Arc<Mutex<Events>>,
}

impl Driver for FakeDriver {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.events.lock().unwrap().closed.push(self.host.clone());
        match self.script {
            Script::CloseFails => Err(ChannelError::Closed.into()),
            _ => Ok(()),
        }
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        match self.script {
            Script::DropAfter(limit) if self.sent >= limit => {
                return Err(ChannelError::Closed.into());
            }
            Script::StallAfter(limit) if self.sent >= limit => {
                return Err(ChannelError::PatternTimeout(Duration::from_secs(30)).into());
            }
            _ => {}
        }
        self.sent += 1;

        let output = format!("{} says {}", self.host, command);
        let response = Response::new(
            command,
            output.clone(),
            output,
            self.prompt.clone(),
            Duration::from_millis(1),
        );
        match self.script {
            Script::Rejects(bad) if bad == command => {
                Ok(response.with_failure("% Invalid input detected"))
            }
            _ => Ok(response),
        }
    }

    async fn acquire_privilege(&mut self, _privilege: &str) -> Result<()> {
        Err(DriverError::NotConnected.into())
    }

    async fn elevate(&mut self) -> Result<()> {
        *self
            .events
            .lock()
            .unwrap()
            .elevations
            .entry(self.host.clone())
            .or_default() += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn platform_name(&self) -> &str {
        "cisco_ios"
    }
}

#[derive(Clone, Default)]
struct FakeProber {
    probed: Arc<Mutex<Vec<String>>>,
}

impl Prober for FakeProber {
    async fn probe(&self, host: &str) -> ProbeVerdict {
        self.probed.lock().unwrap().push(host.to_string());
        ProbeVerdict::Unreachable("no reply within 500ms".into())
    }
}

fn hosts(names: &[&str]) -> Vec<HostRecord> {
    names
        .iter()
        .map(|name| HostRecord::new(*name, "netops", "pw"))
        .collect()
}

fn commands() -> CommandList {
    CommandList::new(["show version", "show clock", "show ip interface brief"])
}

fn artifacts(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn all_commands_succeed() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory.clone(), prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.platform.as_deref(), Some("cisco_ios"));
    assert_eq!(
        report.transcript.commands().collect::<Vec<_>>(),
        vec!["show version", "show clock", "show ip interface brief"]
    );
    assert!(report.probe.is_none());
    assert!(prober.probed.lock().unwrap().is_empty());

    assert!(report.artifact.ends_with("log-20261019-101500/edge1-20261019-101500.log"));
    let content = fs::read_to_string(&report.artifact).unwrap();
    assert!(content.starts_with("banner of edge1\n"));
    assert!(content.contains("edge1#show clock\nedge1 says show clock\n"));

    let events = factory.events.lock().unwrap();
    assert_eq!(events.closed, vec!["edge1"]);
    assert_eq!(events.elevations["edge1"], 3);
}

#[tokio::test]
async fn authentication_failure_is_probed_once() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("edge1", Script::BadPassword)]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory, prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    let report = &reports[0];
    assert_eq!(report.outcome, RunOutcome::AuthenticationFailure);
    assert!(report.transcript.is_empty());
    assert_eq!(*prober.probed.lock().unwrap(), vec!["edge1"]);
    assert_eq!(report.probe.as_ref().map(|p| p.label()), Some("unreachable"));

    assert!(
        report
            .artifact
            .ends_with("edge1-20261019-101500-AuthenticationFailure.log")
    );
    let content = fs::read_to_string(&report.artifact).unwrap();
    assert!(content.contains("AuthenticationFailure: edge1"));
    assert!(content.contains("probe: unreachable"));
}

#[tokio::test]
async fn dropped_session_keeps_partial_transcript() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("edge1", Script::DropAfter(2))]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory.clone(), prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    let report = &reports[0];
    assert_eq!(report.outcome, RunOutcome::ProtocolFailure);
    assert_eq!(
        report.transcript.commands().collect::<Vec<_>>(),
        vec!["show version", "show clock"]
    );
    assert_eq!(prober.probed.lock().unwrap().len(), 1);
    assert_eq!(factory.events.lock().unwrap().closed, vec!["edge1"]);

    let content = fs::read_to_string(&report.artifact).unwrap();
    assert!(content.contains("edge1 says show clock"));
    assert!(!content.contains("show ip interface brief"));
}

#[tokio::test]
async fn stalled_command_is_a_timeout() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("edge1", Script::StallAfter(1))]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory.clone(), prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    let report = &reports[0];
    assert_eq!(report.outcome, RunOutcome::TimeoutFailure);
    assert_eq!(
        report.transcript.commands().collect::<Vec<_>>(),
        vec!["show version"]
    );
    assert_eq!(*prober.probed.lock().unwrap(), vec!["edge1"]);
    assert_eq!(factory.events.lock().unwrap().closed, vec!["edge1"]);
    assert!(report.artifact.ends_with("edge1-20261019-101500-TimeoutFailure.log"));
}

#[tokio::test]
async fn close_failure_keeps_success() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("edge1", Script::CloseFails)]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory.clone(), prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    let report = &reports[0];
    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.transcript.len(), 3);
    assert!(report.error.is_none());
    assert!(prober.probed.lock().unwrap().is_empty());
    assert_eq!(factory.events.lock().unwrap().closed, vec!["edge1"]);
    assert!(report.artifact.ends_with("edge1-20261019-101500.log"));
}

#[tokio::test]
async fn rerun_with_same_stamp_keeps_earlier_failure() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("log-20261019-101500");

    let first = BatchOrchestrator::new(
        FakeFactory::new(&[("edge1", Script::Silent)]),
        FakeProber::default(),
        root.path(),
    );
    let earlier = first
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();
    let earlier_content = fs::read_to_string(&earlier[0].artifact).unwrap();

    let second = BatchOrchestrator::new(
        FakeFactory::new(&[("edge1", Script::Silent)]),
        FakeProber::default(),
        root.path(),
    );
    let later = second
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    assert_ne!(earlier[0].artifact, later[0].artifact);
    assert_eq!(
        fs::read_to_string(&earlier[0].artifact).unwrap(),
        earlier_content
    );
    assert_eq!(
        artifacts(&dir),
        vec![
            "edge1-20261019-101500-2-TimeoutFailure.log",
            "edge1-20261019-101500-TimeoutFailure.log"
        ]
    );
}

#[tokio::test]
async fn failure_does_not_leak_into_next_host() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("hostA", Script::Silent)]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory, prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["hostA", "hostB"]), &commands(), STAMP)
        .await
        .unwrap();

    let outcomes: Vec<_> = reports
        .iter()
        .map(|r| (r.host.host.as_str(), r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("hostA", RunOutcome::TimeoutFailure),
            ("hostB", RunOutcome::Success)
        ]
    );
    assert_eq!(*prober.probed.lock().unwrap(), vec!["hostA"]);

    let dir = root.path().join("log-20261019-101500");
    assert_eq!(
        artifacts(&dir),
        vec![
            "hostA-20261019-101500-TimeoutFailure.log",
            "hostB-20261019-101500.log"
        ]
    );

    let b = fs::read_to_string(&reports[1].artifact).unwrap();
    assert!(!b.contains("hostA"));
    assert!(!b.contains("TimeoutFailure"));
}

#[tokio::test]
async fn rejected_command_does_not_abort() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("edge1", Script::Rejects("show clock"))]);
    let prober = FakeProber::default();
    let orchestrator = BatchOrchestrator::new(factory, prober.clone(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    let report = &reports[0];
    assert_eq!(report.outcome, RunOutcome::Success);
    assert_eq!(report.transcript.len(), 3);
    assert_eq!(
        report.transcript.entries()[1].failure.as_deref(),
        Some("% Invalid input detected")
    );
    assert!(prober.probed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_hosts_get_separate_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let orchestrator =
        BatchOrchestrator::new(FakeFactory::new(&[]), FakeProber::default(), root.path());

    let reports = orchestrator
        .run_stamped(hosts(&["edge1", "edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_ne!(reports[0].artifact, reports[1].artifact);
    assert_eq!(
        artifacts(&root.path().join("log-20261019-101500")),
        vec!["edge1-20261019-101500-2.log", "edge1-20261019-101500.log"]
    );
}

#[tokio::test]
async fn concurrent_jobs_keep_input_order() {
    let root = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(&[("r2", Script::BadPassword), ("r4", Script::DropAfter(1))]);
    let orchestrator = BatchOrchestrator::new(factory, FakeProber::default(), root.path())
        .with_options(BatchOptions {
            jobs: 4,
            session_log: false,
        });

    let names = ["r1", "r2", "r3", "r4", "r5"];
    let reports = orchestrator
        .run_stamped(hosts(&names), &commands(), STAMP)
        .await
        .unwrap();

    let got: Vec<_> = reports.iter().map(|r| r.host.host.as_str()).collect();
    assert_eq!(got, names);
    assert_eq!(reports[1].outcome, RunOutcome::AuthenticationFailure);
    assert_eq!(reports[3].outcome, RunOutcome::ProtocolFailure);
    assert_eq!(artifacts(&root.path().join("log-20261019-101500")).len(), 5);

    // session log off: nothing but the transcript
    let content = fs::read_to_string(&reports[0].artifact).unwrap();
    assert!(content.starts_with("r1#show version\n"));
}

#[tokio::test]
async fn existing_batch_directory_is_kept() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("log-20261019-101500");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("earlier.log"), b"keep me").unwrap();

    let orchestrator =
        BatchOrchestrator::new(FakeFactory::new(&[]), FakeProber::default(), root.path());
    orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap();

    assert_eq!(fs::read(dir.join("earlier.log")).unwrap(), b"keep me");
    assert_eq!(artifacts(&dir).len(), 2);
}

#[tokio::test]
async fn unwritable_log_root_aborts_batch() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("not-a-dir");
    fs::write(&file, b"").unwrap();

    let orchestrator = BatchOrchestrator::new(FakeFactory::new(&[]), FakeProber::default(), &file);
    let err = orchestrator
        .run_stamped(hosts(&["edge1"]), &commands(), STAMP)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Recorder(_)));
}

#[tokio::test]
async fn empty_host_list() {
    let root = tempfile::tempdir().unwrap();
    let orchestrator =
        BatchOrchestrator::new(FakeFactory::new(&[]), FakeProber::default(), root.path());

    let reports = orchestrator
        .run_stamped(vec![], &commands(), STAMP)
        .await
        .unwrap();
    assert!(reports.is_empty());
}
