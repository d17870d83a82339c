//! `netsweep` command line.
//!
//! ```bash
//! netsweep --hosts hostlist.csv --commands commandlist.csv --log-root .
//! ```
//!
//! Exits 0 when every host succeeded, 2 when any host failed and 1 when the
//! batch could not run (unreadable tables, log directory not writable).

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;

use netsweep::batch::{BatchOptions, BatchOrchestrator, HostReport};
use netsweep::inventory;
use netsweep::probe::IcmpProber;
use netsweep::session::{SessionOptions, SshSessionFactory};
use netsweep::transport::HostKeyVerification;
use netsweep::PlatformRegistry;

#[derive(Parser)]
#[command(name = "netsweep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a command list against a batch of network devices over SSH", long_about = None)]
struct Args {
    /// Host table (CSV: host, username, password, secret[, platform])
    #[arg(long, env = "NETSWEEP_HOSTS", default_value = "hostlist.csv")]
    hosts: PathBuf,

    /// Command table (CSV, first column, header row skipped)
    #[arg(long, env = "NETSWEEP_COMMANDS", default_value = "commandlist.csv")]
    commands: PathBuf,

    /// Directory the batch log directory is created in
    #[arg(long, env = "NETSWEEP_LOG_ROOT", default_value = ".")]
    log_root: PathBuf,

    /// SSH port
    #[arg(short, long, default_value_t = 22)]
    port: u16,

    /// Timeout in seconds for connecting, detection and each command
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Timeout in milliseconds for the reachability probe after a failure
    #[arg(long, default_value_t = 500)]
    probe_timeout: u64,

    /// Hosts to run at the same time
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,

    /// Host key checking: strict, accept-new or disabled
    #[arg(long, env = "NETSWEEP_HOST_KEY_VERIFICATION", default_value = "accept-new")]
    host_key_verification: HostKeyVerification,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long, env = "NETSWEEP_KNOWN_HOSTS")]
    known_hosts: Option<PathBuf>,

    /// Skip autodetection and use this dialect for hosts without a platform column
    #[arg(long, env = "NETSWEEP_PLATFORM")]
    platform: Option<String>,

    /// Do not copy the raw session into the log files
    #[arg(long)]
    no_session_log: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match run(args).await {
        Ok(reports) => {
            print_summary(&reports);
            if reports.iter().all(|r| r.outcome.is_success()) {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> netsweep::Result<Vec<HostReport>> {
    let hosts = inventory::load_hosts(&args.hosts)?;
    let commands = inventory::load_commands(&args.commands)?;

    let registry = PlatformRegistry::with_builtin();
    if let Some(name) = &args.platform {
        registry.require(name)?;
    }

    let factory = SshSessionFactory::new(SessionOptions {
        port: args.port,
        timeout: Duration::from_secs(args.timeout),
        host_key_verification: args.host_key_verification,
        known_hosts_path: args.known_hosts,
        platform: args.platform,
        registry,
    });
    let prober = IcmpProber::new(Duration::from_millis(args.probe_timeout));

    let orchestrator = BatchOrchestrator::new(factory, prober, args.log_root).with_options(
        BatchOptions {
            jobs: usize::from(args.jobs),
            session_log: !args.no_session_log,
        },
    );

    orchestrator.run(hosts, &commands).await
}

fn print_summary(reports: &[HostReport]) {
    let width = reports
        .iter()
        .map(|r| r.host.host.len())
        .max()
        .unwrap_or(0)
        .max("HOST".len());

    println!();
    println!(
        "{:<width$}  {:<14}  {:<21}  {:<11}  LOG",
        "HOST", "PLATFORM", "OUTCOME", "PROBE"
    );
    for report in reports {
        println!(
            "{:<width$}  {:<14}  {:<21}  {:<11}  {}",
            report.host.host,
            report.platform.as_deref().unwrap_or("-"),
            report.outcome.as_str(),
            report.probe.as_ref().map(|p| p.label()).unwrap_or("-"),
            report.artifact.display()
        );
    }
}
