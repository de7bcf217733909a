use anyhow::Result;
use chrono::Utc;
use monres::config::{MonitorConfig, DEFAULT_CONFIG_PATH};
use monres::monitor::{build_dispatcher, Monitor};
use monres::probe::send_test_notification;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  monres [--config <config.yaml>]                               Start monitoring");
    eprintln!("  monres [--config <config.yaml>] test-notification [channel]  Send a test alert");
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run,
    TestNotification(Option<String>),
    Help,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    config_path: String,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut command = Command::Run;
    let mut rest = args.iter().skip(1);

    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = rest
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path argument"))?
                    .clone();
            }
            "--help" | "-h" => return Ok(Invocation { config_path, command: Command::Help }),
            "test-notification" => {
                let channel = match rest.next() {
                    Some(next) if next == "--config" || next == "-c" => {
                        config_path = rest
                            .next()
                            .ok_or_else(|| anyhow::anyhow!("--config requires a path argument"))?
                            .clone();
                        rest.next().cloned()
                    }
                    other => other.cloned(),
                };
                command = Command::TestNotification(channel);
            }
            other => anyhow::bail!("unexpected argument '{other}'"),
        }
    }

    Ok(Invocation { config_path, command })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("monres=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let invocation = parse_args(&args).map_err(|e| {
        print_usage();
        e
    })?;

    match invocation.command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::TestNotification(channel) => {
            run_test_notification(&invocation.config_path, channel.as_deref()).await
        }
        Command::Run => run_monitor(&invocation.config_path).await,
    }
}

async fn run_test_notification(config_path: &str, channel: Option<&str>) -> Result<()> {
    let config = MonitorConfig::load(config_path)?;
    let hostname = config.effective_hostname()?;
    let dispatcher = build_dispatcher(&config)?;

    match channel {
        Some(name) => tracing::info!(channel = %name, "Sending test notification"),
        None => tracing::info!(channels = dispatcher.len(), "Sending test notification to all channels"),
    }
    send_test_notification(&dispatcher, &hostname, channel).await?;
    Ok(())
}

async fn run_monitor(config_path: &str) -> Result<()> {
    let config = MonitorConfig::load(config_path)?;
    let hostname = config.effective_hostname()?;
    tracing::info!(
        interval_secs = config.interval_secs(),
        hostname = %hostname,
        rules = config.alerts.len(),
        "monres starting"
    );

    let dispatcher = build_dispatcher(&config)?;
    tracing::info!(channels = dispatcher.len(), "Notification channels ready");
    if dispatcher.is_empty() && !config.alerts.is_empty() {
        tracing::warn!("Alert rules are defined but no notification channel initialized; alerts will only be logged");
    }

    let mut monitor = Monitor::from_config(&config, &hostname, dispatcher)?;

    monitor.tick(Utc::now()).await;

    let mut tick = interval(Duration::from_secs(config.interval_secs()));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the initial pass already ran.
    tick.tick().await;

    let mut terminate = terminate_signal()?;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let report = monitor.tick(Utc::now()).await;
                if !report.events.is_empty() {
                    tracing::debug!(
                        events = report.events.len(),
                        delivered = report.dispatch.delivered,
                        failed = report.dispatch.failed,
                        "Tick produced alert transitions"
                    );
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Received interrupt, shutting down gracefully");
                break;
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }
        }
    }

    if let Err(e) = monitor.save_state() {
        tracing::error!(error = %e, "Failed to save alert state on shutdown");
    }
    tracing::info!("monres stopped");
    Ok(())
}

#[cfg(unix)]
fn terminate_signal() -> Result<TerminateSignal> {
    Ok(TerminateSignal(signal::unix::signal(
        signal::unix::SignalKind::terminate(),
    )?))
}

#[cfg(not(unix))]
fn terminate_signal() -> Result<TerminateSignal> {
    Ok(TerminateSignal)
}

#[cfg(unix)]
struct TerminateSignal(signal::unix::Signal);

#[cfg(unix)]
impl TerminateSignal {
    async fn recv(&mut self) {
        self.0.recv().await;
    }
}

#[cfg(not(unix))]
struct TerminateSignal;

#[cfg(not(unix))]
impl TerminateSignal {
    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
