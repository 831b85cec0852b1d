use clap::Parser;
use pgsu_runner::{
    config::{ConfigErrors, ConnectionConfig, RunnerConfig},
    suite::cases,
    Connection, RunContext, TestRunner,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use tracing_unwrap::ResultExt;

/// Runs the usage instrumentation test cases against a database
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// connection string, replaces the configured connection
    #[arg(long, conflicts_with = "simulated")]
    dsn: Option<String>,

    /// run against the in-process instrumentation model
    #[arg(long)]
    simulated: bool,

    /// wait after every test case, in ms
    #[arg(long)]
    settle_delay: Option<u64>,

    /// glob over test case names
    #[arg(short, long)]
    filter: Option<String>,

    /// tolerance of timing assertions, in ms
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// print the selected test cases and exit
    #[arg(long)]
    list: bool,

    /// log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn load_config(&self) -> Result<RunnerConfig, ConfigErrors> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };

        if self.simulated {
            config.connection = ConnectionConfig::simulated();
        }
        if let Some(dsn) = &self.dsn {
            if !matches!(config.connection, ConnectionConfig::Postgres { .. }) {
                config.connection = ConnectionConfig::default();
            }
            if let ConnectionConfig::Postgres { dsn: current, .. } = &mut config.connection {
                *current = dsn.clone();
            }
        }
        if let Some(settle_delay) = self.settle_delay {
            config.settle_delay = settle_delay;
        }
        if let Some(filter) = &self.filter {
            config.filter = filter.clone();
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.load_config().unwrap_or_log();
    if config.preflight_checks() {
        error!("Config failed preflight checks, not running any test case");
        return ExitCode::FAILURE;
    }

    let suite = cases::builtin().filter(&config.compile_filter().unwrap_or_log());
    if args.list {
        for name in suite.names() {
            println!("{name}");
        }
        return ExitCode::SUCCESS;
    }

    let connection = Connection::load(&config.connection)
        .map_err(ConfigErrors::from)
        .unwrap_or_log();
    let mut context = RunContext::new(connection).with_tolerance(config.tolerance);

    info!(cases = suite.len(), "Starting test run");
    let runner = TestRunner::new(suite).with_settle_delay(config.settle_delay());

    match runner.run(&mut context) {
        Ok(summary) => {
            println!("{summary}");
            if summary.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            error!(error = ?err, "Test run aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
