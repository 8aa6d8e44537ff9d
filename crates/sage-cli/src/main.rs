use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sage_backend::{HttpBackend, SageConfig, StatusPoller};
use sage_cli::{status_line, watch_run, Replay, ReplayScript};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sage")
        .version(sage_cli::VERSION)
        .about("Branchable research workflow sessions")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Enable debug logging (overridden by RUST_LOG)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a YAML script of session actions and print the tree")
                .arg(
                    Arg::new("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Replay script"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Follow an experiment run until it finishes")
                .arg(
                    Arg::new("run-id")
                        .required(true)
                        .help("Backend run identifier"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .action(ArgAction::SetTrue)
                        .help("Fetch the status once instead of polling"),
                ),
        )
}

fn init_tracing(verbosity: u8, json: bool) {
    let default = if verbosity > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn replay(args: &ArgMatches) -> anyhow::Result<()> {
    let path = args
        .get_one::<PathBuf>("script")
        .context("missing script path")?;
    let script = ReplayScript::load(path)?;
    let replay = Replay::run(&script).with_context(|| format!("replaying {}", path.display()))?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&replay.report())?);
    } else {
        print!("{}", replay.render_text());
    }

    let violations = replay.session().tree().validate();
    for violation in &violations {
        tracing::error!(%violation, "tree invariant violated");
    }
    anyhow::ensure!(violations.is_empty(), "replayed tree is inconsistent");
    Ok(())
}

async fn status(args: &ArgMatches) -> anyhow::Result<()> {
    let run_id = args
        .get_one::<String>("run-id")
        .context("missing run id")?;
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => SageConfig::load(path)?,
        None => SageConfig::new(),
    }
    .with_env_overrides()?;

    let backend = HttpBackend::new(&config.backend)?;
    tracing::info!(backend = %backend.base_url(), run_id, "watching run");

    let poller = StatusPoller::new(&config.polling);
    let report = watch_run(&backend, &poller, run_id, args.get_flag("once"), |report| {
        println!("{}", status_line(report));
    })
    .await
    .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    tracing::debug!(status = %report.status, "done");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("replay", args)) => replay(args),
        Some(("status", args)) => status(args).await,
        _ => Ok(()),
    }
}
