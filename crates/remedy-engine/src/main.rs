//! `remedy` command line

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use remedy_engine::{run_simulation, EngineConfig, Scenario};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    Command::new("remedy")
        .version(remedy_engine::VERSION)
        .about("Automated runtime-error analysis and remediation")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Path to a TOML engine config"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run a scripted incident through the full pipeline")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .default_value("database")
                        .value_parser(["database", "cascade", "rollback"])
                        .help("Incident to simulate"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading config from {path}"))?,
        None => EngineConfig::default(),
    };
    if matches.get_flag("json-logs") {
        config.json_logs = true;
    }
    init_tracing(&config);

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let scenario: Scenario = args
                .get_one::<String>("scenario")
                .map_or("database", String::as_str)
                .parse()
                .map_err(anyhow::Error::msg)?;
            let report = run_simulation(scenario, config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(("config", _)) => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        _ => anyhow::bail!("no subcommand given"),
    }
    Ok(())
}
