use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use remex_core::{CommandStatus, Config, ExecutionOutcome};
use serde_json::{json, Value};

mod cli;
mod dispatch;

use cli::RemexCli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = RemexCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let mut config = Config::from_env().map_err(|err| eyre!("{err:?}"))?;
    if let Some(store) = &cli.store {
        config = config
            .with_store_path(store.clone())
            .map_err(|err| eyre!("{err:?}"))?;
    }

    let outcome = dispatch::run(&config, &cli.command).map_err(|err| eyre!("{err:?}"))?;
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn log_filter(level: &str) -> String {
    format!("remex={level},remex_cli={level},remex_core={level},remex_domain={level}")
}

fn emit_output(cli: &RemexCli, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();

    if cli.json {
        let payload = json!({
            "status": outcome.status,
            "message": outcome.message,
            "details": outcome.details,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if is_passthrough(&outcome.details) {
        println!("{}", outcome.message);
    } else {
        match outcome.status {
            CommandStatus::Ok => println!("remex: {}", outcome.message),
            CommandStatus::UserError | CommandStatus::Failure => {
                eprintln!("remex: {}", outcome.message);
            }
        }
    }

    Ok(code)
}

fn is_passthrough(details: &Value) -> bool {
    details
        .as_object()
        .and_then(|map| map.get("passthrough"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_covers_every_workspace_crate() {
        let filter = log_filter("trace");
        for target in ["remex_cli", "remex_core", "remex_domain"] {
            assert!(filter.contains(&format!("{target}=trace")), "{filter}");
        }
    }
}
