use std::path::PathBuf;

use atty::Stream;
use clap::{ArgAction, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use pyb_core::{BundleVenvRequest, CommandContext, CommandStatus, ExecutionOutcome, GlobalOptions};
use serde_json::Value;

mod style;

use style::Style;

const BUNDLE_VENV: &str = "bundle venv";

#[derive(Parser, Debug)]
#[command(
    name = "pyb",
    version,
    about = "Bundle a Python project and its locked dependencies into a virtual environment",
    disable_help_subcommand = true
)]
#[allow(clippy::struct_excessive_bools)]
struct PybCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
enum CommandGroupCli {
    /// Bundle the current project.
    #[command(subcommand)]
    Bundle(BundleCommand),
}

#[derive(Subcommand, Debug)]
enum BundleCommand {
    /// Bundle the project, its locked dependencies and a wheel of itself into a virtual environment.
    Venv {
        #[arg(value_name = "PATH", help = "Where to create the virtual environment")]
        path: PathBuf,
        #[arg(
            short,
            long,
            value_name = "EXE",
            help = "Python executable or name to create the environment with"
        )]
        python: Option<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PybCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };
    let ctx = CommandContext::new(&global);

    let outcome = match &cli.command {
        CommandGroupCli::Bundle(BundleCommand::Venv { path, python }) => {
            let request = BundleVenvRequest {
                path: path.clone(),
                python: python.clone(),
            };
            pyb_core::bundle_venv(&ctx, &request)
                .map_err(|err: anyhow::Error| eyre!("{err:#}"))?
        }
    };
    let code = emit_output(&cli, BUNDLE_VENV, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_filter(level);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn tracing_filter(level: &str) -> String {
    format!("pyb={level},pyb_cli={level},pyb_core={level},pyb_domain={level}")
}

fn emit_output(cli: &PybCli, command: &str, outcome: &ExecutionOutcome) -> Result<i32> {
    let status_code = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };
    let code = outcome.exit_code().unwrap_or(status_code);

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = pyb_core::to_json_response(command, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !cli.quiet || outcome.status != CommandStatus::Ok {
        let message = pyb_core::format_status_message(command, &outcome.message);
        let line = style.status(&outcome.status, &message);
        if outcome.status == CommandStatus::Ok {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
        if let Some(hint) = outcome.hint() {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
        for link in solution_links(&outcome.details) {
            eprintln!("{}", style.link(link));
        }
    }

    Ok(code)
}

fn solution_links(details: &Value) -> Vec<&str> {
    details
        .get("solution")
        .and_then(|solution| solution.get("links"))
        .and_then(Value::as_array)
        .map(|links| links.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
