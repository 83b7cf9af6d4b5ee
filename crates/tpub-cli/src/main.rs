use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tpub_core::{
    outcome_from_error, CommandContext, CommandGroup, GlobalOptions, SharedEffects, SystemEffects,
};

mod cli;
mod output;
mod style;

use cli::{release_request_from_args, TpubCli};
use output::{emit_output, OutputOptions};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = TpubCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        no_color: cli.no_color,
    };
    let group = cli.command.map_or(CommandGroup::Release, |command| command.group());
    let request = release_request_from_args(&cli.release);

    let effects: SharedEffects = Arc::new(SystemEffects::new());
    let outcome = match CommandContext::new(&global, effects) {
        Ok(ctx) => tpub_core::execute(&ctx, group, &request),
        Err(err) => outcome_from_error(&err),
    };

    let opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };
    let code = emit_output(&opts, group, &outcome)?;

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

    // Logs go to stderr so stdout stays reserved for the result line or JSON.
    let filter = format!("tpub={level},tpub_core={level},tpub_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
