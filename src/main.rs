//! dnsmasq-admin: administrative tool for a dnsmasq server.
//!
//! Entry point for the dnsmasq-admin application.

use std::process::ExitCode;

use dnsmasq_admin::settings::{Cli, Command, ValidatedSettings, write_default_settings};

mod app;
mod run;

use app::{exit_code, print_settings_hint, setup_tracing};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Handle init before touching the runtime or settings validation.
    if let Some(Command::Init { output }) = &cli.command {
        return handle_init(output);
    }

    let settings = match ValidatedSettings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Settings error: {e}");
            print_settings_hint(&e);
            return exit_code::SETTINGS_ERROR;
        }
    };

    setup_tracing(settings.verbose);
    tracing::debug!("{settings}");

    // With no subcommand, show the effective configuration.
    let command = cli.command.unwrap_or(Command::Show {
        sources: false,
        json: false,
    });

    run_application(settings, command)
}

/// Handles the `init` subcommand.
fn handle_init(output: &std::path::Path) -> ExitCode {
    match write_default_settings(output) {
        Ok(()) => {
            println!("Settings template written to: {}", output.display());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::SETTINGS_ERROR
        }
    }
}

/// Runs the selected command on a fresh Tokio runtime.
fn run_application(settings: ValidatedSettings, command: Command) -> ExitCode {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    match runtime.block_on(run::execute(settings, command)) {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            exit_code::runtime_error()
        }
    }
}
