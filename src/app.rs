//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to the command
//! handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal waveform visualizer with a seek/progress overlay
#[derive(Parser)]
#[command(name = "waveseek")]
#[command(version)]
#[command(about = "\n\n ∿∿∿∿ ")]
#[command(
    long_about = "\n\n ∿∿∿∿ \n\nA terminal waveform visualizer with a seek/progress overlay.\nThe waveform is synthesized procedurally; its loudness envelope follows a\nmanual level (Up/Down keys) or the microphone input level.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used by default.\n    Run options (-l, -i, -p) can be used without explicitly saying 'run'.\n\nEXAMPLES:\n    # Animate with the default manual level\n    $ waveseek\n\n    # Drive the wave from the microphone\n    $ waveseek -i\n    $ waveseek run --input\n\n    # Start at 80% loudness with the seek cursor at one quarter\n    $ waveseek -l 80 -p 25\n\n    # Edit configuration file\n    $ waveseek config"
)]
#[command(
    after_help = "KEYS:\n    Left/Right          Seek\n    Up/Down             Adjust manual level\n    [ / ]               Adjust scroll speed\n    Space               Pause/resume\n    c                   Toggle seek cursor\n    q / Escape          Quit\n\nCONFIGURATION:\n    Config file:        ~/.config/waveseek/waveseek.toml\n    Logs:               ~/.local/state/waveseek/waveseek.log.*"
)]
struct Cli {
    /// Initial manual level, 0-100 (run default command)
    #[arg(short, long, global = true, value_name = "LEVEL")]
    level: Option<u8>,

    /// Drive the level from the microphone input (run default command)
    #[arg(short, long, global = true)]
    input: bool,

    /// Initial seek position, 0-100 (run default command)
    #[arg(short, long, global = true, value_name = "PERCENT")]
    progress: Option<u8>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Animate the waveform (default)
    ///
    /// Left/Right seek, Up/Down adjust the manual level, Space pauses,
    /// 'c' toggles the cursor, 'q'/Escape quits. SIGUSR1 toggles pause
    /// externally.
    #[command(visible_alias = "r")]
    Run {
        /// Initial manual level, 0-100
        #[arg(short, long, value_name = "LEVEL")]
        level: Option<u8>,

        /// Drive the level from the microphone input
        #[arg(short, long)]
        input: bool,

        /// Initial seek position, 0-100
        #[arg(short, long, value_name = "PERCENT")]
        progress: Option<u8>,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Edit wave geometry, animation, and audio metering settings.
    /// Uses $EDITOR environment variable or falls back to nano/vim.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the metering input device in waveseek.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Save the output to your shell's completion directory or source it
    /// directly.
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "waveseek", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Run { .. }) => {
            // Default command is run. Top-level options apply unless the
            // explicit run command overrides them.
            let (level, input, progress) = match cli.command {
                Some(Commands::Run {
                    level,
                    input,
                    progress,
                }) => (level, input, progress),
                None => (cli.level, cli.input, cli.progress),
                _ => unreachable!(),
            };
            commands::handle_run(commands::RunOptions {
                level,
                input,
                progress,
            })
            .await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
