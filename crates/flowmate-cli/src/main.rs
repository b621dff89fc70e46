mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use flowmate_core::config::get_data_dir;
use std::path::PathBuf;

use commands::session::QueueAction;

#[derive(Parser)]
#[command(name = "flowmate")]
#[command(about = "Focus sessions with an attention coach", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the focus daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the focus daemon
    Stop,
    /// Show the running session
    Status,
    /// Break a goal into focus steps
    Plan {
        /// What you want to get done
        goal: String,
        /// Start the plan right away
        #[arg(short, long)]
        yes: bool,
        /// Also write the plan to a JSON file for editing
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Start the planned session
    Confirm {
        /// Start these tasks instead of the pending plan
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Finish the current focus interval or break early
    Complete,
    /// Drop the whole session
    Abandon,
    /// Pause the focus timer
    Pause,
    /// Resume the focus timer
    Resume,
    /// Turn attention supervision on or off
    Supervise {
        #[arg(value_enum)]
        mode: Toggle,
    },
    /// Inspect or edit the task queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Today's sessions and top distractions
    Stats,
    /// Coaching summary of today
    Report,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Get a configuration value (e.g., ai.model)
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value; an empty value clears it
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// List all configuration
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    match cli.command {
        Commands::Start => commands::daemon::start_daemon(&data_dir),
        Commands::DaemonInternalStart => commands::daemon::run_daemon_process().await,
        Commands::Stop => commands::daemon::stop_daemon(&data_dir).await,
        Commands::Status => commands::daemon::show_status(&data_dir).await,
        Commands::Plan { goal, yes, out } => {
            commands::session::plan(&goal, yes, out.as_deref()).await
        }
        Commands::Confirm { file } => commands::session::confirm(file.as_deref()).await,
        Commands::Complete => commands::session::complete().await,
        Commands::Abandon => commands::session::abandon().await,
        Commands::Pause => commands::session::set_task_pause(true).await,
        Commands::Resume => commands::session::set_task_pause(false).await,
        Commands::Supervise { mode } => {
            commands::session::set_supervision(matches!(mode, Toggle::On)).await
        }
        Commands::Queue { action } => commands::session::handle_queue_command(action).await,
        Commands::Stats => commands::stats::handle_stats_command(),
        Commands::Report => commands::stats::handle_report_command().await,
        Commands::Config { action } => match action {
            ConfigAction::Get { key } => commands::config::handle_config_get(&key),
            ConfigAction::Set { key, value } => commands::config::handle_config_set(&key, &value),
            ConfigAction::List => commands::config::handle_config_list(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_arguments() {
        let cli = Cli::parse_from(["flowmate", "plan", "write report", "--yes"]);
        match cli.command {
            Commands::Plan { goal, yes, out } => {
                assert_eq!(goal, "write report");
                assert!(yes);
                assert!(out.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_supervise_toggle() {
        let cli = Cli::parse_from(["flowmate", "supervise", "off"]);
        assert!(matches!(
            cli.command,
            Commands::Supervise { mode: Toggle::Off }
        ));
        assert!(Cli::try_parse_from(["flowmate", "supervise", "maybe"]).is_err());
    }
}
