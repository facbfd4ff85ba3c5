use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "taper-cli", version, about = "Taper CLI")]
struct Cli {
    /// Account the command operates on
    #[arg(long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Smoke and wake event intake
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Daily scores and progression
    Score {
        #[command(subcommand)]
        action: commands::score::ScoreAction,
    },
    /// Shield bank
    Shield {
        #[command(subcommand)]
        action: commands::shield::ShieldAction,
    },
    /// Weekly maintenance day
    Maintenance {
        #[command(subcommand)]
        action: commands::maintenance::MaintenanceAction,
    },
    /// Per-user settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Event { action } => commands::event::run(&cli.user, action),
        Commands::Score { action } => commands::score::run(&cli.user, action),
        Commands::Shield { action } => commands::shield::run(&cli.user, action),
        Commands::Maintenance { action } => commands::maintenance::run(&cli.user, action),
        Commands::Settings { action } => commands::settings::run(&cli.user, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
