use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(name = "timeruler", version, about = "Timeruler CLI")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit today's schedule
    Schedule {
        #[command(flatten)]
        source: commands::ScheduleSource,
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Follow the current task and announce changes
    Watch {
        #[command(flatten)]
        source: commands::ScheduleSource,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Schedule { source, action } => commands::schedule::run(&source, action),
        Commands::Watch { source } => commands::watch::run(&source),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
