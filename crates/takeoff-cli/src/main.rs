use clap::{Parser, Subcommand};

use takeoff_cli::commands;

/// Takeoff -- engineering drawing analysis with result caching.
#[derive(Parser)]
#[command(name = "takeoff", about = "Takeoff -- engineering drawing analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a drawing file for industry elements and compliance.
    Analyze(commands::analyze::AnalyzeArgs),
    /// List enabled compliance regions and their standards.
    Regions(commands::regions::RegionsArgs),
    /// Show model metadata or retrain from collected feedback.
    Model(commands::model::ModelArgs),
    /// Inspect or clear the result cache.
    Cache(commands::cache::CacheArgs),
    /// Submit a correction to a detection result.
    Feedback(commands::feedback::FeedbackArgs),
    /// Show or validate Takeoff configuration.
    Config(commands::config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(args),
        Commands::Regions(args) => commands::regions::execute(args),
        Commands::Model(args) => commands::model::execute(args),
        Commands::Cache(args) => commands::cache::execute(args),
        Commands::Feedback(args) => commands::feedback::execute(args),
        Commands::Config(args) => commands::config::execute(args),
    };

    match result {
        Ok(code) => takeoff_cli::terminate(code),
        Err(err) => {
            eprintln!("takeoff: error: {err:#}");
            takeoff_cli::terminate(takeoff_cli::ExitCode::AnalysisFailed)
        }
    }
}
