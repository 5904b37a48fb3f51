// CLI application
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use loopbound_cli::commands::{analyze, check_config, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loopbound")]
#[command(about = "Static loop trip-count estimation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Estimate trip counts for every loop of an IR module
    Analyze {
        /// Path to the IR module (JSON)
        #[arg(short, long)]
        module: PathBuf,

        /// Path to the analysis configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    CheckConfig {
        /// Path to the analysis configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            module,
            config,
            format,
            output,
        } => {
            let pb = create_progress_bar("Analyzing loops...");
            let report = analyze(&module, &config, format, output.as_deref());
            pb.finish_and_clear();
            let report = report?;
            log::info!("Analysis complete: {} loops", report.len());
        }
        Commands::CheckConfig { config } => {
            check_config(&config)?;
        }
    }

    Ok(())
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}
