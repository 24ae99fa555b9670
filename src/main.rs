use clap::{Parser, Subcommand};

mod demo;

use mediator::Config;

#[derive(Parser)]
#[command(name = "mediator")]
#[command(about = "In-process command, query and notification dispatcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "mediator.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the order demo through the mediator
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_demo(&cli.config) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("mediator v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn run_demo(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Load config
    let mut config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env()?;

    tracing::info!(
        "Starting mediator demo (publish strategy: {:?})",
        config.mediator.publish_strategy
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(demo::run(&config))?;
    Ok(())
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to mediator.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("{}", e),
    }
}
