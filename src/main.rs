use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use multidash::commands::Session;
use multidash::config::AppConfig;
use multidash::core::AutoRotateUpdate;
use std::path::PathBuf;
use std::time::Duration;

/// multidash - multi-dashboard widget and data source manager
#[derive(Parser, Debug)]
#[command(name = "multidash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dashboard state file
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Backend proxy base URL
    #[arg(long, value_name = "URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List dashboards (current marked with *)
    Dashboards,
    /// Create a dashboard and make it current
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a dashboard (the last one cannot be deleted)
    Delete { id: String },
    /// Make a dashboard current
    Switch { id: String },
    /// Go to the next dashboard
    Next,
    /// Go to the previous dashboard
    Previous,
    /// List registered widget types
    WidgetTypes,
    /// List data source types
    SourceTypes,
    /// Add a widget of the given type to the current dashboard
    AddWidget { widget_type: String },
    /// Remove a widget from the current dashboard
    RemoveWidget { id: String },
    /// Fetch once from a data source config file and print the result
    Fetch { config: PathBuf },
    /// Change auto-rotation settings
    Rotate {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        /// Seconds between rotations
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long, value_name = "BOOL")]
        pause_on_hover: Option<bool>,
    },
    /// Bind widgets, rotate dashboards and log rendered widgets until Ctrl-C
    /// (rendered lines are logged at info, so pass -d 1)
    Run {
        /// Seconds between renders
        #[arg(long, default_value = "5")]
        render_every: u64,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            AppConfig::default()
        }),
    };
    if let Some(backend) = &cli.backend {
        config.backend_url = backend.clone();
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Level 0 (default): warn only, 1: info, 2: debug, 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = load_config(&cli)?;
    let session = Session::open(config, cli.state.clone())?;

    match cli.command {
        Command::Dashboards => {
            for line in session.list_dashboards()? {
                println!("{}", line);
            }
        }
        Command::Create { name, description } => {
            let dashboard = session.create_dashboard(&name, description)?;
            println!("{}", dashboard.id);
        }
        Command::Delete { id } => session.delete_dashboard(&id)?,
        Command::Switch { id } => session.switch_dashboard(&id)?,
        Command::Next | Command::Previous => {
            let forward = matches!(cli.command, Command::Next);
            match session.rotate(forward)? {
                Some(id) => println!("{}", id),
                None => println!("No dashboards"),
            }
        }
        Command::WidgetTypes => {
            for line in session.widget_types() {
                println!("{}", line);
            }
        }
        Command::SourceTypes => {
            for line in session.source_types() {
                println!("{}", line);
            }
        }
        Command::AddWidget { widget_type } => {
            let widget = session.add_widget(&widget_type)?;
            println!(
                "{} at x={} y={} ({}x{})",
                widget.id, widget.layout.x, widget.layout.y, widget.layout.w, widget.layout.h
            );
        }
        Command::RemoveWidget { id } => {
            if !session.remove_widget(&id)? {
                anyhow::bail!("Widget not found on the current dashboard: {}", id);
            }
        }
        Command::Fetch { config } => {
            let content = std::fs::read_to_string(&config)
                .with_context(|| format!("Failed to read {}", config.display()))?;
            let source: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", config.display()))?;
            let data = session.fetch(&source).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Command::Rotate {
            enable,
            disable,
            interval,
            pause_on_hover,
        } => {
            let enabled = match (enable, disable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let settings = session.set_auto_rotate(AutoRotateUpdate {
                enabled,
                interval,
                pause_on_hover,
            })?;
            println!(
                "enabled={} interval={}s pause_on_hover={}",
                settings.enabled, settings.interval, settings.pause_on_hover
            );
        }
        Command::Run { render_every } => {
            warn!("Starting multidash v{}", env!("CARGO_PKG_VERSION"));
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
            };
            session
                .run(Duration::from_secs(render_every.max(1)), shutdown)
                .await?;
        }
    }

    Ok(())
}
