use anyhow::Result;
use clap::Parser;
use signage_engine::app::App;
use signage_engine::config::{BackendKindConfig, Config};
use signage_engine::template::Template;
use signage_engine::utils::fs::expand_tilde;
use tracing_subscriber::EnvFilter;

/// Multi-zone digital signage playback controller.
#[derive(Parser, Debug)]
#[command(name = "signage-engine", version, about)]
struct Cli {
    /// Path to the runtime config file. Defaults to the platform config directory.
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the zone layout template (TOML).
    #[arg(short, long)]
    template: String,

    /// Override the configured screen width, in pixels.
    #[arg(long)]
    screen_width: Option<u32>,

    /// Override the configured screen height, in pixels.
    #[arg(long)]
    screen_height: Option<u32>,

    /// Override the configured playback backend.
    #[arg(long, value_enum)]
    backend: Option<CliBackendKind>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliBackendKind {
    Embedded,
    Subprocess,
}

impl From<CliBackendKind> for BackendKindConfig {
    fn from(kind: CliBackendKind) -> Self {
        match kind {
            CliBackendKind::Embedded => BackendKindConfig::Embedded,
            CliBackendKind::Subprocess => BackendKindConfig::Subprocess,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(|p| expand_tilde(p).map(|p| p.display().to_string()))
        .transpose()?;
    let mut config = Config::load_or_default(config_path.as_ref())?;
    if let Some(width) = cli.screen_width {
        config.display.screen_width = width;
    }
    if let Some(height) = cli.screen_height {
        config.display.screen_height = height;
    }
    if let Some(backend) = cli.backend {
        config.backend.kind = backend.into();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let template_path = expand_tilde(&cli.template)?;
    let template = Template::load(&template_path)?;

    let mut app = App::new(config, template).await?;
    app.run().await?;

    Ok(())
}
