use anyhow::{Context, Result};
use archivist::captioning::ANALYZING_MESSAGE;
use archivist::{
    AnchorSlot, AppConfig, AspectRatio, BackendFactory, BackendType, CredentialStore,
    ImageAnchor, Studio, VINTAGE_STYLES,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod terminal;

use terminal::{render_progress, TerminalCredentialStore};

const DEFAULT_CONFIG_PATH: &str = "archivist.json";

#[derive(Parser)]
#[command(name = "archivist-cli")]
#[command(about = "Archivist CLI - Turn still photos into vintage film clips")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a vintage clip
    Generate {
        /// Free-text instruction
        #[arg(short, long)]
        prompt: Option<String>,

        /// Starting frame image
        #[arg(long)]
        primary: Option<PathBuf>,

        /// Ending frame image
        #[arg(long)]
        secondary: Option<PathBuf>,

        /// Style preset id
        #[arg(short, long, default_value = "silent-cinema")]
        style: String,

        /// Aspect ratio (16:9 or 9:16)
        #[arg(short, long, default_value = "16:9")]
        aspect_ratio: AspectRatio,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Describe the primary frame and append it to the prompt first
        #[arg(long)]
        analyze: bool,

        /// API key (falls back to the environment, then a prompt)
        #[arg(long)]
        api_key: Option<String>,

        /// Use the in-process scripted backend
        #[arg(long)]
        mock: bool,
    },

    /// Describe an image for use as a prompt
    Analyze {
        /// Image to describe
        image: PathBuf,

        /// Existing instruction to append to
        #[arg(short, long)]
        prompt: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        mock: bool,
    },

    /// List style presets
    Styles,

    /// Check that the generation service is reachable with the current key
    Check {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        mock: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration
    Init {
        /// Destination (defaults to --config or archivist.json)
        path: Option<PathBuf>,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            prompt,
            primary,
            secondary,
            style,
            aspect_ratio,
            output,
            analyze,
            api_key,
            mock,
        } => {
            let options = GenerateOptions {
                prompt,
                primary,
                secondary,
                style,
                aspect_ratio,
                output,
                analyze,
            };
            let credentials = Arc::new(TerminalCredentialStore::new(api_key));
            generate_command(with_backend(config, mock), credentials, options).await?;
        }
        Commands::Analyze {
            image,
            prompt,
            api_key,
            mock,
        } => {
            let credentials = Arc::new(TerminalCredentialStore::new(api_key));
            analyze_command(with_backend(config, mock), credentials, &image, prompt).await?;
        }
        Commands::Styles => styles_command(),
        Commands::Check { api_key, mock } => {
            let credentials = Arc::new(TerminalCredentialStore::new(api_key));
            if !check_command(with_backend(config, mock), credentials).await? {
                anyhow::bail!("generation service is not available");
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path } => {
                let path = path
                    .or(cli.config)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
                config_init_command(&path)?;
            }
            ConfigAction::Show => config_show_command(&config)?,
        },
    }

    Ok(())
}

struct GenerateOptions {
    prompt: Option<String>,
    primary: Option<PathBuf>,
    secondary: Option<PathBuf>,
    style: String,
    aspect_ratio: AspectRatio,
    output: Option<PathBuf>,
    analyze: bool,
}

fn with_backend(config: AppConfig, mock: bool) -> AppConfig {
    if mock {
        config.with_backend(BackendType::Mock)
    } else {
        config
    }
}

async fn generate_command(
    config: AppConfig,
    credentials: Arc<dyn CredentialStore>,
    options: GenerateOptions,
) -> Result<()> {
    let mut studio = Studio::from_config(&config, credentials)?;

    studio.select_style(&options.style)?;
    studio.set_aspect_ratio(options.aspect_ratio);
    if let Some(text) = &options.prompt {
        studio.set_instruction(text.as_str());
    }
    if let Some(path) = &options.primary {
        studio.set_anchor(AnchorSlot::Primary, ImageAnchor::from_path(path)?);
    }
    if let Some(path) = &options.secondary {
        studio.set_anchor(AnchorSlot::Secondary, ImageAnchor::from_path(path)?);
    }

    if options.analyze {
        info!("{}", ANALYZING_MESSAGE);
        match studio.analyze_primary().await {
            Ok(text) => info!("Frame analysis: {}", text),
            Err(e) => warn!("Frame analysis skipped: {}", e),
        }
    }

    info!(
        "Generating with style '{}' at {} ({} anchor(s), {} backend)",
        studio.style().name,
        studio.aspect_ratio(),
        studio.anchors().count(),
        config.backend_type
    );

    let progress = tokio::spawn(render_progress(studio.subscribe()));
    let result = studio.generate().await;
    // The bar task ends on the terminal snapshot
    let _ = progress.await;
    let asset = result?;

    let dest = options.output.unwrap_or_else(|| config.output_dir.clone());
    let saved = asset.save_to(&dest)?;

    println!("Saved: {}", saved.display());
    println!("  Size: {} bytes", asset.len());
    println!("  SHA-256: {}", asset.sha256_hex());

    Ok(())
}

async fn analyze_command(
    config: AppConfig,
    credentials: Arc<dyn CredentialStore>,
    image: &Path,
    prompt: Option<String>,
) -> Result<()> {
    info!("Analyzing {}", image.display());

    let mut studio = Studio::from_config(&config, credentials)?;
    studio.set_anchor(
        AnchorSlot::Primary,
        ImageAnchor::from_path(image).with_context(|| format!("loading {}", image.display()))?,
    );
    if let Some(text) = prompt {
        studio.set_instruction(text);
    }

    info!("{}", ANALYZING_MESSAGE);
    let description = studio.analyze_primary().await?;

    println!("Description: {}", description);
    println!("Prompt: {}", studio.instruction());

    Ok(())
}

fn styles_command() {
    for style in VINTAGE_STYLES.iter() {
        println!("{:<16} {}", style.id, style.name);
        println!("{:<16} {}", "", style.description);
    }
}

async fn check_command(config: AppConfig, credentials: Arc<dyn CredentialStore>) -> Result<bool> {
    let backend = BackendFactory::video(&config, credentials)?;
    let available = backend.is_available().await?;
    println!(
        "{} backend: {}",
        backend.name(),
        if available { "available" } else { "unavailable" }
    );
    Ok(available)
}

fn config_init_command(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    AppConfig::default().save(path)?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn config_show_command(config: &AppConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["archivist-cli", "generate"]).unwrap();
        match cli.command {
            Commands::Generate {
                style,
                aspect_ratio,
                mock,
                analyze,
                ..
            } => {
                assert_eq!(style, "silent-cinema");
                assert_eq!(aspect_ratio, AspectRatio::Landscape);
                assert!(!mock);
                assert!(!analyze);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "archivist-cli",
            "--verbose",
            "generate",
            "--style",
            "noir-detective",
            "--aspect-ratio",
            "9:16",
            "--primary",
            "start.png",
            "--mock",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                style,
                aspect_ratio,
                primary,
                mock,
                ..
            } => {
                assert_eq!(style, "noir-detective");
                assert_eq!(aspect_ratio, AspectRatio::Portrait);
                assert_eq!(primary, Some(PathBuf::from("start.png")));
                assert!(mock);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_rejects_unknown_aspect_ratio() {
        assert!(Cli::try_parse_from(["archivist-cli", "generate", "-a", "4:3"]).is_err());
    }

    #[test]
    fn test_mock_flag_switches_backend() {
        let config = with_backend(AppConfig::default(), true);
        assert_eq!(config.backend_type, BackendType::Mock);
        let config = with_backend(AppConfig::default(), false);
        assert_eq!(config.backend_type, BackendType::Gemini);
    }

    #[tokio::test]
    async fn test_check_reports_backend_availability() {
        let mock = AppConfig::default().with_backend(BackendType::Mock);
        let credentials = Arc::new(TerminalCredentialStore::new(Some("k".into())));
        assert!(check_command(mock, credentials).await.unwrap());

        let gemini = AppConfig::default().with_api_base("http://127.0.0.1:9");
        let credentials = Arc::new(TerminalCredentialStore::new(Some("k".into())));
        assert!(!check_command(gemini, credentials).await.unwrap());
    }

    #[tokio::test]
    async fn test_analyze_with_mock_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, frame_png()).unwrap();

        let config = AppConfig::default().with_backend(BackendType::Mock);
        let credentials = Arc::new(TerminalCredentialStore::new(Some("k".into())));
        analyze_command(config, credentials, &path, Some("a harbor".into()))
            .await
            .unwrap();
    }

    fn frame_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_generate_with_mock_backend_saves_clip() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default()
            .with_backend(BackendType::Mock)
            .with_poll_interval(0)
            .with_output_dir(dir.path().to_path_buf());
        let credentials = Arc::new(TerminalCredentialStore::new(Some("test-key".into())));
        let options = GenerateOptions {
            prompt: Some("a tram in the fog".into()),
            primary: None,
            secondary: None,
            style: "8mm-home".into(),
            aspect_ratio: AspectRatio::Landscape,
            output: None,
            analyze: false,
        };

        generate_command(config, credentials, options).await.unwrap();

        let saved: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let name = saved[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("archivist-8mm-home-"));
    }
}
