use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use panel_cli::{build_controller, AppConfig, Overrides};
use panel_mask::{
    io::{geojson::load_detections_for, load_image},
    ImageDimensions, SessionCommand, SessionController,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PanelArgs {
    /// Path to the panel image
    #[arg(short, long)]
    input: PathBuf,
    /// GeoJSON detections to use instead of running the detectors
    #[arg(short, long)]
    detections: Option<PathBuf>,
    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Dilation radius for text boxes
    #[arg(long)]
    text_padding: Option<u32>,
    /// Dilation radius for sound effect polygons
    #[arg(long)]
    sound_padding: Option<u32>,
    /// Leave text boxes out of the mask
    #[arg(long)]
    no_text: bool,
    /// Leave sound effects out of the mask
    #[arg(long)]
    no_sound: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the mask and write the red-highlighted preview
    Preview {
        #[command(flatten)]
        panel: PanelArgs,
        /// Where to save the preview
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inpaint the masked regions
    Remove {
        #[command(flatten)]
        panel: PanelArgs,
        /// Where to save the cleaned panel
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the detectors and save their regions as GeoJSON
    Detect {
        /// Path to the panel image
        #[arg(short, long)]
        input: PathBuf,
        /// GeoJSON output path
        #[arg(short, long)]
        output: PathBuf,
        /// Configuration file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration
    InitConfig {
        /// Output path (.toml or .json)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the JSON schema of session commands
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Preview { panel, output } => {
            let controller = open_panel(panel).await?;
            if let Some(output) = output {
                controller.save(output)?;
                info!("Preview saved to {:?}", output);
            }
            println!("{}", serde_json::to_string_pretty(&controller.status())?);
        }
        Commands::Remove { panel, output } => {
            let controller = open_panel(panel).await?;
            controller.execute(SessionCommand::RemoveRegions).await?;
            controller.save(output)?;
            info!("Cleaned panel saved to {:?}", output);
        }
        Commands::Detect { input, output, config } => {
            let controller = build_controller(&load_config(config.as_deref())?);
            controller.load_image(input).await?;
            let (detections, dims) = controller
                .detections()
                .ok_or_else(|| eyre!("no session after loading {:?}", input))?;
            detections.save_geojson(dims, output)?;
            info!(
                "Saved {} text boxes and {} sound effects to {:?}",
                detections.text.len(),
                detections.sound.len(),
                output
            );
        }
        Commands::InitConfig { output } => {
            AppConfig::default().save(output)?;
            info!("Default configuration written to {:?}", output);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&SessionCommand::schema())?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    })
}

async fn open_panel(panel: &PanelArgs) -> Result<SessionController> {
    let mut config = load_config(panel.config.as_deref())?;
    Overrides {
        text_padding: panel.text_padding,
        sound_padding: panel.sound_padding,
        no_text: panel.no_text,
        no_sound: panel.no_sound,
    }
    .apply(&mut config.pipeline);

    let controller = build_controller(&config);
    let status = match &panel.detections {
        Some(detections) => {
            let image = load_image(&panel.input)?;
            let detections = load_detections_for(detections, ImageDimensions::of(&image))?;
            controller.load_with_detections(image, detections, Some(panel.input.clone()))?
        }
        None => controller.load_image(&panel.input).await?,
    };

    info!(
        "Loaded {:?}: {} text boxes, {} sound effects, {} masked pixels",
        panel.input, status.text_regions, status.sound_regions, status.active_pixels
    );
    Ok(controller)
}
