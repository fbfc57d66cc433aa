//! CLI for Retouch - AI photo editing and creation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use retouch::server::{GeminiClient, ServerConfig};
use retouch::{ApiClient, AspectRatio, ImageAsset, Phase, Session, STYLE_OPTIONS};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Edit photos or create images from text via AI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Orchestration endpoint URL (client commands)
    #[arg(
        long,
        global = true,
        default_value = "http://127.0.0.1:8787/api/retouch"
    )]
    endpoint: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestration endpoint
    Serve(ServeArgs),

    /// Edit an existing photo according to a description
    Edit(EditArgs),

    /// Create a new image from a text description
    Create(CreateArgs),

    /// List the available styles
    Styles,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: String,
}

#[derive(Args)]
struct EditArgs {
    /// The photo to edit
    #[arg(short, long)]
    input: PathBuf,

    /// Free-text description of the changes
    instruction: String,

    /// Style identifier (see `retouch styles`)
    #[arg(short, long, default_value = "realista")]
    style: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct CreateArgs {
    /// Text description of the desired image
    prompt: String,

    /// Style identifier (see `retouch styles`)
    #[arg(short, long, default_value = "realista")]
    style: String,

    /// Aspect ratio
    #[arg(short, long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retouch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let upstream = Arc::new(GeminiClient::new(ServerConfig::from_env()?)?);
            retouch::server::serve(&args.bind, upstream).await?;
        }
        Commands::Edit(args) => {
            edit_photo(args, &cli.endpoint).await?;
        }
        Commands::Create(args) => {
            create_image(args, &cli.endpoint).await?;
        }
        Commands::Styles => {
            for style in STYLE_OPTIONS {
                println!("{:18} {}", style.id, style.label);
            }
        }
    }

    Ok(())
}

async fn edit_photo(args: EditArgs, endpoint: &str) -> anyhow::Result<()> {
    let mut session = Session::new(ApiClient::new(endpoint));
    session.attach_image(ImageAsset::from_bytes(std::fs::read(&args.input)?)?);
    session.set_instruction(&args.instruction);
    session.set_style(&args.style);

    session.submit_edit().await?;
    settle(&session, &args.output)
}

async fn create_image(args: CreateArgs, endpoint: &str) -> anyhow::Result<()> {
    let mut session = Session::new(ApiClient::new(endpoint));
    session.choose_create();
    session
        .submit_creation(&args.prompt, &args.style, args.aspect_ratio.into())
        .await?;
    settle(&session, &args.output)
}

fn settle(session: &Session, output: &PathBuf) -> anyhow::Result<()> {
    match session.phase() {
        Phase::Succeeded(result) => {
            result.image.save(output)?;
            println!("Saved {} ({} bytes)", output.display(), result.image.size());
            if let Some(summary) = &result.summary {
                println!("{summary}");
            }
            Ok(())
        }
        Phase::Failed(message) => anyhow::bail!("{message}"),
        other => anyhow::bail!("unexpected session phase: {other:?}"),
    }
}
