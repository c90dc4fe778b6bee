//! CLI for imagegen - fetch or generate one image per prompt.

use clap::{Args, Parser, Subcommand};
use imagegen::{BackendSelection, ImageConfig, ImageDispatcher, ImagePrompt, ImageResult};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imagegen")]
#[command(about = "Get an image for a prompt from Pexels, Pixabay, Gemini, DALL-E 3 or a local server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire an image for a text prompt
    Generate(GenerateArgs),

    /// List backends and how they are configured
    Providers,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Theme folded into the prompt for generative backends
    #[arg(short, long)]
    theme: Option<String>,

    /// Directory generated images are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Backend to use (overrides IMAGE_PROVIDER)
    #[arg(short, long)]
    provider: Option<BackendSelection>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("imagegen=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Providers => list_providers(cli.json)?,
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let mut config = ImageConfig::from_env();
    if let Some(provider) = args.provider {
        config.disable_image_generation = provider == BackendSelection::Disabled;
        config.image_provider = Some(provider.to_string());
    }

    std::fs::create_dir_all(&args.output_dir)?;
    let dispatcher = ImageDispatcher::from_config(&args.output_dir, &config)?;

    let mut prompt = ImagePrompt::new(&args.prompt);
    if let Some(theme) = args.theme {
        prompt = prompt.with_theme(theme);
    }

    let result = dispatcher.generate(&prompt).await;

    if json_output {
        let out = serde_json::json!({
            "success": !result.is_placeholder(),
            "provider": dispatcher.selection().map(|s| s.to_string()),
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        match &result {
            ImageResult::RemoteUrl(url) => println!("Image URL: {url}"),
            ImageResult::SavedFile { path, .. } => println!("Saved image: {}", path.display()),
            ImageResult::Placeholder(path) => println!("Using placeholder: {path}"),
        }
    }

    Ok(())
}

fn list_providers(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderInfo {
        name: &'static str,
        kind: &'static str,
        stock: bool,
        env_var: &'static str,
        configured: bool,
    }

    let config = ImageConfig::from_env();
    let providers: Vec<ProviderInfo> = BackendSelection::PRIORITY
        .into_iter()
        .filter_map(|backend| {
            let env_var = backend.env_var()?;
            let configured = match backend {
                BackendSelection::Pixabay => config.pixabay_api_key.is_some(),
                BackendSelection::Pexels => config.pexels_api_key.is_some(),
                BackendSelection::GeminiFlash => config.google_api_key.is_some(),
                BackendSelection::DallE3 => config.openai_api_key.is_some(),
                BackendSelection::LocalServer => config.local_image_url.is_some(),
                BackendSelection::Disabled => false,
            };
            Some(ProviderInfo {
                name: backend.display_name(),
                kind: backend.as_str(),
                stock: backend.is_stock(),
                env_var,
                configured,
            })
        })
        .collect();
    let active = config.resolve().map(|s| s.to_string());

    if json_output {
        let out = serde_json::json!({ "active": active, "providers": providers });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Available providers:\n");
        for p in &providers {
            let status = if p.configured { "✓" } else { "✗" };
            let source = if p.stock { "stock" } else { "generative" };
            println!("  {} {} ({}, {})", status, p.name, p.kind, source);
            println!("    {}", p.env_var);
        }
        println!(
            "\nActive: {}",
            active.as_deref().unwrap_or("none (placeholder only)")
        );
    }

    Ok(())
}
