mod terminal;

use anyhow::{bail, Context, Result};
use clap::Parser;
use greeting_data::{
    ClientCredential, FestivalType, GeminiClient, GenerationEvent, GenerationOrchestrator, GreetingConfig,
    MediaKind, ResourceStore, StateAction, TargetAudience, TaskError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Generate a festival greeting with optional image, narration and video
#[derive(Parser, Debug)]
#[command(name = "greeting-studio", version)]
struct Args {
    /// Festival id or label, e.g. `mid-autumn` or `中秋节`
    #[arg(long, default_value_t = FestivalType::default())]
    festival: FestivalType,

    /// Audience id or label, e.g. `family` or `家人`
    #[arg(long, default_value_t = TargetAudience::default())]
    audience: TargetAudience,

    #[arg(long, default_value = "")]
    keywords: String,

    /// Use this greeting instead of generating one
    #[arg(long)]
    text: Option<String>,

    #[arg(long)]
    image: bool,

    #[arg(long)]
    audio: bool,

    /// Requires a billing-enabled API key
    #[arg(long)]
    video: bool,

    /// Where artifacts are written (default: config, then current directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Config file to use instead of the per-user one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never ask for a key; only the configured one is used
    #[arg(long)]
    no_prompt: bool,
}

async fn print_events(mut events: UnboundedReceiver<GenerationEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            GenerationEvent::Started(task) => eprintln!("… {} 生成中", task),
            GenerationEvent::Finished(task) => log::debug!("{task} task settled"),
            GenerationEvent::Alert { message, .. } => eprintln!("⚠ {message}"),
            GenerationEvent::CredentialSelectionRequested => {
                log::info!("Opening credential selection")
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting Greeting Studio");

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GreetingConfig::load_from(path),
        None => GreetingConfig::load(),
    }
    .with_env_overrides();
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let client = GeminiClient::new(&config);
    log::info!("Using endpoint {}", client.get_url());
    if !client.has_key() {
        log::warn!("No API key configured; set GEMINI_API_KEY");
    }

    let credentials = if args.no_prompt {
        ClientCredential::fixed(client.clone())
    } else {
        ClientCredential::new(client.clone(), terminal::stdin_prompt())
    };

    let (tx, rx) = unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let orchestrator = GenerationOrchestrator::new(
        config,
        Arc::new(client),
        Arc::new(credentials),
        ResourceStore::new(),
    )
    .with_events(tx);
    orchestrator.refresh_credential_status().await;

    orchestrator.handle_action(StateAction::SetFestival(args.festival));
    orchestrator.handle_action(StateAction::SetAudience(args.audience));
    orchestrator.handle_action(StateAction::SetKeywords(args.keywords.clone()));

    let mut failures = 0;
    match &args.text {
        Some(text) => orchestrator.handle_action(StateAction::EditText(text.clone())),
        None => failures += orchestrator.generate_text().await.is_err() as usize,
    }
    println!("{}", orchestrator.snapshot().generated_text);

    let (image, audio) = tokio::join!(
        async {
            if args.image {
                orchestrator.generate_image().await
            } else {
                Ok(())
            }
        },
        async {
            if args.audio {
                orchestrator.generate_audio().await
            } else {
                Ok(())
            }
        }
    );
    failures += image.is_err() as usize + audio.is_err() as usize;

    if args.video {
        let mut result = orchestrator.generate_video().await;
        // One retry once a new key has been entered; a rejected key is
        // cleared, so it never counts
        if matches!(result, Err(TaskError::CredentialRequired { .. }))
            && orchestrator.has_valid_credential()
        {
            result = orchestrator.generate_video().await;
        }
        failures += result.is_err() as usize;
    }

    let state = orchestrator.snapshot();
    for kind in [MediaKind::Image, MediaKind::Audio, MediaKind::Video] {
        if let Some(handle) = state.resource(kind) {
            let path = orchestrator
                .resources()
                .save(handle, &output_dir)
                .with_context(|| format!("Failed to save {}", handle.file_name()))?;
            println!("{}", path.display());
        }
    }

    drop(orchestrator);
    printer.await.context("Event printer stopped unexpectedly")?;

    if failures > 0 {
        bail!("{failures} generation stage(s) failed");
    }
    Ok(())
}
