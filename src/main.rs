use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use termtube::capability;
use termtube::cli::Cli;
use termtube::media::{self, MediaDescriptor, MediaKind};
use termtube::player::{Player, PlayerConfig};
use termtube::utils::format_duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    info!("Starting TermTube v{}", env!("CARGO_PKG_VERSION"));

    let descriptor = media::describe(&cli.file_path)
        .with_context(|| format!("cannot play {}", cli.file_path.display()))?;
    print_media_info(&cli, &descriptor);

    if cli.info_only {
        print_terminal_info();
        return Ok(());
    }

    // An interrupt flips the shared flag; the play loop observes it
    // between frames and runs the normal teardown path.
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_cancel = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_cancel.store(true, Ordering::SeqCst);
    })
    .context("failed to install the interrupt handler")?;

    let config = PlayerConfig {
        volume: cli.volume,
        brightness: cli.brightness,
        contrast: cli.contrast,
        forced_transport: cli.forced_transport(),
        fps_override: cli.fps,
        enable_audio: !cli.no_audio,
    };

    let mut player = Player::new(cli.file_path.clone(), descriptor, config, cancel);
    let stats = player.run().await?;

    println!("Playback statistics:");
    println!("  Frames rendered: {}", stats.frames_rendered);
    println!("  Frames dropped:  {}", stats.frames_dropped);
    println!("  Drop rate:       {:.1}%", stats.drop_rate * 100.0);
    println!("  Average FPS:     {:.1}", stats.fps);

    Ok(())
}

fn print_media_info(cli: &Cli, descriptor: &MediaDescriptor) {
    info!(
        "Media: {} ({:?}) {}x{}",
        cli.file_path.display(),
        descriptor.kind,
        descriptor.width,
        descriptor.height
    );
    if descriptor.kind != MediaKind::Still {
        info!(
            "       {:.2} FPS, {} frames, {}",
            descriptor.fps,
            descriptor.frame_count,
            format_duration(descriptor.duration)
        );
    }
    if let Some(codec) = &descriptor.video_codec {
        info!("       video codec: {}", codec);
    }
    if descriptor.has_audio {
        info!(
            "       audio: {}",
            descriptor.audio_codec.as_deref().unwrap_or("unknown codec")
        );
    }
}

fn print_terminal_info() {
    let caps = capability::detect();
    println!("Terminal: {}x{}", caps.width, caps.height);
    println!("SIXEL support: {}", caps.sixel);
    println!("True color (24-bit): {}", caps.true_color);
    println!("256 colors: {}", caps.color256);
    println!("Unicode support: {}", caps.unicode);
    println!("Preferred transport: {}", caps.preferred_transport());
    for name in ["TERM", "TERM_PROGRAM", "COLORTERM", "WT_SESSION", "OS"] {
        if let Ok(value) = std::env::var(name) {
            println!("{}: {}", name, value);
        }
    }
}
