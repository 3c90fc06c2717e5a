use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use speakdr::app::App;
use speakdr::config::Config;
use speakdr::content::{Dialog, Library};
use speakdr::engine::Mode;
use speakdr::event::EventHandler;
use speakdr::voice::console::{ConsoleRecognizer, ConsoleSpeaker};

#[derive(Parser)]
#[command(name = "speakdr", version, about = "Spoken dialogue practice for English learners")]
struct Cli {
    #[arg(long, help = "List levels, categories and dialogs, then exit")]
    list: bool,

    #[arg(short, long, help = "Level to practice (e.g. A1)")]
    level: Option<String>,

    #[arg(short, long, help = "Category within the level")]
    category: Option<String>,

    #[arg(short, long, help = "Practice a single dialog by id")]
    dialog: Option<String>,

    #[arg(short, long, help = "Scoring mode (easy, normal, strict)")]
    mode: Option<Mode>,

    #[arg(short, long, help = "Speech rate, 0.7 to 1.2")]
    rate: Option<f32>,

    #[arg(long, help = "Dialog library JSON file instead of the bundled one")]
    library: Option<PathBuf>,

    #[arg(long, help = "Print session summaries as JSON when done")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SPEAKDR_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(target: "config", "ignoring unreadable config: {err:#}");
        Config::default()
    });
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(rate) = cli.rate {
        config.speech_rate = rate;
    }
    config.clamp_speech_rate();
    rust_i18n::set_locale(&config.locale);

    let library_path = cli.library.clone().or_else(|| config.library_path.clone());
    let library = Library::load(library_path.as_deref()).context("loading dialog library")?;

    if cli.list {
        print_library(&library);
        return Ok(());
    }

    let dialogs = pick_dialogs(&library, &cli)?;
    if dialogs.is_empty() {
        bail!("no dialogs to practice");
    }

    let listening = Arc::new(AtomicBool::new(false));
    let events = EventHandler::new(Arc::clone(&listening));
    let speaker = ConsoleSpeaker::new(events.sender(), config.speech_rate, &config.speech_language);
    let recognizer = ConsoleRecognizer::new(events.sender(), listening);

    println!("Type your lines when the microphone opens. :help lists commands.");
    let starting_mode = config.mode;
    let mut app = App::new(config, speaker, recognizer);
    app.run(&events, &dialogs)?;

    // Keep a mode picked with :mode for next time.
    if app.config.mode != starting_mode {
        if let Err(err) = app.config.save() {
            tracing::warn!(target: "config", "could not save config: {err:#}");
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(app.summaries())?);
    }
    Ok(())
}

fn pick_dialogs(library: &Library, cli: &Cli) -> Result<Vec<Dialog>> {
    if let Some(id) = &cli.dialog {
        return Ok(vec![library.find_dialog(id)?.dialog.clone()]);
    }
    let Some(level_id) = &cli.level else {
        return Ok(library.dialogs().map(|e| e.dialog.clone()).collect());
    };
    let Some(level) = library.level(level_id) else {
        bail!("unknown level {level_id}");
    };
    match &cli.category {
        Some(category_id) => {
            let Some(category) = library.category(&level.id, category_id) else {
                bail!("unknown category {category_id} in level {}", level.id);
            };
            Ok(category.dialogs.clone())
        }
        None => Ok(level
            .categories
            .iter()
            .flat_map(|c| c.dialogs.iter().cloned())
            .collect()),
    }
}

fn print_library(library: &Library) {
    for level in &library.levels {
        println!("{} - {}", level.id, level.name);
        for category in &level.categories {
            let premium = if category.is_premium { " (premium)" } else { "" };
            println!("  {} - {}{premium}", category.id, category.name);
            for dialog in &category.dialogs {
                println!("    {:<20} {} ({} turns)", dialog.id, dialog.title, dialog.turns.len());
            }
        }
    }
}
