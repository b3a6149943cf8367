use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use whyteboard::config::{self, validate_canvas_dimension, Preferences, RecentFiles, LANGUAGES};
use whyteboard::wtbd;
use whyteboard::Notebook;

/// Whiteboard document tool: inspect and validate .wtbd save files
#[derive(Parser, Debug)]
#[command(name = "whyteboard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Save file to open
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Default canvas width for new documents
    #[arg(long, value_name = "PIXELS")]
    width: Option<u32>,

    /// Default canvas height for new documents
    #[arg(long, value_name = "PIXELS")]
    height: Option<u32>,

    /// Interface language for this session
    #[arg(long, value_name = "LANGUAGE")]
    lang: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config_dir = config::default_config_dir();
    let mut prefs = Preferences::load(&config_dir.join("preferences.json"))?;

    // CLI overrides are session-only and validated like the preference.
    if let Some(width) = args.width {
        validate_canvas_dimension("width", width)?;
        prefs.canvas_width = width;
    }
    if let Some(height) = args.height {
        validate_canvas_dimension("height", height)?;
        prefs.canvas_height = height;
    }
    if let Some(lang) = args.lang {
        anyhow::ensure!(
            LANGUAGES.contains(&lang.as_str()),
            "unsupported language {lang:?}; choose one of {LANGUAGES:?}"
        );
        prefs.language = lang;
    }

    match args.file {
        Some(path) => {
            let doc = wtbd::load(&path)
                .with_context(|| format!("could not open {}", path.display()))?;

            let mut recent = RecentFiles::load(&config_dir.join("recent.json"));
            recent.add(path.clone());
            recent.save(&config_dir.join("recent.json"))?;

            info!(
                sheets = doc.notebook.sheets().len(),
                images = doc.images.len(),
                downgraded = doc.notebook.downgraded,
                "opened {}",
                path.display()
            );
            for (i, sheet) in doc.notebook.sheets().iter().enumerate() {
                let marker = if i == doc.notebook.active_index() { "*" } else { " " };
                println!(
                    "{marker} {}: {} shapes, canvas {}x{}",
                    sheet.name,
                    sheet.shapes().len(),
                    sheet.canvas_size.0,
                    sheet.canvas_size.1,
                );
            }
            if doc.notebook.downgraded {
                println!("note: file was written by a newer version and is marked downgraded");
            }
        }
        None => {
            let notebook = Notebook::with_defaults(
                (prefs.canvas_width, prefs.canvas_height),
                prefs.history_depth,
            );
            info!(
                width = prefs.canvas_width,
                height = prefs.canvas_height,
                history_depth = prefs.history_depth,
                language = %prefs.language,
                "no file given; starting an empty notebook"
            );
            println!(
                "new notebook: {} sheet(s), canvas {}x{}",
                notebook.sheets().len(),
                notebook.default_canvas_size.0,
                notebook.default_canvas_size.1,
            );
        }
    }

    Ok(())
}
