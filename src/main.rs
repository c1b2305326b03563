//! Command-line front end: paginate a text file and print the pages.
//! The main interface is through the library and WASM bindings.

use anyhow::Context;
use clap::Parser;
use manuscript_pager::{ConfigPatch, FontLibrary, PaginationConfig, PaginationEngine};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "manuscript-pager", about = "Paginate a chapter of plain text", version)]
struct Cli {
    /// Text file to paginate (reads stdin when omitted)
    file: Option<PathBuf>,

    /// JSON file with a page configuration (camelCase keys)
    #[arg(short, long, env = "MANUSCRIPT_PAGER_CONFIG")]
    config: Option<PathBuf>,

    /// Page width in inches
    #[arg(long)]
    width_in: Option<f32>,

    /// Page height in inches
    #[arg(long)]
    height_in: Option<f32>,

    /// Body font size in points
    #[arg(long)]
    font_size_pt: Option<f32>,

    /// Body font family
    #[arg(long)]
    font_family: Option<String>,

    /// Chapter title shown on the first page
    #[arg(short, long)]
    title: Option<String>,

    /// Print the full pagination state as JSON
    #[arg(short, long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigPatch {
        ConfigPatch {
            page_width_in: self.width_in,
            page_height_in: self.height_in,
            font_size_pt: self.font_size_pt,
            font_family: self.font_family.clone(),
            chapter_title: self.title.clone().map(Some),
            show_chapter_title: self.title.as_ref().map(|_| true),
            ..Default::default()
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PaginationConfig> {
    let Some(path) = path else {
        return Ok(PaginationConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid config {}", path.display()))
}

fn read_text(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manuscript_pager=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?.merged(&cli.overrides());
    let text = read_text(cli.file.as_ref())?;

    let mut engine = PaginationEngine::new(FontLibrary::new());
    engine.initialize(config, text)?;
    let state = engine
        .state()
        .context("engine published no pagination state")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(state.as_ref())?);
        return Ok(());
    }

    for page in &state.pages {
        let marker = if page.page_number == state.current_page_index + 1 {
            "*"
        } else {
            " "
        };
        println!(
            "{}page {:>3}  bytes {:>7}..{:<7}  lines {:>3}{}",
            marker,
            page.page_number,
            page.start_offset,
            page.end_offset,
            page.line_count,
            page.chapter_title
                .as_deref()
                .map(|title| format!("  \"{}\"", title))
                .unwrap_or_default(),
        );
    }
    tracing::info!(total_pages = state.total_pages, "pagination finished");
    Ok(())
}
