use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use wikidoc::Config;

#[derive(Parser)]
#[command(name = "wikidoc")]
#[command(about = "Convert wiki articles to HTML, Typst, JSON or PDF")]
struct Cli {
    /// Input article file
    input: PathBuf,

    /// Output file (defaults to input name with the format's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Config file (defaults to wikidoc.toml in the current directory, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Typst,
    Json,
    Pdf,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Typst => "typ",
            Format::Json => "json",
            Format::Pdf => "pdf",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_or_default(Path::new("wikidoc.toml")),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Read input file
    let markdown = match fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            std::process::exit(1);
        }
    };
    log::info!("converting {} to {}", cli.input.display(), cli.format.extension());

    let bytes = match convert(&markdown, cli.format, &config) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Determine output path
    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension(cli.format.extension()));

    if let Err(e) = fs::write(&output, bytes) {
        eprintln!("Error writing {}: {}", output.display(), e);
        std::process::exit(1);
    }

    println!("Created {}", output.display());
}

fn convert(markdown: &str, format: Format, config: &Config) -> Result<Vec<u8>, String> {
    match format {
        Format::Html => Ok(wikidoc::markdown_to_html_with_config(markdown, config).into_bytes()),
        Format::Typst => Ok(wikidoc::markdown_to_typst_with_config(markdown, config).into_bytes()),
        Format::Json => serde_json::to_vec_pretty(&wikidoc::parse(markdown)).map_err(|e| e.to_string()),
        Format::Pdf => wikidoc::markdown_to_pdf_with_config(markdown, config).map_err(|e| e.to_string()),
    }
}
