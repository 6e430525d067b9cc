use autopersiantype::blocks::flatten_blocks;
use autopersiantype::direction::{classify_document, classify_paragraph};
use autopersiantype::document::DocumentStore;
use autopersiantype::markdown_file::parse_markdown_file;
use autopersiantype::markup::{HtmlTextExtractor, TextExtractor};
use autopersiantype::outline::extract_headings;
use autopersiantype::render::{RenderOptions, render_annotated, render_markdown};
use autopersiantype::settings::{AppConfig, config_file_path, load_config};
use autopersiantype::stats::DocumentStats;
use clap::{Parser, Subcommand};
use log::debug;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "autopersiantype")]
#[command(about = "Direction-aware Markdown preview for mixed Persian and English text", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a Markdown file to annotated HTML
    Render {
        /// Markdown file, or - for stdin
        file: PathBuf,
        /// Emit plain HTML without direction or line annotations
        #[arg(long)]
        no_auto_direction: bool,
        /// Write the HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the reading direction of a document
    Direction {
        /// Markdown file, or - for stdin
        file: PathBuf,
        /// Also classify every non-empty line
        #[arg(long)]
        paragraphs: bool,
    },
    /// Show the source line of every preview block
    Lines {
        /// Markdown file, or - for stdin
        file: PathBuf,
    },
    /// Show word and character counts
    Stats {
        /// Markdown file, or - for stdin
        file: PathBuf,
    },
    /// List the headings of a document
    Headings {
        /// Markdown file, or - for stdin
        file: PathBuf,
    },
    /// Show page settings and images stored in a saved document
    Import {
        /// Saved document or exported HTML page, or - for stdin
        file: PathBuf,
    },
    /// List documents in a directory
    Ls {
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },
}

fn read_input(file: &Path) -> Result<String, String> {
    if file == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(text);
    }

    fs::read_to_string(file).map_err(|e| format!("Failed to read '{}': {}", file.display(), e))
}

/// Markdown body of a saved document, without page settings and images
fn read_markdown(file: &Path) -> Result<String, String> {
    Ok(parse_markdown_file(&read_input(file)?).content)
}

fn cmd_render(
    file: &Path,
    no_auto_direction: bool,
    output: Option<&Path>,
    config: &AppConfig,
) -> Result<(), String> {
    let content = read_markdown(file)?;
    let mut options = RenderOptions::from(&config.settings);
    if no_auto_direction {
        options.auto_direction = false;
    }

    let html = render_markdown(&content, &options);
    match output {
        Some(path) => fs::write(path, html)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e)),
        None => {
            print!("{}", html);
            Ok(())
        }
    }
}

fn cmd_direction(file: &Path, paragraphs: bool) -> Result<(), String> {
    let content = read_markdown(file)?;
    println!("{}", classify_document(&content));

    if paragraphs {
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            println!("{:>4}  {}  {}", index + 1, classify_paragraph(line), line);
        }
    }

    Ok(())
}

fn cmd_lines(file: &Path, config: &AppConfig) -> Result<(), String> {
    let content = read_markdown(file)?;
    let nodes = render_annotated(&content, &RenderOptions::from(&config.settings));

    for block in flatten_blocks(&nodes) {
        let line = block
            .source_line
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        let dir = block.direction.map(|d| d.as_str()).unwrap_or("-");
        let text = HtmlTextExtractor
            .plain_text(&block.inner_html)
            .unwrap_or_else(|_| block.inner_html.clone());
        println!("{:>4}  {:<5} {:<10} {}", line, dir, block.kind.tag(), text.trim());
    }

    Ok(())
}

fn cmd_stats(file: &Path) -> Result<(), String> {
    let content = read_markdown(file)?;
    let stats = DocumentStats::compute(&content);

    println!("words:      {}", stats.words);
    println!("characters: {}", stats.characters);
    println!("direction:  {}", stats.direction);
    println!("headings:   {}", stats.headings.len());
    Ok(())
}

fn cmd_headings(file: &Path) -> Result<(), String> {
    let content = read_markdown(file)?;

    for heading in extract_headings(&content) {
        let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
        println!("{:>4}  {}{}", heading.line, indent, heading.text);
    }

    Ok(())
}

fn cmd_import(file: &Path) -> Result<(), String> {
    let parsed = parse_markdown_file(&read_input(file)?);
    let summary = serde_json::json!({
        "pageSettings": parsed.page_settings,
        "images": parsed.images,
        "content": parsed.content,
    });

    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| format!("Failed to encode document: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn cmd_ls(directory: &Path) -> Result<(), String> {
    let store = DocumentStore::new(directory.to_path_buf());
    let docs = store.list_all_documents().map_err(|e| e.to_string())?;

    for doc in docs {
        println!("{}", doc);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match args.config.clone().or_else(config_file_path) {
        Some(path) => {
            debug!("Loading settings from {}", path.display());
            load_config(&path)
        }
        None => AppConfig::default(),
    };

    let result = match &args.command {
        Commands::Render {
            file,
            no_auto_direction,
            output,
        } => cmd_render(file, *no_auto_direction, output.as_deref(), &config),
        Commands::Direction { file, paragraphs } => cmd_direction(file, *paragraphs),
        Commands::Lines { file } => cmd_lines(file, &config),
        Commands::Stats { file } => cmd_stats(file),
        Commands::Headings { file } => cmd_headings(file),
        Commands::Import { file } => cmd_import(file),
        Commands::Ls { directory } => cmd_ls(directory),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
