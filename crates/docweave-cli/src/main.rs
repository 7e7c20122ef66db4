use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docweave_config::Config;
use docweave_engine::blocks::Block;
use docweave_engine::layout::LayoutSettings;
use docweave_engine::{
    Attributes, ContentController, DisplayList, Document, Exportable, Layout, LayoutContext, MonospacePlatform,
    OpSource, Registry, SearchOptions, find_all, io,
};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docweave", version, about = "Inspect and export docweave documents")]
struct Cli {
    /// Config file to use instead of ~/.config/docweave/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the document as plain text
    Text { file: PathBuf },
    /// Print the document as HTML, or write it to a file
    Html {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Lay the document out and print its lines
    Layout {
        file: PathBuf,
        /// Page width in pixels; defaults to the configured width
        #[arg(short, long)]
        width: Option<f32>,
        /// Also list the draw commands painting would emit
        #[arg(long)]
        paint: bool,
    },
    /// Validate an operation list
    Check { file: PathBuf },
    /// List the positions where a query matches
    Find {
        file: PathBuf,
        query: String,
        #[arg(short = 'i', long)]
        ignore_case: bool,
        #[arg(long)]
        regex: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        config.logging.level.parse().unwrap_or(log::LevelFilter::Warn)
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
    log::debug!("Config: {config:?}");

    let registry = Registry::default();
    match cli.command {
        Command::Text { file } => {
            let document = io::load_document(&file, &registry)?;
            print!("{}", document.to_text(None));
        }
        Command::Html { file, output } => {
            let document = io::load_document(&file, &registry)?;
            let html = document.to_html(None);
            match output {
                Some(path) => std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{html}"),
            }
        }
        Command::Layout { file, width, paint } => {
            let mut document = io::load_document(&file, &registry)?;
            let width = width.unwrap_or(config.layout.page_width);
            print!("{}", layout_report(&mut document, &config, width, paint));
        }
        Command::Check { file } => {
            let ops = io::load_ops(&file)?;
            let summary = check(&ops, &config, &registry)?;
            println!("{}: {summary}", file.display());
        }
        Command::Find {
            file,
            query,
            ignore_case,
            regex,
        } => {
            let document = io::load_document(&file, &registry)?;
            let options = SearchOptions {
                case_insensitive: ignore_case,
                regex,
            };
            for found in find_all(&document, &query, options)? {
                let text = document.to_text(Some((&found.start, &found.end)));
                println!("{}..{}\t{text:?}", found.start, found.end);
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let loaded = match path {
        Some(path) => Config::load_from_path(path)?
            .with_context(|| format!("Config file not found: {}", path.display()))?,
        None => Config::load()?.unwrap_or_default(),
    };
    Ok(loaded)
}

fn layout_settings(config: &Config) -> LayoutSettings {
    LayoutSettings {
        indent_width: config.layout.indent_width,
        cell_padding: config.layout.cell_padding,
        ..LayoutSettings::default()
    }
}

fn default_attributes(config: &Config) -> Attributes {
    Attributes::new()
        .with("font", config.defaults.font.clone())
        .with("size", config.defaults.size)
        .with("color", config.defaults.color.clone())
}

/// One line per laid-out line, indented by nesting depth
fn layout_report(document: &mut Document, config: &Config, width: f32, paint: bool) -> String {
    let platform = MonospacePlatform::default();
    let settings = layout_settings(config);
    let defaults = default_attributes(config);
    let ctx = LayoutContext::new(&platform)
        .with_defaults(&defaults)
        .with_settings(&settings);
    document.layout(&ctx, width);

    let mut out = String::new();
    describe(document, 0, &mut out);
    let _ = writeln!(out, "height {:.1}", document.height());
    if paint {
        let mut list = DisplayList::new();
        document.paint(&mut list, 0.0, document.height());
        for command in &list.commands {
            let _ = writeln!(out, "{command:?}");
        }
    }
    out
}

fn describe(document: &Document, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for (index, block) in document.blocks().iter().enumerate() {
        let rect = block.geometry();
        let _ = writeln!(
            out,
            "{indent}block {index} {} @{} y={:.1} h={:.1}",
            block.tag(),
            block.start(),
            rect.y,
            rect.height
        );
        match block {
            Block::Frames(frames) => {
                for frame in frames.frames() {
                    for line in frame.lines() {
                        let _ = writeln!(
                            out,
                            "{indent}  y={:.1} x={:.1} w={:.1} {:?}",
                            frame.geometry().y + line.y,
                            line.left,
                            line.content_width(),
                            line.text()
                        );
                    }
                }
            }
            Block::Table(table) => {
                for (row_index, row) in table.rows().iter().enumerate() {
                    for (cell_index, cell) in row.cells().iter().enumerate() {
                        let _ = writeln!(
                            out,
                            "{indent}  cell {row_index}/{cell_index} span {}x{}",
                            cell.row_span, cell.col_span
                        );
                        describe(&cell.document, depth + 2, out);
                    }
                }
            }
        }
    }
}

/// Read an operation list back and check that nothing was lost
fn check(ops: &docweave_engine::Delta, config: &Config, registry: &Registry) -> Result<String> {
    if !ops.is_document() {
        bail!("operation list contains retains or deletes; it is a change, not a document");
    }
    let document = Document::from_ops(ops, registry);
    let read = document.to_ops();
    if read.length() != document.length() {
        bail!(
            "document length {} disagrees with its operation list ({})",
            document.length(),
            read.length()
        );
    }
    if read.length() != ops.length() {
        bail!(
            "{} of {} units could not be read",
            ops.length().saturating_sub(read.length()),
            ops.length()
        );
    }
    if &read != ops {
        log::warn!("operation list is not in normalized form");
    }
    let controller = ContentController::new(document, registry.clone())
        .with_history_depth(config.history.max_depth);
    if controller.state() != &read {
        bail!("controller state does not match the document");
    }
    Ok(format!(
        "ok, {} block(s), {} unit(s)",
        controller.document().blocks().len(),
        read.length()
    ))
}
