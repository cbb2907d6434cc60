use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfstudio::event_source::SimulatedEventSource;
use pdfstudio::format::{FontFamily, TextFormat};
use pdfstudio::geometry::ScreenRect;
use pdfstudio::overlay::TextBoxFactory;
use pdfstudio::panic_handler::initialize_panic_handler;
use pdfstudio::pdf::{self, DocumentOpener, DocumentProvider};
use pdfstudio::settings;
use pdfstudio::{Session, SessionConfig, SessionError, run_with_event_source};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "View, edit in place, merge and export PDF documents.",
    arg_required_else_help = true
)]
struct Args {
    /// Log verbosity written to pdfstudio.log (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count and page sizes
    Info { pdf: PathBuf },

    /// Extract plain text
    Text {
        pdf: PathBuf,

        /// Only this page (1-based)
        #[arg(short, long)]
        page: Option<usize>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save one page as PNG or JPEG, chosen by the output extension
    Image {
        pdf: PathBuf,

        /// Page to export (1-based)
        #[arg(short, long)]
        page: usize,

        #[arg(short, long)]
        output: PathBuf,

        /// Render zoom, defaults to the configured export zoom
        #[arg(long)]
        zoom: Option<f32>,
    },

    /// Concatenate PDFs in the given order
    Merge {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Also write a PNG preview of every merged page into this directory
        #[arg(long)]
        preview_dir: Option<PathBuf>,
    },

    /// Replay an editor event script against a PDF and save the result
    Edit {
        pdf: PathBuf,

        /// JSON array of editor events
        #[arg(short, long)]
        script: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Preview frame size used when the script does not render itself
        #[arg(long, default_value_t = 1000.0)]
        width: f64,

        #[arg(long, default_value_t = 1200.0)]
        height: f64,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// List the font families and sizes offered for edits
    Fonts,
}

/// Starting format of an edit session, overriding the configured default
#[derive(clap::Args, Debug)]
struct FormatArgs {
    /// Font family, e.g. "Times New Roman"
    #[arg(long)]
    font: Option<String>,

    #[arg(long)]
    size: Option<f32>,

    /// Text colour as #RRGGBB
    #[arg(long)]
    color: Option<String>,

    /// Save the final format as the default for later sessions
    #[arg(long)]
    remember_format: bool,
}

fn main() {
    let args = Args::parse();

    let level = args.log_level.parse().unwrap_or(LevelFilter::Info);
    if let Err(e) = init_logging(level) {
        eprintln!("Failed to initialize logging: {e}");
    }
    initialize_panic_handler();
    settings::load_settings();
    debug!("Settings: {:?}", settings::current());

    info!("Starting pdfstudio");
    if let Err(e) = run(args.command) {
        error!("{e:?}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    info!("Shutting down pdfstudio");
}

fn init_logging(level: LevelFilter) -> Result<()> {
    WriteLogger::init(level, Config::default(), File::create("pdfstudio.log")?)?;
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Info { pdf } => {
            let doc = open_pdf(&pdf)?;
            println!("{}: {} pages", pdf.display(), doc.page_count());
            for page in 0..doc.page_count() {
                let rect = doc.page_rect(page)?;
                println!(
                    "  page {:>3}: {:.1} x {:.1} pt",
                    page + 1,
                    rect.width(),
                    rect.height()
                );
            }
        }
        Command::Text { pdf, page, output } => {
            let doc = open_pdf(&pdf)?;
            let page = page.map(one_based).transpose()?;
            match output {
                Some(path) => {
                    pdf::save_text(doc.as_ref(), page, &path)?;
                    println!("Text saved to {}", path.display());
                }
                None => {
                    let text = match page {
                        Some(page) => {
                            pdf::PdfError::check_page(page, doc.page_count())?;
                            doc.page_text(page)?
                        }
                        None => pdf::document_text(doc.as_ref())?,
                    };
                    println!("{text}");
                }
            }
        }
        Command::Image {
            pdf,
            page,
            output,
            zoom,
        } => {
            let doc = open_pdf(&pdf)?;
            let zoom = zoom.unwrap_or_else(settings::get_export_zoom);
            pdf::save_page_image(doc.as_ref(), one_based(page)?, &output, zoom)?;
            println!("Page {page} saved to {}", output.display());
        }
        Command::Merge {
            output,
            inputs,
            preview_dir,
        } => match preview_dir {
            Some(dir) => merge_with_previews(&inputs, &output, &dir)?,
            None => {
                pdf::merge_files(&inputs, &output)?;
                println!("Merged {} files into {}", inputs.len(), output.display());
            }
        },
        Command::Edit {
            pdf,
            script,
            output,
            width,
            height,
            format,
        } => edit(
            &pdf,
            &script,
            &output,
            ScreenRect::new(0.0, 0.0, width, height),
            &format,
        )?,
        Command::Fonts => {
            let default = settings::get_default_format();
            for family in FontFamily::ALL {
                let marker = if family == default.family { "*" } else { " " };
                println!("{marker} {}", family.display_name());
            }
            let sizes: Vec<String> = TextFormat::SIZES.iter().map(f32::to_string).collect();
            println!("Sizes: {}", sizes.join(", "));
        }
    }
    Ok(())
}

fn edit(
    pdf: &Path,
    script: &Path,
    output: &Path,
    viewport: ScreenRect,
    format: &FormatArgs,
) -> Result<()> {
    let mut source = SimulatedEventSource::from_file(script)?;
    let mut session = Session::new(
        opener()?,
        Box::new(TextBoxFactory),
        SessionConfig::from_settings(),
    );

    session
        .open(pdf)
        .with_context(|| format!("Failed to open {}", pdf.display()))?;
    if let Some(name) = &format.font {
        session.set_font_family(FontFamily::from_name(name));
    }
    if let Some(size) = format.size {
        session.set_font_size(size);
    }
    if let Some(color) = &format.color {
        session.set_color(color);
    }
    session.render(viewport)?;

    run_with_event_source(&mut session, &mut source)?;
    if format.remember_format {
        settings::set_default_format(session.format());
    }

    match session.apply_overlays(output) {
        Ok(count) => println!("Applied {count} edits to {}", output.display()),
        Err(SessionError::NothingToApply) => {
            println!("No pending edits");
        }
        Err(e) => return Err(e).context("Failed to apply edits"),
    }

    for notification in session.notifications().drain() {
        println!("{notification}");
    }
    Ok(())
}

fn merge_with_previews(inputs: &[PathBuf], output: &Path, dir: &Path) -> Result<()> {
    let mut session = Session::new(
        opener()?,
        Box::new(TextBoxFactory),
        SessionConfig::from_settings(),
    );
    session.merge_and_open(inputs, output)?;
    println!("Merged {} files into {}", inputs.len(), output.display());

    let previews = session.page_previews()?;
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    for (index, preview) in previews.iter().enumerate() {
        let path = dir.join(format!("page-{}.png", index + 1));
        preview
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    println!("Wrote {} page previews to {}", previews.len(), dir.display());
    Ok(())
}

fn one_based(page: usize) -> Result<usize> {
    match page.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Pages are numbered from 1"),
    }
}

#[cfg(feature = "pdf")]
fn opener() -> Result<Box<dyn DocumentOpener>> {
    Ok(pdf::mupdf_opener())
}

#[cfg(not(feature = "pdf"))]
fn opener() -> Result<Box<dyn DocumentOpener>> {
    bail!("pdfstudio was built without the `pdf` feature, documents cannot be opened")
}

fn open_pdf(path: &Path) -> Result<Box<dyn DocumentProvider>> {
    opener()?
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))
}
