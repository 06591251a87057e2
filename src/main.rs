//! CLI entry point for `eml2html`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};

use eml2html::config::Config;
use eml2html::export::attachment::export_attachments;
use eml2html::model::mail::RenderedMail;
use eml2html::parser::charset::Charset;
use eml2html::parser::eml::load_message;
use eml2html::render::html::{header_block, insert_header_block};
use eml2html::render::walk::print_structure;
use eml2html::render::{convert_to_html, list_attachments};

#[derive(Parser)]
#[command(
    name = "eml2html",
    version,
    about = "Render an email (.eml) as a self-contained HTML document",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Email file to convert
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output HTML file (default: FILE with an .html extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Do not add the From/Subject/To/Cc/Date table
    #[arg(long)]
    hide_headers: bool,

    /// Do not embed inline images
    #[arg(long)]
    hide_images: bool,

    /// Extract attachments next to the output file
    #[arg(short = 'a', long)]
    extract_attachments: bool,

    /// Directory for extracted attachments (default: <OUTPUT>-attachments)
    #[arg(long, value_name = "DIR")]
    attachments_dir: Option<PathBuf>,

    /// Print decoded headers and attachments as JSON instead of writing HTML
    #[arg(long)]
    json: bool,

    /// Print the MIME structure and exit
    #[arg(long)]
    structure: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = eml2html::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match &cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(*shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => {
            let Some(ref path) = cli.file else {
                Cli::command().print_help()?;
                anyhow::bail!("No email file given");
            };
            cmd_convert(path, &cli, &config)
        }
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_path = eml2html::config::log_file_path(config);
    let log_dir = eml2html::config::cache_dir(config);
    let log_name = log_path.file_name().map(PathBuf::from).unwrap_or_default();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "eml2html", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Convert one email file to HTML (or JSON), extracting attachments if asked.
fn cmd_convert(path: &Path, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    tracing::info!(path = %path.display(), "Reading email");
    let root = load_message(path, &config.parser_options())?;

    if cli.structure {
        print!("{}", print_structure(&root));
        return Ok(());
    }

    let mut render_options = config.render_options();
    render_options.hide_images |= cli.hide_images;
    let mail = convert_to_html(&root, &render_options)?;

    if cli.json {
        let attachments = list_attachments(&root)?;
        let output = serde_json::json!({
            "file": path.display().to_string(),
            "mail": mail,
            "attachments": attachments,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| path.with_extension("html"));
    let hide_headers = cli.hide_headers || config.render.hide_headers;
    write_html(&mail, &output, hide_headers)?;
    println!("  Wrote {}", output.display());

    if cli.extract_attachments {
        let dir = cli
            .attachments_dir
            .clone()
            .unwrap_or_else(|| default_attachments_dir(&output));
        cmd_attachments(&root, &dir, config)?;
    }

    Ok(())
}

/// Write the document in the charset it declares.
fn write_html(mail: &RenderedMail, output: &Path, hide_headers: bool) -> anyhow::Result<()> {
    let html = if hide_headers {
        mail.html.clone()
    } else {
        insert_header_block(&mail.html, &header_block(mail))
    };

    let charset = Charset::for_label(&mail.charset).unwrap_or_else(|| {
        tracing::warn!(charset = %mail.charset, "No encoder for charset, writing UTF-8");
        Charset::utf8()
    });

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, charset.encode(&html))
        .map_err(|e| anyhow::anyhow!("Cannot write {}: {e}", output.display()))?;
    tracing::debug!(path = %output.display(), charset = charset.name(), "Wrote HTML");
    Ok(())
}

/// `<dir>/<output stem>-attachments`.
fn default_attachments_dir(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "email".to_string());
    output
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{stem}-attachments"))
}

/// Extract all attachments of a message and print what was written.
fn cmd_attachments(
    root: &eml2html::model::part::MimePart,
    dir: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let attachments = list_attachments(root)?;
    if attachments.is_empty() {
        println!("  No attachments");
        return Ok(());
    }

    let paths = export_attachments(&attachments, dir, &config.export_options())?;
    for path in &paths {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!("  {:<50} {:>10}", path.display(), format_size(size, BINARY));
    }
    println!(
        "  Extracted {} attachment(s) to {}",
        paths.len(),
        dir.display()
    );

    Ok(())
}
