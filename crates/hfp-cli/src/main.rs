//! hfpthumb: .hfp thumbnail tool
//!
//! Commands:
//!   render <path>          - render a thumbnail to an image file
//!   classify <path>...     - report cloud materialization state
//!   roots                  - list discovered cloud roots
//!   extract <path>         - inspect the embedded image payload
//!   config show            - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use hfp_cloudfilter::{Classifier, CloudRootRegistry};
use hfp_core::HfpConfig;
use hfp_thumbnail::diag::DiagnosticLog;
use hfp_thumbnail::envelope::decode_text;
use hfp_thumbnail::{codec, ProviderContext, ThumbnailProvider};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hfpthumb",
    version,
    about = "Render and diagnose .hfp thumbnails",
    long_about = "hfpthumb: render thumbnails from .hfp envelopes, including cloud-synced files that are not yet local"
)]
struct Cli {
    /// Path to hfp.toml configuration file
    #[arg(long, short = 'c', env = "HFP_CONFIG", default_value = "hfp.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HFP_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "HFP_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Also append events to the diagnostic log file
    #[arg(long)]
    diag_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the thumbnail of an .hfp file
    Render {
        /// Envelope file
        path: PathBuf,
        /// Side length in pixels (default: thumbnail.default_size)
        #[arg(long, short = 's')]
        size: Option<u32>,
        /// Output image; format follows the extension (default: <path>.png)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Hand the file over as an open stream instead of a path
        #[arg(long)]
        stream: bool,
    },

    /// Report whether files are cloud-backed and locally available
    Classify {
        paths: Vec<PathBuf>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// List discovered cloud sync roots
    Roots {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the embedded image payload of an envelope without rendering
    Extract { path: PathBuf },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HfpConfig::load(&cli.config)?;

    let diag = cli.diag_log.then(|| DiagnosticLog::from_config(&config.log));
    init_logging(&cli.log, &cli.log_format, diag);
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "hfpthumb starting"
    );

    match cli.command {
        Commands::Render { path, size, out, stream } => cmd_render(&config, &path, size, out, stream),
        Commands::Classify { paths, json } => cmd_classify(&config, &paths, json),
        Commands::Roots { json } => cmd_roots(&config, json),
        Commands::Extract { path } => cmd_extract(&config, &path),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat, diag: Option<DiagnosticLog>) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let diag_layer = diag.map(|log| fmt::layer().with_writer(log).with_ansi(false));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(diag_layer)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(diag_layer)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── `hfpthumb render` ─────────────────────────────────────────────────────────

fn cmd_render(config: &HfpConfig, path: &Path, size: Option<u32>, out: Option<PathBuf>, stream: bool) -> Result<()> {
    let size = size.unwrap_or(config.thumbnail.default_size);
    let ctx = Arc::new(ProviderContext::new(config)?);

    let mut provider = if stream {
        let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        ThumbnailProvider::from_stream(ctx, file)
    } else {
        ThumbnailProvider::from_path(ctx, path)?
    };

    let Some(thumb) = provider.thumbnail(size) else {
        println!("no thumbnail embedded in {}", path.display());
        return Ok(());
    };

    let out = out.unwrap_or_else(|| path.with_extension("png"));
    thumb
        .image
        .save(&out)
        .with_context(|| format!("writing {}", out.display()))?;

    info!(out = %out.display(), tier = ?thumb.tier, "thumbnail written");
    println!("{}  {}x{}  {:?}", out.display(), thumb.size(), thumb.size(), thumb.tier);
    Ok(())
}

// ── `hfpthumb classify` ───────────────────────────────────────────────────────

fn classifier(config: &HfpConfig) -> Classifier {
    let registry = Arc::new(CloudRootRegistry::system(&config.cloud));
    Classifier::new(registry).heuristics(config.cloud.heuristics)
}

fn cmd_classify(config: &HfpConfig, paths: &[PathBuf], json: bool) -> Result<()> {
    if paths.is_empty() {
        anyhow::bail!("no paths given");
    }
    let classifier = classifier(config);

    let rows: Vec<serde_json::Value> = paths
        .iter()
        .map(|path| {
            let state = classifier.classify(path);
            let matched = classifier.cloud_match(path).map(|m| format!("{m:?}"));
            serde_json::json!({
                "path": path,
                "state": state,
                "cloud": matched,
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (path, row) in paths.iter().zip(&rows) {
        let state = row["state"].as_str().unwrap_or("unknown");
        match row["cloud"].as_str() {
            Some(why) => println!("{:<12} {}  ({why})", state, path.display()),
            None => println!("{:<12} {}", state, path.display()),
        }
    }
    Ok(())
}

// ── `hfpthumb roots` ──────────────────────────────────────────────────────────

fn cmd_roots(config: &HfpConfig, json: bool) -> Result<()> {
    let registry = CloudRootRegistry::system(&config.cloud);
    let roots = registry.roots();

    if json {
        println!("{}", serde_json::to_string_pretty(roots)?);
        return Ok(());
    }
    if roots.is_empty() {
        println!("no cloud roots found");
        return Ok(());
    }
    for root in roots {
        println!("{:<18} {}", root.source.to_string(), root.path.display());
    }
    Ok(())
}

// ── `hfpthumb extract` ────────────────────────────────────────────────────────

fn cmd_extract(config: &HfpConfig, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = decode_text(&bytes);
    let extractor = hfp_thumbnail::Extractor::new(&config.thumbnail.field)?;

    let Some(payload) = extractor.extract(&text) else {
        println!("field:    {} (not found)", extractor.field());
        return Ok(());
    };

    let clean = codec::normalize(&payload.text);
    let image = codec::decode(&payload.text);
    let format = image::guess_format(&image)
        .map(|f| format!("{f:?}"))
        .unwrap_or_else(|_| "unrecognized".into());

    println!("field:    {}", extractor.field());
    println!("span:     {}..{}", payload.span.start, payload.span.end);
    println!("payload:  {} chars ({} after repair)", payload.text.len(), clean.len());
    println!("preview:  {}", codec::preview(&payload.text, 60));
    println!("tail:     {}", codec::tail(&payload.text, 20));
    println!("decoded:  {} bytes", image.len());
    println!("head:     {}", codec::hex_prefix(&image, 32));
    println!("format:   {format}");
    Ok(())
}

// ── `hfpthumb config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &HfpConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
