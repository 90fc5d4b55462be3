use anyhow::{Context, Result};
use clap::Parser;
use room_palette_wasm::{ExtractorConfig, HttpFetcher, PaletteEngine};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Suggest a palette of up to five colors from room photos.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image URLs (http, https, data, file) or local file paths
    #[arg(required = true)]
    inputs: Vec<String>,

    /// JSON file overriding extractor settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of colors to return
    #[arg(short = 'n', long)]
    max_colors: Option<usize>,

    /// Per-attempt load timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Never retry failed remote loads through the resize relay
    #[arg(long)]
    no_proxy: bool,

    /// Resize relay endpoint (queried with `url`, `w`, `h`)
    #[arg(long)]
    proxy_endpoint: Option<String>,

    /// Print the palette as a JSON array
    #[arg(long)]
    json: bool,

    /// Log acquisition and sampling details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = build_config(&args)?;
    let urls = args
        .inputs
        .iter()
        .map(|input| to_url(input))
        .collect::<Result<Vec<_>>>()?;

    let engine = PaletteEngine::with_config(HttpFetcher::new(), config);
    let colors = engine.extract_from_images(&urls).await;

    if args.json {
        println!("{}", serde_json::to_string(&colors)?);
    } else {
        for hex in &colors {
            println!("{hex}");
        }
    }

    if colors.is_empty() {
        eprintln!("No colors could be extracted.");
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<ExtractorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ExtractorConfig::from_json(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ExtractorConfig::default(),
    };

    if let Some(n) = args.max_colors {
        config.max_colors = n;
    }
    if let Some(ms) = args.timeout_ms {
        config.load_timeout_ms = ms;
    }
    if let Some(endpoint) = &args.proxy_endpoint {
        config.proxy_endpoint = endpoint.clone();
    }
    if args.no_proxy {
        config.use_proxy = false;
    }
    Ok(config)
}

/// URLs pass through untouched; anything else is treated as a file path.
fn to_url(input: &str) -> Result<String> {
    if Url::parse(input).is_ok() {
        return Ok(input.to_string());
    }
    let path = Path::new(input);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let url = Url::from_file_path(&absolute)
        .map_err(|()| anyhow::anyhow!("not a URL or usable path: {input}"))?;
    Ok(url.into())
}
