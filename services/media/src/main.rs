use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use media::command::DEFAULT_TIMEOUT;
use media::{Background, ConversionMode, ConvertOptions, Converter, SizeCeiling, Toolchain};

/// Convert GIF files to WebM for stickers/emojis
#[derive(Parser, Debug)]
#[command(name = "media", version)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "directory"])))]
struct Cli {
    /// Input GIF file path
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory containing GIF files for batch conversion
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Output file (single) or directory (batch)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// sticker (512px max), emoji (100x100px) or preview (full duration)
    #[arg(short, long, default_value = "sticker")]
    mode: ConversionMode,

    /// Maximum file size in KB
    #[arg(long = "max-size", default_value_t = SizeCeiling::DEFAULT_KB)]
    max_size: u64,

    /// Padding for emoji: transparent, white or black
    #[arg(long, default_value = "transparent")]
    background: Background,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let tools = match Toolchain::locate(None, None, DEFAULT_TIMEOUT) {
        Ok(tools) => tools,
        Err(e) => {
            error!("{}. Please install FFmpeg and ensure it's in your PATH.", e);
            std::process::exit(1);
        }
    };

    let options = ConvertOptions {
        mode: cli.mode,
        ceiling: SizeCeiling::for_mode(cli.mode, cli.max_size)?,
        background: cli.background,
    };
    let converter = Converter::with_toolchain(tools);

    info!(
        "Mode: {}, max size: {} KB, format: WebM (VP9, no audio, <=30fps)",
        options.mode,
        options.ceiling.kb()
    );

    if let Some(input) = cli.input {
        let output = match cli.output {
            Some(output) => output,
            None => default_output(&input, &input_parent(&input), options.mode),
        };
        if !convert_one(&converter, &input, &output, options).await {
            std::process::exit(1);
        }
    } else if let Some(directory) = cli.directory {
        batch_convert(&converter, &directory, cli.output, options).await?;
    }

    Ok(())
}

async fn convert_one(
    converter: &Converter,
    input: &Path,
    output: &Path,
    options: ConvertOptions,
) -> bool {
    if !input.is_file() {
        error!("Input file '{}' does not exist", input.display());
        return false;
    }

    match converter.convert(input, output, options).await {
        Ok(conversion) => {
            info!(
                "Converted {} -> {} ({:.1} KB at {})",
                input.display(),
                output.display(),
                conversion.output_size_bytes as f64 / 1024.0,
                conversion.level
            );
            if let Some(out) = conversion.output {
                info!(
                    "Final dimensions: {}x{}, {:.2}s",
                    out.width, out.height, out.duration_secs
                );
            }
            true
        }
        Err(e) => {
            error!("Failed to convert {}: {}", input.display(), e);
            false
        }
    }
}

async fn batch_convert(
    converter: &Converter,
    directory: &Path,
    output_dir: Option<PathBuf>,
    options: ConvertOptions,
) -> Result<()> {
    let mut gifs: Vec<PathBuf> = std::fs::read_dir(directory)
        .with_context(|| format!("'{}' is not a valid directory", directory.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_gif(path))
        .collect();
    gifs.sort();

    if gifs.is_empty() {
        info!("No GIF files found in '{}'", directory.display());
        return Ok(());
    }

    let output_dir = output_dir.unwrap_or_else(|| directory.to_path_buf());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    info!("Found {} GIF file(s) to convert in {} mode", gifs.len(), options.mode);

    let mut successful = 0;
    for gif in &gifs {
        let output = default_output(gif, &output_dir, options.mode);
        if convert_one(converter, gif, &output, options).await {
            successful += 1;
        }
    }

    info!(
        "Batch conversion complete: {}/{} files converted successfully",
        successful,
        gifs.len()
    );
    Ok(())
}

fn is_gif(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == "gif" || ext == "GIF")
}

fn input_parent(input: &Path) -> PathBuf {
    input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<dir>/<stem>_<mode>.webm`
fn default_output(input: &Path, dir: &Path, mode: ConversionMode) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}_{}.webm", stem, mode))
}
