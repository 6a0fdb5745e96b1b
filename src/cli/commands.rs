//! Command implementations

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::app::{Engine, RequestBuilder};
use crate::cli::args::*;
use crate::cli::Commands;
use crate::domain::model::*;
use crate::error::VidopsResult;
use crate::utils::time::TimeParser;
use crate::utils::{format_duration_ms, format_file_size};

/// Run the selected command against the engine
pub async fn dispatch(engine: &Engine, command: Commands) -> Result<()> {
    match command {
        Commands::Info(args) => info_command(engine, args).await,
        Commands::Compare(args) => compare(engine, args).await,
        Commands::Concat(args) => concat(engine, args).await,
        Commands::Merge(args) => merge(engine, args).await,
        Commands::Denoise(args) => denoise(engine, args).await,
        Commands::Thumbnail(args) => thumbnail(engine, args).await,
        Commands::Edit(args) => edit(engine, args).await,
    }
}

/// Execute the info command
pub async fn info_command(engine: &Engine, args: InfoArgs) -> Result<()> {
    let request = engine
        .info_builder()
        .asset(resolve(&args.input)?)
        .build()?;

    let metadata = match run(engine, request).await? {
        OperationResult::Metadata(metadata) => metadata,
        other => return Err(anyhow!("Unexpected result for info: {:?}", other)),
    };

    match args.format {
        OutputFormat::Text => display_metadata(&args.input, &metadata),
        format => print!(
            "{}",
            render_metadata(&metadata, format).context("Failed to serialize metadata")?
        ),
    }
    Ok(())
}

/// Serialize metadata for machine consumption
pub fn render_metadata(metadata: &MediaMetadata, format: OutputFormat) -> VidopsResult<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(metadata)? + "\n",
        OutputFormat::Yaml => serde_yaml::to_string(metadata)?,
        OutputFormat::Text => format!("{:?}\n", metadata),
    };
    Ok(rendered)
}

/// Execute the compare command
pub async fn compare(engine: &Engine, args: CompareArgs) -> Result<()> {
    let request = engine
        .compare_builder()
        .assets(resolve_all(&args.input)?)
        .build()?;

    let compatible = match run(engine, request).await? {
        OperationResult::Compatibility(compatible) => compatible,
        other => return Err(anyhow!("Unexpected result for compare: {:?}", other)),
    };

    if args.json {
        println!("{}", serde_json::json!({ "compatible": compatible }));
    } else if compatible {
        println!("Compatible: all {} videos can be concatenated", args.input.len());
    } else {
        println!("Not compatible: videos differ in codec, geometry or rotation");
    }
    Ok(())
}

/// Execute the concat command
pub async fn concat(engine: &Engine, args: ConcatArgs) -> Result<()> {
    let mut builder = engine
        .concat_builder()
        .assets(resolve_all(&args.input)?)
        .output(target(&args.output)?);
    if let (Some(width), Some(height)) = (args.width, args.height) {
        builder = builder.target_resolution(Resolution::new(width, height)?);
    }

    produce(engine, builder).await
}

/// Execute the merge command
pub async fn merge(engine: &Engine, args: MergeArgs) -> Result<()> {
    let mut builder = engine
        .merge_builder()
        .assets(resolve_all(&args.input)?)
        .output(target(&args.output)?)
        .frame_rate(FrameRate::parse(&args.fps)?)
        .video_codec(VideoCodec::parse(&args.codec)?);
    if let (Some(width), Some(height)) = (args.width, args.height) {
        builder = builder.target_resolution(Resolution::new(width, height)?);
    }

    produce(engine, builder).await
}

/// Execute the denoise command
pub async fn denoise(engine: &Engine, args: DenoiseArgs) -> Result<()> {
    let builder = engine
        .denoise_builder()
        .asset(resolve(&args.input)?)
        .output(target(&args.output)?);

    produce(engine, builder).await
}

/// Execute the thumbnail command
pub async fn thumbnail(engine: &Engine, args: ThumbnailArgs) -> Result<()> {
    let mut builder = engine
        .thumbnail_builder()
        .asset(resolve(&args.input)?)
        .output(target(&args.output)?)
        .position_ms(TimeParser::parse_millis(&args.position)?)
        .precise(args.precise);
    if let Some(width) = args.width {
        builder = builder.width(width);
    }
    if let Some(height) = args.height {
        builder = builder.height(height);
    }

    produce(engine, builder).await
}

/// Execute the edit command
pub async fn edit(engine: &Engine, args: EditArgs) -> Result<()> {
    if args.interactive {
        return edit_interactive(engine, args).await;
    }

    let mut builder = engine
        .edit_builder()
        .asset(resolve(&args.input)?)
        .output(target(&args.output)?)
        .volume(args.volume);
    if let Some(start) = &args.start {
        builder = builder.trim_start(TimeParser::parse_millis(start)?);
    }
    if let Some(end) = &args.end {
        builder = builder.trim_end(TimeParser::parse_millis(end)?);
    }
    if let Some(degrees) = args.rotate {
        builder = builder.rotation(Rotation::from_degrees(degrees)?);
    }

    produce(engine, builder).await
}

/// Hand the input to the interactive editor; Ctrl-C cancels the launch
async fn edit_interactive(engine: &Engine, args: EditArgs) -> Result<()> {
    let session = engine.edit_session();
    let mut completion = session.launch(resolve(&args.input)?, target(&args.output)?)?;

    let outcome = tokio::select! {
        outcome = &mut completion => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling interactive edit");
            session.cancel();
            completion.await
        }
    };

    match outcome.into_result()? {
        Some(OperationResult::Asset(asset)) => {
            println!("{}", asset);
            Ok(())
        }
        Some(other) => Err(anyhow!("Unexpected result for edit: {:?}", other)),
        None => {
            println!("Edit cancelled");
            Ok(())
        }
    }
}

/// Build, execute and print the produced path
async fn produce<B: RequestBuilder>(engine: &Engine, builder: B) -> Result<()> {
    let kind = builder.kind();
    let request = builder.build()?;

    match run(engine, request).await? {
        OperationResult::Asset(asset) => {
            info!("{} written to {}", kind, asset);
            println!("{}", asset);
            Ok(())
        }
        other => Err(anyhow!("Unexpected result for {}: {:?}", kind, other)),
    }
}

/// Execute a request and wait for its outcome
async fn run(engine: &Engine, request: OperationRequest) -> Result<OperationResult> {
    let kind = request.kind();
    engine
        .execute(request)
        .await
        .into_result()?
        .ok_or_else(|| anyhow!("{} was cancelled", kind))
}

fn resolve(path: &Path) -> Result<AssetRef> {
    AssetRef::resolve(path).with_context(|| format!("Input {} is not readable", path.display()))
}

fn resolve_all(paths: &[PathBuf]) -> Result<Vec<AssetRef>> {
    paths.iter().map(|path| resolve(path)).collect()
}

fn target(path: &Path) -> Result<OutputTarget> {
    Ok(OutputTarget::new(path)?)
}

/// Display metadata in human-readable format
fn display_metadata(path: &Path, metadata: &MediaMetadata) {
    println!("Media Information");
    println!("=================");
    println!("File: {}", path.display());
    if let Some(container) = &metadata.container {
        println!("Format: {}", container);
    }
    println!("Duration: {}", format_duration_ms(metadata.duration_ms));
    if let Some(size) = metadata.size_bytes {
        println!("File Size: {}", format_file_size(size));
    }
    println!();

    println!("Video:");
    println!("  Codec: {}", metadata.video_codec);
    println!("  Resolution: {}", metadata.resolution());
    println!("  Rotation: {}", metadata.rotation);
    if metadata.rotation.is_transposed() {
        println!("  Displayed as: {}", metadata.display_resolution());
    }
    if let Some(pixel_format) = &metadata.pixel_format {
        println!("  Pixel Format: {}", pixel_format);
    }
    println!();

    match &metadata.audio_codec {
        Some(codec) => {
            println!("Audio:");
            println!("  Codec: {}", codec);
            if let Some(rate) = metadata.audio_sample_rate {
                println!("  Sample Rate: {} Hz", rate);
            }
        }
        None => println!("Audio: none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MediaMetadata {
        let mut meta =
            MediaMetadata::new(12_500, 1920, 1080, Rotation::Deg90, "h264", Some("aac".into()))
                .unwrap();
        meta.container = Some("mov,mp4,m4a,3gp,3g2,mj2".to_string());
        meta
    }

    #[test]
    fn test_render_json_round_trips() {
        let json = render_metadata(&sample(), OutputFormat::Json).unwrap();
        let parsed: MediaMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
        assert!(!json.contains("pixel_format"));
    }

    #[test]
    fn test_render_yaml() {
        let yaml = render_metadata(&sample(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("duration_ms: 12500"));
        assert!(yaml.contains("rotation: Deg90"));
    }
}
