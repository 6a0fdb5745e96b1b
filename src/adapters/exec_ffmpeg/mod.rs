//! FFmpeg execution adapter
//!
//! Implements the toolkit port on top of the `ffmpeg` executable. Metadata
//! comes from a separate probe backend.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::probe_ffprobe::FfprobeAdapter;
use crate::config::EngineConfig;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{MediaToolkitPort, MetadataProbePort};
use crate::utils::time::TimeParser;

/// Lines of ffmpeg stderr kept in failure messages
const STDERR_TAIL_LINES: usize = 8;

/// Single ffmpeg invocation
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl FfmpegCommand {
    pub fn new(binary_path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: vec!["-hide_banner".to_string(), "-y".to_string()],
            description: description.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(self, path: &Path) -> Self {
        self.arg("-i").arg(path.to_string_lossy())
    }

    pub fn output(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Run to completion, mapping a non-zero exit into a native failure
    pub fn run(&self) -> Result<(), DomainError> {
        debug!("Executing ffmpeg command: {} {:?}", self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .map_err(|e| {
                DomainError::NativeOperationFailed(format!("Failed to execute ffmpeg: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(DomainError::NativeOperationFailed(format!(
                "{} failed ({}): {}",
                self.description, output.status, tail
            )));
        }
        Ok(())
    }
}

/// Builds the ffmpeg invocation for each transform
pub struct CommandFactory {
    ffmpeg_path: String,
    denoise_filter: String,
}

impl CommandFactory {
    pub fn new(ffmpeg_path: impl Into<String>, denoise_filter: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            denoise_filter: denoise_filter.into(),
        }
    }

    fn command(&self, description: &str) -> FfmpegCommand {
        FfmpegCommand::new(&self.ffmpeg_path, description)
    }

    /// Filter the audio track, leave video untouched
    pub fn denoise(&self, input: &Path, output: &Path) -> FfmpegCommand {
        self.command("Denoise")
            .input(input)
            .args(["-c:v", "copy", "-af", self.denoise_filter.as_str(), "-c:a", "aac"])
            .output(output)
    }

    /// Concat demuxer over a list file. Stream copy unless a target resolution forces a re-encode.
    pub fn concat(&self, list_file: &Path, config: &ConcatConfig, output: &Path) -> FfmpegCommand {
        let cmd = self
            .command("Concat")
            .args(["-f", "concat", "-safe", "0"])
            .input(list_file);

        let cmd = match config.target_resolution {
            Some(target) => {
                let target = target.to_even();
                cmd.arg("-vf")
                    .arg(format!(
                        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
                        w = target.width,
                        h = target.height
                    ))
                    .args(["-c:v", "libx264", "-c:a", "aac"])
            }
            None => cmd.args(["-c", "copy"]),
        };
        cmd.output(output)
    }

    /// Scale and pad every input to a common frame, then concatenate with re-encoding
    pub fn merge(
        &self,
        inputs: &[(PathBuf, MediaMetadata)],
        config: &MergeConfig,
        output: &Path,
    ) -> FfmpegCommand {
        let target = config
            .target_resolution
            .unwrap_or_else(|| Resolution {
                width: inputs.iter().map(|(_, m)| m.width).max().unwrap_or(2),
                height: inputs.iter().map(|(_, m)| m.height).max().unwrap_or(2),
            })
            .to_even();
        let with_audio = !inputs.is_empty() && inputs.iter().all(|(_, m)| m.has_audio());

        let mut filter = String::new();
        let mut streams = String::new();
        for index in 0..inputs.len() {
            filter.push_str(&format!(
                "[{i}:v]scale=w={w}:h={h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1[v{i}];",
                i = index,
                w = target.width,
                h = target.height
            ));
            streams.push_str(&format!("[v{}]", index));
            if with_audio {
                streams.push_str(&format!("[{}:a]", index));
            }
        }
        filter.push_str(&format!(
            "{}concat=n={}:v=1:a={}[v]{}",
            streams,
            inputs.len(),
            u8::from(with_audio),
            if with_audio { "[a]" } else { "" }
        ));

        let mut cmd = self.command("Merge");
        for (path, _) in inputs {
            cmd = cmd.input(path);
        }
        cmd = cmd
            .arg("-filter_complex")
            .arg(filter)
            .args(["-map", "[v]"]);
        if with_audio {
            cmd = cmd.args(["-map", "[a]", "-c:a", "aac"]);
        }
        cmd = cmd
            .arg("-r")
            .arg(config.frame_rate.value().to_string())
            .arg("-c:v")
            .arg(config.video_codec.encoder_name());
        if config.video_codec == VideoCodec::Hevc {
            cmd = cmd.args(["-tag:v", "hvc1"]);
        }
        cmd.args(["-preset", "superfast"]).output(output)
    }

    /// Seek before `-i` jumps to the nearest keyframe; after `-i` decodes up to the exact frame
    pub fn thumbnail(&self, input: &Path, config: &ThumbnailConfig, output: &Path) -> FfmpegCommand {
        let position = TimeParser::format_ffmpeg(config.position_ms);
        let mut cmd = self.command("Thumbnail");

        if config.precise {
            cmd = cmd.input(input).arg("-ss").arg(position);
        } else {
            cmd = cmd
                .arg("-ss")
                .arg(position)
                .arg("-noaccurate_seek")
                .input(input);
        }

        let dimension = |value: Option<u32>| value.map_or_else(|| "-1".to_string(), |v| v.to_string());
        cmd.args(["-vframes", "1"])
            .arg("-vf")
            .arg(format!(
                "scale={}:{}",
                dimension(config.width),
                dimension(config.height)
            ))
            .output(output)
    }

    /// Trim, tag rotation and adjust volume while copying video
    pub fn edit(
        &self,
        input: &Path,
        metadata: &MediaMetadata,
        config: &EditConfig,
        output: &Path,
    ) -> FfmpegCommand {
        let mut cmd = self.command("Edit").input(input);

        if config.trims() {
            let start = config.trim_start_ms.unwrap_or(0);
            let end = config.trim_end_ms.unwrap_or(metadata.duration_ms);
            cmd = cmd
                .arg("-ss")
                .arg(TimeParser::format_ffmpeg(start))
                .arg("-to")
                .arg(TimeParser::format_ffmpeg(end));
        }

        if let Some(rotation) = config.rotation {
            cmd = cmd
                .arg("-metadata:s:v:0")
                .arg(format!("rotate={}", rotation.degrees()));
        }

        cmd = cmd.args(["-c:v", "copy"]);

        if config.volume == 0.0 {
            cmd = cmd.arg("-an");
        } else if config.volume == 1.0 {
            cmd = cmd.args(["-c:a", "copy"]);
        } else {
            let is_webm = output
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("webm"))
                .unwrap_or(false);
            cmd = cmd
                .arg("-af")
                .arg(format!("volume={}", config.volume))
                .arg("-c:a")
                .arg(if is_webm { "libopus" } else { "aac" });
        }

        cmd.output(output)
    }
}

/// Concat demuxer list; single quotes in paths are escaped the way ffmpeg expects
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("file '{}'\n", path.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

/// Toolkit backed by the ffmpeg executable
pub struct FfmpegToolkitAdapter {
    commands: CommandFactory,
    probe: Arc<dyn MetadataProbePort>,
    editor_command: Option<String>,
    handles: Mutex<HashMap<u64, PathBuf>>,
    next_handle: AtomicU64,
}

impl FfmpegToolkitAdapter {
    /// Toolkit with the probe backend selected at build time
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_probe(config, default_probe(config))
    }

    pub fn with_probe(config: &EngineConfig, probe: Arc<dyn MetadataProbePort>) -> Self {
        Self {
            commands: CommandFactory::new(&config.ffmpeg_path, &config.denoise_filter),
            probe,
            editor_command: config.editor_command.clone(),
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn lock_handles(&self) -> MutexGuard<'_, HashMap<u64, PathBuf>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle_path(&self, handle: &MediaHandle) -> Result<PathBuf, DomainError> {
        self.lock_handles()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| DomainError::UnreadableAsset(format!("Handle {} is not open", handle.id)))
    }

    fn single_input(&self, kind: OperationKind, handles: &[MediaHandle]) -> Result<PathBuf, DomainError> {
        match handles {
            [handle] => self.handle_path(handle),
            _ => Err(DomainError::NativeOperationFailed(format!(
                "{} expects one input, got {}",
                kind,
                handles.len()
            ))),
        }
    }

    fn denoise(&self, input: &Path, output: &Path) -> Result<(), DomainError> {
        let metadata = self.probe.probe(input)?;
        if !metadata.has_audio() {
            info!("{} has no audio track, copying as is", input.display());
            std::fs::copy(input, output).map_err(|e| {
                DomainError::NativeOperationFailed(format!(
                    "Failed to copy {} to {}: {}",
                    input.display(),
                    output.display(),
                    e
                ))
            })?;
            return Ok(());
        }
        self.commands.denoise(input, output).run()
    }

    fn concat(&self, inputs: &[PathBuf], config: &ConcatConfig, output: &Path) -> Result<(), DomainError> {
        let io_failure = |e: std::io::Error| {
            DomainError::NativeOperationFailed(format!("Failed to write concat list: {}", e))
        };

        let mut list = tempfile::Builder::new()
            .prefix("vidops-concat-")
            .suffix(".txt")
            .tempfile()
            .map_err(io_failure)?;
        list.write_all(concat_list(inputs).as_bytes()).map_err(io_failure)?;
        list.flush().map_err(io_failure)?;

        self.commands.concat(list.path(), config, output).run()
    }

    fn merge(&self, inputs: &[PathBuf], config: &MergeConfig, output: &Path) -> Result<(), DomainError> {
        let probed = inputs
            .iter()
            .map(|path| self.probe.probe(path).map(|meta| (path.clone(), meta)))
            .collect::<Result<Vec<_>, _>>()?;
        self.commands.merge(&probed, config, output).run()
    }

    fn edit(&self, input: &Path, config: &EditConfig, output: &Path) -> Result<(), DomainError> {
        let metadata = self.probe.probe(input)?;
        self.commands.edit(input, &metadata, config, output).run()
    }
}

#[cfg(feature = "libav")]
fn default_probe(_config: &EngineConfig) -> Arc<dyn MetadataProbePort> {
    Arc::new(crate::adapters::probe_libav::LibavProbeAdapter::new())
}

#[cfg(not(feature = "libav"))]
fn default_probe(config: &EngineConfig) -> Arc<dyn MetadataProbePort> {
    Arc::new(FfprobeAdapter::new(&config.ffprobe_path))
}

#[async_trait]
impl MediaToolkitPort for FfmpegToolkitAdapter {
    fn open_asset(&self, asset: &AssetRef) -> Result<MediaHandle, DomainError> {
        let path = asset.path();
        let file_meta = std::fs::metadata(path).map_err(|e| {
            DomainError::UnreadableAsset(format!("Cannot open {}: {}", path.display(), e))
        })?;
        if !file_meta.is_file() || file_meta.len() == 0 {
            return Err(DomainError::UnreadableAsset(format!(
                "{} is not a non-empty file",
                path.display()
            )));
        }
        std::fs::File::open(path).map_err(|e| {
            DomainError::UnreadableAsset(format!("Cannot open {}: {}", path.display(), e))
        })?;

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.lock_handles().insert(id, path.to_path_buf());
        Ok(MediaHandle::new(id, path))
    }

    fn close_handle(&self, handle: MediaHandle) {
        self.lock_handles().remove(&handle.id);
    }

    fn read_metadata(&self, handle: &MediaHandle) -> Result<MediaMetadata, DomainError> {
        let path = self.handle_path(handle)?;
        self.probe.probe(&path)
    }

    fn discard_output(&self, output: &OutputTarget) -> Result<(), DomainError> {
        let path = output.resolved_path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed previous output {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::NativeOperationFailed(format!(
                "Cannot replace {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn run_transform(
        &self,
        kind: OperationKind,
        handles: &[MediaHandle],
        config: &OperationConfig,
        output: &OutputTarget,
    ) -> Result<(), DomainError> {
        let output_path = output.resolved_path();

        match config {
            OperationConfig::Denoise => {
                let input = self.single_input(kind, handles)?;
                self.denoise(&input, &output_path)
            }
            OperationConfig::Concat(concat) => {
                let inputs = handles
                    .iter()
                    .map(|h| self.handle_path(h))
                    .collect::<Result<Vec<_>, _>>()?;
                self.concat(&inputs, concat, &output_path)
            }
            OperationConfig::Merge(merge) => {
                let inputs = handles
                    .iter()
                    .map(|h| self.handle_path(h))
                    .collect::<Result<Vec<_>, _>>()?;
                self.merge(&inputs, merge, &output_path)
            }
            OperationConfig::Thumbnail(thumbnail) => {
                let input = self.single_input(kind, handles)?;
                self.commands.thumbnail(&input, thumbnail, &output_path).run()
            }
            OperationConfig::Edit(edit) => {
                let input = self.single_input(kind, handles)?;
                self.edit(&input, edit, &output_path)
            }
            OperationConfig::Compare | OperationConfig::Info => Err(DomainError::NativeOperationFailed(
                format!("{} is not a transform", kind),
            )),
        }
    }

    async fn launch_interactive_editor(
        &self,
        handle: &MediaHandle,
        output: &OutputTarget,
    ) -> Result<Option<MediaHandle>, DomainError> {
        let editor = self.editor_command.as_deref().ok_or_else(|| {
            DomainError::NativeOperationFailed("No interactive editor configured".to_string())
        })?;
        let mut words = editor.split_whitespace();
        let program = words.next().ok_or_else(|| {
            DomainError::NativeOperationFailed("Editor command is empty".to_string())
        })?;

        let input = self.handle_path(handle)?;
        let output_path = output.resolved_path();
        self.discard_output(output)?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(words).arg(&input).arg(&output_path).kill_on_drop(true);
        debug!("Launching editor: {:?}", cmd);

        let status = cmd.status().await.map_err(|e| {
            DomainError::NativeOperationFailed(format!("Failed to launch editor '{}': {}", program, e))
        })?;
        if !status.success() {
            return Err(DomainError::NativeOperationFailed(format!(
                "Editor exited with {}",
                status
            )));
        }

        if !output_path.is_file() {
            warn!("Editor exited without writing {}", output_path.display());
            return Ok(None);
        }
        self.open_asset(&output.as_asset()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> CommandFactory {
        CommandFactory::new("ffmpeg", "afftdn")
    }

    fn joined(cmd: &FfmpegCommand) -> String {
        cmd.args.join(" ")
    }

    fn meta(width: u32, height: u32, audio: Option<&str>) -> MediaMetadata {
        MediaMetadata::new(5000, width, height, Rotation::Deg0, "h264", audio.map(String::from)).unwrap()
    }

    #[test]
    fn test_thumbnail_seek_placement() {
        let input = Path::new("/in/a.mp4");
        let output = Path::new("/out/a.png");

        let fast = factory().thumbnail(input, &ThumbnailConfig::default(), output);
        assert_eq!(
            joined(&fast),
            "-hide_banner -y -ss 00:00:01.000 -noaccurate_seek -i /in/a.mp4 -vframes 1 -vf scale=-1:-1 /out/a.png"
        );

        let config = ThumbnailConfig {
            position_ms: 2500,
            width: Some(320),
            height: None,
            precise: true,
        };
        let precise = factory().thumbnail(input, &config, output);
        assert_eq!(
            joined(&precise),
            "-hide_banner -y -i /in/a.mp4 -ss 00:00:02.500 -vframes 1 -vf scale=320:-1 /out/a.png"
        );
    }

    #[test]
    fn test_concat_stream_copy() {
        let cmd = factory().concat(
            Path::new("/tmp/list.txt"),
            &ConcatConfig::default(),
            Path::new("/out/joined.mp4"),
        );
        assert_eq!(
            joined(&cmd),
            "-hide_banner -y -f concat -safe 0 -i /tmp/list.txt -c copy /out/joined.mp4"
        );
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/in/a.mp4"), PathBuf::from("/in/it's.mp4")]);
        assert_eq!(list, "file '/in/a.mp4'\nfile '/in/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_merge_filter_graph() {
        let inputs = vec![
            (PathBuf::from("/in/a.mp4"), meta(1280, 720, Some("aac"))),
            (PathBuf::from("/in/b.mp4"), meta(1281, 721, Some("aac"))),
        ];
        let config = MergeConfig {
            target_resolution: None,
            frame_rate: FrameRate::Fps25,
            video_codec: VideoCodec::Hevc,
        };
        let cmd = factory().merge(&inputs, &config, Path::new("/out/m.mp4"));
        let args = joined(&cmd);

        assert!(args.contains("[0:v]scale=w=1280:h=720:force_original_aspect_ratio=decrease"));
        assert!(args.contains("[v0][0:a][v1][1:a]concat=n=2:v=1:a=1[v][a]"));
        assert!(args.contains("-map [a] -c:a aac"));
        assert!(args.contains("-r 25 -c:v hevc -tag:v hvc1"));
        assert!(args.ends_with("/out/m.mp4"));
    }

    #[test]
    fn test_merge_without_audio() {
        let inputs = vec![(PathBuf::from("/in/a.mp4"), meta(640, 480, None))];
        let cmd = factory().merge(&inputs, &MergeConfig::default(), Path::new("/out/m.mp4"));
        let args = joined(&cmd);

        assert!(args.contains("[v0]concat=n=1:v=1:a=0[v]"));
        assert!(!args.contains("-map [a]"));
        assert!(args.contains("-c:v libx264"));
    }

    #[test]
    fn test_edit_volume_variants() {
        let input = Path::new("/in/a.mp4");
        let source = meta(1280, 720, Some("aac"));

        let mute = EditConfig {
            volume: 0.0,
            ..EditConfig::default()
        };
        assert!(joined(&factory().edit(input, &source, &mute, Path::new("/out/e.mp4"))).contains("-c:v copy -an"));

        let untouched = EditConfig::default();
        assert!(joined(&factory().edit(input, &source, &untouched, Path::new("/out/e.mp4")))
            .contains("-c:a copy"));

        let louder = EditConfig {
            volume: 1.5,
            ..EditConfig::default()
        };
        assert!(joined(&factory().edit(input, &source, &louder, Path::new("/out/e.webm")))
            .contains("-af volume=1.5 -c:a libopus"));
    }

    #[test]
    fn test_edit_trim_and_rotation() {
        let config = EditConfig {
            trim_start_ms: Some(1500),
            trim_end_ms: None,
            rotation: Some(Rotation::Deg90),
            volume: 1.0,
        };
        let cmd = factory().edit(
            Path::new("/in/a.mp4"),
            &meta(1280, 720, None),
            &config,
            Path::new("/out/e.mp4"),
        );
        assert!(joined(&cmd).contains("-ss 00:00:01.500 -to 00:00:05.000 -metadata:s:v:0 rotate=90"));
    }

    #[test]
    fn test_denoise_uses_configured_filter() {
        let cmd = CommandFactory::new("/opt/ffmpeg", "anlmdn").denoise(
            Path::new("/in/a.mp4"),
            Path::new("/out/clean.mp4"),
        );
        assert_eq!(cmd.binary_path, "/opt/ffmpeg");
        assert!(joined(&cmd).contains("-c:v copy -af anlmdn -c:a aac"));
    }

    #[test]
    fn test_open_asset_rejects_missing_and_empty_files() {
        let toolkit = FfmpegToolkitAdapter::new(&EngineConfig::default());
        let missing = AssetRef::from_resolved("/definitely/not/here.mp4");
        assert_eq!(
            toolkit.open_asset(&missing).unwrap_err().kind(),
            ErrorKind::UnreadableAsset
        );

        let empty = tempfile::NamedTempFile::new().unwrap();
        let err = toolkit
            .open_asset(&AssetRef::from_resolved(empty.path()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableAsset);
    }

    #[test]
    fn test_open_and_close_handle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not really a video").unwrap();

        let toolkit = FfmpegToolkitAdapter::new(&EngineConfig::default());
        let handle = toolkit.open_asset(&AssetRef::from_resolved(file.path())).unwrap();
        assert_eq!(toolkit.lock_handles().len(), 1);
        toolkit.close_handle(handle);
        assert!(toolkit.lock_handles().is_empty());
    }

    #[test]
    fn test_discard_output_removes_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        std::fs::write(&path, b"stale").unwrap();

        let toolkit = FfmpegToolkitAdapter::new(&EngineConfig::default());
        let target = OutputTarget::new(path.clone()).unwrap();

        toolkit.discard_output(&target).unwrap();
        assert!(!path.exists());
        toolkit.discard_output(&target).unwrap();

        let err = toolkit.open_asset(&target.as_asset()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableAsset);
    }
}
