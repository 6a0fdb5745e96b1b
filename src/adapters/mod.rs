// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod memory;
pub mod probe_ffprobe;
#[cfg(feature = "libav")]
pub mod probe_libav;

// Re-export adapters
pub use exec_ffmpeg::FfmpegToolkitAdapter;
pub use memory::MemoryToolkitAdapter;
pub use probe_ffprobe::FfprobeAdapter;
#[cfg(feature = "libav")]
pub use probe_libav::LibavProbeAdapter;
