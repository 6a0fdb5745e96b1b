// Unit tests for domain models

use super::*;
use crate::domain::errors::*;

#[test]
fn test_rotation_from_degrees() {
    assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::Deg0);
    assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Deg90);
    assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
    assert_eq!(Rotation::from_degrees(-180).unwrap(), Rotation::Deg180);
    assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Deg90);
    assert_eq!(
        Rotation::from_degrees(45).unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
}

#[test]
fn test_resolution_validation() {
    assert!(Resolution::new(1920, 1080).is_ok());
    assert!(Resolution::new(0, 1080).is_err());
    assert!(Resolution::new(1920, 0).is_err());

    let even = Resolution::new(721, 405).unwrap().to_even();
    assert_eq!(even, Resolution { width: 720, height: 404 });

    let widest = Resolution::new(u32::MAX, 1).unwrap().to_even();
    assert_eq!(widest, Resolution { width: u32::MAX - 1, height: 2 });
}

#[test]
fn test_media_metadata_invalid() {
    let err = MediaMetadata::new(1000, 0, 1080, Rotation::Deg0, "h264", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

    let err = MediaMetadata::new(1000, 1920, 1080, Rotation::Deg0, " ", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn test_media_metadata_blank_audio_codec_is_absent() {
    let meta = MediaMetadata::new(
        5000,
        1920,
        1080,
        Rotation::Deg0,
        "h264",
        Some(String::new()),
    )
    .unwrap();
    assert!(!meta.has_audio());
}

#[test]
fn test_display_resolution_swaps_for_portrait_rotation() {
    let meta = MediaMetadata::new(5000, 1920, 1080, Rotation::Deg90, "h264", None).unwrap();
    assert_eq!(meta.display_resolution(), Resolution { width: 1080, height: 1920 });

    let meta = MediaMetadata::new(5000, 1920, 1080, Rotation::Deg180, "h264", None).unwrap();
    assert_eq!(meta.display_resolution(), Resolution { width: 1920, height: 1080 });
}

#[test]
fn test_output_target_extension() {
    let target = OutputTarget::new("/tmp/out/thumb").unwrap().with_extension(".PNG");
    assert_eq!(target.expected_extension(), Some("png"));
    assert_eq!(target.resolved_path(), std::path::PathBuf::from("/tmp/out/thumb.png"));

    let target = OutputTarget::new("/tmp/out/thumb.png").unwrap().with_extension("png");
    assert_eq!(target.resolved_path(), std::path::PathBuf::from("/tmp/out/thumb.png"));

    assert!(OutputTarget::new("").is_err());
}

#[test]
fn test_asset_resolve_missing_file() {
    let err = AssetRef::resolve("/definitely/not/here.mp4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnreadableAsset);
}

#[test]
fn test_asset_resolve_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.MP4");
    std::fs::write(&path, b"data").unwrap();

    let asset = AssetRef::resolve(&path).unwrap();
    assert!(asset.path().is_absolute());
    assert!(asset.path().ends_with("clip.MP4"));
}

#[test]
fn test_frame_rate_and_codec_parse() {
    assert_eq!(FrameRate::parse("25").unwrap().value(), 25);
    assert!(FrameRate::parse("23.976").is_err());
    assert_eq!(VideoCodec::parse("H265").unwrap(), VideoCodec::Hevc);
    assert!(VideoCodec::parse("vp9").is_err());
}

#[test]
fn test_operation_kind_classification() {
    assert!(OperationKind::Concat.produces_asset());
    assert!(!OperationKind::Info.produces_asset());
    assert!(!OperationKind::Compare.produces_asset());
    assert!(OperationKind::Thumbnail.is_single_asset());
    assert!(!OperationKind::Merge.is_single_asset());
}

#[test]
fn test_outcome_into_result() {
    let outcome = CompletionOutcome::failure(DomainError::OutputNotProduced("missing".into()));
    let err = outcome.into_result().unwrap_err();
    assert_eq!(err, DomainError::OutputNotProduced("missing".into()));

    assert_eq!(CompletionOutcome::Cancelled.into_result().unwrap(), None);
}

#[test]
fn test_request_status_from_outcome() {
    let done = CompletionOutcome::Success(OperationResult::Compatibility(true));
    assert_eq!(RequestStatus::from(&done), RequestStatus::Completed);
    assert_eq!(RequestStatus::from(&CompletionOutcome::Cancelled), RequestStatus::Cancelled);

    let failed = CompletionOutcome::failure(DomainError::NativeOperationFailed("boom".into()));
    assert_eq!(RequestStatus::from(&failed), RequestStatus::Error);
    assert!(RequestStatus::Error.is_terminal());
    assert!(!RequestStatus::Processing.is_terminal());
}
