// Unit tests for request builders

use super::*;
use crate::adapters::memory::MemoryToolkitAdapter;

fn metadata(duration_ms: u64, width: u32, height: u32, rotation: Rotation) -> MediaMetadata {
    MediaMetadata::new(
        duration_ms,
        width,
        height,
        rotation,
        "h264",
        Some("aac".to_string()),
    )
    .unwrap()
}

fn setup() -> (Arc<MemoryToolkitAdapter>, Arc<MetadataReader>) {
    let toolkit = Arc::new(MemoryToolkitAdapter::new());
    let reader = Arc::new(MetadataReader::new(toolkit.clone()));
    (toolkit, reader)
}

fn output(path: &str) -> OutputTarget {
    OutputTarget::new(path).unwrap()
}

#[test]
fn test_empty_asset_set_rejected_for_every_kind() {
    let (_, reader) = setup();

    let builders: Vec<Box<dyn RequestBuilder>> = vec![
        Box::new(DenoiseBuilder::new(reader.clone()).output(output("/out/a.mp4"))),
        Box::new(CompareBuilder::new(reader.clone())),
        Box::new(ConcatBuilder::new(reader.clone()).output(output("/out/a.mp4"))),
        Box::new(MergeBuilder::new(reader.clone()).output(output("/out/a.mp4"))),
        Box::new(ThumbnailBuilder::new(reader.clone()).output(output("/out/a.png"))),
        Box::new(InfoBuilder::new(reader.clone())),
        Box::new(EditBuilder::new(reader).output(output("/out/a.mp4"))),
    ];

    for builder in builders {
        let err = builder.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyAssetSet, "kind {}", builder.kind());
    }
}

#[test]
fn test_single_asset_kinds_reject_two_assets() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));
    let b = toolkit.register_asset("/media/b.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let err = InfoBuilder::new(reader.clone())
        .assets([a.clone(), b.clone()])
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = DenoiseBuilder::new(reader)
        .asset(a)
        .asset(b)
        .output(output("/out/clean.mp4"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_producing_kinds_require_output() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let err = DenoiseBuilder::new(reader).asset(a).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_thumbnail_position_and_dimensions() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let base = ThumbnailBuilder::new(reader)
        .asset(a)
        .output(output("/out/thumb.png"));

    let request = base.clone().position_ms(1000).width(320).height(180).build().unwrap();
    assert_eq!(request.kind(), OperationKind::Thumbnail);
    match request.config() {
        OperationConfig::Thumbnail(config) => {
            assert_eq!(config.position_ms, 1000);
            assert_eq!(config.width, Some(320));
            assert!(!config.precise);
        }
        other => panic!("unexpected config {:?}", other),
    }

    // Position equal to duration is still inside the asset
    assert!(base.clone().position_ms(5000).build().is_ok());

    let err = base.clone().position_ms(5001).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = base.width(0).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_dimension_checked_before_metadata_read() {
    let (_, reader) = setup();
    let missing = AssetRef::from_resolved("/media/missing.mp4");

    let err = ThumbnailBuilder::new(reader)
        .asset(missing)
        .height(0)
        .output(output("/out/thumb.png"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_thumbnail_unreadable_asset_reported_by_build() {
    let (_, reader) = setup();

    let err = ThumbnailBuilder::new(reader)
        .asset(AssetRef::from_resolved("/media/missing.mp4"))
        .output(output("/out/thumb.png"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnreadableAsset);
}

#[test]
fn test_concat_rotation_mismatch_is_incompatible() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));
    let b = toolkit.register_asset("/media/b.mp4", metadata(5000, 1920, 1080, Rotation::Deg90));

    let err = ConcatBuilder::new(reader)
        .assets([a, b])
        .output(output("/out/joined.mp4"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleAssets);
    assert!(err.message().contains("rotation"));
    assert_eq!(toolkit.open_handle_count(), 0);
}

#[test]
fn test_concat_identical_assets() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));
    let b = toolkit.register_asset("/media/b.mp4", metadata(3000, 1920, 1080, Rotation::Deg0));

    let request = ConcatBuilder::new(reader)
        .assets([a.clone(), b.clone()])
        .output(output("/out/joined.mp4"))
        .build()
        .unwrap();
    assert_eq!(request.assets(), &[a, b]);
    assert!(request.output().is_some());
}

#[test]
fn test_merge_resolution_minimum() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let base = MergeBuilder::new(reader).asset(a).output(output("/out/merged.mp4"));

    let err = base
        .clone()
        .target_resolution(Resolution { width: 64, height: 720 })
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let request = base
        .target_resolution(Resolution { width: 1280, height: 720 })
        .frame_rate(FrameRate::Fps60)
        .video_codec(VideoCodec::Hevc)
        .build()
        .unwrap();
    match request.config() {
        OperationConfig::Merge(config) => {
            assert_eq!(config.frame_rate, FrameRate::Fps60);
            assert_eq!(config.video_codec, VideoCodec::Hevc);
        }
        other => panic!("unexpected config {:?}", other),
    }
}

#[test]
fn test_edit_volume_and_trim() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let base = EditBuilder::new(reader).asset(a).output(output("/out/edit.mp4"));

    assert_eq!(
        base.clone().volume(2.5).build().unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
    assert_eq!(
        base.clone().volume(f32::NAN).build().unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
    assert_eq!(
        base.clone().trim(3000, 1000).build().unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
    assert_eq!(
        base.clone().trim_end(9000).build().unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );

    let request = base
        .trim(1000, 4000)
        .rotation(Rotation::Deg90)
        .volume(0.5)
        .build()
        .unwrap();
    assert_eq!(request.kind(), OperationKind::Edit);
}

#[test]
fn test_first_error_is_deterministic() {
    let (_, reader) = setup();
    let builder = ThumbnailBuilder::new(reader).width(0);

    // Empty asset set wins over the bad width
    let first = builder.build().unwrap_err();
    let second = builder.build().unwrap_err();
    assert_eq!(first.kind(), ErrorKind::EmptyAssetSet);
    assert_eq!(first, second);
}

#[test]
fn test_build_is_idempotent() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));
    let b = toolkit.register_asset("/media/b.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let builder = ConcatBuilder::new(reader)
        .assets([a, b])
        .output(output("/out/joined.mp4"));

    assert_eq!(builder.build().unwrap(), builder.build().unwrap());
}

#[test]
fn test_output_cannot_overwrite_an_input() {
    let (toolkit, reader) = setup();
    let a = toolkit.register_asset("/media/a.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));
    let b = toolkit.register_asset("/media/b.mp4", metadata(5000, 1920, 1080, Rotation::Deg0));

    let err = ConcatBuilder::new(reader.clone())
        .assets([a.clone(), b])
        .output(output("/media/a.mp4"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = DenoiseBuilder::new(reader)
        .asset(a)
        .output(output("/media/a.mp4"))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert!(toolkit.contains("/media/a.mp4"));
}
