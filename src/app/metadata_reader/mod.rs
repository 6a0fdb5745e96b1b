// Metadata reader - Scoped metadata extraction for single assets

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{HandleGuard, MediaToolkitPort};

/// Reads structural metadata through the toolkit.
///
/// Reads of distinct assets run concurrently; reads of the same asset are
/// serialized so a handle is never demuxed twice at once.
pub struct MetadataReader {
    toolkit: Arc<dyn MediaToolkitPort>,
    in_flight: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

/// Marks an asset as being read until dropped
struct ReadSlot<'a> {
    reader: &'a MetadataReader,
    path: PathBuf,
}

impl Drop for ReadSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.reader.lock_in_flight();
        in_flight.remove(&self.path);
        drop(in_flight);
        self.reader.released.notify_all();
    }
}

impl MetadataReader {
    pub fn new(toolkit: Arc<dyn MediaToolkitPort>) -> Self {
        Self {
            toolkit,
            in_flight: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Read a fresh metadata snapshot. May block; the handle is closed on every path.
    pub fn read(&self, asset: &AssetRef) -> Result<MediaMetadata, DomainError> {
        let _slot = self.claim(asset);

        let guard = HandleGuard::open(Arc::clone(&self.toolkit), asset)?;
        let metadata = self.toolkit.read_metadata(guard.handle())?;

        debug!(
            "Read metadata for {}: {}x{} {} {}, {}ms",
            asset,
            metadata.width,
            metadata.height,
            metadata.rotation,
            metadata.video_codec,
            metadata.duration_ms
        );
        Ok(metadata)
    }

    /// Read every asset in order, stopping at the first failure
    pub fn read_all(&self, assets: &[AssetRef]) -> Result<Vec<MediaMetadata>, DomainError> {
        assets.iter().map(|asset| self.read(asset)).collect()
    }

    fn claim(&self, asset: &AssetRef) -> ReadSlot<'_> {
        let path = asset.path().to_path_buf();
        let mut in_flight = self.lock_in_flight();
        while in_flight.contains(&path) {
            in_flight = self
                .released
                .wait(in_flight)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        in_flight.insert(path.clone());
        ReadSlot { reader: self, path }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryToolkitAdapter;

    fn hd(duration_ms: u64) -> MediaMetadata {
        MediaMetadata::new(duration_ms, 1920, 1080, Rotation::Deg0, "h264", Some("aac".into())).unwrap()
    }

    #[test]
    fn test_read_registered_asset() {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let asset = toolkit.register_asset("/media/a.mp4", hd(5000));
        let reader = MetadataReader::new(toolkit.clone());

        let meta = reader.read(&asset).unwrap();
        assert!(meta.width > 0 && meta.height > 0);
        assert_eq!(meta.duration_ms, 5000);
        assert_eq!(toolkit.open_handle_count(), 0);
    }

    #[test]
    fn test_read_unknown_asset_is_unreadable() {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let reader = MetadataReader::new(toolkit.clone());

        let err = reader.read(&AssetRef::from_resolved("/media/missing.mp4")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableAsset);
    }

    #[test]
    fn test_handle_closed_when_metadata_fails() {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let asset = toolkit.register_undecodable("/media/garbage.bin");
        let reader = MetadataReader::new(toolkit.clone());

        let err = reader.read(&asset).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(toolkit.open_handle_count(), 0);
    }

    #[test]
    fn test_read_all_stops_at_first_failure() {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let good = toolkit.register_asset("/media/a.mp4", hd(1000));
        let missing = AssetRef::from_resolved("/media/missing.mp4");
        let reader = MetadataReader::new(toolkit.clone());

        assert_eq!(reader.read_all(&[good.clone(), good.clone()]).unwrap().len(), 2);
        assert!(reader.read_all(&[good, missing]).is_err());
    }

    #[test]
    fn test_concurrent_reads_of_same_asset() {
        let toolkit = Arc::new(MemoryToolkitAdapter::new());
        let asset = toolkit.register_asset("/media/a.mp4", hd(2000));
        let reader = Arc::new(MetadataReader::new(toolkit.clone()));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let reader = Arc::clone(&reader);
                let asset = asset.clone();
                std::thread::spawn(move || reader.read(&asset).map(|m| m.duration_ms))
            })
            .collect();

        for worker in workers {
            assert_eq!(worker.join().unwrap().unwrap(), 2000);
        }
        assert_eq!(toolkit.max_concurrent_opens_per_asset(), 1);
    }
}
