//! Image persistence collaborator.

use crate::camera::{HeaderCard, ImageRequest};
use crate::image::{ImageMetadata, ImageProxy, PixelBuffer};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Stores a read-out frame and hands back a reference to it.
///
/// Implementations decide where frames go (FITS files, a database, memory).
/// Drivers call [`ImageSaver::save`] once per readout and treat the returned
/// proxy as opaque.
#[async_trait]
pub trait ImageSaver: Send + Sync {
    /// Persist one frame and return a reference to it.
    ///
    /// The request's header cards are part of what is stored.
    async fn save(
        &self,
        request: &ImageRequest,
        pixels: PixelBuffer,
        metadata: ImageMetadata,
    ) -> Result<ImageProxy>;
}

/// A frame kept by [`MemoryImageStore`].
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Id of the request the frame was taken for
    pub request_id: Uuid,
    /// Row-major frame
    pub pixels: PixelBuffer,
    /// Metadata supplied by the driver
    pub metadata: ImageMetadata,
    /// Header cards of the request at save time
    pub headers: Vec<HeaderCard>,
}

/// In-process image store, for simulation and tests.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<ImageProxy, StoredImage>>,
}

impl MemoryImageStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the frame behind `proxy`, if it was stored here.
    pub fn get(&self, proxy: &ImageProxy) -> Option<StoredImage> {
        self.images.read().get(proxy).cloned()
    }

    /// Number of stored frames.
    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    /// `true` when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }
}

#[async_trait]
impl ImageSaver for MemoryImageStore {
    async fn save(
        &self,
        request: &ImageRequest,
        pixels: PixelBuffer,
        metadata: ImageMetadata,
    ) -> Result<ImageProxy> {
        let proxy = ImageProxy::new();
        tracing::debug!(
            %proxy,
            width = pixels.width,
            height = pixels.height,
            "Storing frame in memory"
        );
        self.images.write().insert(
            proxy,
            StoredImage {
                request_id: request.id,
                pixels,
                metadata,
                headers: request.headers.clone(),
            },
        );
        Ok(proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn save_then_get() {
        let store = MemoryImageStore::new();
        let mut request = ImageRequest::new(1.0);
        request.push_header("OBSERVER", "nobody", "");
        let pixels = PixelBuffer::new(2, 1, vec![7, 8]).unwrap();
        let metadata = ImageMetadata {
            frame_start_time: Utc::now(),
            frame_temperature: Some(-20.0),
            binning_factor: 1,
        };

        let proxy = store.save(&request, pixels.clone(), metadata.clone()).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get(&proxy).unwrap();
        assert_eq!(stored.request_id, request.id);
        assert_eq!(stored.pixels, pixels);
        assert_eq!(stored.metadata, metadata);
        assert_eq!(stored.headers[0].key, "OBSERVER");
        assert!(store.get(&ImageProxy::new()).is_none());
    }
}
