use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::sync::Arc;

/// One timestamped image sample from the capture device.
///
/// The image buffer is shared, so clones are cheap and nothing downstream can
/// mutate the pixels the source produced.
#[derive(Clone)]
pub struct Frame {
    id: u64,
    image: Arc<DynamicImage>,
    timestamp_ms: i64,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(id: u64, image: DynamicImage, timestamp_ms: i64) -> Self {
        Self {
            id,
            image: Arc::new(image),
            timestamp_ms,
            captured_at: Utc::now(),
        }
    }

    /// Sequence number assigned by the source, strictly increasing.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Monotonic acquisition time in milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("timestamp_ms", &self.timestamp_ms)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}
