use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

use super::overlay::Overlay;
use crate::error::RenderError;

/// Where composed overlays go. The host UI owns the actual drawing.
pub trait RenderSurface: Send {
    fn present(&mut self, overlay: Overlay) -> Result<(), RenderError>;
}

/// Publishes the latest overlay to any number of UI readers. Readers that fall
/// behind only ever see the newest overlay.
pub struct OverlayChannel {
    sender: watch::Sender<Option<Arc<Overlay>>>,
}

impl OverlayChannel {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn subscribe(&self) -> OverlayReceiver {
        OverlayReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for OverlayChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for OverlayChannel {
    fn present(&mut self, overlay: Overlay) -> Result<(), RenderError> {
        self.sender.send_replace(Some(Arc::new(overlay)));
        Ok(())
    }
}

#[derive(Clone)]
pub struct OverlayReceiver {
    receiver: watch::Receiver<Option<Arc<Overlay>>>,
}

impl OverlayReceiver {
    pub fn latest(&self) -> Option<Arc<Overlay>> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next overlay. Returns `None` once the channel is gone.
    pub async fn changed(&mut self) -> Option<Arc<Overlay>> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }

    pub fn into_stream(self) -> impl Stream<Item = Arc<Overlay>> {
        WatchStream::new(self.receiver).filter_map(|overlay| overlay)
    }
}
