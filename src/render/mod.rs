//! Overlay composition and hand-off to the host UI.

pub mod compositor;
pub mod connections;
pub mod layers;
pub mod overlay;
pub mod raster;
pub mod surface;

pub use compositor::Compositor;
pub use layers::LayerRenderer;
pub use overlay::{DrawOp, Layer, Overlay};
pub use raster::{rasterize, RasterSurface};
pub use surface::{OverlayChannel, OverlayReceiver, RenderSurface};
