use image::Rgba;
use indexmap::IndexMap;
use tracing::debug;

use super::layers::{
    BackgroundLayer, FaceMeshLayer, ForegroundLayer, HandLayer, LayerRenderer, MetricsLayer,
    ObjectLayer,
};
use super::overlay::{Layer, Overlay};
use crate::config::OverlayConfig;
use crate::error::RenderError;
use crate::pipeline::orchestration::Snapshot;

/// Turns a snapshot into an ordered overlay by running each enabled layer.
///
/// The layer set is fixed when the compositor is built, so toggles are read
/// once rather than on every frame.
pub struct Compositor {
    layers: IndexMap<Layer, Box<dyn LayerRenderer>>,
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            layers: IndexMap::new(),
        }
    }

    pub fn add_layer(mut self, renderer: Box<dyn LayerRenderer>) -> Self {
        self.layers.insert(renderer.layer(), renderer);
        self.layers.sort_keys();
        self
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        let background = if config.segmentation_enabled {
            BackgroundLayer::virtual_background(
                Rgba(config.virtual_background_color),
                config.virtual_background_transparency,
            )
        } else {
            BackgroundLayer::plain()
        };

        let mut compositor = Self::new()
            .add_layer(Box::new(background))
            .add_layer(Box::new(MetricsLayer));
        if config.segmentation_enabled {
            compositor = compositor.add_layer(Box::new(ForegroundLayer::new(
                config.segmentation_threshold,
            )));
        }
        if config.show_face_landmarks {
            compositor = compositor.add_layer(Box::new(FaceMeshLayer));
        }
        if config.show_object_detections {
            compositor = compositor.add_layer(Box::new(ObjectLayer::new(config.score_threshold)));
        }
        if config.show_hand_landmarks {
            compositor = compositor.add_layer(Box::new(HandLayer));
        }
        compositor
    }

    pub fn layers(&self) -> impl Iterator<Item = Layer> + '_ {
        self.layers.keys().copied()
    }

    pub fn compose(&self, snapshot: &Snapshot) -> Result<Overlay, RenderError> {
        let mut ops = Vec::new();
        let mut drawn = Vec::with_capacity(self.layers.len());

        for (layer, renderer) in &self.layers {
            let before = ops.len();
            renderer.render(snapshot, &mut ops)?;
            if ops.len() > before {
                drawn.push(*layer);
            }
        }
        debug!(
            frame_id = snapshot.frame.id(),
            layers = %drawn.iter().map(Layer::name).collect::<Vec<_>>().join(","),
            ops = ops.len(),
            "Composed overlay"
        );

        Ok(Overlay {
            frame: snapshot.frame.clone(),
            mask: snapshot.mask.as_ref().map(|mask| mask.shared()),
            layers: drawn,
            ops,
            engagement: snapshot.engagement,
            person_count: snapshot.person_count,
            stale: snapshot.stale,
        })
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}
