//! Software rasterizer for overlays. Text ops (labels and the metrics band)
//! are left to the host UI, which has fonts.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::overlay::{DrawOp, Overlay};
use super::surface::RenderSurface;
use crate::error::RenderError;

pub fn rasterize(overlay: &Overlay) -> Result<RgbaImage, RenderError> {
    let camera = overlay.frame.image().to_rgba8();
    let (width, height) = camera.dimensions();
    let mut canvas = RgbaImage::new(width, height);

    for op in &overlay.ops {
        match op {
            DrawOp::Frame => canvas.copy_from_slice(camera.as_raw()),
            DrawOp::Fill {
                color,
                camera_weight,
            } => {
                for (target, source) in canvas.pixels_mut().zip(camera.pixels()) {
                    *target = blend(*color, *source, *camera_weight);
                }
            }
            DrawOp::MaskedFrame { threshold } => {
                let mask = overlay.mask.as_deref().ok_or_else(|| {
                    RenderError::Surface("masked frame without a segmentation mask".to_string())
                })?;
                if mask.dimensions() != (width, height) {
                    return Err(RenderError::MaskMismatch {
                        mask_width: mask.width(),
                        mask_height: mask.height(),
                        frame_width: width,
                        frame_height: height,
                    });
                }
                for (x, y, pixel) in canvas.enumerate_pixels_mut() {
                    if mask.is_person(x, y, *threshold) {
                        *pixel = *camera.get_pixel(x, y);
                    }
                }
            }
            DrawOp::Line {
                from,
                to,
                color,
                thickness,
            } => draw_thick_line(&mut canvas, *from, *to, *color, *thickness),
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                color,
                thickness,
            } => draw_rect(&mut canvas, (*x, *y, *width, *height), *color, *thickness),
            DrawOp::Point { at, radius, color } => {
                draw_filled_circle_mut(
                    &mut canvas,
                    (at.0.round() as i32, at.1.round() as i32),
                    *radius as i32,
                    *color,
                );
            }
            DrawOp::Label { .. } | DrawOp::Band { .. } => {}
        }
    }
    Ok(canvas)
}

fn blend(color: Rgba<u8>, camera: Rgba<u8>, camera_weight: f32) -> Rgba<u8> {
    let weight = camera_weight.clamp(0.0, 1.0);
    let mix = |c: u8, s: u8| (c as f32 * (1.0 - weight) + s as f32 * weight).round() as u8;
    Rgba([
        mix(color[0], camera[0]),
        mix(color[1], camera[1]),
        mix(color[2], camera[2]),
        255,
    ])
}

fn draw_thick_line(
    canvas: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    color: Rgba<u8>,
    thickness: u32,
) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = (dx * dx + dy * dy).sqrt();
    if thickness <= 1 || length == 0.0 {
        draw_line_segment_mut(canvas, from, to, color);
        return;
    }

    // Offset parallel segments along the normal.
    let (nx, ny) = (-dy / length, dx / length);
    let half = (thickness as f32 - 1.0) / 2.0;
    for step in 0..thickness {
        let offset = step as f32 - half;
        draw_line_segment_mut(
            canvas,
            (from.0 + nx * offset, from.1 + ny * offset),
            (to.0 + nx * offset, to.1 + ny * offset),
            color,
        );
    }
}

fn draw_rect(canvas: &mut RgbaImage, (x, y, width, height): (f32, f32, f32, f32), color: Rgba<u8>, thickness: u32) {
    let (x, y) = (x.round() as i32, y.round() as i32);
    let (width, height) = (width.round().max(0.0) as u32, height.round().max(0.0) as u32);

    for inset in 0..thickness.max(1) {
        let inner_width = width.saturating_sub(inset * 2);
        let inner_height = height.saturating_sub(inset * 2);
        if inner_width == 0 || inner_height == 0 {
            break;
        }
        let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(inner_width, inner_height);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Keeps the most recent rasterized overlay. Mostly useful for headless runs
/// and snapshots.
#[derive(Default)]
pub struct RasterSurface {
    latest: Option<RgbaImage>,
    presented: u64,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<&RgbaImage> {
        self.latest.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl RenderSurface for RasterSurface {
    fn present(&mut self, overlay: Overlay) -> Result<(), RenderError> {
        self.latest = Some(rasterize(&overlay)?);
        self.presented += 1;
        Ok(())
    }
}
