use crate::detection::DetectionResult;
use eframe::egui;
use image::RgbaImage;

const OUTLINE_WIDTH: f32 = 3.0;
const INNER_WIDTH: f32 = 1.0;
const OUTLINE_RGBA: [u8; 4] = [0, 0, 0, 255];
const INNER_RGBA: [u8; 4] = [255, 255, 255, 255];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub font_size: f32,
    /// Distance from the box's top edge down to the label's baseline.
    pub label_offset: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_size: 15.0,
            label_offset: 10.0,
        }
    }
}

/// Ratio between the rendered and the natural size of an image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub fn between(rendered: egui::Vec2, natural: egui::Vec2) -> Option<Self> {
        if natural.x <= 0.0 || natural.y <= 0.0 {
            return None;
        }
        Some(Self {
            x: rendered.x / natural.x,
            y: rendered.y / natural.y,
        })
    }
}

/// One box ready to be painted, in canvas-local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayBox {
    pub rect: egui::Rect,
    pub label: String,
    pub label_pos: egui::Pos2,
}

/// Size the image is shown at: the natural size, shrunk to fit `available`
/// with its aspect ratio kept. Never upscales.
pub fn fit_to(natural: egui::Vec2, available: egui::Vec2) -> egui::Vec2 {
    if natural.x <= 0.0 || natural.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let factor = (available.x / natural.x)
        .min(available.y / natural.y)
        .clamp(0.0, 1.0);
    natural * factor
}

pub fn layout_boxes(
    result: &DetectionResult,
    rendered: egui::Vec2,
    natural: egui::Vec2,
    style: &OverlayStyle,
) -> Vec<OverlayBox> {
    let Some(scale) = Scale::between(rendered, natural) else {
        return Vec::new();
    };

    result
        .detections()
        .map(|p| {
            let min = egui::pos2(p.bbox.left as f32 * scale.x, p.bbox.top as f32 * scale.y);
            let size = egui::vec2(
                p.bbox.width as f32 * scale.x,
                p.bbox.height as f32 * scale.y,
            );
            OverlayBox {
                rect: egui::Rect::from_min_size(min, size),
                label: p.label(),
                label_pos: min + egui::vec2(0.0, style.label_offset),
            }
        })
        .collect()
}

/// Paint the preview texture as the canvas's base layer, then the overlay.
pub fn paint_canvas(
    painter: &egui::Painter,
    canvas: egui::Rect,
    texture: egui::TextureId,
    boxes: &[OverlayBox],
    style: &OverlayStyle,
) {
    painter.image(
        texture,
        canvas,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );
    paint_overlay(painter, canvas, boxes, style);
}

const LABEL_OUTLINE_OFFSETS: [egui::Vec2; 8] = [
    egui::vec2(-1.0, -1.0),
    egui::vec2(0.0, -1.0),
    egui::vec2(1.0, -1.0),
    egui::vec2(-1.0, 0.0),
    egui::vec2(1.0, 0.0),
    egui::vec2(-1.0, 1.0),
    egui::vec2(0.0, 1.0),
    egui::vec2(1.0, 1.0),
];

/// Paint boxes and labels over `canvas`. Everything is drawn twice, a wide
/// black pass and then a thin white one, so it reads on any background.
pub fn paint_overlay(
    painter: &egui::Painter,
    canvas: egui::Rect,
    boxes: &[OverlayBox],
    style: &OverlayStyle,
) {
    let origin = canvas.min.to_vec2();
    let font = egui::FontId::proportional(style.font_size);

    for b in boxes {
        let rect = b.rect.translate(origin);
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(OUTLINE_WIDTH, egui::Color32::BLACK),
            egui::StrokeKind::Middle,
        );
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(INNER_WIDTH, egui::Color32::WHITE),
            egui::StrokeKind::Middle,
        );

        let outline =
            painter.layout_no_wrap(b.label.clone(), font.clone(), egui::Color32::BLACK);
        let fill = painter.layout_no_wrap(b.label.clone(), font.clone(), egui::Color32::WHITE);
        // label_pos is the baseline; galleys are placed by their top-left corner
        let top_left = b.label_pos + origin - egui::vec2(0.0, baseline(&fill));
        for offset in LABEL_OUTLINE_OFFSETS {
            painter.galley(top_left + offset, outline.clone(), egui::Color32::BLACK);
        }
        painter.galley(top_left, fill, egui::Color32::WHITE);
    }
}

/// Distance from the top of `galley` to the baseline of its first row.
pub fn baseline(galley: &egui::Galley) -> f32 {
    galley
        .rows
        .first()
        .and_then(|row| row.glyphs.first())
        .map_or(galley.size().y, |glyph| glyph.pos.y)
}

/// Burn the box outlines into `img` at natural scale.
///
/// Labels need a font rasterizer and stay in the GUI.
pub fn burn_boxes(img: &mut RgbaImage, result: &DetectionResult) {
    for p in result.detections() {
        let x0 = p.bbox.left as f32;
        let y0 = p.bbox.top as f32;
        let x1 = x0 + p.bbox.width as f32;
        let y1 = y0 + p.bbox.height as f32;
        for (thickness, color) in [(OUTLINE_WIDTH, OUTLINE_RGBA), (INNER_WIDTH, INNER_RGBA)] {
            draw_line_on_image(img, x0, y0, x1, y0, thickness, color);
            draw_line_on_image(img, x1, y0, x1, y1, thickness, color);
            draw_line_on_image(img, x1, y1, x0, y1, thickness, color);
            draw_line_on_image(img, x0, y1, x0, y0, thickness, color);
        }
    }
}

/// Lines are axis-aligned box edges. Endpoints are clamped to just outside
/// the image, so an edge lying off-image stays off-image and the step count
/// is bounded by the image size, whatever the box coordinates are.
fn draw_line_on_image(
    img: &mut RgbaImage,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    thickness: f32,
    color: [u8; 4],
) {
    let half_t = (thickness / 2.0).max(0.5) as i32;
    let (w, h) = (img.width() as i32, img.height() as i32);
    let pad = (half_t + 1) as f32;
    let clamp_x = |x: f32| x.clamp(-pad, w as f32 - 1.0 + pad);
    let clamp_y = |y: f32| y.clamp(-pad, h as f32 - 1.0 + pad);
    let (x0, x1, y0, y1) = (clamp_x(x0), clamp_x(x1), clamp_y(y0), clamp_y(y1));

    let dx = x1 - x0;
    let dy = y1 - y0;
    let len = (dx * dx + dy * dy).sqrt();
    let steps = (len * 2.0) as i32;

    for i in 0..=steps {
        let t = i as f32 / steps.max(1) as f32;
        let cx = (x0 + dx * t).round() as i32;
        let cy = (y0 + dy * t).round() as i32;
        for oy in -half_t..=half_t {
            for ox in -half_t..=half_t {
                let px = cx + ox;
                let py = cy + oy;
                if px >= 0 && px < w && py >= 0 && py < h {
                    img.put_pixel(px as u32, py as u32, image::Rgba(color));
                }
            }
        }
    }
}
