use tiny_skia::{FillRule, Pixmap, Transform};

use super::fill::solid_paint;
use super::shadow::{draw_with_shadow, ShadowParams};
use crate::geometry::{clip_mask, ellipse_path, rounded_rect_path, Color, Point, Rect};
use crate::scene::{WindowFrame, WindowStyle};

const TRAFFIC_LIGHT_X: [f32; 3] = [18.0, 42.0, 66.0];
const TRAFFIC_LIGHT_RADIUS: f32 = 6.0;
const TRAFFIC_LIGHT_COLORS: [Color; 3] = [
    Color::rgb(0xff, 0x5f, 0x57),
    Color::rgb(0xfe, 0xbc, 0x2e),
    Color::rgb(0x28, 0xc8, 0x40),
];
const NOTCH_MAX_WIDTH: f32 = 180.0;
const NOTCH_HEIGHT: f32 = 18.0;
const NOTCH_RADIUS: f32 = 8.0;
const FRAMELESS_RADIUS_MAX: f32 = 8.0;

/// Window body, title bar and decorations; `rect` includes the bar.
pub(crate) fn draw_window(
    surface: &mut Pixmap,
    frame: &WindowFrame,
    rect: Rect,
    shadow: Option<ShadowParams>,
    transform: Transform,
    pixel_ratio: f32,
) {
    let radius = frame.corner_radius();
    let Some(body) = rounded_rect_path(rect, radius) else {
        return;
    };
    let white = solid_paint(Color::WHITE);

    if let Some(params) = shadow {
        draw_with_shadow(
            surface,
            Some(params),
            pixel_ratio,
            transform,
            rect,
            None,
            |pixmap, ts, mask| pixmap.fill_path(&body, &white, FillRule::Winding, ts, mask),
        );
    }

    let Some(clip) = clip_mask(surface.width(), surface.height(), &body, transform, true) else {
        return;
    };
    let clip = Some(&clip);
    if let Some(window) = rect.to_skia() {
        surface.fill_rect(window, &white, transform, clip);
    }
    let bar_height = frame.bar_height() as f32;
    let bar_paint = solid_paint(frame.bar_color);
    if let Some(bar) = Rect::new(rect.x, rect.y, rect.w, bar_height).to_skia() {
        surface.fill_rect(bar, &bar_paint, transform, clip);
    }

    let style = frame.style();
    if style.has_traffic_lights() {
        let center_y = rect.y + bar_height / 2.0;
        for (offset, color) in TRAFFIC_LIGHT_X.iter().zip(TRAFFIC_LIGHT_COLORS) {
            let center = Point::new(rect.x + offset, center_y);
            if let Some(dot) = ellipse_path(center, TRAFFIC_LIGHT_RADIUS, TRAFFIC_LIGHT_RADIUS) {
                surface.fill_path(&dot, &solid_paint(color), FillRule::Winding, transform, clip);
            }
        }
    }
    if style == WindowStyle::Notch {
        let width = NOTCH_MAX_WIDTH.min(rect.w * 0.25);
        let notch = Rect::new(
            rect.x + rect.w / 2.0 - width / 2.0,
            rect.y + bar_height - NOTCH_HEIGHT,
            width,
            NOTCH_HEIGHT,
        );
        if let Some(path) = rounded_rect_path(notch, NOTCH_RADIUS) {
            surface.fill_path(&path, &bar_paint, FillRule::Winding, transform, clip);
        }
    }
}

/// White rounded silhouette under a frameless image, carrying the scene shadow.
pub(crate) fn draw_frameless_shadow(
    surface: &mut Pixmap,
    content: Rect,
    corner_radius: f32,
    shadow: ShadowParams,
    transform: Transform,
    pixel_ratio: f32,
) {
    let Some(path) = rounded_rect_path(content, corner_radius.min(FRAMELESS_RADIUS_MAX)) else {
        return;
    };
    let white = solid_paint(Color::WHITE);
    draw_with_shadow(
        surface,
        Some(shadow),
        pixel_ratio,
        transform,
        content,
        None,
        |pixmap, ts, mask| pixmap.fill_path(&path, &white, FillRule::Winding, ts, mask),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(surface: &Pixmap, x: u32, y: u32) -> (u8, u8, u8) {
        let pixel = surface.pixel(x, y).expect("pixel");
        (pixel.red(), pixel.green(), pixel.blue())
    }

    #[test]
    fn regular_window_has_bar_and_traffic_lights() {
        let mut surface = Pixmap::new(300, 200).expect("surface");
        let frame = WindowFrame::default();
        let rect = Rect::new(20.0, 20.0, 240.0, 150.0);
        draw_window(&mut surface, &frame, rect, None, Transform::identity(), 1.0);
        assert_eq!(rgb(&surface, 150, 30), (0x1f, 0x29, 0x37));
        assert_eq!(rgb(&surface, 38, 42), (0xff, 0x5f, 0x57));
        assert_eq!(rgb(&surface, 150, 120), (255, 255, 255));
        assert_eq!(surface.pixel(20, 20).expect("pixel").alpha(), 0);
    }

    #[test]
    fn title_only_window_skips_traffic_lights() {
        let mut surface = Pixmap::new(300, 200).expect("surface");
        let mut frame = WindowFrame::default();
        frame.set_style(WindowStyle::TitleOnly);
        let rect = Rect::new(20.0, 20.0, 240.0, 150.0);
        draw_window(&mut surface, &frame, rect, None, Transform::identity(), 1.0);
        assert_eq!(rgb(&surface, 38, 34), (0x1f, 0x29, 0x37));
        assert_eq!(rgb(&surface, 150, 60), (255, 255, 255));
    }

    #[test]
    fn notch_tab_is_drawn_below_the_bar_line() {
        let mut surface = Pixmap::new(300, 200).expect("surface");
        let mut frame = WindowFrame::default();
        frame.set_style(WindowStyle::Notch);
        frame.bar_color = Color::rgb(10, 20, 30);
        let rect = Rect::new(0.0, 0.0, 300.0, 200.0);
        draw_window(&mut surface, &frame, rect, None, Transform::identity(), 1.0);
        assert_eq!(rgb(&surface, 150, 40), (10, 20, 30));
        assert_eq!(rgb(&surface, 150, 50), (255, 255, 255));
    }

    #[test]
    fn frameless_shadow_darkens_below_content() {
        let mut surface = Pixmap::new(120, 120).expect("surface");
        let shadow = ShadowParams {
            color: Color::BLACK,
            blur: 0.0,
            offset_x: 0.0,
            offset_y: 10.0,
        };
        let content = Rect::new(20.0, 20.0, 60.0, 60.0);
        draw_frameless_shadow(&mut surface, content, 16.0, shadow, Transform::identity(), 1.0);
        assert_eq!(rgb(&surface, 50, 50), (255, 255, 255));
        let below = surface.pixel(50, 85).expect("pixel");
        assert_eq!((below.red(), below.alpha()), (0, 255));
    }
}
