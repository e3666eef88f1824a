// ============================================================
// Layer 6 — Rendering
// ============================================================
// Two output formats:
//
//   PNG  — 4x4 grid of digits, white on black, each cell
//          captioned with a label drawn from a tiny built-in
//          3x5 bitmap font (digits only)
//
//   SVG  — training curves, two stacked panels:
//            model accuracy (train + val) vs epoch
//            model loss     (train + val) vs epoch

use anyhow::{bail, Context, Result};
use image::{GrayImage, Luma};
use std::{fmt::Write as _, fs, path::Path};

use crate::domain::history::{Metric, TrainingHistory};
use crate::domain::image::RawImages;

/// Cells per grid side
pub const DISPLAY_SIZE: usize = 4;

const SCALE:       u32 = 3;
const GLYPH_W:     u32 = 3;
const GLYPH_H:     u32 = 5;
const GLYPH_SCALE: u32 = 3;
const PAD:         u32 = 6;
const CAPTION_H:   u32 = GLYPH_H * GLYPH_SCALE + 2 * PAD;

// ─── Digit Grid (PNG) ─────────────────────────────────────────────────────────

/// Render up to 16 images in a 4x4 grid, each captioned with the
/// label at the same position, and save it as PNG.
pub fn render_digit_grid(images: &RawImages, labels: &[usize], path: &Path) -> Result<()> {
    let grid = digit_grid(images, labels)?;
    grid.save(path)
        .with_context(|| format!("Cannot write image grid to '{}'", path.display()))?;
    tracing::info!("Saved {} digits to '{}'", labels.len().min(DISPLAY_SIZE * DISPLAY_SIZE), path.display());
    Ok(())
}

/// Build the grid image without writing it.
pub fn digit_grid(images: &RawImages, labels: &[usize]) -> Result<GrayImage> {
    if images.len() != labels.len() {
        bail!("{} images but {} labels", images.len(), labels.len());
    }

    let cell_w = images.cols() as u32 * SCALE + 2 * PAD;
    let cell_h = images.rows() as u32 * SCALE + CAPTION_H + PAD;
    let side   = DISPLAY_SIZE as u32;
    let mut canvas = GrayImage::from_pixel(cell_w * side, cell_h * side, Luma([0u8]));

    for (i, &label) in labels.iter().enumerate().take(DISPLAY_SIZE * DISPLAY_SIZE) {
        let x0 = (i % DISPLAY_SIZE) as u32 * cell_w;
        let y0 = (i / DISPLAY_SIZE) as u32 * cell_h;

        draw_number(&mut canvas, label, x0 + PAD, y0 + PAD);

        let pixels = images.image(i);
        for r in 0..images.rows() {
            for c in 0..images.cols() {
                let v = Luma([pixels[r * images.cols() + c]]);
                for dy in 0..SCALE {
                    for dx in 0..SCALE {
                        canvas.put_pixel(
                            x0 + PAD + c as u32 * SCALE + dx,
                            y0 + CAPTION_H + r as u32 * SCALE + dy,
                            v,
                        );
                    }
                }
            }
        }
    }
    Ok(canvas)
}

// Rows of 3 bits, most significant bit = leftmost column
const GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

fn draw_number(canvas: &mut GrayImage, value: usize, x: u32, y: u32) {
    let advance = (GLYPH_W + 1) * GLYPH_SCALE;
    for (k, ch) in value.to_string().chars().enumerate() {
        let Some(d) = ch.to_digit(10) else { continue };
        draw_glyph(canvas, &GLYPHS[d as usize], x + k as u32 * advance, y);
    }
}

fn draw_glyph(canvas: &mut GrayImage, glyph: &[u8; 5], x: u32, y: u32) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..GLYPH_W {
            if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let px = x + col * GLYPH_SCALE + dx;
                    let py = y + row as u32 * GLYPH_SCALE + dy;
                    if px < canvas.width() && py < canvas.height() {
                        canvas.put_pixel(px, py, Luma([255]));
                    }
                }
            }
        }
    }
}

// ─── Training Curves (SVG) ────────────────────────────────────────────────────

const WIDTH:   f64 = 640.0;
const PANEL_H: f64 = 320.0;
const LEFT:    f64 = 70.0;
const RIGHT:   f64 = 20.0;
const TOP:     f64 = 40.0;
const BOTTOM:  f64 = 50.0;

const TRAIN_COLOUR: &str = "#1f77b4";
const VAL_COLOUR:   &str = "#ff7f0e";

#[derive(Clone, Copy)]
enum LegendCorner {
    LowerRight,
    UpperRight,
}

/// Render the history as SVG and save it.
pub fn render_history(history: &TrainingHistory, path: &Path) -> Result<()> {
    if history.epochs() == 0 {
        bail!("training history is empty");
    }
    fs::write(path, history_svg(history))
        .with_context(|| format!("Cannot write training curves to '{}'", path.display()))?;
    tracing::info!("Saved training curves to '{}'", path.display());
    Ok(())
}

/// Two stacked panels: accuracy on top, loss below.
pub fn history_svg(history: &TrainingHistory) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{}" font-family="sans-serif" font-size="12">"#,
        2.0 * PANEL_H
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    panel(
        &mut svg, 0.0, "model accuracy", "accuracy",
        history.get(Metric::Accuracy), history.get(Metric::ValAccuracy),
        LegendCorner::LowerRight,
    );
    panel(
        &mut svg, PANEL_H, "model loss", "loss",
        history.get(Metric::Loss), history.get(Metric::ValLoss),
        LegendCorner::UpperRight,
    );

    svg.push_str("</svg>\n");
    svg
}

fn panel(
    svg:     &mut String,
    y_off:   f64,
    title:   &str,
    y_label: &str,
    train:   &[f64],
    val:     &[f64],
    legend:  LegendCorner,
) {
    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = PANEL_H - TOP - BOTTOM;
    let x0 = LEFT;
    let y0 = y_off + TOP;

    let epochs = train.len().max(val.len()).max(1);
    let (lo, hi) = value_range(train.iter().chain(val).copied());

    let sx = |i: usize| {
        if epochs == 1 { x0 + plot_w / 2.0 } else { x0 + plot_w * i as f64 / (epochs - 1) as f64 }
    };
    let sy = |v: f64| y0 + plot_h * (1.0 - (v - lo) / (hi - lo));

    // Title, frame, axis labels
    let _ = writeln!(svg, r#"<text x="{}" y="{}" text-anchor="middle" font-size="14">{title}</text>"#, x0 + plot_w / 2.0, y_off + TOP / 2.0 + 5.0);
    let _ = writeln!(svg, r#"<rect x="{x0}" y="{y0}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#);
    let _ = writeln!(svg, r#"<text x="{}" y="{}" text-anchor="middle">epoch</text>"#, x0 + plot_w / 2.0, y0 + plot_h + 38.0);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" transform="rotate(-90 {} {})">{y_label}</text>"#,
        LEFT - 50.0, y0 + plot_h / 2.0, LEFT - 50.0, y0 + plot_h / 2.0,
    );

    // Ticks: epochs are numbered from 0 like the x index
    let step = (epochs + 9) / 10;
    for i in (0..epochs).step_by(step.max(1)) {
        let x = sx(i);
        let _ = writeln!(svg, r#"<line x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="black"/>"#, y0 + plot_h, y0 + plot_h + 4.0);
        let _ = writeln!(svg, r#"<text x="{x}" y="{}" text-anchor="middle">{i}</text>"#, y0 + plot_h + 18.0);
    }
    for k in 0..=4 {
        let v = lo + (hi - lo) * k as f64 / 4.0;
        let y = sy(v);
        let _ = writeln!(svg, r#"<line x1="{}" y1="{y}" x2="{x0}" y2="{y}" stroke="black"/>"#, x0 - 4.0);
        let _ = writeln!(svg, r#"<text x="{}" y="{}" text-anchor="end">{v:.3}</text>"#, x0 - 6.0, y + 4.0);
    }

    // Series
    for (series, colour) in [(train, TRAIN_COLOUR), (val, VAL_COLOUR)] {
        let points: Vec<String> = series
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, &v)| format!("{:.2},{:.2}", sx(i), sy(v)))
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{colour}" stroke-width="2" points="{}"/>"#,
            points.join(" ")
        );
    }

    // Legend
    let lx = x0 + plot_w - 80.0;
    let ly = match legend {
        LegendCorner::LowerRight => y0 + plot_h - 44.0,
        LegendCorner::UpperRight => y0 + 8.0,
    };
    let _ = writeln!(svg, r##"<rect x="{lx}" y="{ly}" width="72" height="36" fill="white" stroke="#cccccc"/>"##);
    for (k, (name, colour)) in [("train", TRAIN_COLOUR), ("val", VAL_COLOUR)].iter().enumerate() {
        let y = ly + 12.0 + 14.0 * k as f64;
        let _ = writeln!(svg, r#"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="{colour}" stroke-width="2"/>"#, lx + 6.0, lx + 26.0);
        let _ = writeln!(svg, r#"<text x="{}" y="{}">{name}</text>"#, lx + 32.0, y + 4.0);
    }
}

/// Padded [lo, hi] covering every finite value; never zero-width.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-9 {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::EpochMetrics;

    fn history(epochs: usize) -> TrainingHistory {
        let mut h = TrainingHistory::new();
        for e in 1..=epochs {
            let f = e as f64;
            h.record(&EpochMetrics {
                epoch: e,
                loss: 1.0 / f,
                accuracy: 1.0 - 0.5 / f,
                val_loss: 1.2 / f,
                val_accuracy: 1.0 - 0.6 / f,
            });
        }
        h
    }

    #[test]
    fn test_grid_dimensions_and_pixels() {
        let images = RawImages::new(28, 28, vec![200u8; 2 * 28 * 28]).unwrap();
        let grid   = digit_grid(&images, &[7, 1]).unwrap();

        let cell_w = 28 * SCALE + 2 * PAD;
        let cell_h = 28 * SCALE + CAPTION_H + PAD;
        assert_eq!(grid.dimensions(), (4 * cell_w, 4 * cell_h));

        // first digit body is copied, empty third cell stays black
        assert_eq!(grid.get_pixel(PAD, CAPTION_H)[0], 200);
        assert_eq!(grid.get_pixel(2 * cell_w + PAD, CAPTION_H)[0], 0);
    }

    #[test]
    fn test_grid_rejects_mismatched_labels() {
        let images = RawImages::new(28, 28, vec![0u8; 28 * 28]).unwrap();
        assert!(digit_grid(&images, &[1, 2]).is_err());
    }

    #[test]
    fn test_grid_png_is_written() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("grid.png");
        let images = RawImages::new(28, 28, vec![9u8; 20 * 28 * 28]).unwrap();
        render_digit_grid(&images, &(0..20).map(|i| i % 10).collect::<Vec<_>>(), &path).unwrap();
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn test_caption_lights_pixels() {
        let mut canvas = GrayImage::from_pixel(40, 20, Luma([0u8]));
        draw_number(&mut canvas, 1, 0, 0);
        // "1" has its top-centre bit set
        assert_eq!(canvas.get_pixel(GLYPH_SCALE, 0)[0], 255);
        assert_eq!(canvas.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_history_svg_has_both_panels() {
        let svg = history_svg(&history(5));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("model accuracy"));
        assert!(svg.contains("model loss"));
        assert_eq!(svg.matches("<polyline").count(), 4);
        assert_eq!(svg.matches(">train<").count(), 2);
        assert_eq!(svg.matches(">val<").count(), 2);
    }

    #[test]
    fn test_single_epoch_and_empty_history() {
        assert!(history_svg(&history(1)).contains("<polyline"));

        let dir = tempfile::tempdir().unwrap();
        assert!(render_history(&TrainingHistory::new(), &dir.path().join("h.svg")).is_err());
    }

    #[test]
    fn test_value_range_pads_flat_series() {
        assert_eq!(value_range([0.5, 0.5].into_iter()), (0.0, 1.0));
        assert_eq!(value_range(std::iter::empty()), (0.0, 1.0));
    }
}
