// ============================================================
// Layer 6 — Plots
// ============================================================
// PNG charts drawn with plotters' bitmap backend:
//
//   dataset.png            5x5 grid of training images
//   accuracy_{type}.png    CNN accuracy / val_accuracy per epoch
//   resnet50_loss.png      ResNet50 loss (points) / val_loss (line)
//   resnet50_accuracy.png  ResNet50 accuracy (points) / val_accuracy (line)
//
// Plots are a by-product of a run: callers log a failure
// (e.g. no usable system font) and carry on.

use anyhow::{bail, Result};
use plotters::prelude::*;
use std::{ops::Range, path::Path};

use crate::domain::history::History;
use crate::domain::image::{LabeledImage, IMAGE_SIDE};

const CHART_DIMS: (u32, u32) = (640, 480);
const GRID: usize = 5;
const PIXEL_SCALE: usize = 3;
const CELL_TITLE_HEIGHT: usize = 20;
const FONT: &str = "sans-serif";

/// Draw the first 25 images in a 5x5 grid, each titled with its class.
pub fn plot_dataset_grid(images: &[LabeledImage], path: &Path) -> Result<()> {
    let shown = &images[..images.len().min(GRID * GRID)];
    if shown.is_empty() {
        bail!("no images to plot");
    }

    let cell = IMAGE_SIDE * PIXEL_SCALE;
    let side = (GRID * (cell + CELL_TITLE_HEIGHT)) as u32;
    let root = BitMapBackend::new(path, (side, side)).into_drawing_area();
    root.fill(&WHITE)?;

    for (area, image) in root.split_evenly((GRID, GRID)).into_iter().zip(shown) {
        let area = area.titled(image.class_name(), (FONT, 14))?;
        for y in 0..IMAGE_SIDE {
            for x in 0..IMAGE_SIDE {
                let (r, g, b) = image.rgb(y, x);
                let (px, py) = ((x * PIXEL_SCALE) as i32, (y * PIXEL_SCALE) as i32);
                let s = PIXEL_SCALE as i32;
                area.draw(&Rectangle::new(
                    [(px, py), (px + s, py + s)],
                    RGBColor(r, g, b).filled(),
                ))?;
            }
        }
    }

    root.present()?;
    tracing::info!("Saved dataset grid to '{}'", path.display());
    Ok(())
}

/// CNN accuracy curves, y axis fixed to [0.5, 1].
pub fn plot_accuracy(history: &History, path: &Path) -> Result<()> {
    if history.is_empty() {
        bail!("no epochs to plot");
    }
    let accuracy = history.accuracy();
    let val_accuracy = history.val_accuracy();
    let x_range = epoch_range(accuracy.len());

    let root = BitMapBackend::new(path, CHART_DIMS).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, 0.5f64..1.0f64)?;

    chart.configure_mesh()
        .x_desc("Epoch")
        .y_desc("Accuracy")
        .draw()?;

    chart
        .draw_series(LineSeries::new(indexed(&accuracy), &BLUE))?
        .label("accuracy")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], BLUE));
    chart
        .draw_series(LineSeries::new(indexed(&val_accuracy), &RED))?
        .label("val_accuracy")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .position(SeriesLabelPosition::LowerRight)
        .draw()?;

    root.present()?;
    tracing::info!("Saved accuracy plot to '{}'", path.display());
    Ok(())
}

/// ResNet50 loss and accuracy charts: training as points,
/// validation as a line.
pub fn plot_resnet_curves(history: &History, loss_path: &Path, accuracy_path: &Path) -> Result<()> {
    if history.is_empty() {
        bail!("no epochs to plot");
    }
    plot_train_vs_val(
        loss_path,
        "Training and validation loss",
        "Loss",
        &history.loss(),
        &history.val_loss(),
    )?;
    plot_train_vs_val(
        accuracy_path,
        "Training and validation accuracy",
        "Accuracy",
        &history.accuracy(),
        &history.val_accuracy(),
    )
}

fn plot_train_vs_val(
    path:    &Path,
    title:   &str,
    y_desc:  &str,
    train:   &[f64],
    val:     &[f64],
) -> Result<()> {
    let all: Vec<f64> = train.iter().chain(val).copied().collect();
    let y_range = padded_range(&all);
    let x_range = epoch_range(train.len());

    let root = BitMapBackend::new(path, CHART_DIMS).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart.configure_mesh()
        .x_desc("Epoch")
        .y_desc(y_desc)
        .draw()?;

    chart
        .draw_series(indexed(train).map(|p| Circle::new(p, 4, BLUE.filled())))?
        .label(format!("Training {}", y_desc.to_lowercase()))
        .legend(|(x, y)| Circle::new((x + 10, y), 4, BLUE.filled()));
    chart
        .draw_series(LineSeries::new(indexed(val), &BLUE))?
        .label(format!("Validation {}", y_desc.to_lowercase()))
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    tracing::info!("Saved plot to '{}'", path.display());
    Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// (epoch index, value) pairs, epochs counted from 0
fn indexed(values: &[f64]) -> impl Iterator<Item = (f64, f64)> + '_ {
    values.iter().enumerate().map(|(i, &v)| (i as f64, v))
}

fn epoch_range(epochs: usize) -> Range<f64> {
    0.0..(epochs.saturating_sub(1) as f64).max(1.0)
}

/// Range covering every finite value with 5% headroom on each side.
fn padded_range(values: &[f64]) -> Range<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}

/// Whether plotters finds a system font to draw text with.
#[cfg(test)]
pub(crate) fn text_renders() -> bool {
    let mut buf = vec![0u8; 32 * 32 * 3];
    let root = BitMapBackend::with_buffer(&mut buf, (32, 32)).into_drawing_area();
    root.draw(&Text::new("a", (0, 0), (FONT, 12.0).into_font())).is_ok()
}
