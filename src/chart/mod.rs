use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use crate::timeline::Workload;

pub mod comparison;
pub mod gantt;
pub mod output;
mod pdf;

pub use comparison::ComparisonChart;
pub use gantt::GanttChart;
pub use output::{chart_file_name, display_chart, save_chart};
pub use pdf::PdfError;

/// Resolution of rendered charts.
pub const PIXELS_PER_INCH: u32 = 150;

pub type DrawResult<T, DB> = Result<T, DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to draw the {chart} chart: {message}")]
    Drawing { chart: &'static str, message: String },
    #[error("Failed to encode the {chart} chart image")]
    Encode {
        chart: &'static str,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to assemble PDF")]
    Pdf(#[from] PdfError),
    #[error("Failed to write chart file `{}`", path.display())]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A figure that can be drawn on any plotters backend.
pub trait Chart {
    /// Short name used in file names and messages, e.g. `gantt`.
    fn name(&self) -> &'static str;

    /// Figure size in inches.
    fn figure_size(&self) -> (f64, f64);

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult<(), DB>;

    /// Figure size in pixels at [`PIXELS_PER_INCH`].
    fn pixel_size(&self) -> (u32, u32) {
        let (width, height) = self.figure_size();
        (inches_to_pixels(width), inches_to_pixels(height))
    }
}

fn inches_to_pixels(inches: f64) -> u32 {
    (inches * f64::from(PIXELS_PER_INCH)).round() as u32
}

/// Converts a font size in points to pixels at [`PIXELS_PER_INCH`].
pub(crate) fn points(size: f64) -> f64 {
    size * f64::from(PIXELS_PER_INCH) / 72.0
}

pub(crate) const fn workload_color(workload: Workload) -> RGBColor {
    match workload {
        Workload::Cpu => RGBColor(0xFF, 0x6B, 0x6B),
        Workload::Io => RGBColor(0x4E, 0xCD, 0xC4),
        Workload::Mixed => RGBColor(0x45, 0xB7, 0xD1),
    }
}

/// Draws legend boxes with labels in the top right corner of `area`.
pub(crate) fn draw_figure_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entries: &[(RGBColor, String)],
) -> DrawResult<(), DB> {
    let font_size = points(10.0);
    let row_height = (font_size * 1.4).round() as i32;
    let box_size = (font_size * 0.8).round() as i32;
    let width = (font_size * 14.0).round() as i32;
    let (area_width, _) = area.dim_in_pixel();
    let left = area_width as i32 - width;
    let top = row_height / 2;

    area.draw(&Rectangle::new(
        [
            (left - box_size, top - row_height / 4),
            (area_width as i32 - box_size / 2, top + row_height * entries.len() as i32),
        ],
        BLACK.mix(0.3).stroke_width(1),
    ))?;

    for (row, (color, label)) in entries.iter().enumerate() {
        let y = top + row as i32 * row_height;
        area.draw(&Rectangle::new(
            [(left, y), (left + 2 * box_size, y + box_size)],
            color.filled(),
        ))?;
        area.draw(&Rectangle::new(
            [(left, y), (left + 2 * box_size, y + box_size)],
            BLACK.stroke_width(1),
        ))?;
        area.draw(&Text::new(
            label.as_str(),
            (left + 3 * box_size, y),
            ("sans-serif", font_size).into_font(),
        ))?;
    }

    Ok(())
}
