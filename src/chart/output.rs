use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use plotters::prelude::*;
use plotters_svg::SVGBackend;

use super::pdf::{encode_png, png_to_pdf};
use super::{Chart, ChartError};
use crate::args::ChartOutputFormat;
use crate::results::RunTimestamp;

/// Name of the file a chart of run `timestamp` is saved to, e.g. `gantt_chart_20240101_120000.png`.
pub fn chart_file_name(
    chart_name: &str,
    timestamp: &RunTimestamp,
    format: ChartOutputFormat,
) -> String {
    format!("{chart_name}_chart_{timestamp}.{}", format.extension())
}

fn drawing_error<E: std::error::Error + Send + Sync>(
    chart: &'static str,
) -> impl FnOnce(DrawingAreaErrorKind<E>) -> ChartError {
    move |error| ChartError::Drawing {
        chart,
        message: error.to_string(),
    }
}

fn draw_on<C: Chart, DB: DrawingBackend>(
    chart: &C,
    root: DrawingArea<DB, plotters::coord::Shift>,
) -> Result<(), ChartError> {
    chart.draw(&root).map_err(drawing_error(chart.name()))?;
    root.present().map_err(drawing_error(chart.name()))
}

/// Rasterizes the chart into a packed RGB buffer.
fn render_rgb<C: Chart>(chart: &C) -> Result<Vec<u8>, ChartError> {
    let (width, height) = chart.pixel_size();
    let mut buffer = vec![0; width as usize * height as usize * 3];
    draw_on(
        chart,
        BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area(),
    )?;
    Ok(buffer)
}

/// Renders the chart into an SVG document held in memory.
pub(crate) fn render_svg<C: Chart>(chart: &C) -> Result<String, ChartError> {
    let mut svg = String::new();
    draw_on(
        chart,
        SVGBackend::with_string(&mut svg, chart.pixel_size()).into_drawing_area(),
    )?;
    Ok(svg)
}

fn render_pdf<C: Chart>(chart: &C) -> Result<Vec<u8>, ChartError> {
    let (width, height) = chart.pixel_size();
    let png =
        encode_png(render_rgb(chart)?, width, height).map_err(|source| ChartError::Encode {
            chart: chart.name(),
            source,
        })?;
    Ok(png_to_pdf(&png)?)
}

/// Renders the chart into `path` in the given format.
pub fn save_chart<C: Chart>(
    chart: &C,
    path: &Path,
    format: ChartOutputFormat,
) -> Result<(), ChartError> {
    let size = chart.pixel_size();
    log::debug!(
        target: "chart_output",
        "Rendering {} chart ({}x{} px) to {}",
        chart.name(),
        size.0,
        size.1,
        path.display()
    );

    match format {
        ChartOutputFormat::Png => {
            draw_on(chart, BitMapBackend::new(path, size).into_drawing_area())
        }
        ChartOutputFormat::Svg => draw_on(chart, SVGBackend::new(path, size).into_drawing_area()),
        ChartOutputFormat::Pdf => {
            let pdf = render_pdf(chart)?;
            fs::write(path, pdf).map_err(|source| ChartError::Write {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Writes the chart as SVG to a new uniquely named file in the temp directory.
///
/// The file is created exclusively and kept after the process exits.
fn write_preview<C: Chart>(chart: &C, timestamp: &RunTimestamp) -> Result<PathBuf, ChartError> {
    let svg = render_svg(chart)?;
    let (mut file, path) = tempfile::Builder::new()
        .prefix(&format!("{}_chart_{timestamp}_", chart.name()))
        .suffix(".svg")
        .tempfile()
        .and_then(|file| file.keep().map_err(|error| error.error))
        .map_err(|source| ChartError::Write {
            path: std::env::temp_dir(),
            source,
        })?;

    file.write_all(svg.as_bytes()).map_err(|source| ChartError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn viewer_command(path: &Path) -> Command {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };
    command.arg(path);
    command
}

/// Renders the chart to a temporary SVG file and opens it in the default viewer.
///
/// Returns the path of the rendered file. Failing to start the viewer is not an error.
pub fn display_chart<C: Chart>(
    chart: &C,
    timestamp: &RunTimestamp,
) -> Result<PathBuf, ChartError> {
    let path = write_preview(chart, timestamp)?;
    log::debug!(target: "chart_output", "Rendered {} chart to {}", chart.name(), path.display());

    match viewer_command(&path).spawn() {
        Ok(_) => log::info!(
            target: "chart_output",
            "Opened {} in the default viewer",
            path.display()
        ),
        Err(error) => log::warn!(
            target: "chart_output",
            "Could not open a viewer for {}: {error}. Open the file manually.",
            path.display()
        ),
    }

    Ok(path)
}
