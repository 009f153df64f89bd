use std::iter;

use plotters::coord::Shift;
use plotters::coord::ranged1d::SegmentedCoord;
use plotters::coord::types::{RangedCoordf64, RangedCoordu32};
use plotters::prelude::*;
use plotters::style::FontStyle;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use strum::EnumCount;

use super::{Chart, DrawResult, points, workload_color};
use crate::statistics::{WorkloadMetrics, WorkloadSummary};
use crate::timeline::Workload;

const TITLE: &str = "Kernel Scheduler Experiment - Workload Comparison";

const TOTAL_CAPTION: &str = "Total Context Switches";
const SPLIT_CAPTION: &str = "Involuntary vs Voluntary CS";
const RUNTIME_CAPTION: &str = "Average CPU Runtime";
const RATIO_CAPTION: &str = "Involuntary CS Ratio (% of Total)";

const INVOLUNTARY_COLOR: RGBColor = RGBColor(0xE7, 0x4C, 0x3C);
const VOLUNTARY_COLOR: RGBColor = RGBColor(0x2E, 0xCC, 0x71);

/// Headroom above the highest bar for its value label.
const HEADROOM: f64 = 1.15;

type PanelCoord = Cartesian2d<SegmentedCoord<RangedCoordu32>, RangedCoordf64>;

/// Upper bound of a value axis showing `values`.
pub fn value_axis_max(values: impl IntoIterator<Item = f64>) -> f64 {
    let max = values.into_iter().fold(0.0, f64::max);
    if max > 0.0 { max * HEADROOM } else { 1.0 }
}

/// Bar charts comparing the mean scheduling metrics of the workloads.
#[derive(Debug, Clone)]
pub struct ComparisonChart {
    summaries: [WorkloadSummary; Workload::COUNT],
}

impl ComparisonChart {
    pub fn new(metrics: &WorkloadMetrics) -> Self {
        Self {
            summaries: [Workload::Cpu, Workload::Io, Workload::Mixed]
                .map(|workload| metrics.summary(workload)),
        }
    }

    fn values(&self, metric: impl Fn(&WorkloadSummary) -> f64) -> [f64; Workload::COUNT] {
        self.summaries.each_ref().map(metric)
    }
}

fn segment(index: usize) -> (SegmentValue<u32>, SegmentValue<u32>) {
    let index = index as u32;
    (SegmentValue::Exact(index), SegmentValue::Exact(index + 1))
}

fn workload_label(value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(index) => Workload::all()
            .nth(*index as usize)
            .map(|workload| workload.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn value_label_style() -> TextStyle<'static> {
    ("sans-serif", points(9.0))
        .into_font()
        .style(FontStyle::Bold)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom))
}

fn build_panel<'a, DB: DrawingBackend>(
    area: &'a DrawingArea<DB, Shift>,
    caption: &str,
    y_desc: &str,
    y_max: f64,
) -> DrawResult<ChartContext<'a, DB, PanelCoord>, DB> {
    let mut chart = ChartBuilder::on(area)
        .caption(
            caption,
            ("sans-serif", points(12.0)).into_font().style(FontStyle::Bold),
        )
        .margin(points(8.0) as u32)
        .x_label_area_size(points(20.0) as u32)
        .y_label_area_size(points(40.0) as u32)
        .build_cartesian_2d((0u32..Workload::COUNT as u32).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&workload_label)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", points(10.0)).into_font())
        .label_style(("sans-serif", points(9.0)).into_font())
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(TRANSPARENT)
        .draw()?;

    Ok(chart)
}

/// Pixel width of one workload segment.
fn segment_width<DB: DrawingBackend>(chart: &ChartContext<'_, DB, PanelCoord>) -> u32 {
    chart.plotting_area().dim_in_pixel().0 / Workload::COUNT as u32
}

/// Draws one bar per workload in its workload color with the value printed above.
fn draw_single_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    y_desc: &str,
    values: [f64; Workload::COUNT],
    y_max: f64,
    format_value: impl Fn(f64) -> String,
) -> DrawResult<(), DB> {
    let mut chart = build_panel(area, caption, y_desc, y_max)?;
    let side_margin = segment_width(&chart) / 5;

    chart.draw_series(Workload::all().zip(values).map(|(workload, value)| {
        let (left, right) = segment(workload.index());
        let mut bar = Rectangle::new(
            [(left, 0.0), (right, value)],
            workload_color(workload).mix(0.8).filled(),
        );
        bar.set_margin(0, 0, side_margin, side_margin);
        bar
    }))?;

    for (index, value) in values.into_iter().enumerate() {
        chart.draw_series(iter::once(Text::new(
            format_value(value),
            (SegmentValue::CenterOf(index as u32), value),
            value_label_style(),
        )))?;
    }

    Ok(())
}

fn draw_context_switch_split<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    involuntary: [f64; Workload::COUNT],
    voluntary: [f64; Workload::COUNT],
) -> DrawResult<(), DB> {
    let y_max = value_axis_max(involuntary.into_iter().chain(voluntary));
    let mut chart = build_panel(area, SPLIT_CAPTION, "Context Switches", y_max)?;
    let width = segment_width(&chart);
    let outer = width / 8;
    let half = width / 2;

    for (name, color, values, (left_margin, right_margin)) in [
        ("Involuntary", INVOLUNTARY_COLOR, involuntary, (outer, half)),
        ("Voluntary", VOLUNTARY_COLOR, voluntary, (half, outer)),
    ] {
        chart
            .draw_series(values.into_iter().enumerate().map(|(index, value)| {
                let (left, right) = segment(index);
                let mut bar =
                    Rectangle::new([(left, 0.0), (right, value)], color.mix(0.8).filled());
                bar.set_margin(0, 0, left_margin, right_margin);
                bar
            }))?
            .label(name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], color.filled()));

        let shift = (left_margin as i32 - right_margin as i32) / 2;
        for (index, value) in values.into_iter().enumerate() {
            chart.draw_series(iter::once(
                EmptyElement::at((SegmentValue::CenterOf(index as u32), value))
                    + Text::new(format!("{value:.0}"), (shift, 0), value_label_style()),
            ))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font(("sans-serif", points(9.0)).into_font())
        .border_style(BLACK.mix(0.8))
        .background_style(WHITE.mix(0.8))
        .draw()?;

    Ok(())
}

impl Chart for ComparisonChart {
    fn name(&self) -> &'static str {
        "comparison"
    }

    fn figure_size(&self) -> (f64, f64) {
        (14.0, 10.0)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult<(), DB> {
        root.fill(&WHITE)?;
        let body = root.titled(
            TITLE,
            ("sans-serif", points(16.0)).into_font().style(FontStyle::Bold),
        )?;
        let panels = body.split_evenly((2, 2));

        let total = self.values(|summary| summary.mean_total_cs);
        draw_single_panel(
            &panels[0],
            TOTAL_CAPTION,
            "Context Switches",
            total,
            value_axis_max(total),
            |value| format!("{value:.0}"),
        )?;

        draw_context_switch_split(
            &panels[1],
            self.values(|summary| summary.mean_involuntary_cs),
            self.values(|summary| summary.mean_voluntary_cs),
        )?;

        let runtime = self.values(|summary| summary.mean_runtime_s);
        draw_single_panel(
            &panels[2],
            RUNTIME_CAPTION,
            "Runtime (seconds)",
            runtime,
            value_axis_max(runtime),
            |value| format!("{value:.2}s"),
        )?;

        draw_single_panel(
            &panels[3],
            RATIO_CAPTION,
            "Percentage (%)",
            self.values(|summary| summary.involuntary_ratio_pct),
            100.0,
            |value| format!("{value:.1}%"),
        )
    }
}
