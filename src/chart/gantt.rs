use std::iter;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, FontTransform};
use strum::EnumCount;

use super::{Chart, DrawResult, draw_figure_legend, points, workload_color};
use crate::results::Phase;
use crate::timeline::{Timeline, Workload};

const TITLE: &str = "Kernel Scheduler Experiment - Process Timeline Gantt Chart";

/// End of the time axis in seconds.
pub const TIME_AXIS_END: f64 = 55.0;
const MAX_BAR_WIDTH: f64 = 10.0;
const BAR_BOTTOM: f64 = 0.3;
const BAR_TOP: f64 = 0.7;

const PHASE_MARKERS: [(f64, &str); 5] = [
    (5.0, "CPU Test"),
    (15.0, "I/O Test"),
    (25.0, "Mixed Test"),
    (35.0, "Concurrent"),
    (45.0, "Complete"),
];

const MARKER_COLOR: RGBColor = RGBColor(0x80, 0x80, 0x80);

/// Nominal time window of `phase` in seconds since the start of the experiment.
pub const fn phase_window(phase: Phase) -> (f64, f64) {
    match phase {
        Phase::Baseline => (0.0, 5.0),
        Phase::DuringCpu => (5.0, 15.0),
        Phase::DuringIo => (15.0, 25.0),
        Phase::DuringMixed => (25.0, 35.0),
        Phase::DuringConcurrent => (35.0, 45.0),
        Phase::Final => (45.0, 55.0),
    }
}

const fn legend_label(workload: Workload) -> &'static str {
    match workload {
        Workload::Cpu => "CPU-Bound Process",
        Workload::Io => "I/O-Bound Process",
        Workload::Mixed => "Mixed Workload Process",
    }
}

/// One sampled process instance placed on the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GanttBar {
    pub phase: Phase,
    pub pid: i64,
    pub start: f64,
    pub width: f64,
    pub total_cs: i64,
    pub involuntary_cs: i64,
    pub runtime_ms: i64,
}

impl GanttBar {
    pub fn end(&self) -> f64 {
        self.start + self.width
    }

    pub fn center(&self) -> f64 {
        self.start + self.width / 2.0
    }

    /// Annotation printed inside the bar, one entry per line.
    pub fn label_lines(&self) -> [String; 4] {
        [
            format!("PID {}", self.pid),
            format!("CS: {}", self.total_cs),
            format!("Invol: {}", self.involuntary_cs),
            format!("Runtime: {}ms", self.runtime_ms),
        ]
    }
}

/// Timeline of the test processes with one row per workload.
#[derive(Debug, Clone)]
pub struct GanttChart {
    bars: [Vec<GanttBar>; Workload::COUNT],
}

impl GanttChart {
    /// Places every workload instance of the test phases into its phase window.
    ///
    /// The baseline phase and processes of unknown workloads are left out.
    pub fn new(timeline: &Timeline<'_>) -> Self {
        let mut bars: [Vec<GanttBar>; Workload::COUNT] = Default::default();

        for (phase, entry) in timeline.test_phase_entries() {
            let Some(workload) = entry.workload() else {
                continue;
            };
            let (start, end) = phase_window(phase);
            let record = entry.record;

            bars[workload.index()].push(GanttBar {
                phase,
                pid: record.pid(),
                start,
                width: MAX_BAR_WIDTH.min(end - start),
                total_cs: record.total_cs(),
                involuntary_cs: record.involuntary_cs(),
                runtime_ms: record.runtime_ms(),
            });
        }

        Self { bars }
    }

    pub fn bars(&self, workload: Workload) -> &[GanttBar] {
        &self.bars[workload.index()]
    }

    fn draw_row<DB: DrawingBackend>(
        &self,
        workload: Workload,
        area: &DrawingArea<DB, Shift>,
    ) -> DrawResult<(), DB> {
        let bars = self.bars(workload);
        let centered = Pos::new(HPos::Center, VPos::Center);

        let mut chart = ChartBuilder::on(area)
            .margin(points(6.0) as u32)
            .x_label_area_size(points(28.0) as u32)
            .y_label_area_size(points(28.0) as u32)
            .build_cartesian_2d(0f64..TIME_AXIS_END, 0f64..1f64)?;

        if bars.is_empty() {
            chart.draw_series(iter::once(Text::new(
                format!("No {} processes found", workload.long_name()),
                (TIME_AXIS_END / 2.0, 0.5),
                ("sans-serif", points(12.0))
                    .into_font()
                    .color(&BLACK)
                    .pos(centered),
            )))?;
            return Ok(());
        }

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(0)
            .x_labels(12)
            .x_desc("Time (seconds)")
            .y_desc(workload.long_name())
            .axis_desc_style(("sans-serif", points(11.0)).into_font().style(FontStyle::Bold))
            .label_style(("sans-serif", points(9.0)).into_font())
            .bold_line_style(BLACK.mix(0.15))
            .light_line_style(TRANSPARENT)
            .draw()?;

        for (boundary, label) in PHASE_MARKERS {
            chart.draw_series(iter::once(PathElement::new(
                vec![(boundary, 0.0), (boundary, 1.0)],
                MARKER_COLOR.mix(0.5).stroke_width(2),
            )))?;
            chart.draw_series(iter::once(Text::new(
                label,
                (boundary, 0.95),
                ("sans-serif", points(8.0))
                    .into_font()
                    .transform(FontTransform::Rotate270)
                    .color(&MARKER_COLOR)
                    .pos(Pos::new(HPos::Left, VPos::Bottom)),
            )))?;
        }

        let color = workload_color(workload);
        chart.draw_series(bars.iter().map(|bar| {
            Rectangle::new(
                [(bar.start, BAR_BOTTOM), (bar.end(), BAR_TOP)],
                color.mix(0.7).filled(),
            )
        }))?;
        chart.draw_series(bars.iter().map(|bar| {
            Rectangle::new(
                [(bar.start, BAR_BOTTOM), (bar.end(), BAR_TOP)],
                BLACK.stroke_width(2),
            )
        }))?;

        let label_font = ("sans-serif", points(7.0))
            .into_font()
            .style(FontStyle::Bold)
            .color(&BLACK)
            .pos(centered);
        let line_height = (BAR_TOP - BAR_BOTTOM) / 5.0;
        for bar in bars {
            for (line, text) in bar.label_lines().into_iter().enumerate() {
                let y = BAR_TOP - line_height * (line as f64 + 1.0);
                chart.draw_series(iter::once(Text::new(
                    text,
                    (bar.center(), y),
                    label_font.clone(),
                )))?;
            }
        }

        Ok(())
    }
}

impl Chart for GanttChart {
    fn name(&self) -> &'static str {
        "gantt"
    }

    fn figure_size(&self) -> (f64, f64) {
        (16.0, 10.0)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult<(), DB> {
        root.fill(&WHITE)?;
        let body = root.titled(
            TITLE,
            ("sans-serif", points(16.0)).into_font().style(FontStyle::Bold),
        )?;

        let rows = body.split_evenly((Workload::COUNT, 1));
        for (workload, row) in Workload::all().zip(rows.iter()) {
            self.draw_row(workload, row)?;
        }

        let legend: Vec<_> = Workload::all()
            .map(|workload| (workload_color(workload), legend_label(workload).to_owned()))
            .collect();
        draw_figure_legend(root, &legend)
    }
}

#[cfg(test)]
mod test {
    use crate::chart::output::render_svg;
    use crate::results::load_test_run;

    use super::*;

    #[test]
    fn test_phase_windows_are_contiguous() {
        let windows: Vec<_> = Phase::all().map(phase_window).collect();
        assert_eq!(windows.first().map(|w| w.0), Some(0.0));
        assert_eq!(windows.last().map(|w| w.1), Some(TIME_AXIS_END));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        for (boundary, _) in PHASE_MARKERS {
            assert!(windows.iter().any(|(start, _)| *start == boundary));
        }
    }

    #[test]
    fn test_bars_from_timeline() {
        let (_dir, run) = load_test_run(&[
            (
                "baseline_20240101_120000.txt",
                "---\n1 test_cpu 1 1 0 10 120 0\n",
            ),
            (
                "during_cpu_20240101_120000.txt",
                "---\n1234 test_cpu 50 30 20 9500 120 0\n1300 test_helper 1 1 0 1 120 0\n",
            ),
            (
                "during_concurrent_20240101_120000.txt",
                "---\n1235 test_cpu 80 40 40 9800 120 0\n1236 test_io 300 290 10 120 120 0\n",
            ),
        ]);
        let chart = GanttChart::new(&Timeline::extract(&run));

        let cpu = chart.bars(Workload::Cpu);
        assert_eq!(cpu.len(), 2);
        assert_eq!(
            cpu[0],
            GanttBar {
                phase: Phase::DuringCpu,
                pid: 1234,
                start: 5.0,
                width: 10.0,
                total_cs: 50,
                involuntary_cs: 20,
                runtime_ms: 9500,
            }
        );
        assert_eq!(cpu[1].phase, Phase::DuringConcurrent);
        assert_eq!(cpu[1].start, 35.0);
        assert_eq!(cpu[1].end(), 45.0);

        let io = chart.bars(Workload::Io);
        assert_eq!(io.len(), 1);
        assert_eq!(io[0].pid, 1236);
        assert!(chart.bars(Workload::Mixed).is_empty());

        for workload in Workload::all() {
            for bar in chart.bars(workload) {
                assert!(bar.width <= MAX_BAR_WIDTH);
                assert!(bar.end() <= TIME_AXIS_END);
            }
        }
    }

    #[test]
    fn test_bar_labels() {
        let bar = GanttBar {
            phase: Phase::DuringCpu,
            pid: 1234,
            start: 5.0,
            width: 10.0,
            total_cs: 50,
            involuntary_cs: 20,
            runtime_ms: 9500,
        };
        assert_eq!(bar.center(), 10.0);
        assert_eq!(bar.label_lines(), ["PID 1234", "CS: 50", "Invol: 20", "Runtime: 9500ms"]);
    }

    #[test]
    fn test_figure_size() {
        let (_dir, run) = load_test_run(&[("during_io_20240101_120000.txt", "---\n")]);
        let chart = GanttChart::new(&Timeline::extract(&run));
        assert_eq!(chart.name(), "gantt");
        assert_eq!(chart.pixel_size(), (2400, 1500));
    }

    #[test]
    fn test_legend_labels() {
        let labels: Vec<_> = Workload::all().map(legend_label).collect();
        assert_eq!(
            labels,
            ["CPU-Bound Process", "I/O-Bound Process", "Mixed Workload Process"]
        );
    }

    #[test]
    fn test_draw_with_missing_workloads() {
        let (_dir, run) = load_test_run(&[(
            "during_cpu_20240101_120000.txt",
            "---\n1234 test_cpu 50 30 20 9500 120 0\n",
        )]);
        let svg = render_svg(&GanttChart::new(&Timeline::extract(&run))).unwrap();

        assert!(svg.contains(TITLE));
        assert!(svg.contains("PID 1234"));
        assert!(svg.contains("CPU-Bound Process"));
        assert!(svg.contains("No I/O-Bound (test_io) processes found"));
        assert!(svg.contains("No Mixed (test_mixed) processes found"));
        assert!(!svg.contains("No CPU-Bound (test_cpu) processes found"));
    }

    #[test]
    fn test_draw_empty_timeline() {
        let (_dir, run) = load_test_run(&[(
            "baseline_20240101_120000.txt",
            "---\n1 bash 10 8 2 100 120 0\n",
        )]);
        let timeline = Timeline::extract(&run);
        assert_eq!(timeline.total_instances(), 0);

        let svg = render_svg(&GanttChart::new(&timeline)).unwrap();
        assert!(svg.contains(TITLE));
        for workload in Workload::all() {
            let placeholder = format!("No {} processes found", workload.long_name());
            assert!(svg.contains(&placeholder), "{placeholder}");
        }
    }
}
