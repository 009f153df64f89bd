#![forbid(unsafe_code, reason = "It shoudn't be needed")]

mod args;
mod chart;
mod results;
mod statistics;
mod timeline;
mod utils;

use std::io::Write;

use args::Args;
use chart::{Chart, ComparisonChart, GanttChart, chart_file_name, display_chart, save_chart};
use clap::Parser;
use color_eyre::eyre::{Context, Result, bail, ensure};
use color_eyre::owo_colors::OwoColorize;
use results::{ResultsRun, RunTimestamp};
use statistics::WorkloadMetrics;
use timeline::Timeline;

fn print_headline(headline: &str) {
    println!("\n{:#^60}\n", headline.green());
}

fn output_chart<C: Chart>(chart: &C, args: &Args, timestamp: &RunTimestamp) -> Result<()> {
    if args.should_save() {
        let path = args
            .output_dir()
            .join(chart_file_name(chart.name(), timestamp, args.format()));
        save_chart(chart, &path, args.format())
            .wrap_err_with(|| format!("Failed to save the {} chart", chart.name()))?;
        println!("✓ Saved {} chart: {}", chart.name(), path.display());
    } else {
        let path = display_chart(chart, timestamp)
            .wrap_err_with(|| format!("Failed to display the {} chart", chart.name()))?;
        println!("✓ Rendered {} chart: {}", chart.name(), path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let results_dir = args.results_dir();
    ensure!(
        results_dir.is_dir(),
        "Results directory not found: {}",
        results_dir.display()
    );

    println!("Loading results from: {}", results_dir.display());
    let Some(run) = ResultsRun::load(results_dir, args.timestamp_selection())
        .wrap_err("Failed to load experiment results")?
    else {
        bail!(
            "No stats files matching `<phase>_<YYYYMMDD>_<HHMMSS>.txt` found in {}",
            results_dir.display()
        );
    };

    let timestamp = run.timestamp();
    match timestamp.datetime() {
        Some(datetime) => println!("✓ Results loaded (timestamp: {timestamp}, {datetime})"),
        None => println!("✓ Results loaded (timestamp: {timestamp})"),
    }

    let timeline = Timeline::extract(&run);
    println!(
        "✓ Found {} test process instances across all phases",
        timeline.total_instances()
    );

    let metrics = WorkloadMetrics::from_timeline(&timeline);
    print_headline(" Workload Summary ");
    metrics
        .write_stats(&mut std::io::stdout().lock())
        .wrap_err("Failed to print the workload summary")?;

    if let Some(path) = args.metrics_json_path() {
        let mut writer = utils::get_buf_writer_for_path(&path)?;
        metrics
            .write_json(&mut writer)
            .wrap_err_with(|| format!("Failed to write metrics to `{}`", path.display()))?;
        writer
            .flush()
            .wrap_err_with(|| format!("Failed to write metrics to `{}`", path.display()))?;
        println!("✓ Metrics written to {}", path.display());
    }

    print_headline(" Charts ");
    if args.should_save() {
        std::fs::create_dir_all(args.output_dir()).wrap_err_with(|| {
            format!(
                "Failed to create output directory: `{}`",
                args.output_dir().display()
            )
        })?;
    }

    output_chart(&GanttChart::new(&timeline), &args, timestamp)?;
    output_chart(&ComparisonChart::new(&metrics), &args, timestamp)?;

    println!("\n✓ Visualization complete!");

    Ok(())
}
