//! Run header and end-of-run summary display.

use std::process::ExitStatus;

use super::banner::{print_banner, print_footer, BannerColor};
use super::colors::*;
use crate::config::MonitorConfig;
use crate::process::{Capabilities, ProcessInfo};
use crate::report::{Snapshot, Summary};
use crate::threshold::Thresholds;

/// Print the resolved target and the limits in effect.
pub fn print_target(process: &ProcessInfo, config: &MonitorConfig, capabilities: Capabilities) {
    print_banner("MONITORING", BannerColor::Cyan);
    println!(
        "{BOLD}Process:{RESET}   {} {GRAY}(pid {}){RESET}",
        process.name, process.pid
    );
    if !process.cmdline.is_empty() {
        println!("{BOLD}Command:{RESET}   {GRAY}{}{RESET}", process.cmdline);
    }
    let duration = match config.duration_seconds {
        0 => "until interrupted".to_string(),
        secs => format!("{}s", secs),
    };
    println!(
        "{BOLD}Sampling:{RESET}  every {}s, {}",
        config.interval_seconds, duration
    );
    println!("{BOLD}Limits:{RESET}    {}", describe_thresholds(&config.thresholds));
    if !capabilities.handle_count {
        println!("{GRAY}Handle counts are not available on this platform.{RESET}");
    }
    println!();
}

fn describe_thresholds(thresholds: &Thresholds) -> String {
    if thresholds.is_empty() {
        return "none".to_string();
    }
    thresholds
        .configured()
        .map(|(metric, limit)| format!("{} > {}", metric.label(), metric.format_value(limit)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the rows of the summary table: label, average, peak, violations.
fn summary_rows(summary: &Summary, snapshot: &Snapshot) -> Vec<[String; 4]> {
    summary
        .metrics
        .iter()
        .filter(|m| snapshot.metrics.contains_key(&m.metric))
        .map(|m| {
            let violations = summary
                .violations
                .get(&m.metric)
                .map(|count| count.to_string())
                .unwrap_or_else(|| "-".to_string());
            [
                m.metric.label().to_string(),
                m.metric.format_value(m.average),
                m.metric.format_value(m.peak),
                violations,
            ]
        })
        .collect()
}

/// Print the end-of-run summary.
///
/// `summary` is `None` when no sample was recorded.
pub fn print_summary(summary: Option<&Summary>, snapshot: &Snapshot) {
    println!();
    let total_violations: usize = snapshot.violations.values().sum();
    let color = if total_violations > 0 {
        BannerColor::Yellow
    } else {
        BannerColor::Green
    };
    print_banner("SUMMARY", color);

    if let Some(reason) = snapshot.stop_reason {
        println!("{BOLD}Stopped:{RESET}   {}", reason.describe());
    }
    let elapsed = snapshot
        .finished_at
        .map(|end| (end - snapshot.started_at).num_seconds().max(0))
        .unwrap_or(0);
    println!(
        "{BOLD}Samples:{RESET}   {} over {}s{}",
        snapshot.sample_count,
        elapsed,
        if snapshot.skipped_ticks > 0 {
            format!(" {GRAY}({} skipped){RESET}", snapshot.skipped_ticks)
        } else {
            String::new()
        }
    );

    match summary {
        None => println!("{GRAY}No samples were recorded.{RESET}"),
        Some(summary) => {
            println!();
            println!(
                "  {BOLD}{:<8} {:>12} {:>12} {:>10}{RESET}",
                "Metric", "Average", "Peak", "Over limit"
            );
            for [label, average, peak, violations] in summary_rows(summary, snapshot) {
                let highlight = if violations != "-" && violations != "0" {
                    YELLOW
                } else {
                    ""
                };
                println!(
                    "  {:<8} {:>12} {:>12} {}{:>10}{RESET}",
                    label, average, peak, highlight, violations
                );
            }
        }
    }
    print_footer(color);
}

/// Print how a child started by `procwatch exec` ended.
pub fn print_child_exit(command: &str, status: ExitStatus) {
    match status.code() {
        Some(0) => println!("{GREEN}{}{RESET} exited successfully", command),
        Some(code) => println!("{YELLOW}{}{RESET} exited with status {}", command, code),
        None => println!("{YELLOW}{}{RESET} was terminated by a signal", command),
    }
}
