//! Terminal reports for finished runs.
//!
//! Color scheme:
//! - Accuracy is traffic-lit: green ≥ 0.8, yellow ≥ 0.5, red below
//! - Paths and secondary numbers are dimmed
//! - Badges mark cell status ([ok], [failed], [best])

use std::fmt;

use owo_colors::{OwoColorize, Style};

use crate::evaluation::{MatrixCell, RunSummary, SweepReport};

/// Status markers for table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    Ok,
    Failed,
    /// Chosen threshold in a sweep
    Best,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Ok => "ok",
            Badge::Failed => "failed",
            Badge::Best => "best",
        }
    }

    pub fn style(&self) -> Style {
        match self {
            Badge::Ok => Style::new().green(),
            Badge::Failed => Style::new().bright_red().bold(),
            Badge::Best => Style::new().bright_yellow().bold(),
        }
    }

    pub fn render(&self) -> String {
        format!("[{}]", self.label().style(self.style()))
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

pub struct Colorizer;

impl Colorizer {
    pub fn heading(s: &str) -> String {
        s.bright_blue().bold().to_string()
    }

    /// Fixed-width accuracy, colored by tier.
    pub fn accuracy(acc: f64) -> String {
        let text = format!("{:.3}", acc);
        if acc >= 0.8 {
            text.green().to_string()
        } else if acc >= 0.5 {
            text.yellow().to_string()
        } else {
            text.red().to_string()
        }
    }

    pub fn dim(s: &str) -> String {
        s.dimmed().to_string()
    }
}

fn tokens(t: Option<f64>) -> String {
    t.map(|t| format!("{:.1}", t)).unwrap_or_else(|| "-".to_string())
}

/// Horizontal rule used between report sections.
pub fn rule() -> String {
    "━".repeat(64).bright_blue().to_string()
}

/// One run's headline numbers.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut lines = vec![format!(
        "{} {} on {} ({})",
        Colorizer::heading("▸"),
        summary.mode,
        summary.dataset,
        Colorizer::dim(&summary.generator)
    )];
    lines.push(format!(
        "   dev   acc {}  tokens {}  latency {:.2}s",
        Colorizer::accuracy(summary.dev_accuracy),
        tokens(summary.dev_avg_tokens_out),
        summary.dev_avg_latency_sec
    ));
    match summary.test_accuracy {
        Some(acc) => lines.push(format!(
            "   test  acc {}  tokens {}  latency {:.2}s",
            Colorizer::accuracy(acc),
            tokens(summary.test_avg_tokens_out),
            summary.test_avg_latency_sec.unwrap_or(0.0)
        )),
        None => lines.push(format!("   test  {}", Colorizer::dim("skipped"))),
    }
    if let Some(best) = &summary.round1_best {
        lines.push(format!(
            "   best  variant {} (dev acc {}, tokens {:.1})",
            best.name,
            Colorizer::accuracy(best.accuracy),
            best.avg_tokens_out
        ));
    }
    if let Some(stats) = &summary.override_stats {
        lines.push(format!(
            "   audit overrides {}/{} (success {:.2}), rejected {}, mean conf {:.2}",
            stats.dev.overrides,
            stats.dev.total_examples,
            stats.dev.override_success_rate,
            stats.dev.auditor_rejections,
            stats.dev.mean_confidence
        ));
    }
    lines.join("\n")
}

/// Table of (dataset, mode) cells.
pub fn render_matrix(cells: &[MatrixCell]) -> String {
    let mut lines = vec![format!(
        "{:<20} {:<26} {:>8} {:>8} {:>9}",
        "dataset", "mode", "dev", "test", "tokens"
    )];
    for cell in cells {
        match &cell.outcome {
            Ok(run) => lines.push(format!(
                "{:<20} {:<26} {:>8} {:>8} {:>9} {}",
                cell.dataset,
                cell.mode.as_str(),
                format!("{:.3}", run.summary.dev_accuracy),
                run.summary
                    .test_accuracy
                    .map(|a| format!("{:.3}", a))
                    .unwrap_or_else(|| "-".to_string()),
                tokens(run.summary.test_avg_tokens_out.or(run.summary.dev_avg_tokens_out)),
                Badge::Ok
            )),
            Err(e) => lines.push(format!(
                "{:<20} {:<26} {} {}",
                cell.dataset,
                cell.mode.as_str(),
                Badge::Failed,
                Colorizer::dim(e)
            )),
        }
    }
    lines.join("\n")
}

/// Sweep points grouped by dataset, best threshold marked.
pub fn render_sweep(report: &SweepReport) -> String {
    let best = report.best_by_dataset();
    let mut lines = vec![format!(
        "{:<20} {:>9} {:>8} {:>8} {:>10}",
        "dataset", "threshold", "dev", "test", "overrides"
    )];
    for point in &report.points {
        if !point.success {
            lines.push(format!(
                "{:<20} {:>9.2} {} {}",
                point.dataset,
                point.threshold,
                Badge::Failed,
                Colorizer::dim(point.error.as_deref().unwrap_or(""))
            ));
            continue;
        }
        let is_best = best
            .get(&point.dataset)
            .is_some_and(|b| std::ptr::eq(*b, point));
        let overrides = point
            .override_stats
            .as_ref()
            .map(|s| s.dev.overrides.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "{:<20} {:>9.2} {:>8} {:>8} {:>10} {}",
            point.dataset,
            point.threshold,
            format!("{:.3}", point.dev_accuracy.unwrap_or(0.0)),
            point
                .test_accuracy
                .map(|a| format!("{:.3}", a))
                .unwrap_or_else(|| "-".to_string()),
            overrides,
            if is_best { Badge::Best.render() } else { String::new() }
        ));
    }
    lines.push(Colorizer::dim(&format!("written to {}", report.dir.display())));
    lines.join("\n")
}
