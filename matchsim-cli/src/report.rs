//! Run reporting - rating history, wait latency and final standings
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: HistoryRecorder (observer collecting data during the run)
//! - Level 2: finish() - assemble the RunReport
//! - Level 3: standings(), summarize_latency()
//! - Level 4: moving_average(), histogram(), percentile(), output helpers

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use matchsim_core::{
    GameSession, PlayerRegistry, PlayerWait, RunSummary, SimConfig, SimulationObserver,
};

/// Final state of one player
#[derive(Clone, Debug, Serialize)]
pub struct Standing {
    pub id: u32,
    pub elo: f64,
    pub true_rating: u32,
    pub wins: u32,
    pub losses: u32,
    pub ratio: f64,
    pub god: bool,
}

/// Bars in the wait histogram
const LATENCY_BINS: usize = 20;

/// One bar of the wait histogram, `[lower_ms, upper_ms)`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower_ms: f64,
    pub upper_ms: f64,
    pub count: usize,
}

/// Queue wait statistics in milliseconds
#[derive(Clone, Debug, Default, Serialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_ms: f64,
    pub p90_ms: f64,
    pub max_ms: f64,
    /// Mean wait per rated batch
    pub avg_series: Vec<f64>,
    /// Longest wait per rated batch
    pub max_series: Vec<f64>,
    /// Distribution of every sampled wait
    pub histogram: Vec<HistogramBin>,
}

/// Everything a run produced, ready to print or save
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Local>,
    pub config: SimConfig,
    pub games_completed: u64,
    pub ticks: u64,
    pub peak_active: usize,
    /// Sorted by ELO, highest first
    pub standings: Vec<Standing>,
    pub god_mean_elo: Option<f64>,
    pub field_mean_elo: Option<f64>,
    pub latency: LatencySummary,
    /// Moving average of each player's ELO history
    pub smoothed_elo: BTreeMap<u32, Vec<f64>>,
}

// ============================================================================
// LEVEL 1 - DATA COLLECTION
// ============================================================================

/// Observer that samples ratings and queue waits as the run progresses
#[derive(Default)]
pub struct HistoryRecorder {
    elo_history: BTreeMap<u32, Vec<f64>>,
    latency_buffer: Vec<f64>,
    latency_avg: Vec<f64>,
    latency_max: Vec<f64>,
    latency_raw: Vec<f64>,
    progress: Option<ProgressBar>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a progress bar over `total` games
    pub fn with_progress(mut self, total: u64) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} games ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        self.progress = Some(ProgressBar::new(total).with_style(style));
        self
    }

    /// Number of rating snapshots taken so far
    pub fn snapshots(&self) -> usize {
        self.elo_history.values().map(Vec::len).max().unwrap_or(0)
    }

    // ========================================================================
    // LEVEL 2 - REPORT ASSEMBLY
    // ========================================================================

    /// Close the progress bar and build the report
    pub fn finish(
        self,
        config: &SimConfig,
        summary: &RunSummary,
        standings: Vec<Standing>,
    ) -> RunReport {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        let (god_mean_elo, field_mean_elo) = group_means(&standings);
        let smoothed_elo = self
            .elo_history
            .iter()
            .map(|(&id, series)| (id, moving_average(series, config.smoothing)))
            .collect();

        RunReport {
            generated_at: Local::now(),
            config: config.clone(),
            games_completed: summary.games_completed,
            ticks: summary.ticks,
            peak_active: summary.peak_active,
            standings,
            god_mean_elo,
            field_mean_elo,
            latency: summarize_latency(self.latency_raw, self.latency_avg, self.latency_max),
            smoothed_elo,
        }
    }
}

impl SimulationObserver for HistoryRecorder {
    fn on_players_matched(&mut self, waits: &[PlayerWait]) {
        self.latency_buffer
            .extend(waits.iter().map(|w| w.waited.as_secs_f64() * 1000.0));
    }

    fn on_game_finished(&mut self, _session: &GameSession) {
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    fn on_batch_rated(&mut self, registry: &PlayerRegistry, _finished: usize) {
        for player in registry.get_all() {
            self.elo_history
                .entry(player.id().0)
                .or_default()
                .push(player.elo());
        }

        // No game formed since the last batch: nothing to average
        if self.latency_buffer.is_empty() {
            return;
        }
        let buffer = std::mem::take(&mut self.latency_buffer);
        self.latency_avg.push(mean(&buffer));
        self.latency_max.push(buffer.iter().copied().fold(0.0, f64::max));
        self.latency_raw.extend(buffer);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Snapshot every player, highest ELO first
pub fn standings(registry: &PlayerRegistry) -> Vec<Standing> {
    let mut standings: Vec<Standing> = registry
        .get_all()
        .iter()
        .map(|p| Standing {
            id: p.id().0,
            elo: p.elo(),
            true_rating: p.true_rating(),
            wins: p.wins(),
            losses: p.losses(),
            ratio: p.ratio(),
            god: p.is_god(),
        })
        .collect();
    standings.sort_by(|a, b| b.elo.total_cmp(&a.elo));
    standings
}

fn group_means(standings: &[Standing]) -> (Option<f64>, Option<f64>) {
    let gods: Vec<f64> = standings.iter().filter(|s| s.god).map(|s| s.elo).collect();
    let field: Vec<f64> = standings.iter().filter(|s| !s.god).map(|s| s.elo).collect();
    let opt_mean = |v: &[f64]| if v.is_empty() { None } else { Some(mean(v)) };
    (opt_mean(&gods[..]), opt_mean(&field[..]))
}

fn summarize_latency(raw: Vec<f64>, avg_series: Vec<f64>, max_series: Vec<f64>) -> LatencySummary {
    if raw.is_empty() {
        return LatencySummary::default();
    }
    let mut sorted = raw;
    sorted.sort_by(f64::total_cmp);

    LatencySummary {
        samples: sorted.len(),
        mean_ms: mean(&sorted),
        p90_ms: percentile(&sorted, 0.9),
        max_ms: sorted[sorted.len() - 1],
        avg_series,
        max_series,
        histogram: histogram(&sorted, LATENCY_BINS),
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Mean of each full window; empty when the series is shorter than `window`
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return data.to_vec();
    }
    data.windows(window).map(mean).collect()
}

/// Equal-width bins spanning `[0, max]` of an ascending slice
///
/// The maximum lands in the last bin. If every value is zero a single
/// empty-width bin holds them all.
pub fn histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    let max = match sorted.last() {
        Some(&max) if bins > 0 => max,
        _ => return Vec::new(),
    };
    if max <= 0.0 {
        return vec![HistogramBin {
            lower_ms: 0.0,
            upper_ms: 0.0,
            count: sorted.len(),
        }];
    }

    let width = max / bins as f64;
    let mut counts = vec![0; bins];
    for &value in sorted {
        let bin = ((value / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower_ms: i as f64 * width,
            upper_ms: (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Nearest-rank percentile of an ascending slice
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Write the report as JSON into `dir`, named after its timestamp
pub fn save_report(report: &RunReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let name = format!("{}.json", report.generated_at.format("%m-%d-%Y %H-%M-%S"));
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}

/// Print report as JSON (smoothed series included)
pub fn print_json_report(report: &RunReport) {
    if let Ok(json) = serde_json::to_string_pretty(report) {
        println!("{}", json);
    }
}

/// Print report as text
pub fn print_text_report(report: &RunReport, top: usize) {
    println!("\n=== Matchmaking Results ===");
    println!("Games completed: {}", report.games_completed);
    println!("Ticks:           {}", report.ticks);
    println!("Peak concurrent: {}", report.peak_active);

    if let Some(god) = report.god_mean_elo {
        println!("God mean ELO:    {:.1}", god);
    }
    if let Some(field) = report.field_mean_elo {
        println!("Field mean ELO:  {:.1}", field);
    }

    let latency = &report.latency;
    println!(
        "Wait latency:    mean {:.2} ms, p90 {:.2} ms, max {:.2} ms ({} samples)",
        latency.mean_ms, latency.p90_ms, latency.max_ms, latency.samples
    );

    let peak = latency.histogram.iter().map(|b| b.count).max().unwrap_or(0);
    if peak > 0 {
        println!("\nWait histogram:");
        for bin in &latency.histogram {
            let bar = "#".repeat(bin.count * 40 / peak);
            println!(
                "  {:>8.2}-{:<8.2} ms {:>6} {}",
                bin.lower_ms, bin.upper_ms, bin.count, bar
            );
        }
    }

    println!("\nTop {} players:", top.min(report.standings.len()));
    for s in report.standings.iter().take(top) {
        println!(
            "  #{:<4} elo {:>8.1}  true {:>5}  W/L {:>4}/{:<4} ratio {:.2}{}",
            s.id,
            s.elo,
            s.true_rating,
            s.wins,
            s.losses,
            s.ratio,
            if s.god { "  god" } else { "" }
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
