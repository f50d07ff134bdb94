//! Byte accounting, throughput and ETA estimation for a running wipe.
//!
//! [`ProgressState`] is purely observational: it never fails and never
//! touches the device. The engine feeds it every accepted write through
//! [`ProgressState::update`], which hands back a [`DisplayFrame`] at most once
//! per elapsed second so front-ends are not flooded with redraws.
use crate::format::{format_bytes, format_time};
use chrono::{DateTime, Local};
use std::fmt;
use std::time::Instant;

/// Number of cells in the textual progress bar.
pub const BAR_WIDTH: usize = 40;

const MIB: f64 = 1024.0 * 1024.0;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Running progress of one wipe session.
#[derive(Debug, Clone)]
pub struct ProgressState {
    total_size: u64,
    written: u64,
    start: Instant,
    started_at: DateTime<Local>,
    /// Whole seconds since `start` at the last speed sample.
    last_sample_secs: u64,
    /// Bytes per second, averaged over the whole session so far.
    speed: f64,
}

impl ProgressState {
    pub fn init(total_size: u64) -> Self {
        Self {
            total_size,
            written: 0,
            start: Instant::now(),
            started_at: Local::now(),
            last_sample_secs: 0,
            speed: 0.0,
        }
    }

    /// Accounts for `bytes_delta` newly accepted bytes.
    ///
    /// Returns a fresh frame only when a new whole second has elapsed since
    /// the previous sample; otherwise the bytes are counted silently.
    pub fn update(&mut self, bytes_delta: u64) -> Option<DisplayFrame> {
        self.update_at(bytes_delta, Instant::now())
    }

    /// Same as [`update`](Self::update), sampled at an explicit instant.
    pub fn update_at(&mut self, bytes_delta: u64, now: Instant) -> Option<DisplayFrame> {
        self.written += bytes_delta;
        debug_assert!(self.written <= self.total_size);

        let elapsed = self.elapsed_secs_at(now);
        if elapsed <= self.last_sample_secs {
            return None;
        }

        // Speed uses total elapsed time, not the last interval.
        self.speed = self.written as f64 / elapsed as f64;
        self.last_sample_secs = elapsed;
        Some(self.render_at(now))
    }

    pub fn render(&self) -> DisplayFrame {
        self.render_at(Instant::now())
    }

    pub fn render_at(&self, now: Instant) -> DisplayFrame {
        let percentage = self.percentage();
        DisplayFrame {
            bar: render_bar(percentage),
            percentage,
            written: self.written,
            total: self.total_size,
            speed: self.speed,
            elapsed_secs: self.elapsed_secs_at(now),
            eta_secs: self.eta_secs(),
        }
    }

    /// Builds the final summary. Call once, after a clean completion.
    pub fn finish(&self) -> SummaryReport {
        self.finish_at(Instant::now(), Local::now())
    }

    pub fn finish_at(&self, now: Instant, finished_at: DateTime<Local>) -> SummaryReport {
        let elapsed_secs = self.elapsed_secs_at(now);
        let average_speed = if elapsed_secs > 0 {
            self.written as f64 / elapsed_secs as f64
        } else {
            0.0
        };

        SummaryReport {
            total_bytes: self.written,
            elapsed_secs,
            average_speed,
            started_at: self.started_at,
            finished_at,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Bytes per second; zero until the first one-second sample.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn percentage(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        self.written as f64 / self.total_size as f64 * 100.0
    }

    /// Estimated seconds remaining, undefined until a speed sample exists.
    pub fn eta_secs(&self) -> Option<u64> {
        if self.speed <= 0.0 || self.written == 0 {
            return None;
        }
        let remaining = self.total_size.saturating_sub(self.written);
        Some((remaining as f64 / self.speed) as u64)
    }

    fn elapsed_secs_at(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.start).as_secs()
    }
}

/// Draws a [`BAR_WIDTH`]-cell bar: `=` for filled cells, `>` for the leading
/// edge and blanks for the rest.
pub fn render_bar(percentage: f64) -> String {
    let filled = ((percentage / 100.0 * BAR_WIDTH as f64).floor() as usize).min(BAR_WIDTH);

    (0..BAR_WIDTH)
        .map(|i| match i.cmp(&filled) {
            std::cmp::Ordering::Less => '=',
            std::cmp::Ordering::Equal => '>',
            std::cmp::Ordering::Greater => ' ',
        })
        .collect()
}

/// One refresh of the two-line status display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub bar: String,
    pub percentage: f64,
    pub written: u64,
    pub total: u64,
    /// Bytes per second.
    pub speed: f64,
    pub elapsed_secs: u64,
    pub eta_secs: Option<u64>,
}

impl DisplayFrame {
    /// `[<bar>] <pct>% | <written> / <total>`
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {:.1}% | {} / {}",
            self.bar,
            self.percentage,
            format_bytes(self.written),
            format_bytes(self.total)
        )
    }

    /// `Speed: <x> MB/s | Elapsed: <t> | ETA: <t>`
    pub fn stats_line(&self) -> String {
        let eta = self
            .eta_secs
            .map(format_time)
            .unwrap_or_else(|| "calculating...".to_string());
        format!(
            "Speed: {:.2} MB/s | Elapsed: {} | ETA: {}",
            self.speed / MIB,
            format_time(self.elapsed_secs),
            eta
        )
    }
}

impl fmt::Display for DisplayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.status_line(), self.stats_line())
    }
}

/// Final, append-only report of a completed wipe.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub total_bytes: u64,
    pub elapsed_secs: u64,
    /// Bytes per second over the whole session.
    pub average_speed: f64,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Total data written: {}", format_bytes(self.total_bytes))?;
        writeln!(f, "  Total time: {}", format_time(self.elapsed_secs))?;
        writeln!(f, "  Average speed: {:.2} MB/s", self.average_speed / MIB)?;
        writeln!(f, "  Start: {}", self.started_at.format(TIMESTAMP_FORMAT))?;
        write!(f, "  End: {}", self.finished_at.format(TIMESTAMP_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn init_starts_empty() {
        let p = ProgressState::init(10 * MB);
        assert_eq!(p.written(), 0);
        assert_eq!(p.speed(), 0.0);
        assert_eq!(p.eta_secs(), None);
        assert_eq!(p.percentage(), 0.0);
    }

    #[test]
    fn updates_within_the_first_second_only_accumulate() {
        let mut p = ProgressState::init(10 * MB);
        let t0 = p.start;

        assert!(p.update_at(MB, t0 + Duration::from_millis(200)).is_none());
        assert!(p.update_at(MB, t0 + Duration::from_millis(900)).is_none());
        assert_eq!(p.written(), 2 * MB);
        assert_eq!(p.speed(), 0.0);
    }

    #[test]
    fn speed_is_averaged_over_total_elapsed_time() {
        let mut p = ProgressState::init(100 * MB);
        let t0 = p.start;

        let frame = p.update_at(4 * MB, t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(frame.speed, (4 * MB) as f64);

        assert!(p.update_at(2 * MB, t0 + Duration::from_millis(1500)).is_none());

        let frame = p.update_at(2 * MB, t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(frame.speed, (4 * MB) as f64);
        assert_eq!(frame.written, 8 * MB);
        // 92 MiB left at 4 MiB/s
        assert_eq!(frame.eta_secs, Some(23));
    }

    #[test]
    fn skipped_seconds_still_produce_one_frame() {
        let mut p = ProgressState::init(100 * MB);
        let t0 = p.start;

        assert!(p.update_at(MB, t0 + Duration::from_secs(5)).is_some());
        assert!(p.update_at(MB, t0 + Duration::from_millis(5_999)).is_none());
        assert!(p.update_at(MB, t0 + Duration::from_secs(6)).is_some());
    }

    #[test]
    fn bar_has_fixed_width_and_leading_edge() {
        assert_eq!(render_bar(0.0), format!(">{}", " ".repeat(39)));
        assert_eq!(render_bar(50.0), format!("{}>{}", "=".repeat(20), " ".repeat(19)));
        assert_eq!(render_bar(99.9), format!("{}>", "=".repeat(39)));
        assert_eq!(render_bar(100.0), "=".repeat(40));
        for pct in [0.0, 12.5, 33.3, 99.0, 100.0] {
            assert_eq!(render_bar(pct).chars().count(), BAR_WIDTH);
        }
    }

    #[test]
    fn frame_lines_match_display_layout() {
        let mut p = ProgressState::init(4 * MB);
        let t0 = p.start;
        let frame = p.update_at(2 * MB, t0 + Duration::from_secs(2)).unwrap();

        assert_eq!(
            frame.status_line(),
            format!("[{}>{}] 50.0% | 2.0 MB / 4.0 MB", "=".repeat(20), " ".repeat(19))
        );
        assert_eq!(frame.stats_line(), "Speed: 1.00 MB/s | Elapsed: 2s | ETA: 2s");
    }

    #[test]
    fn eta_reads_calculating_before_first_sample() {
        let p = ProgressState::init(MB);
        let frame = p.render_at(p.start);
        assert!(frame.stats_line().ends_with("ETA: calculating..."));
    }

    #[test]
    fn summary_reports_average_speed() {
        let mut p = ProgressState::init(10 * MB);
        let t0 = p.start;
        p.update_at(10 * MB, t0 + Duration::from_secs(3));

        let end = p.started_at + chrono::Duration::seconds(5);
        let summary = p.finish_at(t0 + Duration::from_secs(5), end);
        assert_eq!(summary.total_bytes, 10 * MB);
        assert_eq!(summary.elapsed_secs, 5);
        assert_eq!(summary.average_speed, (2 * MB) as f64);

        let text = summary.to_string();
        assert!(text.contains("Total data written: 10.0 MB"));
        assert!(text.contains("Total time: 5s"));
        assert!(text.contains("Average speed: 2.00 MB/s"));
    }

    #[test]
    fn summary_of_instant_wipe_has_zero_speed() {
        let mut p = ProgressState::init(MB);
        let t0 = p.start;
        p.update_at(MB, t0);
        let summary = p.finish_at(t0, p.started_at);
        assert_eq!(summary.average_speed, 0.0);
        assert_eq!(summary.elapsed_secs, 0);
    }

    proptest! {
        #[test]
        fn accounting_never_moves_backwards(
            total in 1u64..=(1u64 << 40),
            steps in prop::collection::vec((0u64..=(8 * MB), 0u64..=1500), 1..64),
        ) {
            let mut p = ProgressState::init(total);
            let mut now = p.start;
            let mut delta_sum = 0u64;
            let mut last_frame_pct = -1.0;

            for (delta, gap_ms) in steps {
                let delta = delta.min(total - p.written());
                let (written, pct, sample) = (p.written(), p.percentage(), p.last_sample_secs);
                now += Duration::from_millis(gap_ms);

                if let Some(frame) = p.update_at(delta, now) {
                    prop_assert!(frame.percentage >= last_frame_pct);
                    prop_assert_eq!(frame.written, p.written());
                    last_frame_pct = frame.percentage;
                }
                delta_sum += delta;

                prop_assert!(p.written() >= written);
                prop_assert!(p.percentage() >= pct);
                prop_assert!(p.last_sample_secs >= sample);
                prop_assert_eq!(p.written(), delta_sum);
                prop_assert!(p.written() <= total);
            }
        }
    }
}
