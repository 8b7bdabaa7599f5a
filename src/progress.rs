//! Terminal progress display for the pipeline, using indicatif.
//!
//! [`Progress`] is the binary's [`PipelineCallback`]: it draws one bar per
//! stage, keeps the finished report, remembers the first task error and
//! answers `terminating()` from the Ctrl+C flag.
//!
//! | Stage    | Display                                   |
//! |----------|-------------------------------------------|
//! | Walk     | spinner with folder and file counts       |
//! | Size     | bar over files                            |
//! | Hash     | bar over bytes, with throughput and ETA   |
//! | Analysis | bar over files indexed                    |

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::analysis::Report;
use crate::pipeline::{PipelineCallback, Stage, TaskError};
use crate::signal::ShutdownHandler;
use crate::snapshot::TreeSnapshot;

/// Progress reporter and result sink for one pipeline run.
pub struct Progress {
    bar: Option<ProgressBar>,
    hidden: bool,
    shutdown: ShutdownHandler,
    total_files: usize,
    total_bytes: u64,
    report: Option<Report>,
    failure: Option<(Stage, String)>,
}

impl Progress {
    /// Create a reporter; `hidden` suppresses every bar.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupwalk::progress::Progress;
    /// use dupwalk::signal::ShutdownHandler;
    ///
    /// let progress = Progress::new(true, ShutdownHandler::new());
    /// assert!(progress.report().is_none());
    /// ```
    #[must_use]
    pub fn new(hidden: bool, shutdown: ShutdownHandler) -> Self {
        Self {
            bar: None,
            hidden,
            shutdown,
            total_files: 0,
            total_bytes: 0,
            report: None,
            failure: None,
        }
    }

    /// The report, once analysis has finished.
    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Move the report out.
    pub fn take_report(&mut self) -> Option<Report> {
        self.report.take()
    }

    /// Files in the snapshot.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Sum of all file sizes, once sizing has finished.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Stage and message of the task error, if one occurred.
    #[must_use]
    pub fn failure(&self) -> Option<(Stage, &str)> {
        self.failure.as_ref().map(|(stage, msg)| (*stage, msg.as_str()))
    }

    fn start(&mut self, bar: ProgressBar, style: ProgressStyle, message: &'static str) {
        if let Some(old) = self.bar.take() {
            old.finish_and_clear();
        }
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(style);
        bar.set_message(message);
        self.bar = Some(bar);
    }

    fn finish(&mut self, message: String) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(message);
        }
    }

    fn walk_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn files_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn bytes_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {bytes}/{total_bytes} {msg} {bytes_per_sec} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl PipelineCallback for Progress {
    fn on_filewalk_progress(&mut self, folder_count: usize, file_count: usize) {
        if self.bar.is_none() {
            let bar = ProgressBar::new_spinner();
            bar.enable_steady_tick(Duration::from_millis(100));
            self.start(bar, Self::walk_style(), "Walking");
        }
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Walking: {folder_count} folders, {file_count} files"));
        }
    }

    fn on_filewalk_loading(&mut self, path: &Path) {
        if !self.hidden {
            eprintln!("Loading file walk from {}", path.display());
        }
    }

    fn on_filewalk_saving(&mut self, path: &Path) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Saving file walk to {}", path.display()));
        }
    }

    fn on_filewalk_finished(&mut self, snapshot: &TreeSnapshot) {
        self.total_files = snapshot.len();
        self.finish(format!(
            "Walk complete: {} folders, {} files",
            snapshot.folder_count(),
            snapshot.len()
        ));
        self.start(
            ProgressBar::new(self.total_files as u64),
            Self::files_style(),
            "Sizing",
        );
    }

    fn on_filesize_progress(&mut self, file_count: usize, _byte_count: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(file_count as u64);
        }
    }

    fn on_filesize_finished(&mut self, _sizes: &[u64], total_bytes: u64) {
        self.total_bytes = total_bytes;
        self.finish(format!("Sizing complete: {}", bytesize::ByteSize::b(total_bytes)));
        self.start(ProgressBar::new(total_bytes), Self::bytes_style(), "Hashing");
    }

    fn on_hashing_progress(&mut self, file_count: usize, byte_count: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(byte_count);
            bar.set_message(format!("{file_count}/{} files", self.total_files));
        }
    }

    fn on_hashing_finished(&mut self, hashes: &[String]) {
        self.finish(format!("Hashing complete: {} files", hashes.len()));
        self.start(
            ProgressBar::new(self.total_files as u64),
            Self::files_style(),
            "Grouping",
        );
    }

    fn on_analysis_progress(&mut self, file_count: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(file_count as u64);
        }
    }

    fn on_analysis_finished(&mut self, report: Report) {
        self.finish(format!("Analysis complete: {} duplicate groups", report.group_count()));
        self.report = Some(report);
    }

    fn on_task_error(&mut self, stage: Stage, error: &TaskError) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("{stage} failed"));
        }
        self.failure = Some((stage, error.to_string()));
    }

    fn terminating(&self) -> bool {
        self.shutdown.is_shutdown_requested()
    }
}
