use crate::batch::{BatchObserver, BatchReport, FileOutcome};
use crate::constants::{PROGRESS_BAR_TEMPLATE, PROGRESS_CHARS};
use crate::error::OptimizeError;
use crate::logger;
use crate::reencode::{EncodeReport, ResizeEvent, ResizeKind, Termination};
use crate::utils::{calculate_compression_ratio, file_label, format_file_size};
use crate::{error, info, warn};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Terminal observer: a progress bar plus one line per notable event.
///
/// In quiet mode the bar is hidden and only errors are printed.
pub struct ConsoleReporter {
    progress: ProgressBar,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let progress = if logger::is_quiet() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
            progress.set_style(style.progress_chars(PROGRESS_CHARS));
        }
        Self { progress }
    }

    // Keeps log lines from tearing through the bar.
    fn println(&self, f: impl FnOnce()) {
        self.progress.suspend(f);
    }

    pub fn finish(&self, report: &BatchReport) {
        if report.cancelled {
            self.progress.abandon_with_message("cancelled");
        } else {
            self.progress.finish_with_message("done");
        }

        let summary = report.summary();
        info!("\n📊 Summary:");
        info!("  📁 Files found: {}", summary.total);
        info!("  ✅ Optimized: {}", summary.optimized);
        if summary.exhausted > 0 {
            info!("  ⚠️  Over budget (best effort): {}", summary.exhausted);
        }
        if summary.failed > 0 {
            info!("  ❌ Failed: {}", summary.failed);
        }
        if summary.skipped > 0 {
            info!("  ⏭️  Skipped: {}", summary.skipped);
        }
        info!(
            "  📊 Total size: {} -> {} ({:.1}% saved)",
            format_file_size(summary.bytes_before),
            format_file_size(summary.bytes_after),
            summary.compression_ratio()
        );
        info!(
            "  ⏱️  Total time: {:.2?} ({:.2} files/second, {} threads)",
            summary.elapsed,
            summary.files_per_second(),
            report.threads
        );

        if summary.failed > 0 {
            for outcome in &report.outcomes {
                if let FileOutcome::Failed { source, error } = outcome {
                    info!("    - {}: {}", file_label(source), error);
                }
            }
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchObserver for ConsoleReporter {
    fn on_batch_start(&self, total: usize, threads: usize) {
        self.progress.set_length(total as u64);
        self.println(|| {
            info!("📊 Found {} image files, using {} threads", total, threads);
        });
    }

    fn on_resize(&self, source: &Path, event: &ResizeEvent) {
        let label = file_label(source);
        self.println(|| match event.kind {
            ResizeKind::Initial => {
                info!("📏 {}: resized {} -> {}", label, event.from, event.to);
            }
            ResizeKind::Fallback => {
                info!(
                    "📉 {}: still too large, shrinking {} -> {} (quality reset to {})",
                    label, event.from, event.to, event.quality_after
                );
            }
        });
    }

    fn on_file_complete(&self, source: &Path, original_size: u64, report: &EncodeReport) {
        let label = file_label(source);
        let ratio = calculate_compression_ratio(original_size, report.size_bytes);
        self.println(|| match report.termination {
            Termination::WithinBudget => {
                info!(
                    "✅ {}: {} -> {} ({:.1}%), {}, quality {}",
                    label,
                    format_file_size(original_size),
                    format_file_size(report.size_bytes),
                    ratio,
                    report.dimensions(),
                    report.quality
                );
            }
            Termination::Exhausted(reason) => {
                warn!(
                    "{}: could not reach the size limit ({}); kept best effort {} at {}",
                    label,
                    reason,
                    format_file_size(report.size_bytes),
                    report.dimensions()
                );
            }
        });
        self.progress.inc(1);
    }

    fn on_file_failed(&self, source: &Path, err: &OptimizeError) {
        let label = file_label(source);
        self.println(|| {
            error!("Failed to process {}: {}", label, err);
        });
        self.progress.inc(1);
    }

    fn on_file_skipped(&self, _source: &Path) {
        self.progress.inc(1);
    }
}
