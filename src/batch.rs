use crate::constants::MIN_AVAILABLE_MEMORY_MIB;
use crate::discovery::discover_images;
use crate::error::{OptimizeError, Result};
use crate::processing::{process_task, ImageTask, OptimizeOptions};
use crate::reencode::{EncodeReport, Limits, ResizeEvent};
use crate::utils::calculate_compression_ratio;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

/// Shared stop signal. Files already being processed finish; files not yet
/// started are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callbacks for a batch run.
///
/// Callbacks fire from worker threads, so implementations must be `Sync`.
/// Every method defaults to a no-op.
pub trait BatchObserver: Sync {
    fn on_batch_start(&self, _total: usize, _threads: usize) {}
    fn on_resize(&self, _source: &Path, _event: &ResizeEvent) {}
    fn on_file_complete(&self, _source: &Path, _original_size: u64, _report: &EncodeReport) {}
    fn on_file_failed(&self, _source: &Path, _error: &OptimizeError) {}
    fn on_file_skipped(&self, _source: &Path) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl BatchObserver for SilentObserver {}

#[derive(Debug)]
pub enum FileOutcome {
    Optimized {
        task: ImageTask,
        original_size: u64,
        report: EncodeReport,
    },
    Failed {
        source: PathBuf,
        error: OptimizeError,
    },
    /// Cancelled before the file was started.
    Skipped { source: PathBuf },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FileOutcome::Optimized { task, .. } => &task.source,
            FileOutcome::Failed { source, .. } | FileOutcome::Skipped { source } => source,
        }
    }
}

/// Per-file outcomes in discovery order.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub threads: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.outcomes.len(),
            elapsed: self.elapsed,
            ..BatchSummary::default()
        };

        for outcome in &self.outcomes {
            match outcome {
                FileOutcome::Optimized {
                    original_size,
                    report,
                    ..
                } => {
                    summary.optimized += 1;
                    if !report.is_within_budget() {
                        summary.exhausted += 1;
                    }
                    summary.bytes_before += original_size;
                    summary.bytes_after += report.size_bytes;
                }
                FileOutcome::Failed { .. } => summary.failed += 1,
                FileOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Aggregate counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    /// Files written, including best-effort ones.
    pub optimized: usize,
    /// Written but still over the byte budget.
    pub exhausted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Percentage saved across written files.
    pub fn compression_ratio(&self) -> f64 {
        calculate_compression_ratio(self.bytes_before, self.bytes_after)
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.optimized as f64 / secs
        } else {
            0.0
        }
    }
}

/// Estimates the decoded footprint of an image from its size on disk.
fn estimate_image_memory_mib(path: &Path) -> f64 {
    let file_size_mib = match fs::metadata(path) {
        Ok(metadata) => metadata.len() as f64 / (1024.0 * 1024.0),
        // Unreadable files fail later in their own task.
        Err(_) => return 0.0,
    };

    let multiplier = match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => 4.0,
        Some("png") => 3.0,
        Some("gif") => 2.0,
        Some("bmp") => 1.2,
        _ => 3.0,
    };

    file_size_mib * multiplier
}

/// Picks the worker count for a batch.
///
/// Starts from `requested` (or the CPU count), never exceeds the number of
/// files, and is further capped so the estimated decode footprint of all
/// workers fits in available memory.
pub fn plan_parallelism(files: &[PathBuf], requested: Option<usize>) -> usize {
    let baseline = requested
        .unwrap_or_else(num_cpus::get)
        .min(files.len())
        .max(1);

    let total_mib: f64 = files.iter().map(|f| estimate_image_memory_mib(f)).sum();
    let avg_per_file_mib = ((total_mib / files.len().max(1) as f64).ceil() as u64).max(1);

    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    let available_mem_mib = sys.available_memory() / (1024 * 1024);
    if available_mem_mib == 0 {
        // Memory could not be read (some sandboxes); trust the baseline.
        return baseline;
    }

    let mem_cap = (available_mem_mib.saturating_sub(MIN_AVAILABLE_MEMORY_MIB) / avg_per_file_mib)
        .clamp(1, baseline as u64) as usize;
    baseline.min(mem_cap)
}

/// Optimizes every image in `input` into `output`.
///
/// Fails before touching the filesystem when the input is missing or holds
/// no images. After that, per-file failures are recorded in the report and
/// never abort the batch.
pub fn optimize_folder<O>(
    input: &Path,
    output: &Path,
    options: &OptimizeOptions,
    observer: &O,
    cancel: &CancelFlag,
) -> Result<BatchReport>
where
    O: BatchObserver + ?Sized,
{
    let start_time = Instant::now();

    let sources = discover_images(input)?;
    if sources.is_empty() {
        return Err(OptimizeError::NoImagesFound(input.to_path_buf()));
    }

    fs::create_dir_all(output)
        .map_err(|_| OptimizeError::DirectoryCreationFailed(output.to_path_buf()))?;

    let threads = plan_parallelism(&sources, options.threads);
    tracing::debug!(files = sources.len(), threads, "starting batch");
    observer.on_batch_start(sources.len(), threads);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| OptimizeError::ThreadPool(e.to_string()))?;

    let limits = options.limits;
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        sources
            .par_iter()
            .map(|source| run_task(source, output, limits, observer, cancel))
            .collect()
    });

    // A stop that arrives after the last file started skips nothing but
    // still counts.
    Ok(BatchReport {
        outcomes,
        threads,
        elapsed: start_time.elapsed(),
        cancelled: cancel.is_cancelled(),
    })
}

fn run_task<O>(
    source: &Path,
    output_dir: &Path,
    limits: Limits,
    observer: &O,
    cancel: &CancelFlag,
) -> FileOutcome
where
    O: BatchObserver + ?Sized,
{
    if cancel.is_cancelled() {
        observer.on_file_skipped(source);
        return FileOutcome::Skipped {
            source: source.to_path_buf(),
        };
    }

    let processed = ImageTask::for_source(source, output_dir, limits).and_then(|task| {
        let (original_size, result) =
            process_task(&task, |event| observer.on_resize(source, event))?;
        Ok((task, original_size, result.report))
    });

    match processed {
        Ok((task, original_size, report)) => {
            observer.on_file_complete(source, original_size, &report);
            FileOutcome::Optimized {
                task,
                original_size,
                report,
            }
        }
        Err(error) => {
            tracing::debug!(source = %source.display(), %error, "file failed");
            observer.on_file_failed(source, &error);
            FileOutcome::Failed {
                source: source.to_path_buf(),
                error,
            }
        }
    }
}
