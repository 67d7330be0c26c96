pub mod batch;
pub mod cli;
pub mod codec;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod formats;
pub mod logger;
pub mod processing;
pub mod reencode;
pub mod report;
pub mod utils;

pub use batch::{
    optimize_folder, plan_parallelism, BatchObserver, BatchReport, BatchSummary, CancelFlag,
    FileOutcome, SilentObserver,
};
pub use codec::{Codec, ImageCodec};
pub use discovery::{discover_images, is_image_file};
pub use error::{OptimizeError, Result};
pub use formats::OutputFormat;
pub use processing::{load_image, process_task, write_output, ImageTask, OptimizeOptions};
pub use reencode::{
    quality_step, reencode, Dimensions, EncodeReport, ExhaustReason, Limits, ReencodeResult,
    ResizeEvent, ResizeKind, Termination,
};
pub use report::ConsoleReporter;
