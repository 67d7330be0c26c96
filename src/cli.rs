use crate::constants::{DEFAULT_MAX_SIZE_KB, DEFAULT_MAX_WIDTH};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "img-fit",
    about = "Shrink a folder of images to fit a maximum width and file size",
    long_about = "img-fit re-encodes every image in a folder so that it is no wider than the \
                  given width and no larger than the given size. It lowers the encoder quality \
                  step by step and, when quality alone is not enough, shrinks the image further. \
                  Supported formats: JPEG, PNG, BMP, GIF. Outputs keep their file name and format.",
    version,
    after_help = "EXAMPLES:\n  \
    img-fit ./photos ./web\n  \
    img-fit ./photos ./web --width 800 --size 150\n  \
    img-fit ./photos ./web -j 2 --quiet"
)]
pub struct Args {
    #[arg(help = "Folder containing the source images")]
    pub input: PathBuf,

    #[arg(
        help = "Folder for the optimized images",
        long_help = "Folder for the optimized images. Created if it does not exist. \
                     Existing files with the same name are overwritten."
    )]
    pub output: PathBuf,

    #[arg(
        short = 'w',
        long,
        default_value_t = DEFAULT_MAX_WIDTH,
        help = "Maximum width in pixels",
        long_help = "Images wider than this are scaled down once, keeping the aspect ratio, \
                     before the size loop starts."
    )]
    pub width: u32,

    #[arg(
        short = 's',
        long,
        default_value_t = DEFAULT_MAX_SIZE_KB,
        help = "Maximum file size in KB",
        long_help = "Target upper bound for each output file, in kilobytes (1 KB = 1024 bytes)."
    )]
    pub size: u64,

    #[arg(
        short = 'j',
        long,
        help = "Number of parallel threads (default: auto)",
        long_help = "Number of images processed at once. \
                     If not specified, uses the number of CPU cores, capped by available memory."
    )]
    pub threads: Option<usize>,

    #[arg(short = 'q', long, help = "Only print errors")]
    pub quiet: bool,

    #[arg(
        short = 'v',
        long,
        conflicts_with = "quiet",
        help = "Log every encode attempt",
        long_help = "Print a debug line for every encode attempt to stderr. \
                     RUST_LOG overrides this when set."
    )]
    pub verbose: bool,
}
