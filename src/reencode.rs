//! Size-constrained re-encoding.
//!
//! [`reencode`] takes one decoded image and converges it to a width and byte
//! budget: an optional one-off downscale to the maximum width, then a greedy
//! quality search that steps down in proportion to the overshoot, falling
//! back to shrinking both dimensions by 10% whenever quality runs out.
//!
//! The search is bounded. After [`MAX_ENCODE_ATTEMPTS`] encodes, or once the
//! image cannot shrink any further, the smallest encoding seen so far is
//! returned with [`Termination::Exhausted`].

use crate::codec::Codec;
use crate::constants::{
    FALLBACK_QUALITY, FALLBACK_SCALE, INITIAL_QUALITY, MAX_ENCODE_ATTEMPTS, MIN_QUALITY,
    MIN_QUALITY_STEP, STEP_BUDGET_DIVISOR,
};
use crate::error::{OptimizeError, Result};
use image::{DynamicImage, GenericImageView};
use std::fmt;

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Both sides multiplied by `factor` and floored, never below 1 px.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            width: scale_side(self.width, factor),
            height: scale_side(self.height, factor),
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn scale_side(side: u32, factor: f64) -> u32 {
    ((side as f64 * factor).floor() as u32).max(1)
}

/// Width and byte budget an output must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_width: u32,
    pub max_size_bytes: u64,
}

impl Limits {
    pub fn new(max_width: u32, max_size_bytes: u64) -> Result<Self> {
        if max_width == 0 {
            return Err(OptimizeError::InvalidWidth(max_width));
        }
        if max_size_bytes == 0 {
            return Err(OptimizeError::InvalidSize(max_size_bytes));
        }
        Ok(Self {
            max_width,
            max_size_bytes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeKind {
    /// The one-off downscale to the maximum width.
    Initial,
    /// A 10% shrink after quality was exhausted.
    Fallback,
}

/// A dimension change applied while converging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub kind: ResizeKind,
    pub from: Dimensions,
    pub to: Dimensions,
    /// Quality the next encode will use.
    pub quality_after: u8,
}

/// One encode of the current image.
#[derive(Debug, Clone)]
pub struct EncodingAttempt {
    pub quality: u8,
    pub bytes: Vec<u8>,
}

impl EncodingAttempt {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The encode attempt ceiling was reached.
    IterationCap,
    /// The image is already 1 px on every side it can shrink.
    MinimumDimensions,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::IterationCap => {
                write!(f, "gave up after {} encode attempts", MAX_ENCODE_ATTEMPTS)
            }
            ExhaustReason::MinimumDimensions => write!(f, "image cannot shrink any further"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    WithinBudget,
    Exhausted(ExhaustReason),
}

/// Final encoding for one image.
#[derive(Debug, Clone)]
pub struct ReencodeResult {
    pub bytes: Vec<u8>,
    pub report: EncodeReport,
}

/// Everything about a [`ReencodeResult`] except the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeReport {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub size_bytes: u64,
    pub resize_events: Vec<ResizeEvent>,
    /// Number of encodes performed.
    pub iterations: usize,
    pub termination: Termination,
}

impl EncodeReport {
    pub fn is_within_budget(&self) -> bool {
        self.termination == Termination::WithinBudget
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn fallback_count(&self) -> usize {
        self.resize_events
            .iter()
            .filter(|event| event.kind == ResizeKind::Fallback)
            .count()
    }
}

/// Quality points to drop after an encode of `current_size` bytes.
///
/// The overshoot is measured in units of 5% of the budget, rounded up, with
/// a floor of [`MIN_QUALITY_STEP`]:
/// `max(2, ceil((current_size - max_size_bytes) / (max_size_bytes * 0.05)))`.
///
/// ```
/// use img_fit::reencode::quality_step;
///
/// // 10% over budget costs two units.
/// assert_eq!(quality_step(1100, 1000), 2);
/// // 50% over budget costs ten.
/// assert_eq!(quality_step(1500, 1000), 10);
/// // A single byte over still costs the minimum step.
/// assert_eq!(quality_step(1001, 1000), 2);
/// ```
pub fn quality_step(current_size: u64, max_size_bytes: u64) -> u64 {
    let overshoot = current_size.saturating_sub(max_size_bytes) as u128;
    let budget = max_size_bytes.max(1) as u128;
    // overshoot / (budget / 20), rounded up, in integer arithmetic
    let units = (overshoot * STEP_BUDGET_DIVISOR as u128 + budget - 1) / budget;
    (units.min(u64::MAX as u128) as u64).max(MIN_QUALITY_STEP)
}

/// Quality for the next attempt, never below [`MIN_QUALITY`].
pub fn next_quality(quality: u8, current_size: u64, max_size_bytes: u64) -> u8 {
    let step = quality_step(current_size, max_size_bytes);
    (quality as u64)
        .saturating_sub(step)
        .max(MIN_QUALITY as u64) as u8
}

/// Target of the initial downscale, if the image is wider than `max_width`.
pub fn initial_target(dimensions: Dimensions, max_width: u32) -> Option<Dimensions> {
    if dimensions.width <= max_width {
        return None;
    }
    let ratio = max_width as f64 / dimensions.width as f64;
    let height = ((dimensions.height as f64 * ratio).floor() as u32).max(1);
    Some(Dimensions::new(max_width, height))
}

enum LoopState {
    Encoding {
        quality: u8,
        best: Option<Smallest>,
    },
    DimensionFallback {
        best: Smallest,
    },
    Done(EncodingAttempt),
    Aborted {
        reason: ExhaustReason,
        best: Smallest,
    },
}

/// Smallest oversized encode so far, and the dimensions it was made at.
struct Smallest {
    attempt: EncodingAttempt,
    dimensions: Dimensions,
}

impl Smallest {
    // Ties keep the earlier attempt.
    fn keep_smaller(best: Option<Smallest>, candidate: Smallest) -> Smallest {
        match best {
            Some(best) if best.attempt.size() <= candidate.attempt.size() => best,
            _ => candidate,
        }
    }
}

/// Converge `image` to `limits` using `codec`.
///
/// `on_resize` sees every dimension change as it happens; the same events are
/// also returned in [`EncodeReport::resize_events`].
pub fn reencode<C, F>(
    image: DynamicImage,
    limits: &Limits,
    codec: &C,
    mut on_resize: F,
) -> Result<ReencodeResult>
where
    C: Codec + ?Sized,
    F: FnMut(&ResizeEvent),
{
    let mut image = image;
    let mut resize_events = Vec::new();

    let original = Dimensions::of(&image);
    if let Some(target) = initial_target(original, limits.max_width) {
        image = codec.resize(&image, target.width, target.height);
        let event = ResizeEvent {
            kind: ResizeKind::Initial,
            from: original,
            to: Dimensions::of(&image),
            quality_after: INITIAL_QUALITY,
        };
        on_resize(&event);
        resize_events.push(event);
    }

    let mut iterations = 0usize;
    let mut state = LoopState::Encoding {
        quality: INITIAL_QUALITY,
        best: None,
    };

    let (attempt, dimensions, termination) = loop {
        state = match state {
            LoopState::Encoding { quality, best } => {
                iterations += 1;
                let dimensions = Dimensions::of(&image);
                let attempt = EncodingAttempt {
                    quality,
                    bytes: codec.encode(&image, quality)?,
                };
                let size = attempt.size();
                tracing::debug!(
                    iteration = iterations,
                    quality,
                    size,
                    budget = limits.max_size_bytes,
                    width = dimensions.width,
                    height = dimensions.height,
                    "encode attempt"
                );

                if size <= limits.max_size_bytes {
                    LoopState::Done(attempt)
                } else {
                    let next = next_quality(quality, size, limits.max_size_bytes);
                    let best = Smallest::keep_smaller(
                        best,
                        Smallest {
                            attempt,
                            dimensions,
                        },
                    );

                    if iterations >= MAX_ENCODE_ATTEMPTS {
                        LoopState::Aborted {
                            reason: ExhaustReason::IterationCap,
                            best,
                        }
                    } else if next <= MIN_QUALITY || !codec.quality_sensitive() {
                        // Lower qualities would reproduce the same bytes.
                        LoopState::DimensionFallback { best }
                    } else {
                        LoopState::Encoding {
                            quality: next,
                            best: Some(best),
                        }
                    }
                }
            }
            LoopState::DimensionFallback { best } => {
                let from = Dimensions::of(&image);
                let to = from.scaled(FALLBACK_SCALE);
                if to == from {
                    LoopState::Aborted {
                        reason: ExhaustReason::MinimumDimensions,
                        best,
                    }
                } else {
                    image = codec.resize(&image, to.width, to.height);
                    let event = ResizeEvent {
                        kind: ResizeKind::Fallback,
                        from,
                        to: Dimensions::of(&image),
                        quality_after: FALLBACK_QUALITY,
                    };
                    tracing::debug!(from = %event.from, to = %event.to, "dimension fallback");
                    on_resize(&event);
                    resize_events.push(event);
                    LoopState::Encoding {
                        quality: FALLBACK_QUALITY,
                        best: Some(best),
                    }
                }
            }
            LoopState::Done(attempt) => {
                break (attempt, Dimensions::of(&image), Termination::WithinBudget);
            }
            LoopState::Aborted { reason, best } => {
                break (best.attempt, best.dimensions, Termination::Exhausted(reason));
            }
        };
    };

    let report = EncodeReport {
        width: dimensions.width,
        height: dimensions.height,
        quality: attempt.quality,
        size_bytes: attempt.size(),
        resize_events,
        iterations,
        termination,
    };
    Ok(ReencodeResult {
        bytes: attempt.bytes,
        report,
    })
}
