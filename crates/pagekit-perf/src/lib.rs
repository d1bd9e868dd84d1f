//! Pagekit Performance Utilities
//!
//! Small helpers page components reach for ad hoc: visibility-driven lazy
//! mounting, connection/device heuristics, idle-time scheduling, a
//! process-wide event bus, and throttle/debounce/memoize wrappers.
//!
//! None of these depend on one another.

mod timing;
mod memo;
mod visibility;
mod lazy;
mod hints;
mod idle;
mod event_bus;

pub use timing::{throttle, debounce, Throttled, Debounced};
pub use memo::{memoize, memoize_bounded, Memoized};
pub use visibility::{VisibilityDetector, VisibilityHandle, VisibilityOptions, DEFAULT_THRESHOLD};
pub use lazy::LazyMount;
pub use hints::{
    NetworkInformation, EffectiveType, EnvironmentSignals, ResponsiveImageProps,
    is_slow_connection, is_low_end_device, prefers_reduced_motion,
    get_responsive_image_props, DEFAULT_IMAGE_WIDTHS, RESPONSIVE_SIZES,
};
pub use idle::{IdleScheduler, IdleBackend, IdleDeadline, IdleOptions, IdleHandle, IdleCallback, IDLE_BUDGET};
pub use event_bus::{EventBus, Subscription, global_bus};

use pagekit_dom::DomError;

/// Performance utility error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PerfError {
    #[error("invalid root margin: {0}")]
    InvalidRootMargin(#[from] DomError),

    #[error("threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("invalid environment signals: {0}")]
    InvalidSignals(String),
}
