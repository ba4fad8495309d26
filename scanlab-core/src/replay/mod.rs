//! Replay: point-in-time views, warmup gating, and the bar-by-bar scheduler.

pub mod scheduler;
pub mod view;
pub mod warmup;

pub use scheduler::{
    run_replay, Anomaly, AnomalyKind, CancelToken, ReplayConfig, ReplayError, ReplayResult,
};
pub use view::PointInTimeView;
pub use warmup::SessionWarmup;
