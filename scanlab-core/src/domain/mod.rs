//! Domain types shared across the simulation core.

pub mod bar;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use position::{Position, PositionStatus};
pub use signal::{Direction, Signal};
pub use trade::{ExitReason, Trade};

use serde::{Deserialize, Serialize};

/// One point on the running-equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Epoch milliseconds of the bar step that changed position state.
    pub timestamp: i64,
    pub equity: f64,
}
