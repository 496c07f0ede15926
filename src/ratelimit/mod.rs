//! Rolling-window rate limiting.

mod backend;
mod clock;
mod limiter;
mod rules;
mod window;

pub use backend::Acquire;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use limiter::{CompositeLimiter, Reservation};
pub use rules::{Constraint, ConstraintRule, LimiterConfig};
pub use window::WindowGate;
