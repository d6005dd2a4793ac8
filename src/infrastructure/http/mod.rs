//! Outbound HTTP used by redirect verification.

mod prober;

pub use prober::{HttpProber, ProberSettings};
