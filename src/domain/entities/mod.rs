//! Core domain entities.
//!
//! - [`RedirectRule`] - A stored legacy path → destination mapping
//! - [`Post`] - Content-system record a rule may point at
//! - [`ProbeRequest`] / [`ProbeResult`] - Live HTTP checks of a rule
//! - [`RedirectExpectation`] - Classification of probe results
//!
//! Creation inputs use separate structs (`NewRedirectRule`), following the
//! "New Type" pattern.

pub mod post;
pub mod probe;
pub mod redirect_rule;
pub mod verification;

pub use post::Post;
pub use probe::{ProbeError, ProbeRequest, ProbeResponse, ProbeResult};
pub use redirect_rule::{Destination, NewRedirectRule, RedirectRule, RuleId, RuleStatus};
pub use verification::{Mismatch, RedirectExpectation, VerificationNotice, VerificationOutcome};
