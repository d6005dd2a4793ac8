//! Business logic services for the application layer.

pub mod redirect_service;
pub mod rule_validator;
pub mod verification_service;

pub use redirect_service::{
    ImportFailure, ImportOptions, ImportReport, RedirectService, ResolverSettings,
};
pub use rule_validator::{RuleValidator, ValidationFailure};
pub use verification_service::{
    BatchOutcome, VerificationReport, VerificationService, VerificationSettings,
};
