//! insu-route
//!
//! Everything decided from the question text alone: which collections to
//! search, which intent a classifier label maps to, and the insured profile
//! a premium question describes.

pub mod intent;
pub mod profile;
pub mod resolver;

pub use intent::Intent;
pub use profile::InsuredProfile;
pub use resolver::{CollectionResolver, Resolution, COMPARISON_KEYWORDS, INSURANCE_TYPE_KEYWORDS};
