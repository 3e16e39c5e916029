//! patchbank-classify: instrument taxonomy for the asset store
//!
//! Reads the normalized asset store and derives the instrument store:
//! every preset gets a category and subcategory from a keyword/threshold
//! ruleset, every wavetable a sound category.

pub mod classifier;
pub mod db;
pub mod pass;
pub mod ruleset;

pub use classifier::{Classifier, PresetClass};
pub use pass::{ClassificationPass, PassSummary};
pub use ruleset::{Ruleset, RulesetError, RulesetSpec};
