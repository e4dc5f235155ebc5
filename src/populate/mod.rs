//! Document population and overrides
//!
//! [`DocumentPopulator`] turns a schema tree and a seed into a document.
//! Values come from path-scoped streams ([`GeneratorFactory`]) through an
//! ordered rule table ([`ValueSynthesizer`]). [`Override`]s edit the result.

pub mod generator;
pub mod overrides;
pub mod populator;
pub mod synthesizer;
pub mod value_path;

pub use generator::{GeneratorFactory, GeneratorStream};
pub use overrides::{apply_overrides, Override};
pub use populator::DocumentPopulator;
pub use synthesizer::{ValueGenerator, ValueMatcher, ValueRule, ValueSynthesizer, DEFAULT_RULES};
pub use value_path::ValuePath;

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many instances of a repeatable schema position are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum RepeatablePopulateMode {
    /// Between the declared minimum and a few more; optional single elements are left out
    Random,
    /// At least one of everything, optional elements included
    #[default]
    MinimumOne,
    /// Exactly one of everything, whatever the declared cardinality
    ExactlyOne,
}

impl RepeatablePopulateMode {
    /// All modes
    pub const ALL: [RepeatablePopulateMode; 3] = [
        RepeatablePopulateMode::Random,
        RepeatablePopulateMode::MinimumOne,
        RepeatablePopulateMode::ExactlyOne,
    ];

    /// Kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatablePopulateMode::Random => "random",
            RepeatablePopulateMode::MinimumOne => "minimum-one",
            RepeatablePopulateMode::ExactlyOne => "exactly-one",
        }
    }
}

impl fmt::Display for RepeatablePopulateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
