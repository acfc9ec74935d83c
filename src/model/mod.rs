pub mod confidence;
pub mod markets;
pub mod outcome;
pub mod poisson;
pub mod ratings;

pub use confidence::{Confidence, GateConfig};
pub use markets::{Market, MarketBook};
pub use poisson::ModelConfig;
pub use ratings::{RatingConfig, TeamForm};

/// What the model says about one fixture: the tier from the gate plus the
/// priced markets. Low tiers carry an empty book.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub confidence: Confidence,
    pub markets: MarketBook,
}
