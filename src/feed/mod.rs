pub mod api_football;
pub mod odds;
pub mod provider;

pub use api_football::ApiFootball;
pub use provider::{FixtureFeed, OddsFeed};
