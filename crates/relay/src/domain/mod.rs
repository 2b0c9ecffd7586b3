pub mod auction;
pub mod eth;
pub mod intake;
pub mod opportunity;
pub mod permission;
pub mod relay;
pub mod settlement;

pub use {opportunity::Opportunity, relay::Relay};
