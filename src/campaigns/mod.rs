/// Audience selector parsing and resolution
pub mod audience;
/// Campaign descriptor files and loading
pub mod descriptor;
/// Rate-limited fan-out of one message to many recipients
pub mod dispatcher;
/// The scheduled dispatch state machine
pub mod engine;

pub use audience::AudienceSelector;
pub use descriptor::{Campaign, CampaignMessage};
pub use dispatcher::{BroadcastDispatcher, DispatchReport};
pub use engine::CampaignEngine;
