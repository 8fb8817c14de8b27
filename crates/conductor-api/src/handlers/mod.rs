//! API request handlers.

pub mod agents;
pub mod catalog;
pub mod channel;
pub mod health;
pub mod lifecycle;
pub mod messaging;
pub mod observe;
pub mod workflow;

pub use agents::*;
pub use catalog::*;
pub use channel::*;
pub use health::*;
pub use lifecycle::*;
pub use messaging::*;
pub use observe::*;
pub use workflow::*;
