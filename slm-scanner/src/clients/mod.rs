//! HTTP clients for the external collaborators

pub mod announcer;
pub mod assistant;
pub mod search;
pub mod todoist;

pub use announcer::{Announcer, HttpAnnouncer, LogAnnouncer};
pub use assistant::ChatCompletionClient;
pub use search::{GoogleSearchClient, SearchCredentials};
pub use todoist::TodoistClient;

/// User-Agent sent with every outgoing request
pub(crate) const USER_AGENT: &str = concat!("shopping-list-manager/", env!("CARGO_PKG_VERSION"));
