pub mod error;
pub mod mailbox;
pub mod message;
pub mod traits;
pub mod types;

pub use error::BotError;
pub use mailbox::{Mailbox, SessionHandle};
pub use message::SessionMessage;
pub use traits::{AudioSink, CatalogClient, Notifier, SearchBackend};
pub use types::{CatalogEntry, QueueSnapshot, Track};
