//! Outbound messaging and operator alerting.

mod messaging;

pub use messaging::{MessagingClient, MessagingClientConfig};
