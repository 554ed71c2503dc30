mod publisher;

pub use publisher::{OrderPublisher, PublishError};
