pub mod api;
pub mod tasks;

pub use api::{HttpMessagingApi, MessagingApi};
pub use tasks::BackgroundTasks;
