// Library crate - exports wire models, the service client, and blotter logic

pub mod blotter;
pub mod bulk;
pub mod entry;
pub mod equities;
pub mod service;

// Re-export commonly used types
pub use equities::models::*;
pub use equities::EquitiesClient;
pub use service::PositionService;
