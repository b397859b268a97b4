pub mod ai;
pub mod appointments;
pub mod auth;
pub mod conversation;
pub mod knowledge_base;
pub mod messaging;
pub mod notifications;
pub mod registry;
pub mod sheets;
pub mod tools;
