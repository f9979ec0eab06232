pub mod config;
pub mod grind;
pub mod invite;
pub mod message;
pub mod task;
pub mod user;
