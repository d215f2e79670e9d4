//! Taskboard: kanban board client with optimistic sync against a hosted store.

pub mod board;
pub mod comments;
pub mod config;
pub mod coordinator;
pub mod detail;
pub mod render;
pub mod store;
