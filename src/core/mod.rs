// src/core/mod.rs

pub mod argument;
pub mod builder;
pub mod caller;
pub mod dispatch;
pub mod execution;
pub mod flags;
pub mod messages;
pub mod registry;
pub mod requirement;
