//! A declarative command argument-resolution and dispatch engine.
//!
//! An embedder describes a command handler's expected parameters with a
//! [`CommandDescriptor`](models::CommandDescriptor), builds a validated
//! [`CommandModel`](core::builder::CommandModel) once at registration time,
//! and wraps it in a [`CommandDispatcher`](core::dispatch::CommandDispatcher)
//! that converts raw text tokens into typed values, enforces requirements,
//! and invokes the handler exactly once per matching input. Any user-input
//! problem emits a categorized, user-facing message instead.

pub mod constants;
pub mod core;
pub mod models;
