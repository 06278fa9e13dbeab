//! # Engine Module
//!
//! Internal storage engine implementation.
//!
//! This module contains all core building blocks such as:
//! - Block allocation
//! - Component registration and layout
//! - Entity templates and collections
//! - Component groups and system dispatch
//! - Context orchestration
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod component;
pub mod allocator;
pub mod layout;
pub mod template;
pub mod entity;
pub mod group;
pub mod systems;
pub mod context;
