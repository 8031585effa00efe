//! Per-resource sync tasks

pub mod assets;
pub mod components;
pub mod custom_fields;
pub mod libraries;
pub mod roles;
pub mod simple;
pub mod workflows;
