//! CLI Commands

pub mod servers;
pub mod validate;
