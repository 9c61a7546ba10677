//! Route handlers organized by resource

pub mod groups;
pub mod health;
pub mod students;
