// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod group;
pub mod post;
pub mod profile;
pub mod relationship;
pub mod student;

#[cfg(test)]
pub mod fixtures;

pub use group::*;
pub use post::*;
pub use profile::*;
pub use relationship::*;
pub use student::*;
