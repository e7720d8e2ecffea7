// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export database components

pub mod group_repository;
pub mod post_repository;
pub mod profile_repository;
pub mod relationship_repository;

pub use group_repository::*;
pub use post_repository::*;
pub use profile_repository::ProfileRepository;
pub use relationship_repository::*;
