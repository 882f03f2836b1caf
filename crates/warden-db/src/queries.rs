//! Database query functions organized by domain.

pub mod bans;
pub mod members;
pub mod sightings;
