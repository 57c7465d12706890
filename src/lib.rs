// rigmatch - decides whether a concrete test Setup can play an abstract
// Scenario, and which devices take which roles.

pub mod core;
pub mod report;
