pub mod csv;
pub mod mood;
pub mod roles;
pub mod roster;
