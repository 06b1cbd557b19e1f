//! Subcommand implementations.
//!
//! Pipeline stages (`validate`, `reconcile`) return the summary line for a
//! passing verdict; `main` turns errors into the failing one.

pub mod reconcile;
pub mod render;
pub mod validate;
