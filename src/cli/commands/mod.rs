//! Command implementations.

pub mod db;
pub mod search;
pub mod serve;
