//! casefetch - Delhi High Court case-status retrieval.
//!
//! Drives a real browser through the court's case-status search form,
//! extracts the result page into a [`models::CaseRecord`], and serves
//! searches as background jobs that clients poll over HTTP.

pub mod cli;
pub mod config;
pub mod export;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod server;
pub mod utils;
