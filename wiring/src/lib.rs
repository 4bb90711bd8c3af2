//! Wiring - railway station wiring documentation store
//!
//! Projects hold records of eight fixed kinds, edited through a REST API and
//! moved in and out as multi-sheet spreadsheets.

pub mod api;
pub mod config;
pub mod convert;
pub mod entity;
pub mod export;
pub mod import;
pub mod projects;
pub mod schema;
pub mod sheet;
pub mod store;
