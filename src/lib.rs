//! Library catalog service: a REST API over authors and books with a
//! read-through query cache in front of SQLite.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
