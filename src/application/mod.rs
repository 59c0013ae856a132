//! Application services layer.

pub mod authors;
pub mod books;
pub mod columns;
pub mod error;
pub mod pagination;
pub mod repos;
