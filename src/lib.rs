pub mod app;
pub mod auth;
pub mod budgets;
pub mod categories;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod guard;
#[cfg(test)]
mod memory;
pub mod pagination;
pub mod purchases;
pub mod response;
pub mod state;
pub mod validation;
