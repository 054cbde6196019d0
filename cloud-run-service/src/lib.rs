pub mod config;
pub mod domain;
pub mod handlers;
pub mod startup;
