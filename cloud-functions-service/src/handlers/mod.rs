pub mod function;
pub mod health;
