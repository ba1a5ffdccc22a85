//! Command implementations for the CLI
//!
//! - start: Run the renewal loop
//! - test: Test configuration validity
//! - config: Configuration display
//! - price: One-shot renewal and price lookup

pub mod config;
pub mod price;
pub mod start;
pub mod test;
