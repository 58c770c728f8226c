//! CLI command implementations

pub mod build;
pub mod config;
pub mod env;
pub mod extract;
pub mod list;
pub mod triplet;

pub use build::execute as build;
pub use config::execute as config;
pub use env::execute as env;
pub use extract::execute as extract;
pub use list::execute as list;
pub use triplet::execute as triplet;
