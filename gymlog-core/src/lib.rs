pub mod config;
pub mod curate;
pub mod db;
pub mod errors;
pub mod loader;
pub mod logging;
pub mod parser;
pub mod workbook;

pub use errors::{GymError, Result};

#[cfg(test)]
mod test_support;
