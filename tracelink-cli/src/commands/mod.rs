//! Command handlers -- one module per subcommand

pub mod config;
pub mod normalize;
pub mod resolve;
