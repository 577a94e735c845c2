//! Data structures shared by the parser, filters and formatters.

pub mod attributes;
pub mod network;
pub mod record;

pub use attributes::*;
pub use network::*;
pub use record::*;
