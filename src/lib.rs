pub mod aggregate;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod results;
pub mod runner;
