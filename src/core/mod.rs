pub mod dispatcher;
pub mod engine;
pub mod filter;
pub mod geo;
pub mod schedule;
pub mod search;
