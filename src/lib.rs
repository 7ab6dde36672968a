pub mod aws;
pub mod config;
pub mod decompose;
pub mod display;
pub mod errors;
pub mod logging;
pub mod platform;
pub mod poll;
pub mod report;
pub mod sampler;
pub mod traces;
pub mod types;
