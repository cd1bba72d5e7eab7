pub mod cli;
pub mod config;
pub mod errors;
pub mod external;
pub mod git;
pub mod logging;
pub mod review;
