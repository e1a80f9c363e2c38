//! Library side of the `cda-import` binary.

pub mod config;
pub mod logging;
pub mod run;
pub mod summary;
