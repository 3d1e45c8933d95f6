// Library root: configuration, player pool loading and the run pipeline,
// exposed so the binary and integration tests share one API.

pub mod config;
pub mod pool;
pub mod report;
pub mod run;
