//! Library half of the `chemsor` binary: logging setup and stage orchestration.

pub mod logging;
pub mod pipeline;
