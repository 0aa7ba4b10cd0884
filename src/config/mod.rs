//! JSON configuration of the demo tooling.

pub mod sheet;
