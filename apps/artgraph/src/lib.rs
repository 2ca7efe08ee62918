//! # artgraph
//!
//! Command-line front end for `artgraph-core`. The binary in `main.rs` only
//! sets up logging and hands the parsed arguments to [`cli::execute`].

pub mod cli;
pub mod config;
