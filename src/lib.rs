//! # author-tagger
//!
//! Maintains the `@author` tags of the public Java types in a project,
//! driven by a line-oriented `.authors` rule script.
//!
//! ## Architecture
//!
//! - **filter**: Compilation of type name and author filters into regexes
//! - **record**: Per-file records and the record collection the rules act on
//! - **scan**: Discovery of `.java` files below the source root
//! - **analyze**: Package, public type, existing authors and anchor line of a file
//! - **rules**: Interpreter for the `.authors` rule script
//! - **rewrite**: Author block rewriting with backup, test and restore policies
//! - **diff**: Line diff between the pre- and post-image of a rewritten file
//! - **report**: Run report rendering (HTML, JSON, text)
//! - **pipeline**: One complete tagging run
//! - **config** / **cli** / **logging**: Run configuration and its sources

pub mod analyze;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod rewrite;
pub mod rules;
pub mod scan;

pub use error::{Result, TaggerError};
