// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod analyzer;
mod builtins;
mod engine;
mod error;
mod expr;
mod lexer;
mod options;
mod schema;
mod scope;
mod segments;
mod shape;
mod statement;

pub use engine::{extract, Engine};
pub use error::SourceError;
pub use lexer::Source;
pub use options::{EngineOptions, RawBlocks};
pub use schema::{Describe, VariableSchema};
pub use shape::{ScalarType, ShapeNode};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::expr::*;
    pub use crate::lexer::*;
    pub use crate::scope::*;
    pub use crate::segments::*;
    pub use crate::statement::*;
}

#[cfg(test)]
mod tests;
