// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Errors raised when selecting part of a template by line numbers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid line range {first}..={last}: lines are numbered from 1 and must be ascending")]
    InvalidRange { first: usize, last: usize },

    #[error("line {line} is past the end of `{file}` ({count} lines)")]
    LineOutOfBounds {
        file: String,
        line: usize,
        count: usize,
    },
}
