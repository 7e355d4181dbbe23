// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::analyzer::Analyzer;
use crate::lexer::Source;
use crate::options::EngineOptions;
use crate::schema::VariableSchema;
use crate::segments::{Segment, SegmentKind, Segmenter};
use crate::statement::Statement;

use anyhow::Result;

/// The variable extraction engine.
///
/// An engine only holds its options. Every call runs a fresh pass, so one
/// engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: EngineOptions,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    /// Free variables of `text` and their shapes. Never fails; malformed
    /// markup yields a partial schema.
    pub fn extract(&self, text: &str) -> VariableSchema {
        let source = Source::new("<template>".to_string(), text.to_string());
        self.extract_source(&source)
    }

    pub fn extract_source(&self, source: &Source) -> VariableSchema {
        let segments = self.segments(source);
        Analyzer::new(&self.options).analyze(&segments)
    }

    /// Extracts from the one-based, inclusive line range `first..=last` of
    /// `source` only.
    pub fn extract_lines(
        &self,
        source: &Source,
        first: usize,
        last: usize,
    ) -> Result<VariableSchema> {
        let text = source.slice_lines(first, last)?;
        let part = Source::new(
            format!("{}:{first}-{last}", source.file()),
            text.to_string(),
        );
        Ok(self.extract_source(&part))
    }

    pub fn segments<'source>(&self, source: &'source Source) -> Vec<Segment<'source>> {
        Segmenter::new(source, self.options.raw_blocks).segments()
    }

    /// Parsed form of every statement in `source`, for inspection.
    pub fn statements<'source>(&self, source: &'source Source) -> Vec<Statement<'source>> {
        self.segments(source)
            .into_iter()
            .filter(|s| s.kind == SegmentKind::Statement)
            .map(|s| Statement::parse(s.inner))
            .collect()
    }
}

/// Extracts the variable schema of `text` with default options.
pub fn extract(text: &str) -> VariableSchema {
    Engine::new().extract(text)
}
