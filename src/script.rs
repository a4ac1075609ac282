//! Structured script input.
//!
//! Loading files, joining continuation lines and computing indentation are
//! the job of an external loader; the resolver consumes the resulting tree.

use std::fmt;

/// A logical script line with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLine {
    pub content: String,
    pub source: String,
    pub line: usize,
}

impl SourceLine {
    pub fn new(source: impl Into<String>, line: usize, content: impl Into<String>) -> Self {
        Self { content: content.into(), source: source.into(), line }
    }
}

impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, line {})", self.content.trim(), self.source, self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileElement {
    Line(SourceLine),
    Section(FileSection),
}

/// A header line ending in `:` together with its indented body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection {
    line: SourceLine,
    elements: Vec<FileElement>,
}

impl FileSection {
    pub fn new(line: SourceLine, elements: Vec<FileElement>) -> Self {
        Self { line, elements }
    }

    /// Header text without its trailing `:`.
    pub fn header(&self) -> &str {
        let content = self.line.content.trim();
        content.strip_suffix(':').unwrap_or(content).trim_end()
    }

    pub fn line(&self) -> &SourceLine {
        &self.line
    }

    pub fn elements(&self) -> &[FileElement] {
        &self.elements
    }
}
