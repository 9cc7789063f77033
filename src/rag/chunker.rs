use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A window of normalized text.
///
/// `start` and `end` are char offsets into the normalized text. `end` is
/// `start + chunk_size` even when the text ends earlier; consumers clamp.
/// `page` is `None` when the text carried no page boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub page: Option<u32>,
}

/// Collapse every whitespace run (including line breaks) into one space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Where a page begins in the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub page: u32,
    pub start: usize,
}

/// Normalized text of a whole document together with its page layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub text: String,
    pub pages: Vec<PageSpan>,
}

impl NormalizedDocument {
    /// Normalize each page and join the non-empty ones with a single space.
    /// Page numbers are 1-based and count empty pages too.
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::new();
        let mut char_len = 0;

        for (i, page) in pages.iter().enumerate() {
            let normalized = normalize_text(page.as_ref());
            if normalized.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
                char_len += 1;
            }
            spans.push(PageSpan {
                page: i as u32 + 1,
                start: char_len,
            });
            char_len += normalized.chars().count();
            text.push_str(&normalized);
        }

        Self { text, pages: spans }
    }

    /// Page containing the char at `offset`.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let idx = self.pages.partition_point(|span| span.start <= offset);
        idx.checked_sub(1).map(|i| self.pages[i].page)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk_size must be greater than 0".into(),
            ));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split bare text into windows. Chunks are page-unaware.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.windows(text, |_| None)
    }

    /// Split a normalized document, tagging each chunk with the page its
    /// `start` falls on.
    pub fn chunk_document(&self, doc: &NormalizedDocument) -> Vec<Chunk> {
        self.windows(&doc.text, |start| doc.page_at(start))
    }

    fn windows<F>(&self, text: &str, page_of: F) -> Vec<Chunk>
    where
        F: Fn(usize) -> Option<u32>,
    {
        // Byte position of every char, plus the end of the string, so
        // windows never split a UTF-8 sequence.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;

        let mut chunks = Vec::with_capacity(len.div_ceil(self.step()));
        let mut start = 0;

        while start < len {
            let end = start.saturating_add(self.chunk_size);
            chunks.push(Chunk {
                text: text[bounds[start]..bounds[end.min(len)]].to_string(),
                start,
                end,
                page: page_of(start),
            });
            start = start.saturating_add(self.step());
        }

        chunks
    }
}

/// One-shot form of [`Chunker::chunk`].
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(text))
}
