//! Corpus chunking.

/// A unit of source case text, immutable once indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position in the corpus; doubles as the stable tie-break order.
    pub id: usize,
    pub text: String,
}

/// Configuration for the character-window splitter.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Window size in characters.
    pub size: usize,
    /// Overlap between consecutive windows, in characters.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            size: 120,
            overlap: 40,
        }
    }
}

/// Split text into overlapping character windows.
///
/// Operates on chars, so multi-byte text never splits inside a code point.
/// An overlap >= size is clamped so the window always advances.
pub fn chunk_text(content: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() || config.size == 0 {
        return Vec::new();
    }

    let step = config.size.saturating_sub(config.overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.size).min(chars.len());
        let text: String = chars[start..end].iter().collect();
        chunks.push(Chunk {
            id: chunks.len(),
            text,
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
