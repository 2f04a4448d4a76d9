//! Paragraph and sentence aware text chunking with overlap.
//!
//! Text is split into units (headings are atomic, paragraphs split into
//! sentence-like pieces, short pieces merged forward), then units are packed
//! left to right into chunks of at most the target size. Each new chunk is
//! seeded with the trailing overlap characters of the previous one so
//! context survives the boundary.

/// Sentence fragments shorter than this merge with following units.
const MERGE_THRESHOLD: usize = 200;

/// Chunker configuration, sizes in characters.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target chunk size (default: 2800, roughly 700 tokens).
    pub chunk_size: usize,
    /// Overlap carried between adjacent chunks (default: 400).
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2800,
            chunk_overlap: 400,
        }
    }
}

/// One chunk with its position in the unit sequence.
///
/// `start`/`end` are indices into the internal unit sequence, not character
/// offsets; they only need to be stable for identical input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub start: usize,
    pub end: usize,
}

/// Split `text` into ordered, non-empty chunks.
#[must_use]
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let units = split_units(text);
    if units.is_empty() {
        if text.trim().is_empty() {
            return Vec::new();
        }
        return char_windows(text, config.chunk_size, config.chunk_overlap);
    }
    pack_units(&units, config.chunk_size, config.chunk_overlap)
}

/// Advisory section label for a chunk: slide markers for slide-deck
/// extractions, leading H1 text for markdown.
#[must_use]
pub fn infer_section(path: &str, content: &str) -> Option<String> {
    if path.to_ascii_lowercase().ends_with(".pptx")
        && let Some(label) = slide_label(content)
    {
        return Some(label);
    }

    let trimmed = content.trim();
    if trimmed.starts_with("# ") {
        let line = trimmed.lines().next()?;
        let title = line.trim_start_matches('#').trim_start();
        return Some(title.chars().take(80).collect());
    }
    None
}

/// Match a leading `- ppt/slides/slideN.xml` marker line.
fn slide_label(content: &str) -> Option<String> {
    let rest = content.strip_prefix('-')?.trim_start();
    let lower = rest.to_ascii_lowercase();
    let digits_at = "ppt/slides/slide".len();
    if !lower.starts_with("ppt/slides/slide") {
        return None;
    }
    let digits: String = lower[digits_at..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() || !lower[digits_at + digits.len()..].starts_with(".xml") {
        return None;
    }
    Some(format!("slide:{digits}"))
}

fn split_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    for paragraph in split_paragraphs(text) {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_heading(trimmed) {
            units.push(trimmed.to_owned());
            continue;
        }

        // Greedily merge short sentences to avoid fragment explosion.
        let mut acc = String::new();
        for sentence in split_sentences(trimmed) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let merged_len = if acc.is_empty() {
                char_len(sentence)
            } else {
                char_len(&acc) + 1 + char_len(sentence)
            };
            if merged_len < MERGE_THRESHOLD {
                if acc.is_empty() {
                    acc.push_str(sentence);
                } else {
                    acc.push(' ');
                    acc.push_str(sentence);
                }
            } else {
                if !acc.is_empty() {
                    units.push(std::mem::take(&mut acc));
                }
                acc.push_str(sentence);
            }
        }
        if !acc.is_empty() {
            units.push(acc);
        }
    }
    units
}

/// Paragraphs are separated by blank (whitespace-only) lines.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Lines starting with one to six `#` characters and whitespace are atomic.
fn is_heading(paragraph: &str) -> bool {
    let hashes = paragraph.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes)
        && paragraph
            .chars()
            .nth(hashes)
            .is_some_and(char::is_whitespace)
}

/// Break after `.`, `!`, `?` followed by whitespace and an uppercase letter
/// or digit; the separating whitespace is dropped.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < chars.len() {
        current.push(chars[i]);
        if matches!(chars[i], '.' | '!' | '?') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j > i + 1
                && j < chars.len()
                && (chars[j].is_uppercase() || chars[j].is_ascii_digit())
            {
                sentences.push(std::mem::take(&mut current));
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

fn pack_units(units: &[String], size: usize, overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut buf: Vec<String> = Vec::new();
    let mut start_idx = 0usize;

    for (i, unit) in units.iter().enumerate() {
        let candidate_len =
            buf.iter().map(|u| char_len(u)).sum::<usize>() + buf.len() + char_len(unit);
        if candidate_len > size && !buf.is_empty() {
            let joined = buf.join("\n");
            chunks.push(Chunk {
                content: joined.clone(),
                start: start_idx,
                end: i - 1,
            });
            let tail = tail_chars(&joined, overlap);
            buf.clear();
            if !tail.is_empty() {
                buf.push(tail);
            }
            buf.push(unit.clone());
            start_idx = i.saturating_sub(1);
        } else {
            buf.push(unit.clone());
        }
    }

    if !buf.is_empty() {
        chunks.push(Chunk {
            content: buf.join("\n"),
            start: start_idx,
            end: units.len() - 1,
        });
    }
    chunks
}

/// Fixed-size character windows for text the unit splitter cannot handle.
/// The step is clamped positive so overlap can never stall progress.
fn char_windows(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size.max(1)).min(chars.len());
        chunks.push(Chunk {
            content: chars[start..end].iter().collect(),
            start,
            end,
        });
        start += step;
    }
    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn tail_chars(text: &str, n: usize) -> String {
    let len = char_len(text);
    if len <= n {
        return text.to_owned();
    }
    text.chars().skip(len - n).collect()
}
