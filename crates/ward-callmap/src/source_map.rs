//! Byte-offset to source-position resolution.
//!
//! Preprocessed C carries GNU line markers (`# 12 "foo.c"`, possibly with
//! trailing flags) that re-anchor the following line to a position in the
//! original file. The source map scans the preprocessed text once,
//! records the anchor of every physical line, and resolves byte offsets by
//! binary search.

use ward_core::Pos;

/// Anchor for one physical line of the preprocessed source.
#[derive(Debug, Clone)]
struct LineAnchor {
    /// Byte offset where the line starts.
    start: usize,
    /// Original file this line belongs to.
    file: String,
    /// 1-based line number in that file.
    line: u32,
}

/// Maps byte offsets of one translation unit back to `file:line`.
#[derive(Debug, Clone)]
pub struct SourceMap {
    anchors: Vec<LineAnchor>,
    fallback: String,
}

impl SourceMap {
    /// Build the map for one unit. `path` is the position reported for
    /// input that carries no line markers (and for offsets before the
    /// first marker).
    pub fn new(path: &str, source: &str) -> Self {
        let mut anchors = Vec::new();
        let mut file = path.to_string();
        let mut line: u32 = 1;

        let mut offset = 0;
        for text in source.split_inclusive('\n') {
            match parse_line_marker(text) {
                Some((marked_line, marked_file)) => {
                    line = marked_line;
                    file = marked_file;
                }
                None => {
                    anchors.push(LineAnchor {
                        start: offset,
                        file: file.clone(),
                        line,
                    });
                    line = line.saturating_add(1);
                }
            }
            offset += text.len();
        }

        Self {
            anchors,
            fallback: path.to_string(),
        }
    }

    /// Resolve a byte offset to its original position.
    pub fn resolve(&self, offset: usize) -> Pos {
        let idx = match self
            .anchors
            .binary_search_by(|anchor| anchor.start.cmp(&offset))
        {
            Ok(idx) => idx,
            Err(0) => return Pos::new(self.fallback.clone(), 1),
            Err(idx) => idx - 1,
        };
        let anchor = &self.anchors[idx];
        Pos::new(anchor.file.clone(), anchor.line)
    }
}

/// Parse `# <line> "<file>" <flags...>`. Returns `None` for ordinary
/// lines and for other `#` directives (e.g. `#pragma`).
fn parse_line_marker(text: &str) -> Option<(u32, String)> {
    let rest = text.trim_start().strip_prefix('#')?;
    let rest = rest.trim_start();
    if !rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let line: u32 = rest[..digits_end].parse().ok()?;

    let rest = rest[digits_end..].trim_start();
    let rest = rest.strip_prefix('"')?;
    let file_end = rest.find('"')?;
    Some((line, rest[..file_end].to_string()))
}
