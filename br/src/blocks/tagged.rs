//! Tagged-text block sources
//!
//! Blocks are delimited inline with paired markers:
//!
//! ```text
//! <!intro>
//! Shared introduction paragraph.
//! <!/intro>
//! ```
//!
//! Validation is a pure pass over the marker positions that returns every
//! problem it finds; extraction only happens when that list is empty.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{BlockMap, NAME_PATTERN};

static OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("<!{NAME_PATTERN}>")).expect("open marker regex is valid"));

static CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("<!/{NAME_PATTERN}>")).expect("close marker regex is valid"));

/// A single `<!name>` or `<!/name>` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Block name inside the marker
    pub name: String,
    /// Byte offset of the `<` that starts the marker
    pub offset: usize,
    /// Byte offset just past the closing `>`
    pub end: usize,
    /// 1-based line of the marker
    pub line: usize,
    /// 1-based column (in characters) of the marker
    pub column: usize,
}

impl Marker {
    fn at(text: &str, name: &str, offset: usize, end: usize) -> Self {
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = text[line_start..offset].chars().count() + 1;
        Self {
            name: name.to_string(),
            offset,
            end,
            line,
            column,
        }
    }

    fn location(&self) -> String {
        format!("{}:{} (offset {})", self.line, self.column, self.offset)
    }
}

/// A structural problem found in a tagged-text source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagProblem {
    /// An open marker whose name never appears in a close marker
    Unclosed(Marker),
    /// A close marker whose name never appears in an open marker
    Unopened(Marker),
    /// Different number of open and close markers
    CountMismatch { opens: usize, closes: usize },
    /// The i-th open and i-th close carry different names
    Mismatch { open: Marker, close: Marker },
    /// The i-th close sits before the i-th open
    CloseBeforeOpen { open: Marker, close: Marker },
    /// A block opens before the previous block has closed
    Interleaved { previous_close: Marker, open: Marker },
}

impl fmt::Display for TagProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagProblem::Unclosed(m) => write!(f, "<!{}> opened at {} but not closed", m.name, m.location()),
            TagProblem::Unopened(m) => write!(f, "<!/{}> closed at {} but not opened", m.name, m.location()),
            TagProblem::CountMismatch { opens, closes } => write!(
                f,
                "number of opening ({}) and closing ({}) tags does not match",
                opens, closes
            ),
            TagProblem::Mismatch { open, close } => write!(
                f,
                "tag mismatch: <!{}> at {} closed by <!/{}> at {}",
                open.name,
                open.location(),
                close.name,
                close.location()
            ),
            TagProblem::CloseBeforeOpen { open, close } => write!(
                f,
                "<!/{}> at {} appears before its <!{}> at {}",
                close.name,
                close.location(),
                open.name,
                open.location()
            ),
            TagProblem::Interleaved { previous_close, open } => write!(
                f,
                "<!{}> at {} opens before <!/{}> at {} closes",
                open.name,
                open.location(),
                previous_close.name,
                previous_close.location()
            ),
        }
    }
}

/// Collect all open and close markers, left to right
pub fn scan(text: &str) -> (Vec<Marker>, Vec<Marker>) {
    // "<!" + name + ">" and "<!/" + name + ">"
    let opens = OPEN_RE
        .find_iter(text)
        .map(|m| Marker::at(text, &m.as_str()[2..m.len() - 1], m.start(), m.end()))
        .collect::<Vec<_>>();
    let closes = CLOSE_RE
        .find_iter(text)
        .map(|m| Marker::at(text, &m.as_str()[3..m.len() - 1], m.start(), m.end()))
        .collect::<Vec<_>>();
    debug!(opens = opens.len(), closes = closes.len(), "tagged::scan: markers found");
    (opens, closes)
}

/// Check marker structure and return every problem found
///
/// Pairs must appear strictly one after another: a close may not precede its
/// open, and a block may not open before the previous one has closed. So
/// `<!a><!b><!/a><!/b>` is rejected rather than giving `a` the text `<!b>`.
/// An empty result means the source can be extracted.
pub fn validate(opens: &[Marker], closes: &[Marker]) -> Vec<TagProblem> {
    let mut problems = Vec::new();

    for open in opens {
        if !closes.iter().any(|c| c.name == open.name) {
            problems.push(TagProblem::Unclosed(open.clone()));
        }
    }

    for close in closes {
        if !opens.iter().any(|o| o.name == close.name) {
            problems.push(TagProblem::Unopened(close.clone()));
        }
    }

    if opens.len() != closes.len() {
        problems.push(TagProblem::CountMismatch {
            opens: opens.len(),
            closes: closes.len(),
        });
        return problems;
    }

    for (i, (open, close)) in opens.iter().zip(closes).enumerate() {
        if open.name != close.name {
            problems.push(TagProblem::Mismatch {
                open: open.clone(),
                close: close.clone(),
            });
            continue;
        }
        if close.offset < open.end {
            problems.push(TagProblem::CloseBeforeOpen {
                open: open.clone(),
                close: close.clone(),
            });
            continue;
        }
        if i > 0 && open.offset < closes[i - 1].end {
            problems.push(TagProblem::Interleaved {
                previous_close: closes[i - 1].clone(),
                open: open.clone(),
            });
        }
    }

    problems
}

/// Parse a tagged-text source into blocks
///
/// Returns the full problem list if the source is malformed; no blocks are
/// extracted in that case. Content is trimmed and later duplicates win.
pub fn parse(text: &str) -> Result<BlockMap, Vec<TagProblem>> {
    let (opens, closes) = scan(text);
    let problems = validate(&opens, &closes);
    if !problems.is_empty() {
        debug!(count = problems.len(), "tagged::parse: validation failed");
        return Err(problems);
    }

    let mut blocks = BlockMap::new();
    for (open, close) in opens.iter().zip(&closes) {
        let content = text[open.end..close.offset].trim().to_string();
        debug!(name = %open.name, len = content.len(), "tagged::parse: extracted block");
        blocks.insert(open.name.clone(), content);
    }
    Ok(blocks)
}
