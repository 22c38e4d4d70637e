//! Removal of privacy decorators from annotated contract source
//!
//! Decorated contracts mark private state with the keywords `known`, `unknown`, `secret` and
//! `reinitialisable`. A regular contract compiler rejects them, so they are stripped before
//! compilation and their positions recorded so a later pass can put them back.
//!
//! Every line is normalized before any offset is taken, so the recorded offsets stay valid
//! against the normalized buffer and the stripped output.
//!
//! # Examples
//!
//! ```rust
//! use shroud_compiler::lexer::{redecorate, strip_decorators, Decorator};
//!
//! let source = "contract Token {\n    secret uint256 supply;\n}";
//! let stripped = strip_decorators(source).unwrap();
//!
//! assert_eq!(stripped.text, "contract Token {\r\nuint256 supply;\r\n}");
//! assert_eq!(stripped.redecorations.len(), 1);
//! assert_eq!(stripped.redecorations[0].decorator, Decorator::Secret);
//! assert_eq!(
//!     redecorate(&stripped.text, &stripped.redecorations),
//!     "contract Token {\r\nsecret uint256 supply;\r\n}"
//! );
//! ```

use crate::error::{CompilerError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Terminator used to join normalized lines.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Declaration keywords that may never be followed by a decorator.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "contract",
    "function",
    "struct",
    "enum",
    "bool",
    "fixed",
    "address",
    r"uint[0-9]{0,3}",
    r"int[0-9]{0,3}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decorator {
    Known,
    Unknown,
    Secret,
    Reinitialisable,
}

impl Decorator {
    pub const ALL: [Decorator; 4] =
        [Decorator::Known, Decorator::Unknown, Decorator::Secret, Decorator::Reinitialisable];

    pub fn as_str(&self) -> &'static str {
        match self {
            Decorator::Known => "known",
            Decorator::Unknown => "unknown",
            Decorator::Secret => "secret",
            Decorator::Reinitialisable => "reinitialisable",
        }
    }
}

impl fmt::Display for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decorator {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self> {
        Decorator::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CompilerError::InvalidDecorator(s.to_string()))
    }
}

/// Where a stripped decorator has to be reinserted, as a byte offset into the stripped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redecoration {
    pub decorator: Decorator,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedSource {
    pub text: String,
    pub redecorations: Vec<Redecoration>,
}

/// Keyword tables for one source buffer.
///
/// Built once per buffer before scanning and never modified afterwards: the collision table
/// holds the fixed structural keywords plus every struct name the buffer declares.
#[derive(Debug, Clone)]
pub struct DecoratorLexer {
    decorators: Regex,
    collisions: Regex,
}

impl DecoratorLexer {
    pub fn for_source(buffer: &str) -> Result<Self> {
        let decorator_group =
            Decorator::ALL.iter().map(Decorator::as_str).collect::<Vec<_>>().join("|");
        let decorators = Regex::new(&format!(r"(?-u:\b)(?:{})(?-u:\b)", decorator_group))?;

        let mut structural: Vec<String> =
            STRUCTURAL_KEYWORDS.iter().map(|k| k.to_string()).collect();
        structural.extend(declared_struct_names(buffer)?.iter().map(|name| regex::escape(name)));

        let collisions = Regex::new(&format!(
            r"(?-u:\b)(?:{}) (?:{})(?-u:\b)",
            structural.join("|"),
            decorator_group
        ))?;

        Ok(Self { decorators, collisions })
    }

    /// Fails on the first declaration that names something after a decorator.
    pub fn check_collisions(&self, buffer: &str) -> Result<()> {
        match self.collisions.find(buffer) {
            Some(found) => Err(CompilerError::ReservedKeyword {
                text: found.as_str().to_string(),
                offset: found.start(),
            }),
            None => Ok(()),
        }
    }

    /// Strips every decorator outside comments from a normalized buffer.
    pub fn strip(&self, buffer: &str) -> Result<StrippedSource> {
        self.check_collisions(buffer)?;

        let mut text = buffer.to_string();
        let mut redecorations = Vec::new();
        let mut removed = 0;

        // find_iter yields non-overlapping matches in ascending offset order
        for found in self.decorators.find_iter(buffer) {
            if in_comment(buffer, found.start()) {
                debug!(
                    keyword = found.as_str(),
                    offset = found.start(),
                    "Skipping commented decorator"
                );
                continue;
            }

            let decorator: Decorator = found.as_str().parse()?;
            let offset = found.start() - removed;
            let keyword_end = offset + found.len();
            let trailing = text[keyword_end..].chars().next().map_or(0, char::len_utf8);

            text.replace_range(offset..keyword_end + trailing, "");
            removed += found.len() + trailing;
            redecorations.push(Redecoration { decorator, offset });
        }

        Ok(StrippedSource { text, redecorations })
    }
}

fn declared_struct_names(buffer: &str) -> Result<Vec<String>> {
    let declaration = Regex::new(r"(?-u:\b)struct ([A-Za-z_$][A-Za-z0-9_$]*)")?;
    let mut names: Vec<String> =
        declaration.captures_iter(buffer).map(|caps| caps[1].to_string()).collect();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Collapses whitespace runs to one space and drops the leading space.
///
/// A byte order mark counts as whitespace.
fn tidy(line: &str) -> String {
    let mut tidied = String::with_capacity(line.len());
    let mut in_space = false;

    for ch in line.chars() {
        if ch.is_whitespace() || ch == '\u{feff}' {
            if !in_space {
                tidied.push(' ');
            }
            in_space = true;
        } else {
            tidied.push(ch);
            in_space = false;
        }
    }

    if tidied.starts_with(' ') {
        tidied.remove(0);
    }
    tidied
}

/// Normalizes every line of `source` and joins them with [`LINE_TERMINATOR`].
pub fn normalize(source: &str) -> String {
    source
        .split('\n')
        .map(|line| tidy(line.strip_suffix('\r').unwrap_or(line)))
        .collect::<Vec<_>>()
        .join(LINE_TERMINATOR)
}

/// Whether `position` lies inside a comment of `buffer`.
///
/// Rescans from the start of the buffer on every call and carries no state between calls.
/// An unterminated block comment extends to the end of the buffer, and a `/*` opened inside
/// a line comment still starts a block comment.
pub fn in_comment(buffer: &str, position: usize) -> bool {
    let bytes = buffer.as_bytes();
    let mut comment = false;
    let mut block = false;

    for ii in 1..=position {
        let pair = (bytes.get(ii - 1).copied(), bytes.get(ii).copied());

        if block {
            if pair == (Some(b'*'), Some(b'/')) {
                comment = false;
                block = false;
            }
            continue;
        }

        match pair {
            (Some(b'/'), Some(b'/')) => comment = true,
            (Some(b'/'), Some(b'*')) => {
                comment = true;
                block = true;
            }
            _ => {}
        }

        let is_newline = |byte: Option<u8>| matches!(byte, Some(b'\r') | Some(b'\n'));
        if is_newline(pair.0) || is_newline(pair.1) {
            comment = false;
        }
    }

    comment
}

/// Normalizes `source` and strips its decorators.
pub fn strip_decorators(source: &str) -> Result<StrippedSource> {
    let buffer = normalize(source);
    DecoratorLexer::for_source(&buffer)?.strip(&buffer)
}

/// Reinserts decorators, each followed by one space, in ascending offset order.
///
/// Records pointing inside a multi-byte character are skipped.
pub fn redecorate(stripped: &str, redecorations: &[Redecoration]) -> String {
    let mut text = stripped.to_string();
    let mut inserted = 0;

    for redecoration in redecorations {
        let at = (redecoration.offset + inserted).min(text.len());
        if !text.is_char_boundary(at) {
            warn!(
                decorator = %redecoration.decorator,
                offset = redecoration.offset,
                "Skipping redecoration off a character boundary"
            );
            continue;
        }
        let keyword = format!("{} ", redecoration.decorator);
        text.insert_str(at, &keyword);
        inserted += keyword.len();
    }

    text
}

/// Where [`strip_file`] writes its outputs.
#[derive(Debug, Clone)]
pub struct StripOptions {
    pub work_dir: PathBuf,
    /// Also persist the redecoration records as JSON
    pub write_records: bool,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self { work_dir: PathBuf::from("parse"), write_records: true }
    }
}

#[derive(Debug, Clone)]
pub struct StrippedFile {
    pub source: StrippedSource,
    pub stripped_path: PathBuf,
    pub original_copy_path: PathBuf,
    pub records_path: Option<PathBuf>,
}

/// Strips a decorated file and persists the results into the working directory.
///
/// Writes `<name>_dedecorated.sol`, a copy of the input and, when enabled,
/// `<name>_redecorate.json`. Nothing is written if the source reuses a decorator as a name.
pub fn strip_file(input: &Path, options: &StripOptions) -> Result<StrippedFile> {
    info!(path = %input.display(), "Parsing decorated file");

    let file_name = input
        .file_name()
        .ok_or_else(|| CompilerError::InvalidPath(input.display().to_string()))?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CompilerError::InvalidPath(input.display().to_string()))?;

    let raw = fs::read_to_string(input)?;
    let source = strip_decorators(&raw)?;

    fs::create_dir_all(&options.work_dir)?;

    let stripped_path = options.work_dir.join(format!("{}_dedecorated.sol", stem));
    fs::write(&stripped_path, &source.text)?;

    let original_copy_path = options.work_dir.join(file_name);
    if !same_file(input, &original_copy_path) {
        fs::copy(input, &original_copy_path)?;
    }

    let records_path = if options.write_records {
        let path = options.work_dir.join(format!("{}_redecorate.json", stem));
        fs::write(&path, serde_json::to_string_pretty(&source.redecorations)?)?;
        Some(path)
    } else {
        None
    };

    info!(
        decorators = source.redecorations.len(),
        output = %stripped_path.display(),
        "Stripped decorators"
    );

    Ok(StrippedFile { source, stripped_path, original_copy_path, records_path })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
