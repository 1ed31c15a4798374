//! Minimal scanner for Valve's KeyValues ("VDF") text format.
//!
//! Only covers what `libraryfolders.vdf` needs: one named root block with
//! quoted key/value pairs and optionally nested blocks. String contents are
//! kept raw (no unescaping); `\\` sequences are normalised by the path
//! helpers, matching how Steam writes Windows paths.

use std::collections::BTreeMap;

use thiserror::Error;

/// Steam caps the number of additional library locations.
const MAX_LIBRARY_FOLDERS: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VdfError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected '{{' after block name")]
    MissingBlockOpen,

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(char),
}

/// A parsed block: flat key/value pairs plus nested sub-blocks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub key_values: BTreeMap<String, String>,
    pub blocks: BTreeMap<String, DataBlock>,
}

enum Token {
    Open,
    Close,
    Text(String),
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
                self.chars.next();
            }
            // Line comments, as written by some Steam tools.
            let mut lookahead = self.chars.clone();
            if lookahead.next() == Some('/') && lookahead.next() == Some('/') {
                while self.chars.peek().is_some_and(|&c| c != '\n') {
                    self.chars.next();
                }
                continue;
            }
            return;
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, VdfError> {
        self.skip_whitespace_and_comments();
        let Some(&first) = self.chars.peek() else {
            return Ok(None);
        };
        match first {
            '{' => {
                self.chars.next();
                Ok(Some(Token::Open))
            }
            '}' => {
                self.chars.next();
                Ok(Some(Token::Close))
            }
            '"' => {
                self.chars.next();
                let mut text = String::new();
                loop {
                    match self.chars.next() {
                        None => return Err(VdfError::UnterminatedString),
                        Some('"') => break,
                        Some('\\') => {
                            // Keep escapes raw; path cleanup happens later.
                            text.push('\\');
                            if let Some(next) = self.chars.next() {
                                text.push(next);
                            }
                        }
                        Some(c) => text.push(c),
                    }
                }
                Ok(Some(Token::Text(text)))
            }
            _ => {
                let mut text = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || c == '{' || c == '}' || c == '"' {
                        break;
                    }
                    text.push(c);
                    self.chars.next();
                }
                Ok(Some(Token::Text(text)))
            }
        }
    }
}

/// Parses a whole document of the form `"name" { ... }`.
///
/// A missing closing brace at the root is tolerated; any other malformed
/// input yields an error, never a panic.
pub fn parse(input: &str) -> Result<DataBlock, VdfError> {
    let mut scanner = Scanner::new(input);
    match scanner.next_token()? {
        Some(Token::Text(_)) => {}
        Some(Token::Open) => return Err(VdfError::UnexpectedToken('{')),
        Some(Token::Close) => return Err(VdfError::UnexpectedToken('}')),
        None => return Err(VdfError::UnexpectedEof),
    }
    match scanner.next_token()? {
        Some(Token::Open) => {}
        _ => return Err(VdfError::MissingBlockOpen),
    }
    parse_block_body(&mut scanner, true)
}

fn parse_block_body(scanner: &mut Scanner<'_>, is_root: bool) -> Result<DataBlock, VdfError> {
    let mut block = DataBlock::default();
    loop {
        match scanner.next_token()? {
            None => {
                if is_root {
                    return Ok(block);
                }
                return Err(VdfError::UnexpectedEof);
            }
            Some(Token::Close) => return Ok(block),
            Some(Token::Open) => return Err(VdfError::UnexpectedToken('{')),
            Some(Token::Text(key)) => match scanner.next_token()? {
                Some(Token::Text(value)) => {
                    block.key_values.insert(key, value);
                }
                Some(Token::Open) => {
                    let nested = parse_block_body(scanner, false)?;
                    block.blocks.insert(key, nested);
                }
                Some(Token::Close) => return Err(VdfError::UnexpectedToken('}')),
                None => return Err(VdfError::UnexpectedEof),
            },
        }
    }
}

/// Extracts the additional Steam library locations from a parsed
/// `libraryfolders.vdf` document.
///
/// Handles both the legacy flat layout (`"1" "<path>"`) and the current
/// nested layout (`"1" { "path" "<path>" ... }`), for numeric keys 1 through
/// 8. Paths are returned with `\\` folded to `/` and a trailing slash
/// trimmed; existence is the consumer's concern.
pub fn external_steam_locations(input: &str) -> Result<Vec<String>, VdfError> {
    let root = parse(input)?;
    let mut locations = Vec::new();
    for index in 1..=MAX_LIBRARY_FOLDERS {
        let key = index.to_string();
        let path = root.key_values.get(&key).cloned().or_else(|| {
            root.blocks
                .get(&key)
                .and_then(|block| block.key_values.get("path").cloned())
        });
        if let Some(path) = path {
            locations.push(clean_library_path(&path));
        }
    }
    Ok(locations)
}

fn clean_library_path(path: &str) -> String {
    let mut cleaned = path.replace("\\\\", "/");
    if cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}
