//! Line scanner for code cells.
//!
//! Finds the natural-language spans of a code cell (docstrings, `#` comments,
//! literal first arguments of `print(` and `print_formatted_tensor(` calls),
//! sends only those spans to the translator and rebuilds the cell with every
//! other byte untouched.
//!
//! The scanner is a best-effort lexer, not a parser. A `#` inside a string
//! literal is taken as a comment start, and an escaped quote ends a print
//! literal early. Both are known and kept as-is.

use crate::chat_translator::{Translate, translate_nonblank};
use crate::errors::ProviderError;
use log::debug;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static DOCSTRING_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\s*)('''|""")"#).expect("valid regex"));
static TODO_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(todo:)(.*)$").expect("valid regex"));
static PRINT_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"print\(\s*(?:"(.+?)"|'(.+?)')"#).expect("valid regex"));
static TENSOR_PRINT_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"print_formatted_tensor\(\s*(?:"(.+?)"|'(.+?)')"#).expect("valid regex")
});

const TENSOR_PRINT: &str = "print_formatted_tensor";
const FSTRING_PRINT: &str = "print(f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    DoubleQuotes,
    SingleQuotes,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::DoubleQuotes => r#"""""#,
            Delimiter::SingleQuotes => "'''",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            r#"""""# => Some(Delimiter::DoubleQuotes),
            "'''" => Some(Delimiter::SingleQuotes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintCall {
    Print,
    FormattedTensor,
}

/// Classification of one line seen outside a docstring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span<'a> {
    PlainCode,
    /// `comment` is the trimmed text after the first `#`.
    InlineComment { code: &'a str, comment: &'a str },
    SingleLineDocstring {
        indent: &'a str,
        delim: Delimiter,
        content: &'a str,
    },
    /// Opening line of a docstring that continues on following lines.
    MultiLineDocstring { indent: &'a str, delim: Delimiter },
    /// `inner` is the byte range of the literal between its quotes.
    PrintLiteral { call: PrintCall, inner: Range<usize> },
}

/// Classifies a line in priority order: docstring, comment, f-string print,
/// print literal, formatted-tensor print literal, plain code.
pub fn classify_line(line: &str) -> Span<'_> {
    if let Some(caps) = DOCSTRING_OPEN.captures(line) {
        let indent = caps.get(1).map_or("", |m| m.as_str());
        let delim = caps
            .get(2)
            .and_then(|m| Delimiter::parse(m.as_str()))
            .unwrap_or(Delimiter::DoubleQuotes);
        let marker = delim.as_str();
        let stripped = line.trim();
        // A bare delimiter (or four quotes) has no inner content and opens a block.
        if stripped.ends_with(marker) && stripped.len() > marker.len() * 2 - 2 {
            let end = stripped.len() - marker.len();
            let content = stripped.get(marker.len()..end).unwrap_or("");
            return Span::SingleLineDocstring {
                indent,
                delim,
                content,
            };
        }
        return Span::MultiLineDocstring { indent, delim };
    }

    if let Some(pos) = line.find('#') {
        return Span::InlineComment {
            code: &line[..pos],
            comment: line[pos + 1..].trim(),
        };
    }

    if line.contains(FSTRING_PRINT) {
        return Span::PlainCode;
    }

    if !line.contains(TENSOR_PRINT) {
        if let Some(inner) = literal_range(&PRINT_LITERAL, line) {
            return Span::PrintLiteral {
                call: PrintCall::Print,
                inner,
            };
        }
    }

    if let Some(inner) = literal_range(&TENSOR_PRINT_LITERAL, line) {
        return Span::PrintLiteral {
            call: PrintCall::FormattedTensor,
            inner,
        };
    }

    Span::PlainCode
}

fn literal_range(pattern: &Regex, line: &str) -> Option<Range<usize>> {
    let caps = pattern.captures(line)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.range())
}

enum ScanState<'a> {
    Code,
    Docstring {
        indent: &'a str,
        delim: Delimiter,
        buffer: Vec<&'a str>,
    },
}

/// Translates the natural-language spans of a code cell.
pub struct CodeScanner<'t> {
    translator: &'t dyn Translate,
    target_lang: &'t str,
}

impl<'t> CodeScanner<'t> {
    pub fn new(translator: &'t dyn Translate, target_lang: &'t str) -> Self {
        Self {
            translator,
            target_lang,
        }
    }

    /// Scans `code` line by line (split on `\n`) in a single forward pass and
    /// returns the rebuilt text. Each input line is emitted exactly once.
    pub fn translate(&self, code: &str) -> Result<String, ProviderError> {
        if code.trim().is_empty() {
            return Ok(code.to_string());
        }

        let mut out: Vec<String> = Vec::new();
        let mut state = ScanState::Code;

        for line in code.split('\n') {
            state = match state {
                ScanState::Docstring {
                    indent,
                    delim,
                    mut buffer,
                } => {
                    if line.trim().ends_with(delim.as_str()) {
                        self.flush_docstring(indent, &buffer, &mut out)?;
                        out.push(line.to_string());
                        ScanState::Code
                    } else {
                        buffer.push(line);
                        ScanState::Docstring {
                            indent,
                            delim,
                            buffer,
                        }
                    }
                }
                ScanState::Code => match classify_line(line) {
                    Span::MultiLineDocstring { indent, delim } => {
                        out.push(line.to_string());
                        ScanState::Docstring {
                            indent,
                            delim,
                            buffer: Vec::new(),
                        }
                    }
                    span => {
                        out.push(self.rewrite_line(line, span)?);
                        ScanState::Code
                    }
                },
            };
        }

        // 没有闭合的 docstring：翻译到单元格末尾
        if let ScanState::Docstring { indent, buffer, .. } = state {
            debug!("unterminated docstring, consuming to end of cell");
            self.flush_docstring(indent, &buffer, &mut out)?;
        }

        Ok(out.join("\n"))
    }

    fn text(&self, text: &str) -> Result<String, ProviderError> {
        translate_nonblank(self.translator, text, self.target_lang)
    }

    fn flush_docstring(
        &self,
        indent: &str,
        buffer: &[&str],
        out: &mut Vec<String>,
    ) -> Result<(), ProviderError> {
        // 空 docstring：不输出任何行
        if buffer.is_empty() {
            return Ok(());
        }
        let translated = self.text(&buffer.join("\n"))?;
        out.extend(translated.split('\n').map(|t| format!("{indent}{t}")));
        Ok(())
    }

    fn rewrite_line(&self, line: &str, span: Span<'_>) -> Result<String, ProviderError> {
        match span {
            Span::PlainCode | Span::MultiLineDocstring { .. } => Ok(line.to_string()),
            Span::SingleLineDocstring {
                indent,
                delim,
                content,
            } => {
                let marker = delim.as_str();
                Ok(format!("{indent}{marker}{}{marker}", self.text(content)?))
            }
            Span::InlineComment { code, comment } => {
                let translated = match TODO_MARKER.captures(comment) {
                    Some(todo) => {
                        let prefix = todo.get(1).map_or("", |m| m.as_str());
                        let rest = todo.get(2).map_or("", |m| m.as_str()).trim();
                        format!("{prefix} {}", self.text(rest)?)
                    }
                    None => self.text(comment)?,
                };
                Ok(format!("{code}# {translated}"))
            }
            Span::PrintLiteral { call, inner } => {
                debug!("{:?} literal at {:?}", call, inner);
                let translated = self.text(&line[inner.clone()])?;
                Ok(format!("{}{}{}", &line[..inner.start], translated, &line[inner.end..]))
            }
        }
    }
}

/// Convenience wrapper around [`CodeScanner::translate`].
pub fn translate_code(
    code: &str,
    translator: &dyn Translate,
    target_lang: &str,
) -> Result<String, ProviderError> {
    CodeScanner::new(translator, target_lang).translate(code)
}
