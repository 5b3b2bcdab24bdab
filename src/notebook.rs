use crate::chat_translator::Translate;
use crate::code_scanner::CodeScanner;
use crate::errors::{InputError, ProviderError};
use crate::markdown_translator::translate_markdown;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

/// A notebook document. Fields other than `cells` are carried through as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: String,
    #[serde(default)]
    pub source: CellSource,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Markdown,
    Code,
    Other,
}

/// Cell source as stored on disk: a list of line fragments (each keeping its
/// own line terminator) or a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Lines(Vec::new())
    }
}

impl CellSource {
    pub fn text(&self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text.clone(),
        }
    }

    /// Replaces the whole source, keeping the on-disk form.
    pub fn replace(&mut self, text: String) {
        *self = match self {
            CellSource::Lines(_) => CellSource::Lines(split_keep_ends(&text)),
            CellSource::Text(_) => CellSource::Text(text),
        };
    }
}

/// Splits after every `\n`, keeping the terminator on each fragment.
pub fn split_keep_ends(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(String::from).collect()
}

impl Cell {
    pub fn kind(&self) -> CellKind {
        match self.cell_type.as_str() {
            "markdown" => CellKind::Markdown,
            "code" => CellKind::Code,
            _ => CellKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStats {
    pub total: usize,
    pub code: usize,
    pub markdown: usize,
}

impl fmt::Display for CellStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total cells: {}, code: {}, markdown: {}",
            self.total, self.code, self.markdown
        )
    }
}

impl Notebook {
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let data = fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Pretty JSON with a two-space indent; non-ASCII text is written as-is.
    pub fn save(&self, path: &Path) -> Result<(), InputError> {
        let data = serde_json::to_string_pretty(self).map_err(|source| InputError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|source| InputError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn stats(&self) -> CellStats {
        let mut stats = CellStats {
            total: self.cells.len(),
            ..CellStats::default()
        };
        for cell in &self.cells {
            match cell.kind() {
                CellKind::Code => stats.code += 1,
                CellKind::Markdown => stats.markdown += 1,
                CellKind::Other => {}
            }
        }
        stats
    }
}

/// Walks the cells of a notebook in order and translates each one.
pub struct NotebookTranslator<'t> {
    markdown: &'t dyn Translate,
    code: &'t dyn Translate,
    target_lang: &'t str,
    print_translation: bool,
    show_progress: bool,
}

impl<'t> NotebookTranslator<'t> {
    pub fn new(markdown: &'t dyn Translate, code: &'t dyn Translate, target_lang: &'t str) -> Self {
        Self {
            markdown,
            code,
            target_lang,
            print_translation: false,
            show_progress: false,
        }
    }

    /// Echo every translated cell to stdout.
    pub fn print_translation(mut self, enabled: bool) -> Self {
        self.print_translation = enabled;
        self
    }

    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Translates every cell. The first provider failure aborts the notebook.
    pub fn translate(&self, mut notebook: Notebook) -> Result<Notebook, ProviderError> {
        info!("{}", notebook.stats());

        let progress = if self.show_progress {
            let pb = ProgressBar::new(notebook.cells.len() as u64);
            pb.set_style(
                ProgressStyle::with_template("Translating cells {bar:40.cyan/blue} {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for (index, cell) in notebook.cells.iter_mut().enumerate() {
            self.translate_cell(index, cell, &progress)?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(notebook)
    }

    fn translate_cell(
        &self,
        index: usize,
        cell: &mut Cell,
        progress: &ProgressBar,
    ) -> Result<(), ProviderError> {
        let label = match cell.kind() {
            CellKind::Markdown => "MD",
            CellKind::Code => "Code",
            CellKind::Other => {
                debug!("cell {index}: skipping '{}' cell", cell.cell_type);
                return Ok(());
            }
        };

        let source = cell.source.text();
        let translated = match cell.kind() {
            CellKind::Markdown => translate_markdown(&source, self.markdown, self.target_lang)?,
            // 整个单元格一起扫描，跨行的 docstring 才能被识别
            _ => CodeScanner::new(self.code, self.target_lang).translate(&source)?,
        };

        if self.print_translation {
            progress.suspend(|| println!("{label} cell {index}:\n{translated}"));
        }
        cell.source.replace(translated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upper(text: &str, _: &str) -> Result<String, ProviderError> {
        Ok(text.to_uppercase())
    }

    fn sample() -> Notebook {
        serde_json::from_value(json!({
            "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": ["# Intro\n", "Some text\n"]},
                {"cell_type": "code", "execution_count": null, "metadata": {}, "outputs": [],
                 "source": ["x = 1  # set x\n", "print(\"done\")"]},
                {"cell_type": "raw", "metadata": {}, "source": "keep # me"}
            ],
            "metadata": {"kernelspec": {"name": "python3"}},
            "nbformat": 4,
            "nbformat_minor": 5
        }))
        .unwrap()
    }

    #[test]
    fn stats_count_kinds() {
        let stats = sample().stats();
        assert_eq!(
            stats,
            CellStats {
                total: 3,
                code: 1,
                markdown: 1
            }
        );
        assert_eq!(stats.to_string(), "Total cells: 3, code: 1, markdown: 1");
    }

    #[test]
    fn cells_keep_order_and_type() {
        let translator = NotebookTranslator::new(&upper, &upper, "ja");
        let out = translator.translate(sample()).unwrap();
        let types: Vec<&str> = out.cells.iter().map(|c| c.cell_type.as_str()).collect();
        assert_eq!(types, vec!["markdown", "code", "raw"]);
        assert_eq!(
            out.cells[0].source,
            CellSource::Lines(vec!["# INTRO\n".into(), "SOME TEXT\n".into()])
        );
        assert_eq!(
            out.cells[1].source,
            CellSource::Lines(vec!["x = 1  # SET X\n".into(), "print(\"DONE\")".into()])
        );
        assert_eq!(out.cells[2].source, CellSource::Text("keep # me".into()));
    }

    #[test]
    fn unknown_fields_survive() {
        let translator = NotebookTranslator::new(&upper, &upper, "ja");
        let out = translator.translate(sample()).unwrap();
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["nbformat"], 4);
        assert_eq!(value["metadata"]["kernelspec"]["name"], "python3");
        assert_eq!(value["cells"][1]["outputs"], json!([]));
        assert!(value["cells"][1]["execution_count"].is_null());
    }

    #[test]
    fn docstring_spanning_source_entries() {
        let nb: Notebook = serde_json::from_value(json!({
            "cells": [{"cell_type": "code", "metadata": {}, "source": [
                "def f():\n", "    \"\"\"\n", "    doc line\n", "    \"\"\"\n", "    return 1"
            ]}]
        }))
        .unwrap();
        let calls = std::cell::RefCell::new(Vec::new());
        let stub = |text: &str, _: &str| -> Result<String, ProviderError> {
            calls.borrow_mut().push(text.to_string());
            Ok(text.trim().to_uppercase())
        };
        let out = NotebookTranslator::new(&stub, &stub, "ja").translate(nb).unwrap();
        assert_eq!(*calls.borrow(), vec!["    doc line".to_string()]);
        assert_eq!(
            out.cells[0].source,
            CellSource::Lines(vec![
                "def f():\n".into(),
                "    \"\"\"\n".into(),
                "    DOC LINE\n".into(),
                "    \"\"\"\n".into(),
                "    return 1".into(),
            ])
        );
    }

    #[test]
    fn failure_aborts_notebook() {
        let failing = |_: &str, _: &str| -> Result<String, ProviderError> {
            Err(ProviderError::RateLimited("429".into()))
        };
        let result = NotebookTranslator::new(&failing, &failing, "ja").translate(sample());
        assert!(matches!(result, Err(ProviderError::RateLimited(_))));
    }

    #[test]
    fn split_keeps_terminators() {
        assert_eq!(split_keep_ends("a\nb\n"), vec!["a\n", "b\n"]);
        assert_eq!(split_keep_ends("a\nb"), vec!["a\n", "b"]);
        assert!(split_keep_ends("").is_empty());
    }
}
