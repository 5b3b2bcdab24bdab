//! File and directory driver: one notebook at a time, no state shared
//! between notebooks.

use crate::errors::{AppError, InputError};
use crate::notebook::{Notebook, NotebookTranslator};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// `name.ext` → `name_<target>.ext`
pub fn output_path(input: &Path, target_lang: &str) -> PathBuf {
    with_stem_suffix(input, target_lang)
}

/// `name.ext` → `name_bk.ext`
pub fn backup_path(input: &Path) -> PathBuf {
    with_stem_suffix(input, "bk")
}

fn with_stem_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let file_name = match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    input.with_file_name(file_name)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Rename the input to its backup path and write the translation in its place.
    pub rename_source: bool,
    pub recursive: bool,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub translated: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn message(&self) -> String {
        let count = self.translated.len();
        format!("Translated {} notebook{}.", count, if count == 1 { "" } else { "s" })
    }
}

/// Translates one notebook file and returns the path written.
pub fn translate_file(
    path: &Path,
    translator: &NotebookTranslator<'_>,
    target_lang: &str,
    options: BatchOptions,
) -> Result<PathBuf, AppError> {
    if options.rename_source {
        let backup = backup_path(path);
        if backup.exists() {
            return Err(InputError::BackupExists(backup).into());
        }
    }

    let notebook = Notebook::load(path)?;
    let translated = translator.translate(notebook)?;

    let out_path = if options.rename_source {
        let backup = backup_path(path);
        fs::rename(path, &backup).map_err(|source| InputError::Rename {
            from: path.to_path_buf(),
            to: backup.clone(),
            source,
        })?;
        info!("Renamed {} to {}", path.display(), backup.display());
        path.to_path_buf()
    } else {
        output_path(path, target_lang)
    };

    translated.save(&out_path)?;
    eprintln!(
        "\x1b[32;1mSaved translated notebook to:\x1b[0m {}",
        out_path.display()
    );
    Ok(out_path)
}

/// All `.ipynb` files under `dir`, sorted. Collected before any output is
/// written so fresh outputs are never picked up.
pub fn find_notebooks(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, InputError> {
    if !dir.is_dir() {
        return Err(InputError::NotADirectory(dir.to_path_buf()));
    }

    let mut walker = WalkDir::new(dir).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut paths = Vec::new();
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(NOTEBOOK_EXTENSION))
        {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Translates every notebook in `dir`. A failing notebook is logged and
/// skipped; the rest of the batch continues.
pub fn translate_directory(
    dir: &Path,
    translator: &NotebookTranslator<'_>,
    target_lang: &str,
    options: BatchOptions,
) -> Result<BatchSummary, InputError> {
    let mut summary = BatchSummary::default();

    for path in find_notebooks(dir, options.recursive)? {
        eprintln!("\x1b[32;1mTranslating\x1b[0m {}...", path.display());
        match translate_file(&path, translator, target_lang, options) {
            Ok(out) => summary.translated.push(out),
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                summary.failed.push((path, e.to_string()));
            }
        }
    }

    Ok(summary)
}
