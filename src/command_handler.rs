use crate::batch::{self, BatchOptions};
use crate::chat_translator::ChatTranslator;
use crate::config::{DEFAULT_PROMPTS_FILE, PromptKind, ProviderKind, TranslatorConfig};
use crate::notebook::NotebookTranslator;
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::info;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

pub fn handle_translation(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("path")
        .context("missing notebook path")?;
    let source_lang = matches
        .get_one::<String>("source")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "auto".to_string());
    let target_lang = matches
        .get_one::<String>("target")
        .map(|s| s.to_lowercase())
        .context("missing target language")?;

    let config = build_config(matches)?;
    info!(
        "Translating from {} to {} with {} ({})",
        source_lang, target_lang, config.provider, config.model
    );

    let chat = ChatTranslator::new(config)?;
    let markdown = chat.for_prompt(PromptKind::Markdown);
    let code = chat.for_prompt(PromptKind::Code);

    let print_translation = matches.get_flag("print");
    let translator = NotebookTranslator::new(&markdown, &code, &target_lang)
        .print_translation(print_translation)
        .show_progress(!print_translation && std::io::stderr().is_terminal());

    let options = BatchOptions {
        rename_source: matches.get_flag("rename"),
        recursive: !matches.get_flag("no-recursive"),
    };

    if matches.get_flag("directory") || path.is_dir() {
        let summary = batch::translate_directory(path, &translator, &target_lang, options)?;
        for (failed, reason) in &summary.failed {
            eprintln!("\x1b[31;1mFailed:\x1b[0m {} ({})", failed.display(), reason);
        }
        println!("{}", summary.message());
    } else {
        batch::translate_file(path, &translator, &target_lang, options)
            .with_context(|| format!("failed to translate {}", path.display()))?;
    }

    Ok(())
}

fn build_config(matches: &ArgMatches) -> Result<TranslatorConfig> {
    let provider: ProviderKind = matches
        .get_one::<String>("provider")
        .map(String::as_str)
        .unwrap_or("openai")
        .parse()?;
    let prompts_path = matches
        .get_one::<PathBuf>("prompts")
        .context("missing prompt template path")?;
    let mut config = TranslatorConfig::from_env(provider, prompts_path)?;

    if let Some(model) = matches.get_one::<String>("model") {
        config.model = model.clone();
    }
    config.proxy = matches.get_one::<String>("proxy").cloned();
    config.extra_prompt = matches.get_one::<String>("prompt").cloned();

    let delay = matches.get_one::<u64>("delay").copied().unwrap_or(10);
    let max_attempts = matches
        .get_one::<u32>("max-retries")
        .copied()
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);
    config.retry = RetryPolicy::new(max_attempts, Duration::from_secs(delay));

    Ok(config)
}

pub fn make_app() -> Command {
    Command::new("notebook-translator")
        .about("Translates Jupyter notebooks: markdown cells, code comments, docstrings and print messages, leaving code untouched.")
        .arg(
            Arg::new("path")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Notebook file or directory"),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .default_value("auto")
                .help("Source language code"),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .required(true)
                .help("Destination language code"),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .default_value("10")
                .value_parser(value_parser!(u64))
                .help("Initial retry delay in seconds, doubled after each failed attempt"),
        )
        .arg(
            Arg::new("max-retries")
                .long("max-retries")
                .default_value("3")
                .value_parser(value_parser!(u32))
                .help("Maximum attempts per request"),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .default_value("openai")
                .help("Translation provider: openai or deepseek"),
        )
        .arg(Arg::new("model").long("model").help("Override the provider's default model"))
        .arg(
            Arg::new("prompts")
                .long("prompts")
                .default_value(DEFAULT_PROMPTS_FILE)
                .value_parser(value_parser!(PathBuf))
                .help("Prompt template file (TOML, or JSON by extension)"),
        )
        .arg(Arg::new("prompt").long("prompt").help("Extra instruction sent with every request"))
        .arg(Arg::new("proxy").long("proxy").help("HTTP(S) proxy URL"))
        .arg(
            Arg::new("print")
                .long("print")
                .action(ArgAction::SetTrue)
                .help("Print translated cells"),
        )
        .arg(
            Arg::new("directory")
                .long("directory")
                .action(ArgAction::SetTrue)
                .help("Process all .ipynb files in the directory"),
        )
        .arg(
            Arg::new("no-recursive")
                .long("no-recursive")
                .action(ArgAction::SetTrue)
                .help("Do not descend into subdirectories"),
        )
        .arg(
            Arg::new("rename")
                .long("rename")
                .action(ArgAction::SetTrue)
                .help("Rename the input to <name>_bk.ipynb and write the translation in its place"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let matches = make_app()
            .try_get_matches_from([
                "notebook-translator",
                "lessons",
                "--target",
                "JA",
                "--provider",
                "deepseek",
                "--delay",
                "2",
                "--directory",
                "--no-recursive",
                "--print",
            ])
            .unwrap();
        assert_eq!(matches.get_one::<PathBuf>("path").unwrap(), &PathBuf::from("lessons"));
        assert_eq!(matches.get_one::<String>("target").unwrap(), "JA");
        assert_eq!(matches.get_one::<String>("source").unwrap(), "auto");
        assert_eq!(*matches.get_one::<u64>("delay").unwrap(), 2);
        assert!(matches.get_flag("directory"));
        assert!(matches.get_flag("no-recursive"));
        assert!(!matches.get_flag("rename"));
        assert_eq!(
            matches.get_one::<PathBuf>("prompts").unwrap(),
            &PathBuf::from(DEFAULT_PROMPTS_FILE)
        );
    }

    #[test]
    fn target_is_required() {
        assert!(
            make_app()
                .try_get_matches_from(["notebook-translator", "a.ipynb"])
                .is_err()
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let matches = make_app()
            .try_get_matches_from([
                "notebook-translator",
                "a.ipynb",
                "--target",
                "ja",
                "--provider",
                "gemini",
                "--prompts",
                "/nonexistent/prompts.toml",
            ])
            .unwrap();
        let err = build_config(&matches).unwrap_err();
        assert!(err.to_string().contains("gemini"));
    }
}
