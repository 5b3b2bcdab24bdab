pub mod batch;
pub mod chat_translator;
pub mod code_scanner;
pub mod command_handler;
pub mod config;
pub mod errors;
pub mod markdown_translator;
pub mod notebook;
pub mod retry;

pub use chat_translator::{ChatTranslator, Translate};
pub use code_scanner::{CodeScanner, translate_code};
pub use command_handler::{handle_translation, make_app};
pub use markdown_translator::translate_markdown;
pub use notebook::{Notebook, NotebookTranslator};
