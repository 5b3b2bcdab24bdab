use crate::errors::ConfigError;
use crate::retry::RetryPolicy;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use std::{env, fmt, fs};

pub const DEFAULT_PROMPTS_FILE: &str = "prompts.toml";
pub const MARKDOWN_PROMPT_KEY: &str = "translation_system_prompt_lines";
pub const CODE_PROMPT_KEY: &str = "code_translation_system_prompt_lines";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    DeepSeek,
}

impl ProviderKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4.1-mini",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }

    pub fn credential_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::DeepSeek => write!(f, "deepseek"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

/// Which system prompt a request is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Markdown,
    Code,
}

impl PromptKind {
    pub fn key(&self) -> &'static str {
        match self {
            PromptKind::Markdown => MARKDOWN_PROMPT_KEY,
            PromptKind::Code => CODE_PROMPT_KEY,
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            PromptKind::Markdown => 1.0,
            PromptKind::Code => 0.7,
        }
    }
}

/// System prompts, each stored as a list of lines in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    markdown: String,
    code: String,
}

impl PromptTemplates {
    pub fn new(markdown: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            code: code.into(),
        }
    }

    /// Loads the templates from a TOML file, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let raw: HashMap<String, Vec<String>> = if is_json {
            serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            toml::from_str(&data).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        Self::from_map(&raw, path)
    }

    fn from_map(raw: &HashMap<String, Vec<String>>, path: &Path) -> Result<Self, ConfigError> {
        let lookup = |key: &str| -> Result<String, ConfigError> {
            let joined = raw.get(key).map(|lines| lines.join("\n")).unwrap_or_default();
            if joined.trim().is_empty() {
                return Err(ConfigError::MissingPromptTemplate {
                    key: key.to_string(),
                    path: path.to_path_buf(),
                });
            }
            Ok(joined)
        };
        Ok(Self {
            markdown: lookup(PromptKind::Markdown.key())?,
            code: lookup(PromptKind::Code.key())?,
        })
    }

    pub fn get(&self, kind: PromptKind) -> &str {
        match kind {
            PromptKind::Markdown => &self.markdown,
            PromptKind::Code => &self.code,
        }
    }
}

/// Everything the chat translator needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub provider: ProviderKind,
    pub credential: String,
    pub prompt_templates: PromptTemplates,
    pub model: String,
    pub endpoint: String,
    pub proxy: Option<String>,
    pub extra_prompt: Option<String>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl TranslatorConfig {
    pub fn new(provider: ProviderKind, credential: String, prompt_templates: PromptTemplates) -> Self {
        Self {
            provider,
            credential,
            prompt_templates,
            model: provider.default_model().to_string(),
            endpoint: provider.endpoint().to_string(),
            proxy: None,
            extra_prompt: None,
            retry: RetryPolicy::default(),
            // 显式设置超时
            request_timeout: Duration::from_secs(600),
        }
    }

    /// Reads the provider credential from the environment and the prompt
    /// templates from `prompts_path`.
    pub fn from_env(provider: ProviderKind, prompts_path: &Path) -> Result<Self, ConfigError> {
        let credential = read_credential(provider.credential_var())?;
        let prompt_templates = PromptTemplates::load(prompts_path)?;
        Ok(Self::new(provider, credential, prompt_templates))
    }
}

pub fn read_credential(var: &str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingCredential {
            var: var.to_string(),
        }),
    }
}
