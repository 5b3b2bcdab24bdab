use crate::config::{PromptKind, TranslatorConfig};
use crate::errors::{ConfigError, ProviderError};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Value, json};

/// A translation function: text and target language in, translated text out.
pub trait Translate {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, ProviderError>;
}

impl<F> Translate for F
where
    F: Fn(&str, &str) -> Result<String, ProviderError>,
{
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, ProviderError> {
        self(text, target_lang)
    }
}

/// Blank text is returned unchanged without calling the provider.
pub fn translate_nonblank(
    translator: &dyn Translate,
    text: &str,
    target_lang: &str,
) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        return Ok(text.to_string());
    }
    translator.translate(text, target_lang)
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

/// OpenAI-compatible chat-completions client.
pub struct ChatTranslator {
    client: Client,
    config: TranslatorConfig,
}

impl ChatTranslator {
    pub fn new(config: TranslatorConfig) -> Result<Self, ConfigError> {
        let mut client_builder = Client::builder().timeout(config.request_timeout);
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            client_builder = client_builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = client_builder.build()?;
        Ok(Self { client, config })
    }

    /// A [`Translate`] bound to one of the two system prompts.
    pub fn for_prompt(&self, kind: PromptKind) -> PromptedTranslator<'_> {
        PromptedTranslator {
            inner: self,
            kind,
        }
    }

    fn build_messages(&self, kind: PromptKind, text: &str, target_lang: &str) -> Vec<Message> {
        let mut messages = vec![
            Message {
                role: "system",
                content: self.config.prompt_templates.get(kind).to_string(),
            },
            Message {
                role: "user",
                content: format!("Translate into {}:\n\n{}", target_lang, text),
            },
        ];
        if let Some(extra) = self.config.extra_prompt.as_deref().filter(|p| !p.is_empty()) {
            messages.push(Message {
                role: "user",
                content: extra.to_string(),
            });
        }
        messages
    }

    /// One request with retry; the response content is trimmed.
    pub fn complete(
        &self,
        kind: PromptKind,
        text: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.config.model,
            "messages": self.build_messages(kind, text, target_lang),
            "temperature": kind.temperature(),
        });

        debug!("requesting {} ({:?}): {:?}", self.config.provider, kind, preview(text));
        let translated = self.config.retry.run(|| self.send(&body))?;
        debug!("translated: {:?}", preview(&translated));
        Ok(translated)
    }

    fn send(&self, body: &Value) -> Result<String, ProviderError> {
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.credential))
            .json(body)
            .send()
            .map_err(classify_transport_error)?;

        let status = resp.status();
        let text = resp.text().map_err(classify_transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, text));
        }

        let json_resp: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        extract_content(&json_resp)
    }
}

pub struct PromptedTranslator<'a> {
    inner: &'a ChatTranslator,
    kind: PromptKind,
}

impl Translate for PromptedTranslator<'_> {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, ProviderError> {
        self.inner.complete(self.kind, text, target_lang)
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if let Some(status) = err.status() {
        classify_status(status, err.to_string())
    } else {
        ProviderError::Connection(err.to_string())
    }
}

fn classify_status(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout(message),
        s if s.is_server_error() => ProviderError::Server {
            status: s.as_u16(),
            message,
        },
        s => ProviderError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

fn extract_content(json_resp: &Value) -> Result<String, ProviderError> {
    json_resp["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| {
            ProviderError::MalformedResponse(format!(
                "missing choices[0].message.content in {}",
                preview(&json_resp.to_string())
            ))
        })
}

/// First 100 characters, for log lines.
pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > 100 {
        let mut short: String = text.chars().take(100).collect();
        short.push_str("...");
        short
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PromptTemplates, ProviderKind};
    use std::cell::Cell;

    fn translator(extra_prompt: Option<&str>) -> ChatTranslator {
        let mut config = TranslatorConfig::new(
            ProviderKind::OpenAi,
            "sk-test".into(),
            PromptTemplates::new("markdown system", "code system"),
        );
        config.extra_prompt = extra_prompt.map(str::to_string);
        ChatTranslator::new(config).unwrap()
    }

    #[test]
    fn blank_text_skips_provider() {
        let calls = Cell::new(0);
        let stub = |text: &str, _: &str| -> Result<String, ProviderError> {
            calls.set(calls.get() + 1);
            Ok(text.to_uppercase())
        };
        assert_eq!(translate_nonblank(&stub, "", "ja").unwrap(), "");
        assert_eq!(translate_nonblank(&stub, "  \n\t", "ja").unwrap(), "  \n\t");
        assert_eq!(calls.get(), 0);
        assert_eq!(translate_nonblank(&stub, "hi", "ja").unwrap(), "HI");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn messages_use_selected_prompt() {
        let t = translator(None);
        let messages = t.build_messages(PromptKind::Code, "fix this", "ja");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "code system");
        assert_eq!(messages[1].content, "Translate into ja:\n\nfix this");
    }

    #[test]
    fn extra_prompt_is_appended() {
        let t = translator(Some("Use polite form."));
        let messages = t.build_messages(PromptKind::Markdown, "text", "ja");
        assert_eq!(messages[0].content, "markdown system");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "Use polite form.");
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            ProviderError::Server { status: 502, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, String::new()),
            ProviderError::Timeout(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            ProviderError::Rejected { status: 401, .. }
        ));
    }

    #[test]
    fn content_is_trimmed() {
        let resp = json!({"choices": [{"message": {"content": "  こんにちは\n"}}]});
        assert_eq!(extract_content(&resp).unwrap(), "こんにちは");
    }

    #[test]
    fn missing_content_is_malformed() {
        let resp = json!({"error": {"message": "bad"}});
        assert!(matches!(
            extract_content(&resp),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn preview_truncates() {
        let long = "a".repeat(150);
        assert_eq!(preview(&long).chars().count(), 103);
        assert_eq!(preview("short"), "short");
    }
}
