//! AI document summaries
//!
//! [`SummaryService`] turns a document and a prompt template into a single
//! chat request, retried with backoff. Failures never escape as errors: every
//! call yields a [`SummaryOutcome`] the caller can show as-is.

pub mod budget;
pub mod client;
pub mod retry;
pub mod templates;

use serde::Serialize;
use std::time::Duration;

use crate::config::AiConfig;
use crate::error::AiError;

pub use budget::{estimate_tokens, ContentValidation};
pub use client::{AzureOpenAi, ChatBackend, ChatCompletion, ChatMessage, ChatRequest};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use templates::{PromptTemplate, SYSTEM_PROMPT};

/// Name reported for caller-supplied prompts
pub const CUSTOM_TEMPLATE_NAME: &str = "Custom Prompt";

/// Result of one summary request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryOutcome {
    pub success: bool,
    pub summary: String,
    pub template_name: Option<String>,
    pub template_description: Option<String>,
    pub tokens_used: Option<u64>,
    pub error: Option<String>,
}

impl SummaryOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Summary generation over a chat backend.
///
/// Without a backend the service is unconfigured and every request fails
/// fast with no network traffic.
pub struct SummaryService {
    backend: Option<Box<dyn ChatBackend>>,
    config: AiConfig,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl SummaryService {
    /// Service backed by Azure OpenAI, or unconfigured when credentials are
    /// missing.
    pub fn from_config(config: &AiConfig) -> Self {
        let backend: Option<Box<dyn ChatBackend>> = match AzureOpenAi::from_config(config) {
            Ok(client) => Some(Box::new(client)),
            Err(e) => {
                log::info!("AI summaries unavailable: {}", e);
                None
            }
        };
        Self::new(backend, config.clone())
    }

    pub fn new(backend: Option<Box<dyn ChatBackend>>, config: AiConfig) -> Self {
        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_base_ms),
        };
        Self {
            backend,
            config,
            policy,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn templates(&self) -> &'static [PromptTemplate] {
        templates::all()
    }

    pub fn validate_content_size(&self, content: &str) -> ContentValidation {
        budget::validate(
            content,
            self.config.max_context_tokens,
            self.config.max_tokens as usize,
        )
    }

    /// Summarise `content` with the built-in template `template_key`.
    pub fn generate_summary(
        &self,
        content: &str,
        template_key: &str,
        progress: Option<&mut dyn FnMut(&str)>,
    ) -> SummaryOutcome {
        if !self.is_configured() {
            return SummaryOutcome::failure(AiError::NotConfigured.to_string());
        }
        let template = match templates::template(template_key) {
            Ok(t) => t,
            Err(e) => return SummaryOutcome::failure(e.to_string()),
        };

        self.run(
            template.format(content),
            template.name,
            template.description,
            progress,
        )
    }

    /// Summarise `content` with a caller-supplied prompt.
    pub fn generate_with_prompt(
        &self,
        content: &str,
        prompt: &str,
        progress: Option<&mut dyn FnMut(&str)>,
    ) -> SummaryOutcome {
        if !self.is_configured() {
            return SummaryOutcome::failure(AiError::NotConfigured.to_string());
        }
        self.run(
            templates::fill(prompt, content),
            CUSTOM_TEMPLATE_NAME,
            "User-supplied prompt",
            progress,
        )
    }

    fn request(&self, prompt: String) -> ChatRequest {
        let (max_tokens, temperature) = if self.config.send_sampling_params {
            (Some(self.config.max_tokens), Some(self.config.temperature))
        } else {
            (None, None)
        };
        ChatRequest {
            model: self.config.deployment.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            max_tokens,
            temperature,
        }
    }

    fn run(
        &self,
        prompt: String,
        name: &str,
        description: &str,
        progress: Option<&mut dyn FnMut(&str)>,
    ) -> SummaryOutcome {
        let Some(backend) = self.backend.as_deref() else {
            return SummaryOutcome::failure(AiError::NotConfigured.to_string());
        };

        let mut ignore = |_: &str| {};
        let progress: &mut dyn FnMut(&str) = match progress {
            Some(p) => p,
            None => &mut ignore,
        };

        let request = self.request(prompt);
        progress("Sending request to Azure OpenAI...");
        let result = self
            .policy
            .run(self.sleeper.as_ref(), progress, |_| backend.complete(&request));

        match result {
            Ok(completion) => {
                log::info!(
                    "summary '{}' generated ({} tokens)",
                    name,
                    completion
                        .total_tokens
                        .map_or_else(|| "?".to_string(), |t| t.to_string())
                );
                SummaryOutcome {
                    success: true,
                    summary: completion.content,
                    template_name: Some(name.to_string()),
                    template_description: Some(description.to_string()),
                    tokens_used: completion.total_tokens,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("summary '{}' failed: {}", name, e);
                SummaryOutcome::failure(format!("Error generating summary: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::retry::tests::RecordingSleeper;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Fails a fixed number of times, then answers
    struct ScriptedBackend {
        failures: RefCell<u32>,
        requests: Rc<RefCell<Vec<ChatRequest>>>,
    }

    impl ChatBackend for ScriptedBackend {
        fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, AiError> {
            self.requests.borrow_mut().push(request.clone());
            let mut failures = self.failures.borrow_mut();
            if *failures > 0 {
                *failures -= 1;
                return Err(AiError::Api {
                    status: 429,
                    message: "rate limited".into(),
                });
            }
            Ok(ChatCompletion {
                content: "## Summary".into(),
                total_tokens: Some(42),
            })
        }
    }

    fn service(failures: u32) -> (SummaryService, Rc<RefCell<Vec<ChatRequest>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let backend = ScriptedBackend {
            failures: RefCell::new(failures),
            requests: Rc::clone(&requests),
        };
        let service = SummaryService::new(Some(Box::new(backend)), AiConfig::default())
            .with_sleeper(Box::new(RecordingSleeper::default()));
        (service, requests)
    }

    #[test]
    fn unconfigured_service_fails_fast() {
        let service = SummaryService::new(None, AiConfig::default());
        assert!(!service.is_configured());

        let outcome = service.generate_summary("doc", "high_level", None);
        assert!(!outcome.success);
        assert!(outcome.summary.is_empty());
        assert_eq!(
            outcome.error.as_deref(),
            Some("AI service is not properly configured. Please check your Azure OpenAI credentials.")
        );
    }

    #[test]
    fn from_config_without_credentials_is_unconfigured() {
        assert!(!SummaryService::from_config(&AiConfig::default()).is_configured());
    }

    #[test]
    fn unknown_template_is_reported() {
        let (service, requests) = service(0);
        let outcome = service.generate_summary("doc", "limerick", None);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Invalid template key: limerick"));
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn success_carries_template_metadata() {
        let (service, requests) = service(0);
        let outcome = service.generate_summary("my doc", "review", None);

        assert!(outcome.success);
        assert_eq!(outcome.summary, "## Summary");
        assert_eq!(outcome.template_name.as_deref(), Some("Technical Review"));
        assert_eq!(outcome.tokens_used, Some(42));

        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gpt-5-mini");
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert!(request.messages[1].content.ends_with("Document content:\nmy doc"));
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.temperature, None);
    }

    #[test]
    fn retries_then_succeeds_with_progress() {
        let (service, requests) = service(2);
        let mut messages = Vec::new();
        let mut record = |m: &str| messages.push(m.to_string());

        let outcome = service.generate_summary("doc", "high_level", Some(&mut record));
        assert!(outcome.success);
        assert_eq!(requests.borrow().len(), 3);
        assert_eq!(messages[0], "Sending request to Azure OpenAI...");
        assert!(messages.contains(&"Attempt 2 failed, retrying...".to_string()));
        assert_eq!(messages.last().map(String::as_str), Some("Attempt 3 of 3..."));
    }

    #[test]
    fn exhausted_retries_become_failure_outcome() {
        let (service, requests) = service(5);
        let outcome = service.generate_summary("doc", "technical", None);

        assert!(!outcome.success);
        assert!(outcome.summary.is_empty());
        assert_eq!(requests.borrow().len(), 3);
        let error = outcome.error.unwrap_or_default();
        assert!(error.starts_with("Error generating summary:"));
        assert!(error.contains("rate limited"));
    }

    #[test]
    fn custom_prompt_appends_content() {
        let (service, requests) = service(0);
        let outcome = service.generate_with_prompt("body", "List open questions.", None);

        assert!(outcome.success);
        assert_eq!(outcome.template_name.as_deref(), Some(CUSTOM_TEMPLATE_NAME));
        assert_eq!(
            requests.borrow()[0].messages[1].content,
            "List open questions.\n\nDocument content:\nbody"
        );
    }

    #[test]
    fn sampling_params_are_opt_in() {
        let config = AiConfig {
            send_sampling_params: true,
            ..Default::default()
        };
        let service = SummaryService::new(None, config);
        let request = service.request("p".into());
        assert_eq!(request.max_tokens, Some(128_000));
        assert_eq!(request.temperature, Some(0.25));
    }

    #[test]
    fn validation_uses_configured_budget() {
        let service = SummaryService::new(None, AiConfig::default());
        let check = service.validate_content_size("abcd");
        assert!(check.valid);
        assert_eq!(check.max_tokens, 271_500);
    }
}
