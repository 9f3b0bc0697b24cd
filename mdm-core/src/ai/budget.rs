//! Token budget checks before a request is sent

use serde::Serialize;

/// Tokens reserved for the system instruction
pub const SYSTEM_PROMPT_TOKENS: usize = 200;
/// Tokens reserved for the template text around the document
pub const FORMATTING_TOKENS: usize = 300;

/// Roughly four characters per token.
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count() / 4
}

/// Outcome of a size check; never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentValidation {
    pub valid: bool,
    pub estimated_tokens: usize,
    /// Largest input the budget allows
    pub max_tokens: usize,
    pub message: String,
}

/// Input allowance once the system prompt, template and full response are
/// reserved out of the context window.
pub fn max_input_tokens(max_context_tokens: usize, response_tokens: usize) -> usize {
    max_context_tokens
        .saturating_sub(SYSTEM_PROMPT_TOKENS)
        .saturating_sub(FORMATTING_TOKENS)
        .saturating_sub(response_tokens)
}

pub fn validate(content: &str, max_context_tokens: usize, response_tokens: usize) -> ContentValidation {
    let estimated = estimate_tokens(content);
    let max = max_input_tokens(max_context_tokens, response_tokens);

    if estimated > max {
        ContentValidation {
            valid: false,
            estimated_tokens: estimated,
            max_tokens: max,
            message: format!(
                "Content is too large ({} estimated tokens). Maximum allowed is {} tokens.",
                group_thousands(estimated),
                group_thousands(max)
            ),
        }
    } else {
        ContentValidation {
            valid: true,
            estimated_tokens: estimated,
            max_tokens: max,
            message: format!(
                "Content size is acceptable ({} estimated tokens out of {} max).",
                group_thousands(estimated),
                group_thousands(max)
            ),
        }
    }
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: usize = 400_000;
    const RESPONSE: usize = 128_000;

    fn content_of(tokens: usize) -> String {
        "abcd".repeat(tokens)
    }

    #[test]
    fn estimate_is_chars_over_four() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn default_budget() {
        assert_eq!(max_input_tokens(CONTEXT, RESPONSE), 271_500);
    }

    #[test]
    fn budget_boundary() {
        let max = max_input_tokens(CONTEXT, RESPONSE);

        assert!(validate(&content_of(max - 1), CONTEXT, RESPONSE).valid);
        assert!(validate(&content_of(max), CONTEXT, RESPONSE).valid);

        let over = validate(&content_of(max + 1), CONTEXT, RESPONSE);
        assert!(!over.valid);
        assert_eq!(over.estimated_tokens, 271_501);
        assert_eq!(
            over.message,
            "Content is too large (271,501 estimated tokens). Maximum allowed is 271,500 tokens."
        );
    }

    #[test]
    fn acceptable_message() {
        let ok = validate("tiny", CONTEXT, RESPONSE);
        assert_eq!(
            ok.message,
            "Content size is acceptable (1 estimated tokens out of 271,500 max)."
        );
    }

    #[test]
    fn oversized_response_reservation_saturates() {
        assert_eq!(max_input_tokens(1000, 5000), 0);
        assert!(!validate("abcdefgh", 1000, 5000).valid);
    }

    #[test]
    fn grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
