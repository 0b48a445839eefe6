//! Input validation for untrusted free text reaching the coordinator:
//! PRD descriptions, feature descriptions, and blocker reports. All of
//! these either get forwarded to an `AIClient` or written back to the
//! board as a comment, so both sides of that exchange need the same
//! boundary checks (SPEC_FULL §4.6, §10).

use crate::error::CoordinatorError;
use html_escape::encode_text;
use regex::Regex;
use std::collections::HashSet;

/// 10KB allows a full project description while bounding memory per request.
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const MAX_CONTEXT_KEY_LENGTH: usize = 100;
pub const MAX_CONTEXT_VALUE_LENGTH: usize = 1_000;

static SAFE_CONTENT_REGEX: &str =
    r"^[a-zA-Z0-9\s\.,!?:;()\[\]{}\-_+=@#$%^&*|\\/<>'`~\n\r\t]+$";

static DANGEROUS_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "data:text/html",
    "vbscript:",
    "&&",
    "||",
    ";rm",
    ";del",
    "`rm",
    "`del",
    "$(rm",
    "$(del",
    "';",
    "\";",
    "union select",
    "drop table",
    "delete from",
    "../",
    "..\\",
    "file://",
    "/etc/passwd",
    "/etc/shadow",
    "c:\\windows\\system32",
];

#[derive(Debug, Clone)]
pub struct ContentValidator {
    safe_content_regex: Regex,
    dangerous_patterns: HashSet<String>,
}

impl ContentValidator {
    pub fn new() -> Result<Self, CoordinatorError> {
        let safe_content_regex = Regex::new(SAFE_CONTENT_REGEX)
            .map_err(|e| CoordinatorError::Configuration(format!("invalid regex: {e}")))?;
        let dangerous_patterns = DANGEROUS_PATTERNS.iter().map(|s| s.to_lowercase()).collect();

        Ok(Self {
            safe_content_regex,
            dangerous_patterns,
        })
    }

    /// Validates and HTML-escapes a PRD or feature description before it is
    /// passed to `AIClient::parse_prd`/template matching or echoed in a
    /// board comment.
    pub fn validate_and_sanitize_description(&self, content: &str) -> Result<String, CoordinatorError> {
        if content.len() > MAX_DESCRIPTION_LENGTH {
            return Err(CoordinatorError::Validation(format!(
                "description exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }
        if content.trim().is_empty() {
            return Err(CoordinatorError::Validation(
                "description cannot be empty".to_string(),
            ));
        }

        let lowered = content.to_lowercase();
        if let Some(pattern) = self.dangerous_patterns.iter().find(|p| lowered.contains(p.as_str())) {
            return Err(CoordinatorError::Validation(format!(
                "description contains a disallowed pattern: {pattern}"
            )));
        }

        if !self.safe_content_regex.is_match(content) {
            return Err(CoordinatorError::Validation(
                "description contains invalid characters".to_string(),
            ));
        }

        Ok(encode_text(content).to_string())
    }

    pub fn validate_context_key(&self, key: &str) -> Result<(), CoordinatorError> {
        if key.is_empty() || key.len() > MAX_CONTEXT_KEY_LENGTH {
            return Err(CoordinatorError::Validation(format!(
                "context key must be non-empty and under {MAX_CONTEXT_KEY_LENGTH} characters"
            )));
        }
        if !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(CoordinatorError::Validation(
                "context keys may only contain alphanumerics and underscores".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_and_sanitize_context_value(&self, value: &str) -> Result<String, CoordinatorError> {
        if value.len() > MAX_CONTEXT_VALUE_LENGTH {
            return Err(CoordinatorError::Validation(format!(
                "context value exceeds maximum length of {MAX_CONTEXT_VALUE_LENGTH} characters"
            )));
        }
        let lowered = value.to_lowercase();
        if self.dangerous_patterns.iter().any(|p| lowered.contains(p.as_str())) {
            return Err(CoordinatorError::Validation(
                "context value contains a disallowed pattern".to_string(),
            ));
        }
        Ok(encode_text(value).to_string())
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new().expect("static regex is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_clean_description() {
        let validator = ContentValidator::new().unwrap();
        assert!(validator
            .validate_and_sanitize_description("Build a todo app with JWT auth and a web UI.")
            .is_ok());
    }

    #[test]
    fn rejects_script_injection() {
        let validator = ContentValidator::new().unwrap();
        let result =
            validator.validate_and_sanitize_description("Build this <script>alert(1)</script>");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_command_injection() {
        let validator = ContentValidator::new().unwrap();
        assert!(validator
            .validate_and_sanitize_description("do the thing && rm -rf /")
            .is_err());
    }

    #[test]
    fn rejects_empty_description() {
        let validator = ContentValidator::new().unwrap();
        assert!(validator.validate_and_sanitize_description("").is_err());
    }

    #[test]
    fn rejects_over_length_description() {
        let validator = ContentValidator::new().unwrap();
        let long = "x".repeat(MAX_DESCRIPTION_LENGTH + 1);
        assert!(validator.validate_and_sanitize_description(&long).is_err());
    }

    #[test]
    fn accepts_description_at_exact_limit() {
        let validator = ContentValidator::new().unwrap();
        let boundary = "x".repeat(MAX_DESCRIPTION_LENGTH);
        assert!(validator.validate_and_sanitize_description(&boundary).is_ok());
    }

    #[test]
    fn context_keys_reject_special_characters() {
        let validator = ContentValidator::new().unwrap();
        assert!(validator.validate_context_key("tech_stack").is_ok());
        assert!(validator.validate_context_key("bad key").is_err());
        assert!(validator.validate_context_key("bad/key").is_err());
        assert!(validator.validate_context_key("").is_err());
    }

    #[test]
    fn context_values_reject_dangerous_patterns() {
        let validator = ContentValidator::new().unwrap();
        assert!(validator
            .validate_and_sanitize_context_value("rust")
            .is_ok());
        assert!(validator
            .validate_and_sanitize_context_value("'; DROP TABLE users; --")
            .is_err());
    }
}
