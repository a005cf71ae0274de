//! Local pattern matching
//!
//! Covers the common machine-readable identifiers without any network call.
//! Names and addresses need one of the service providers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{DetectError, PiiDetector};

// name, pattern; compiled once per process
static BUILTIN_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("email", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
        ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
        ("credit_card", r"\b(?:\d[ -]?){12,18}\d\b"),
        ("phone", r"(?:\+?1[ .-]?)?\(?\b\d{3}\)?[ .-]?\d{3}[ .-]\d{4}\b"),
        ("ipv4", r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (name, re)))
    .collect()
});

#[derive(Default)]
pub struct PatternDetector {
    extra: Vec<Regex>,
}

impl PatternDetector {
    /// Built-in patterns plus `extra` user patterns.
    pub fn new<S: AsRef<str>>(extra: &[S]) -> Result<Self, DetectError> {
        let extra = extra
            .iter()
            .map(|pattern| {
                Regex::new(pattern.as_ref()).map_err(|source| DetectError::InvalidPattern {
                    pattern: pattern.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }
}

impl PiiDetector for PatternDetector {
    fn detect_pii(&self, text: &str) -> Result<Vec<String>, DetectError> {
        let mut found = Vec::new();

        for (name, re) in BUILTIN_PATTERNS.iter() {
            for m in re.find_iter(text) {
                log::debug!("[Detect] {} match {:?}", name, m.as_str());
                found.push(m.as_str().to_string());
            }
        }
        for re in &self.extra {
            found.extend(re.find_iter(text).map(|m| m.as_str().to_string()));
        }

        log::info!("[Detect] patterns found {} values", found.len());
        Ok(found)
    }

    fn name(&self) -> &'static str {
        "patterns"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Vec<String> {
        PatternDetector::default().detect_pii(text).unwrap()
    }

    #[test]
    fn test_builtin_patterns_compile() {
        assert_eq!(BUILTIN_PATTERNS.len(), 5);
    }

    #[test]
    fn test_ssn() {
        assert_eq!(detect("SSN: 123-45-6789"), vec!["123-45-6789"]);
    }

    #[test]
    fn test_email() {
        assert_eq!(detect("mail jane.smith@example.com now"), vec!["jane.smith@example.com"]);
    }

    #[test]
    fn test_credit_card() {
        assert!(detect("Card number 4111 1111 1111 1111").contains(&"4111 1111 1111 1111".to_string()));
    }

    #[test]
    fn test_phone() {
        assert!(detect("Call (555) 123-4567 today").iter().any(|v| v.contains("555) 123-4567")));
    }

    #[test]
    fn test_ipv4() {
        assert_eq!(detect("host 192.168.10.1"), vec!["192.168.10.1"]);
    }

    #[test]
    fn test_plain_text_has_no_pii() {
        assert!(detect("Patient intake form, page one").is_empty());
    }

    #[test]
    fn test_extra_patterns() {
        let detector = PatternDetector::new(&[r"MRN-\d{6}"]).unwrap();
        assert_eq!(detector.detect_pii("id MRN-004211").unwrap(), vec!["MRN-004211"]);
    }

    #[test]
    fn test_invalid_extra_pattern() {
        let err = PatternDetector::new(&["(unclosed"]).err().unwrap();
        assert!(matches!(err, DetectError::InvalidPattern { .. }));
    }
}
