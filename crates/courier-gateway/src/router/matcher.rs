//! Activation-code recognition.

use regex::Regex;

/// Decides whether a message text is an activation code.
///
/// A text matches when the configured pattern matches starting at its first
/// character; the match does not have to cover the whole text unless the
/// pattern itself ends with `$`.
#[derive(Debug, Clone)]
pub struct ActivationMatcher {
    pattern: String,
    anchored: Regex,
}

impl ActivationMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        // Compile the bare pattern first so errors point at what was configured.
        Regex::new(pattern)?;
        let anchored = Regex::new(&format!(r"\A(?:{pattern})"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            anchored,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_activation(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}
