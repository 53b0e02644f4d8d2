use serde::{Deserialize, Serialize};

use crate::provider::{ACCEPTED_SYMBOLOGIES, ScanOptions};

/// Scan pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Text shown by the scanner UI while it looks for a code.
    pub prompt: String,
    /// Language passed to the text recognizer.
    pub ocr_language: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            prompt: "Place the barcode inside the rectangle to scan it.".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

impl ScanConfig {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = language.into();
        self
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            formats: ACCEPTED_SYMBOLOGIES.to_vec(),
            prompt: self.prompt.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ScanConfig = serde_json::from_str(r#"{"ocr_language":"deu"}"#).unwrap();
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.prompt, ScanConfig::default().prompt);
    }

    #[test]
    fn scan_options_always_carry_the_accepted_symbologies() {
        let options = ScanConfig::default().with_prompt("Aim at the code").scan_options();
        assert_eq!(options.formats, ACCEPTED_SYMBOLOGIES.to_vec());
        assert_eq!(options.prompt, "Aim at the code");
    }
}
