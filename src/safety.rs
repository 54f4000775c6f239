//! Content-safety policy sent with every request.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

/// Harm categories understood by the Gemini API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

/// Level at which content in a category is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    #[default]
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// One `safetySettings` entry on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Block threshold per harm category.
///
/// Every category defaults to `BLOCK_MEDIUM_AND_ABOVE`; the `[safety]` table
/// in the config file can override each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SafetyPolicy {
    pub harassment: HarmBlockThreshold,
    pub hate_speech: HarmBlockThreshold,
    pub sexually_explicit: HarmBlockThreshold,
    pub dangerous_content: HarmBlockThreshold,
}

impl SafetyPolicy {
    /// Same threshold for every category
    pub fn uniform(threshold: HarmBlockThreshold) -> Self {
        Self {
            harassment: threshold,
            hate_speech: threshold,
            sexually_explicit: threshold,
            dangerous_content: threshold,
        }
    }

    pub fn threshold(&self, category: HarmCategory) -> HarmBlockThreshold {
        match category {
            HarmCategory::Harassment => self.harassment,
            HarmCategory::HateSpeech => self.hate_speech,
            HarmCategory::SexuallyExplicit => self.sexually_explicit,
            HarmCategory::DangerousContent => self.dangerous_content,
        }
    }

    /// Wire representation, one entry per category
    pub fn settings(&self) -> Vec<SafetySetting> {
        HarmCategory::iter()
            .map(|category| SafetySetting {
                category,
                threshold: self.threshold(category),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blocks_medium_and_above_everywhere() {
        let settings = SafetyPolicy::default().settings();
        assert_eq!(settings.len(), 4);
        assert!(
            settings
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockMediumAndAbove)
        );
    }

    #[test]
    fn settings_serialize_with_api_names() {
        let policy = SafetyPolicy {
            hate_speech: HarmBlockThreshold::BlockLowAndAbove,
            ..SafetyPolicy::default()
        };
        let json = serde_json::to_value(policy.settings()).unwrap();
        assert_eq!(json[1]["category"], "HARM_CATEGORY_HATE_SPEECH");
        assert_eq!(json[1]["threshold"], "BLOCK_LOW_AND_ABOVE");
        assert_eq!(json[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
    }

    #[test]
    fn policy_reads_partial_toml() {
        let policy: SafetyPolicy = toml::from_str(r#"harassment = "BLOCK_NONE""#).unwrap();
        assert_eq!(policy.harassment, HarmBlockThreshold::BlockNone);
        assert_eq!(policy.sexually_explicit, HarmBlockThreshold::BlockMediumAndAbove);
    }
}
