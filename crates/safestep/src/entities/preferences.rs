//! The user preferences singleton.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Text scale for the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSize {
    /// Standard size.
    Medium,
    /// The default.
    Large,
    /// Largest available.
    ExtraLarge,
}

impl TextSize {
    /// Wire and display form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::Large => "large",
            Self::ExtraLarge => "extra-large",
        }
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessibility and routing preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Prefer well-lit, step-free routes.
    pub safe_route_mode: bool,
    /// Read instructions aloud.
    pub voice_guidance_enabled: bool,
    /// Interface text scale.
    pub text_size: TextSize,
    /// High-contrast colours.
    pub high_contrast_mode: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            safe_route_mode: true,
            voice_guidance_enabled: true,
            text_size: TextSize::Large,
            high_contrast_mode: true,
        }
    }
}

/// Partial update for the preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesPatch {
    /// See [`UserPreferences::safe_route_mode`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_route_mode: Option<bool>,
    /// See [`UserPreferences::voice_guidance_enabled`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_guidance_enabled: Option<bool>,
    /// See [`UserPreferences::text_size`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_size: Option<TextSize>,
    /// See [`UserPreferences::high_contrast_mode`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_contrast_mode: Option<bool>,
}

impl PreferencesPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl UserPreferences {
    /// Apply a partial update. Every field is a plain value, so this cannot fail.
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(v) = patch.safe_route_mode {
            self.safe_route_mode = v;
        }
        if let Some(v) = patch.voice_guidance_enabled {
            self.voice_guidance_enabled = v;
        }
        if let Some(v) = patch.text_size {
            self.text_size = v;
        }
        if let Some(v) = patch.high_contrast_mode {
            self.high_contrast_mode = v;
        }
    }
}
