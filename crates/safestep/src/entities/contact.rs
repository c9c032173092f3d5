//! Family contacts.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{require_text, Entity, EntityKind};

/// Minimum length of a phone number, counting formatting characters.
pub const MIN_PHONE_LENGTH: usize = 10;

/// Digits plus the usual formatting characters.
fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9+\-.() ]+$").expect("Invalid regex pattern"))
}

fn validate_phone(value: &str) -> Result<String> {
    let phone = value.trim();
    if phone.chars().count() < MIN_PHONE_LENGTH {
        return Err(Error::validation(format!(
            "phoneNumber must be at least {MIN_PHONE_LENGTH} characters"
        )));
    }
    if !phone_pattern().is_match(phone) {
        return Err(Error::validation(
            "phoneNumber may contain only digits, spaces and + - . ( )",
        ));
    }
    Ok(phone.to_string())
}

/// Someone who can follow the user's trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyContact {
    /// Unique identifier, assigned on creation.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Validated phone number.
    pub phone_number: String,
    /// How the contact is related to the user, e.g. "Daughter".
    pub relationship: String,
    /// First to be called.
    pub is_primary: bool,
    /// Whether the contact can follow trips live.
    pub family_link_enabled: bool,
}

/// Creation payload for a family contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewFamilyContact {
    /// Display name. Must not be blank.
    pub name: String,
    /// At least ten digits and phone punctuation.
    pub phone_number: String,
    /// Relationship label. Must not be blank.
    pub relationship: String,
    /// Defaults to `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    /// Defaults to `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_link_enabled: Option<bool>,
}

/// Partial update for a family contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FamilyContactPatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New phone number, validated like on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// New relationship label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    /// New primary flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    /// New family-link flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_link_enabled: Option<bool>,
}

impl Entity for FamilyContact {
    const KIND: EntityKind = EntityKind::FamilyContact;
    type New = NewFamilyContact;
    type Patch = FamilyContactPatch;

    fn from_new(id: String, new: NewFamilyContact) -> Result<Self> {
        Ok(Self {
            id,
            name: require_text("name", &new.name)?,
            phone_number: validate_phone(&new.phone_number)?,
            relationship: new.relationship.trim().to_string(),
            is_primary: new.is_primary.unwrap_or(false),
            family_link_enabled: new.family_link_enabled.unwrap_or(false),
        })
    }

    fn apply(&mut self, patch: FamilyContactPatch) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = require_text("name", &name)?;
        }
        if let Some(phone) = patch.phone_number {
            self.phone_number = validate_phone(&phone)?;
        }
        if let Some(relationship) = patch.relationship {
            self.relationship = relationship.trim().to_string();
        }
        if let Some(is_primary) = patch.is_primary {
            self.is_primary = is_primary;
        }
        if let Some(enabled) = patch.family_link_enabled {
            self.family_link_enabled = enabled;
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}
