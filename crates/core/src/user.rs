//! User, auth session, and preference types.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minimum accepted username length.
pub const USERNAME_MIN_LEN: usize = 3;
/// Maximum accepted username length.
pub const USERNAME_MAX_LEN: usize = 100;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Unique login name
    pub username: String,
    /// Optional email, unique when present
    pub email: Option<String>,
    /// Password digest, never the plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Cleared instead of deleting the row
    pub is_active: bool,
    /// Email verification flag
    pub is_verified: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active, unverified user.
    #[must_use]
    pub fn new(id: String, username: String, email: Option<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            email,
            password_hash,
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validate a username against the length rules.
///
/// # Errors
/// Returns `CoreError::InvalidInput` when the name is out of bounds.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(CoreError::InvalidInput(format!(
            "username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// One issued bearer token. Only a digest of the token is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Unique session identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// SHA-256 digest of the issued token
    pub token_hash: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// Set on logout or deactivation
    pub revoked: bool,
    /// Client user agent, if supplied
    pub user_agent: Option<String>,
    /// Client address, if supplied
    pub ip_address: Option<String>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// Whether this session currently authenticates requests.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// How the assistant should phrase feedback to the user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStyle {
    /// Warm, encouraging tone
    #[default]
    Supportive,
    /// Short, factual tone
    Direct,
    /// Probing, question-driven tone
    Socratic,
}

impl FeedbackStyle {
    /// Returns the string representation of the style.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Supportive => "supportive",
            Self::Direct => "direct",
            Self::Socratic => "socratic",
        }
    }
}

impl FromStr for FeedbackStyle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supportive" => Ok(Self::Supportive),
            "direct" => Ok(Self::Direct),
            "socratic" => Ok(Self::Socratic),
            _ => Err(CoreError::InvalidFeedbackStyle(s.to_owned())),
        }
    }
}

/// Per-user assistant preferences. Exactly one row per user, created lazily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Owning user
    pub user_id: String,
    /// Why the user journals, in their own words
    pub purpose_statement: Option<String>,
    /// Long-running goals the assistant should keep in mind
    #[serde(default)]
    pub long_term_goals: Vec<String>,
    /// Recurring difficulties worth gentle attention
    #[serde(default)]
    pub known_challenges: Vec<String>,
    /// Preferred assistant tone
    #[serde(default)]
    pub preferred_feedback_style: FeedbackStyle,
    /// User-specific shorthand the assistant should understand
    #[serde(default)]
    pub personal_glossary: BTreeMap<String, String>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Documented defaults for a user who has never set preferences.
    #[must_use]
    pub fn default_for(user_id: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            purpose_statement: None,
            long_term_goals: Vec::new(),
            known_challenges: Vec::new(),
            preferred_feedback_style: FeedbackStyle::Supportive,
            personal_glossary: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial preference update. List fields replace wholesale, the glossary
/// merges key by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub purpose_statement: Option<String>,
    pub long_term_goals: Option<Vec<String>>,
    pub known_challenges: Option<Vec<String>>,
    pub preferred_feedback_style: Option<FeedbackStyle>,
    pub personal_glossary: Option<BTreeMap<String, String>>,
}

impl PreferencesUpdate {
    /// Apply this update on top of existing preferences.
    pub fn apply_to(&self, prefs: &mut UserPreferences) {
        if let Some(ref purpose) = self.purpose_statement {
            prefs.purpose_statement = Some(purpose.clone());
        }
        if let Some(ref goals) = self.long_term_goals {
            prefs.long_term_goals = goals.clone();
        }
        if let Some(ref challenges) = self.known_challenges {
            prefs.known_challenges = challenges.clone();
        }
        if let Some(style) = self.preferred_feedback_style {
            prefs.preferred_feedback_style = style;
        }
        if let Some(ref glossary) = self.personal_glossary {
            for (term, meaning) in glossary {
                prefs.personal_glossary.insert(term.clone(), meaning.clone());
            }
        }
        prefs.updated_at = Utc::now();
    }
}
