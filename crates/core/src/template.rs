//! Journal template types.
//!
//! A template is the ordered catalogue of named sections the structurer may
//! route content into. Users can define their own; a process-wide default is
//! used otherwise. Both shapes are identical and interchangeable downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named bucket in a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionDefinition {
    /// Canonical section name, case-sensitive
    pub name: String,
    /// What belongs in this section, phrased for the model
    pub description: String,
    /// Alternate titles the model may emit for this section
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Short sample utterances that belong here
    #[serde(default)]
    pub examples: Vec<String>,
}

impl SectionDefinition {
    /// Creates a section with no aliases or examples.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            aliases: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// Adds alternate titles.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Adds sample utterances.
    #[must_use]
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `candidate` names this section, by canonical name or alias.
    /// Matching is case-insensitive; stored keys stay case-sensitive.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.name.eq_ignore_ascii_case(candidate)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(candidate))
    }
}

/// An ordered catalogue of sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalTemplate {
    /// Display name of the template
    pub name: String,
    /// Sections in presentation order
    pub sections: Vec<SectionDefinition>,
}

impl JournalTemplate {
    /// Look up a section by canonical name or alias.
    #[must_use]
    pub fn resolve(&self, candidate: &str) -> Option<&SectionDefinition> {
        self.sections.iter().find(|s| s.matches(candidate))
    }

    /// Whether `name` is a canonical section name or alias.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Canonical section names in order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }
}

/// A user-owned template row. At most one active per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTemplate {
    /// Unique template identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// The section catalogue
    pub template: JournalTemplate,
    /// Whether this template is the user's active one
    pub is_active: bool,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl UserTemplate {
    /// Creates a new active user template.
    #[must_use]
    pub fn new(id: String, user_id: String, template: JournalTemplate) -> Self {
        let now = Utc::now();
        Self { id, user_id, template, is_active: true, created_at: now, updated_at: now }
    }
}
