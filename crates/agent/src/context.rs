//! Per-turn agent context.

use quill_core::{DraftData, JournalTemplate, UserPreferences};

/// Everything a turn's tools may read, loaded once at the start of the turn.
/// `draft_data` tracks tool effects within the turn so later tools and the
/// dynamic prompt see earlier writes.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub user_id: String,
    pub session_id: String,
    pub conversation_type: String,
    pub preferences: UserPreferences,
    pub template: JournalTemplate,
    pub draft_data: DraftData,
}

impl AgentContext {
    /// Template sections the draft does not cover yet, in catalogue order.
    pub fn empty_sections(&self) -> Vec<&str> {
        self.template
            .sections
            .iter()
            .map(|s| s.name.as_str())
            .filter(|name| !self.draft_data.contains_key(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::SectionDefinition;

    #[test]
    fn empty_sections_excludes_covered_ones() {
        let mut ctx = AgentContext {
            user_id: "u".into(),
            session_id: "s".into(),
            conversation_type: "journaling".into(),
            preferences: UserPreferences::default_for("u".into()),
            template: JournalTemplate {
                name: "t".into(),
                sections: vec![
                    SectionDefinition::new("A", "a"),
                    SectionDefinition::new("B", "b"),
                ],
            },
            draft_data: DraftData::new(),
        };
        assert_eq!(ctx.empty_sections(), vec!["A", "B"]);
        ctx.draft_data.insert("A".into(), serde_json::json!("x"));
        assert_eq!(ctx.empty_sections(), vec!["B"]);
    }
}
