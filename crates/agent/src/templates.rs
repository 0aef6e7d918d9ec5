//! Effective template resolution and the process-wide default.
//!
//! The default catalogue ships compiled in; `QUILL_TEMPLATE_PATH` may point
//! at a JSON file that replaces it. `reload` re-reads that source of truth.
//! A user's active template, when present, wins over the default everywhere.

use std::sync::{Arc, RwLock};

use quill_core::{JournalTemplate, SectionDefinition};
use quill_storage::Tx;

use crate::error::AgentError;

/// Env var naming an optional JSON file with the default template.
pub const TEMPLATE_PATH_VAR: &str = "QUILL_TEMPLATE_PATH";

/// The compiled-in default catalogue.
#[must_use]
pub fn builtin_template() -> JournalTemplate {
    JournalTemplate {
        name: "Personal & Trading Journal".into(),
        sections: vec![
            SectionDefinition::new(
                "General Reflection",
                "General thoughts, daily reflections, or free-form content that fits nowhere else",
            )
            .with_aliases(["Open Reflection", "Daily Notes", "Journal", "Reflection", "General"])
            .with_examples([
                "reflecting on work-life balance",
                "random thoughts about the day",
            ]),
            SectionDefinition::new(
                "Things Done",
                "Tasks completed, accomplishments, actions taken, work already finished",
            )
            .with_aliases(["Completed", "Accomplishments", "Achievements", "Finished"])
            .with_examples(["completed the quarterly report", "called mom"]),
            SectionDefinition::new(
                "To Do",
                "Future tasks, errands, or actions that still need to be taken",
            )
            .with_aliases(["Tasks", "Todo", "Errands", "Action Items"])
            .with_examples(["schedule dentist appointment", "buy milk next week"]),
            SectionDefinition::new(
                "Events",
                "Meetings, appointments, deadlines, or scheduled activities with specific times",
            )
            .with_aliases(["Schedule", "Meetings", "Appointments", "Calendar", "Deadlines"])
            .with_examples(["board meeting Friday at 2pm", "project deadline March 15th"]),
            SectionDefinition::new(
                "Thoughts & Feelings",
                "Emotional state, mood, feelings, concerns, or personal reflections",
            )
            .with_aliases(["Emotional State", "Emotions", "Mood", "Feelings", "Concerns"])
            .with_examples(["anxious about the presentation", "excited about vacation"]),
            SectionDefinition::new(
                "Trading Journal",
                "Actual trades made, positions opened or closed, crypto transactions, investment actions",
            )
            .with_aliases(["Trading Activity", "Trades", "Transactions", "Positions"])
            .with_examples(["bought 100 shares of AAPL", "sold Ethereum at $3200"]),
            SectionDefinition::new(
                "Market Thoughts",
                "Analysis, predictions, or observations about markets, crypto, stocks, or economic trends",
            )
            .with_aliases(["Market Analysis", "Trading Ideas", "Economic Views", "Financial Outlook"])
            .with_examples(["market looks bearish this week", "Fed policy likely to impact rates"]),
            SectionDefinition::new(
                "Portfolio Review",
                "Portfolio performance, risk assessment, allocation changes, profit and loss analysis",
            )
            .with_aliases(["Performance", "P&L", "Allocation"])
            .with_examples(["portfolio up 3% this month", "need to rebalance crypto allocation"]),
            SectionDefinition::new(
                "Goals",
                "Goals, objectives, and plans for the days and weeks ahead",
            )
            .with_aliases(["Objectives", "Plans", "Next Week"])
            .with_examples(["want to run three times this week"]),
            SectionDefinition::new(
                "Things I'm Grateful For",
                "Gratitude for people, events, achievements, or circumstances",
            )
            .with_aliases(["Gratitude", "Grateful", "Thankful", "Appreciation"])
            .with_examples(["grateful for family support", "thankful for good health"]),
        ],
    }
}

fn load_default() -> JournalTemplate {
    let Ok(path) = std::env::var(TEMPLATE_PATH_VAR) else {
        return builtin_template();
    };
    match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(template) => {
            tracing::info!(path, "loaded default template from file");
            template
        },
        Err(error) => {
            tracing::warn!(path, error, "failed to load template file, using builtin");
            builtin_template()
        },
    }
}

/// Caches the default template and resolves each user's effective one.
pub struct TemplateProvider {
    default: RwLock<Arc<JournalTemplate>>,
}

impl TemplateProvider {
    #[must_use]
    pub fn new() -> Self {
        Self { default: RwLock::new(Arc::new(load_default())) }
    }

    /// The current process-wide default.
    ///
    /// # Panics
    /// Only if the internal lock is poisoned.
    #[must_use]
    pub fn default_template(&self) -> Arc<JournalTemplate> {
        self.default.read().expect("template lock poisoned").clone()
    }

    /// Re-read the default from its source of truth.
    pub fn reload(&self) {
        let fresh = Arc::new(load_default());
        *self.default.write().expect("template lock poisoned") = fresh;
        tracing::info!("default template reloaded");
    }

    /// The template in effect for a user: their active one, else the default.
    pub async fn effective_template(
        &self,
        tx: &mut Tx,
        user_id: &str,
    ) -> Result<JournalTemplate, AgentError> {
        if let Some(user_template) = tx.get_active_template(user_id).await? {
            return Ok(user_template.template);
        }
        Ok((*self.default_template()).clone())
    }
}

impl Default for TemplateProvider {
    fn default() -> Self {
        Self::new()
    }
}
