//! System prompt assembly: a fixed base per conversation type plus a
//! dynamic fragment derived from the turn's context.

use std::fmt::Write as _;

use crate::context::AgentContext;

pub(crate) const JOURNALING_BASE_PROMPT: &str = "\
You are Quill, a journaling assistant. You MUST call tools for all journaling requests.

MANDATORY TOOL USAGE:
- When the user shares anything worth journaling (thoughts, feelings, activities, trades): call structure_journal with their text.
- When the user explicitly asks to save, finalize, or complete the entry: call save_journal with confirm=true. Never call it without an explicit cue in the user's words.
- When the user mentions things they need to do, or asks about their task list: use the task tools.
- When you learn something durable about the user (goals, challenges, vocabulary): call update_preferences.

Examples:
- \"hi, I want to journal\" -> no content yet, ask what's on their mind
- \"I am sad because the market is down\" -> structure_journal(text=\"I am sad because the market is down\")
- \"save it\" / \"please finalize\" -> save_journal(confirm=true)

After the tools run, reply naturally in the user's preferred feedback style. Keep replies short and warm; never recite tool output verbatim.";

pub(crate) const GENERAL_BASE_PROMPT: &str = "\
You are Quill, a helpful assistant. Provide clear, direct answers to the user's questions.";

/// Compose the full system prompt for one turn.
#[must_use]
pub fn system_prompt(base: &str, ctx: &AgentContext) -> String {
    let mut prompt = base.to_owned();

    let _ = write!(
        prompt,
        "\n\nFeedback style: {}.",
        ctx.preferences.preferred_feedback_style.as_str()
    );
    if let Some(ref purpose) = ctx.preferences.purpose_statement {
        let _ = write!(prompt, "\nThe user journals because: {purpose}");
    }
    if !ctx.preferences.long_term_goals.is_empty() {
        let _ = write!(
            prompt,
            "\nLong-term goals to keep in mind: {}.",
            ctx.preferences.long_term_goals.join("; ")
        );
    }
    if !ctx.preferences.personal_glossary.is_empty() {
        prompt.push_str("\nPersonal glossary:");
        for (term, meaning) in &ctx.preferences.personal_glossary {
            let _ = write!(prompt, "\n  {term}: {meaning}");
        }
    }

    let empty = ctx.empty_sections();
    if empty.is_empty() {
        prompt.push_str("\n\nEvery template section already has content in the current draft.");
    } else {
        let _ = write!(
            prompt,
            "\n\nTemplate sections still empty in the current draft: {}. \
             When it fits naturally, encourage the user to cover them.",
            empty.join(", ")
        );
    }
    prompt
}
