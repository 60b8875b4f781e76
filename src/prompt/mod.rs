//! Prompt assembly
//!
//! Builds the text sent to the model in a fixed order: instructions, worked
//! examples, retrieved context, recent conversation, the question, and the
//! answer cue. Sections are separated by blank lines.
//!
//! When a character budget is set and the prompt exceeds it, the oldest
//! conversation turns go first, then context is cut from the least relevant
//! chunk backwards. Instructions, examples and the question are never cut.

mod templates;

pub use templates::{FEW_SHOT_EXAMPLES, SYSTEM_INSTRUCTIONS};

use crate::chunking::Chunk;
use crate::config::PromptConfig;
use crate::session::{ChatTurn, Role};
use std::fmt;
use templates::*;
use tracing::debug;

/// Assembled prompt text plus what went into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    context_chunks: usize,
    history_turns: usize,
    truncated: bool,
}

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Chunks that made it into the context block (possibly shortened)
    pub fn context_chunks(&self) -> usize {
        self.context_chunks
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    /// Whether anything was dropped or shortened to meet the budget
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Size limits applied during assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    /// `None` for unlimited
    pub max_chars: Option<usize>,
    pub max_history_turns: usize,
}

impl PromptBudget {
    pub fn unlimited() -> Self {
        Self {
            max_chars: None,
            max_history_turns: usize::MAX,
        }
    }
}

impl From<&PromptConfig> for PromptBudget {
    fn from(config: &PromptConfig) -> Self {
        Self {
            max_chars: (config.max_chars > 0).then_some(config.max_chars),
            max_history_turns: config.max_history_turns,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ContextBlock<'a> {
    label: Option<&'a str>,
    text: &'a str,
}

/// Sections still in play during truncation
struct Draft<'a> {
    instructions: &'a str,
    few_shot: &'a str,
    context: Vec<ContextBlock<'a>>,
    history: Vec<&'a ChatTurn>,
    query: &'a str,
}

impl Draft<'_> {
    fn render(&self) -> String {
        let mut sections: Vec<String> = Vec::with_capacity(6);
        sections.push(self.instructions.to_string());
        if !self.few_shot.is_empty() {
            sections.push(self.few_shot.to_string());
        }
        sections.push(self.render_context());
        if !self.history.is_empty() {
            sections.push(self.render_history());
        }
        sections.push(format!("{QUESTION_HEADER}\n{}", self.query));
        sections.push(ANSWER_HEADER.to_string());
        sections.join("\n\n")
    }

    fn render_context(&self) -> String {
        if self.context.is_empty() {
            return format!("{CONTEXT_HEADER}\n{NO_CONTEXT}");
        }
        let body = self
            .context
            .iter()
            .map(|block| match block.label {
                Some(label) => format!("[{label}]\n{}", block.text),
                None => block.text.to_string(),
            })
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
        format!("{CONTEXT_HEADER}\n{body}")
    }

    fn render_history(&self) -> String {
        let lines = self
            .history
            .iter()
            .map(|turn| match turn.role {
                Role::User => format!("User: {}", turn.text.trim()),
                _ => format!("Assistant: {}", turn.text.trim()),
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("{CONVERSATION_HEADER}\n{lines}")
    }

    /// Cut `excess` characters, least relevant context first.
    /// Returns false once there is nothing left to cut.
    fn cut_context(&mut self, excess: usize) -> bool {
        let Some(last) = self.context.last_mut() else {
            return false;
        };
        let len = last.text.chars().count();
        if len <= excess {
            self.context.pop();
        } else {
            let keep = len - excess;
            let end = last
                .text
                .char_indices()
                .nth(keep)
                .map(|(i, _)| i)
                .unwrap_or(last.text.len());
            last.text = &last.text[..end];
        }
        true
    }
}

/// Prompt assembler with fixed instruction text and a size budget
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    instructions: String,
    few_shot: String,
    budget: PromptBudget,
}

impl PromptAssembler {
    /// Assembler using the built-in instructions and examples
    pub fn new(budget: PromptBudget) -> Self {
        Self::with_templates(SYSTEM_INSTRUCTIONS, FEW_SHOT_EXAMPLES, budget)
    }

    pub fn with_templates(
        instructions: impl Into<String>,
        few_shot: impl Into<String>,
        budget: PromptBudget,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            few_shot: few_shot.into(),
            budget,
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(PromptBudget::from(config))
    }

    pub fn budget(&self) -> PromptBudget {
        self.budget
    }

    /// Assemble a prompt. `chunks` are ordered most relevant first;
    /// `history` must not contain the question being asked.
    pub fn assemble(&self, chunks: &[Chunk], history: &[ChatTurn], query: &str) -> Prompt {
        let conversation: Vec<&ChatTurn> = history
            .iter()
            .filter(|turn| turn.role != Role::Error)
            .collect();
        let skip = conversation
            .len()
            .saturating_sub(self.budget.max_history_turns);

        let mut draft = Draft {
            instructions: self.instructions.trim(),
            few_shot: self.few_shot.trim(),
            context: chunks
                .iter()
                .map(|c| ContextBlock {
                    label: c.label.as_deref(),
                    text: c.text.trim(),
                })
                .filter(|block| !block.text.is_empty())
                .collect(),
            history: conversation[skip..].to_vec(),
            query: query.trim(),
        };

        let mut text = draft.render();
        let mut truncated = false;

        if let Some(max_chars) = self.budget.max_chars {
            loop {
                let len = text.chars().count();
                if len <= max_chars {
                    break;
                }
                let cut = if !draft.history.is_empty() {
                    draft.history.remove(0);
                    true
                } else {
                    draft.cut_context(len - max_chars)
                };
                if !cut {
                    debug!("Fixed prompt sections exceed budget of {} chars", max_chars);
                    break;
                }
                truncated = true;
                text = draft.render();
            }
        }

        if truncated {
            debug!(
                "Prompt truncated to {} chars ({} chunks, {} turns)",
                text.chars().count(),
                draft.context.len(),
                draft.history.len()
            );
        }

        Prompt {
            text,
            context_chunks: draft.context.len(),
            history_turns: draft.history.len(),
            truncated,
        }
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(PromptBudget::unlimited())
    }
}

/// Assemble without limits from explicit instruction text
pub fn assemble(
    system_instructions: &str,
    few_shot: &str,
    chunks: &[Chunk],
    history: &[ChatTurn],
    query: &str,
) -> Prompt {
    PromptAssembler::with_templates(system_instructions, few_shot, PromptBudget::unlimited())
        .assemble(chunks, history, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("fn load() {}", 0, Some("src/config.rs".to_string())),
            Chunk::new("  fn save() {}\n", 12, None),
        ]
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?}"))
    }

    #[test]
    fn test_section_order() {
        let history = vec![
            ChatTurn::user("What is this?"),
            ChatTurn::assistant("A config loader."),
        ];
        let prompt = PromptAssembler::default().assemble(&chunks(), &history, "Where is save?");
        let text = prompt.as_str();

        let order = [
            position(text, "highly-capable coding assistant"),
            position(text, "Example 1:"),
            position(text, CONTEXT_HEADER),
            position(text, CONVERSATION_HEADER),
            position(text, QUESTION_HEADER),
            position(text, ANSWER_HEADER),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(text.ends_with(ANSWER_HEADER));
        assert!(text.contains("[src/config.rs]\nfn load() {}\n\n---\n\nfn save() {}"));
        assert!(text.contains("User: What is this?\nAssistant: A config loader."));
        assert!(text.contains("### User Question\nWhere is save?"));
        assert!(!prompt.truncated());
    }

    #[test]
    fn test_free_function_matches_original_layout() {
        let prompt = assemble(
            "SYS",
            "SHOTS",
            &[Chunk::new("ctx a", 0, None), Chunk::new("ctx b", 5, None)],
            &[],
            "q?",
        );
        assert_eq!(
            prompt.as_str(),
            "SYS\n\nSHOTS\n\n### Repository Context\nctx a\n\n---\n\nctx b\n\n### User Question\nq?\n\n### Your Answer"
        );
    }

    #[test]
    fn test_error_turns_and_history_window() {
        let history = vec![
            ChatTurn::user("first"),
            ChatTurn::assistant("first answer"),
            ChatTurn::user("second"),
            ChatTurn::error("model unreachable"),
            ChatTurn::user("third"),
            ChatTurn::assistant("third answer"),
        ];
        let budget = PromptBudget {
            max_chars: None,
            max_history_turns: 3,
        };
        let prompt = PromptAssembler::new(budget).assemble(&[], &history, "fourth");
        let text = prompt.as_str();

        assert!(!text.contains("model unreachable"));
        assert!(!text.contains("first"));
        assert!(text.contains("User: second\nUser: third\nAssistant: third answer"));
        assert_eq!(prompt.history_turns(), 3);
        assert!(text.contains(NO_CONTEXT));
    }

    #[test]
    fn test_budget_drops_oldest_history_first() {
        let history = vec![
            ChatTurn::user("oldest question"),
            ChatTurn::assistant("oldest answer"),
            ChatTurn::user("newest question"),
            ChatTurn::assistant("newest answer"),
        ];
        let full = PromptAssembler::default().assemble(&chunks(), &history, "q");
        let budget = PromptBudget {
            max_chars: Some(full.char_len() - 5),
            max_history_turns: usize::MAX,
        };

        let prompt = PromptAssembler::new(budget).assemble(&chunks(), &history, "q");
        let text = prompt.as_str();

        assert!(prompt.truncated());
        assert!(!text.contains("oldest question"));
        assert!(text.contains("oldest answer"));
        assert!(text.contains("newest answer"));
        assert_eq!(prompt.context_chunks(), 2);
        assert!(text.contains("fn save() {}"));
    }

    #[test]
    fn test_budget_shortens_last_chunk() {
        let context = vec![
            Chunk::new("x".repeat(50), 0, None),
            Chunk::new("q".repeat(50), 50, None),
        ];
        let full = PromptAssembler::default().assemble(&context, &[], "why");
        let budget = PromptBudget {
            max_chars: Some(full.char_len() - 10),
            max_history_turns: usize::MAX,
        };

        let prompt = PromptAssembler::new(budget).assemble(&context, &[], "why");
        assert_eq!(prompt.char_len(), full.char_len() - 10);
        assert!(prompt.as_str().contains(&"x".repeat(50)));
        assert!(prompt.as_str().contains(&"q".repeat(40)));
        assert!(!prompt.as_str().contains(&"q".repeat(41)));
    }

    #[test]
    fn test_budget_drops_exhausted_chunk() {
        let context = vec![
            Chunk::new("x".repeat(50), 0, None),
            Chunk::new("q".repeat(50), 50, None),
        ];
        let full = PromptAssembler::default().assemble(&context, &[], "why");
        let budget = PromptBudget {
            max_chars: Some(full.char_len() - 60),
            max_history_turns: usize::MAX,
        };

        let prompt = PromptAssembler::new(budget).assemble(&context, &[], "why");
        assert_eq!(prompt.context_chunks(), 1);
        assert!(!prompt.as_str().contains("qqq"));
        assert!(prompt.as_str().contains(&"x".repeat(47)));
        assert!(!prompt.as_str().contains(&"x".repeat(48)));
        assert!(prompt.char_len() <= full.char_len() - 60);
    }

    #[test]
    fn test_fixed_sections_over_budget() {
        let history = vec![ChatTurn::user("earlier"), ChatTurn::assistant("reply")];
        let budget = PromptBudget {
            max_chars: Some(10),
            max_history_turns: usize::MAX,
        };

        let prompt = PromptAssembler::new(budget).assemble(&chunks(), &history, "the question");
        assert!(prompt.truncated());
        assert_eq!(prompt.context_chunks(), 0);
        assert_eq!(prompt.history_turns(), 0);
        assert!(prompt.as_str().contains("the question"));
        assert!(prompt.as_str().contains("Example 2:"));
    }

    #[test]
    fn test_from_config_zero_is_unlimited() {
        let budget = PromptBudget::from(&PromptConfig {
            max_chars: 0,
            max_history_turns: 4,
        });
        assert_eq!(budget.max_chars, None);
        assert_eq!(budget.max_history_turns, 4);
    }
}
