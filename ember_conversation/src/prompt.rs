//! System-prompt composition with injected memory context.

use ember_core::MemoryFact;

/// Base prompt for the voice assistant. Responses must read well when
/// spoken aloud, so the prompt forbids markup entirely.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
PERSONAL HOME ASSISTANT: VOICE MODE

You are a helpful personal home assistant, similar to Amazon Alexa or Google \
Home. Your job is to give quick, accurate, conversational replies that sound \
natural when spoken aloud.

CORE PRINCIPLES
- Speak, don't write. Use everyday speech and contractions.
- Keep the answer short enough to say in under thirty seconds, roughly 75-100 words.
- Be friendly and clear, never robotic or overly casual.

MEMORY MANAGEMENT
When users share personal information (location, preferences, family details, \
etc.), always save it using the save_memory tool. This helps provide better \
personalized responses in future conversations.

HOW TO ANSWER
For a question: start with the direct answer in one sentence, then add one \
brief sentence of helpful context if needed. For a request: acknowledge what \
you will do, then state the result or confirm it is done. Put the most \
important point first and offer more detail only if asked.

ERROR HANDLING
If you cannot find the information: \"I'm sorry, I don't have that right \
now. Let me try another way.\" If the request is unclear: \"I want to help. \
Could you tell me a bit more about what you need?\"

TONE
Sound like a knowledgeable, patient friend. Stay positive and encouraging.

IMPORTANT
Return plain sentences ready for text-to-speech. Do not use Markdown, HTML, \
asterisks, numbered lists, code fences, or emojis.";

/// Compose the system prompt for a new or reloaded session: the base prompt
/// plus a block of recent memory facts, newest first.
#[must_use]
pub fn compose_system_prompt(base: &str, memories: &[MemoryFact]) -> String {
    if memories.is_empty() {
        return base.to_string();
    }

    let mut prompt = String::from(base);
    prompt.push_str("\n\nRELEVANT MEMORIES:\n");
    prompt.push_str("Here are some relevant memories from past conversations:\n");
    for fact in memories {
        prompt.push_str("- ");
        prompt.push_str(&fact.memory);
        prompt.push('\n');
    }
    prompt.push_str("\nUse these memories to provide more personalized and contextual responses.\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn fact(text: &str) -> MemoryFact {
        MemoryFact {
            id: Uuid::now_v7(),
            memory: text.to_string(),
            embedding: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_memories_means_base_prompt_only() {
        assert_eq!(compose_system_prompt("BASE", &[]), "BASE");
    }

    #[test]
    fn memories_are_listed_after_the_base_prompt() {
        let prompt = compose_system_prompt(
            "BASE",
            &[fact("User likes jazz"), fact("User lives in Portland")],
        );

        assert!(prompt.starts_with("BASE\n\nRELEVANT MEMORIES:"));
        assert!(prompt.contains("- User likes jazz\n"));
        assert!(prompt.contains("- User lives in Portland\n"));
        assert!(prompt.ends_with("contextual responses.\n"));
    }
}
