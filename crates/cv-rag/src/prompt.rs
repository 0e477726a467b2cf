//! System prompt composition
//!
//! The template frames the assistant as representing a named individual's
//! professional profile, answering from the supplied context and declining
//! gracefully outside it.

use cv_core::LlmConfig;

/// Who the assistant speaks for.
#[derive(Debug, Clone)]
pub struct ProfileIdentity {
    /// The person's name
    pub owner: String,

    /// Their professional title
    pub title: String,
}

impl ProfileIdentity {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            owner: config.owner.clone(),
            title: config.owner_title.clone(),
        }
    }
}

/// Build the system prompt from retrieved context chunks.
///
/// Chunks are joined with a blank line; an empty chunk list produces the same
/// template with an empty context section.
pub fn compose_prompt(context_chunks: &[String], identity: &ProfileIdentity) -> String {
    let context = context_chunks.join("\n\n");
    let owner = &identity.owner;
    let title = &identity.title;
    let first_name = owner.split_whitespace().next().unwrap_or(owner);

    format!(
        "You are an AI assistant representing {owner}, {article} {title}. \n\
         Use the following information about his professional background to answer questions accurately and professionally.\n\
         \n\
         PROFESSIONAL INFORMATION:\n\
         {context}\n\
         \n\
         Respond as if you are representing {first_name}'s professional profile to potential employers or recruiters. \
         Be helpful, accurate, and professional. If asked about something not covered in the provided information, \
         acknowledge that politely and offer to clarify what information is available.",
        article = article_for(title),
    )
}

fn article_for(title: &str) -> &'static str {
    match title.chars().next() {
        Some(c) if "aeiouAEIOU".contains(c) => "an",
        _ => "a",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ProfileIdentity {
        ProfileIdentity {
            owner: "Mariano Elorga".to_string(),
            title: "AWS Solutions Architect".to_string(),
        }
    }

    #[test]
    fn test_context_appears_verbatim() {
        let chunks = vec!["Hello world".to_string()];
        let prompt = compose_prompt(&chunks, &identity());
        assert!(prompt.contains("PROFESSIONAL INFORMATION:\nHello world"));
    }

    #[test]
    fn test_chunks_joined_with_blank_line() {
        let chunks = vec!["first".to_string(), "second".to_string()];
        let prompt = compose_prompt(&chunks, &identity());
        assert!(prompt.contains("first\n\nsecond"));
    }

    #[test]
    fn test_identity_interpolated() {
        let prompt = compose_prompt(&[], &identity());
        assert!(prompt.contains("representing Mariano Elorga, an AWS Solutions Architect"));
        assert!(prompt.contains("Mariano's professional profile"));
    }

    #[test]
    fn test_empty_context_still_templated() {
        let prompt = compose_prompt(&[], &identity());
        assert!(prompt.contains("PROFESSIONAL INFORMATION:"));
        assert!(prompt.contains("decline") || prompt.contains("acknowledge that politely"));
    }
}
