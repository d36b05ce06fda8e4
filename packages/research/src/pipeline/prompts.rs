//! Prompts for the model-backed collaborators.

use crate::llm::CompletionRequest;
use crate::types::source::SearchResult;

/// System prompt for summarization. `{language}` is substituted.
pub const SUMMARIZE_SYSTEM_PROMPT: &str =
    "You are a helpful research assistant. You MUST output ONLY in {language}.";

/// Prompt for summarizing one source into points and a category.
pub const SUMMARIZE_PROMPT: &str = r#"Task: Summarize the following content in {language}.

Requirements:
1. LANGUAGE: The summary MUST be written in {language} ONLY. Do not use any other language for the summary text itself.
2. POINTS: Provide 3 to 5 key points as distinct sentences.
3. TERMS: If technical terms are used, include the original English term in parentheses (e.g., "생성형 AI (Generative AI)").
4. CATEGORY: Assign a category to this content (e.g., "Concept", "News", "Tutorial", "Industry Case", "Opinion", "Tool").

Format the output strictly as a JSON object with keys:
- "points": [list of strings]
- "category": "string"

Content:
{content}"#;

pub const RANK_SYSTEM_PROMPT: &str = "You are a precise ranking algorithm. Output valid JSON only.";

/// Prompt for scoring and deduplicating search candidates.
pub const RANK_PROMPT: &str = r#"You are a Search Relevance Ranker.

Query: "{query}"

Task:
1. Rank the following search results based on their relevance, information density, and credibility.
2. DEDUPLICATE: If multiple results convey the exact same information (e.g. same press release on different sites), keep only the best source and discard the others (score 0).
3. DIVERSITY: Prefer a diverse set of sources (e.g. mix of official docs, news, videos, community discussions).

Return a JSON object with a key "rankings" containing a list of objects.
Each object must have:
- "index": (int) the original index of the result [0, 1, ...]
- "score": (int) relevance score from 0 to 10. Give 0 if irrelevant or duplicate.
- "reason": (string) brief reason for the score

Results to Rank:
{candidates}"#;

/// Characters of each candidate's snippet shown to the ranker.
const RANK_SNIPPET_CHARS: usize = 200;

/// Build the summarization request. `content` is inserted last so text in it
/// is never mistaken for a placeholder.
pub fn format_summarize_prompt(content: &str, language: &str) -> CompletionRequest {
    CompletionRequest::new(
        SUMMARIZE_SYSTEM_PROMPT.replace("{language}", language),
        SUMMARIZE_PROMPT
            .replace("{language}", language)
            .replace("{content}", content),
    )
    .json()
}

/// Build the ranking request over indexed candidates.
pub fn format_rank_prompt(query: &str, candidates: &[SearchResult]) -> CompletionRequest {
    let listing = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let snippet: String = c
                .snippet
                .as_deref()
                .or(c.description.as_deref())
                .unwrap_or_default()
                .chars()
                .take(RANK_SNIPPET_CHARS)
                .collect();
            format!(
                "[{}] Title: {}\n    Snippet: {}\n    Source: {}\n",
                i, c.title, snippet, c.source_kind
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    CompletionRequest::new(
        RANK_SYSTEM_PROMPT,
        RANK_PROMPT
            .replace("{query}", query)
            .replace("{candidates}", &listing),
    )
    .json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::SourceKind;

    #[test]
    fn test_summarize_prompt_substitution() {
        let request = format_summarize_prompt("Body mentions {language} literally", "English");
        assert!(request.json_mode);
        assert!(request.system.ends_with("ONLY in English."));
        assert!(request.user.contains("Summarize the following content in English."));
        assert!(request.user.ends_with("Body mentions {language} literally"));
    }

    #[test]
    fn test_rank_prompt_lists_candidates() {
        let candidates = vec![
            SearchResult::new("https://a.com", "A", SourceKind::Web).with_snippet("x".repeat(500)),
            SearchResult::new("https://youtube.com/watch?v=1", "B", SourceKind::Video)
                .with_description("video"),
        ];
        let request = format_rank_prompt("rust async", &candidates);

        assert!(request.user.contains("Query: \"rust async\""));
        assert!(request.user.contains("[0] Title: A"));
        assert!(request.user.contains("[1] Title: B\n    Snippet: video\n    Source: video"));
        assert!(!request.user.contains(&"x".repeat(201)));
    }
}
