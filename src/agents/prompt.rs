//! Role instructions and per-call prompt assembly.

use super::types::{ResearchFindings, Topic};
use crate::tools::SearchHit;

pub const RESEARCHER_INSTRUCTION: &str = r#"You are an expert researcher. Your goal is to gather comprehensive and accurate information on the user's topic.

## Rules
1. Base your summary on the search results provided, when there are any.
2. Prefer concrete facts: names, dates, figures, mechanisms.
3. Distinguish established facts from interpretation.
4. If you receive feedback that earlier research was insufficient, research the topic again and address every point it raises.

## Response
Reply with a clear, well-organized summary of your findings in plain prose or bullet points. Do not add commentary about the process."#;

pub const JUDGE_INSTRUCTION: &str = r#"You are a strict editor and fact-checker.

Evaluate the research findings against the user's original request and decide whether they are sufficient to build a high-quality course module.

- If they are good enough, answer with status "pass" and a brief confirmation as feedback.
- If they are missing key information, too vague, or likely inaccurate, answer with status "fail" and specific, constructive feedback on what to research next.

Answer only with a JSON object of the form {"status": "pass" | "fail", "feedback": "..."}."#;

pub const CONTENT_BUILDER_INSTRUCTION: &str = r#"You are an expert course creator. Transform the approved research findings into a well-structured, engaging course module.

## Formatting Rules
1. Start with a main title using a single `#` (H1).
2. Use `##` (H2) for main section headings. These are used for the table of contents.
3. Use bullet points and clear paragraphs.
4. Maintain a professional but engaging tone.

Make sure the content directly addresses the user's original request. Reply with the Markdown document only."#;

/// User turn for a research attempt.
pub fn research_prompt(topic: &Topic, prior_feedback: Option<&str>, hits: &[SearchHit]) -> String {
    let mut prompt = format!("## Topic\n{}\n", topic);

    if let Some(feedback) = prior_feedback {
        prompt.push_str(
            "\n## Reviewer Feedback\nEarlier research on this topic was judged insufficient. \
             Research the topic again, addressing this feedback:\n",
        );
        prompt.push_str(feedback);
        prompt.push('\n');
    }

    if hits.is_empty() {
        prompt.push_str("\n## Search Results\nNo search results are available. Rely on what you know about the topic.\n");
    } else {
        prompt.push_str("\n## Search Results\n");
        for (i, hit) in hits.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. **{}**\n   {}\n   URL: {}\n",
                i + 1,
                hit.title,
                hit.snippet,
                hit.url
            ));
        }
    }

    prompt
}

/// Search queries for a research attempt: the topic, plus a feedback-focused query on retries.
pub fn search_queries(topic: &Topic, prior_feedback: Option<&str>) -> Vec<String> {
    let mut queries = vec![topic.as_str().to_string()];
    if let Some(feedback) = prior_feedback {
        let focus: String = feedback
            .split_whitespace()
            .take(MAX_FEEDBACK_QUERY_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        if !focus.is_empty() {
            queries.push(format!("{} {}", topic, focus));
        }
    }
    queries
}

const MAX_FEEDBACK_QUERY_WORDS: usize = 24;

/// User turn for the judge.
pub fn judge_prompt(topic: &Topic, findings: &ResearchFindings) -> String {
    format!(
        "## Original Request\n{}\n\n## Research Findings\n{}\n",
        topic,
        findings.as_str()
    )
}

/// User turn for the content builder.
pub fn build_prompt(topic: &Topic, findings: &ResearchFindings) -> String {
    format!(
        "## Original Request\n{}\n\n## Approved Research Findings\n{}\n",
        topic,
        findings.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        Topic::parse("History of the Roman aqueducts").unwrap()
    }

    #[test]
    fn first_attempt_has_no_feedback_section() {
        let prompt = research_prompt(&topic(), None, &[]);
        assert!(prompt.contains("History of the Roman aqueducts"));
        assert!(!prompt.contains("Reviewer Feedback"));
        assert!(prompt.contains("No search results are available"));
    }

    #[test]
    fn retry_carries_feedback_verbatim() {
        let feedback = "Missing: construction dates of Aqua Marcia.";
        let hits = vec![SearchHit {
            title: "Aqua Marcia".into(),
            snippet: "Built 144-140 BC.".into(),
            url: "https://example.org/marcia".into(),
        }];
        let prompt = research_prompt(&topic(), Some(feedback), &hits);
        assert!(prompt.contains("Research the topic again, addressing this feedback"));
        assert!(!prompt.contains("previous research"));
        assert!(prompt.contains(feedback));
        assert!(prompt.contains("1. **Aqua Marcia**"));
    }

    #[test]
    fn retries_add_a_feedback_query() {
        assert_eq!(search_queries(&topic(), None).len(), 1);
        let queries = search_queries(&topic(), Some("  add   engineering details "));
        assert_eq!(
            queries,
            vec![
                "History of the Roman aqueducts".to_string(),
                "History of the Roman aqueducts add engineering details".to_string(),
            ]
        );
        assert_eq!(search_queries(&topic(), Some("   ")).len(), 1);
    }
}
