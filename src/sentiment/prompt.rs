// src/sentiment/prompt.rs
//! Prompt text for the sentiment extraction call.

use crate::ai_adapter::{ChatMessage, ChatRequest};

/// The exact sentence the model is told to reply with for off-topic input.
pub const REFUSAL_SENTENCE: &str =
    "I'm trained to answer questions on Finance and Foreign Exchanges. That question is outside my scope.";

pub const TEMPERATURE: f32 = 0.0;
pub const MAX_TOKENS: u32 = 1200;

const SYSTEM_PROMPT: &str = r#"You are a senior FX analyst with more than ten years of experience trading global currency markets through rate cycles, QE tapers, geopolitical shocks and central bank pivots.

Always reply with valid JSON and nothing else, using exactly these keys:
{
  "summary_points": [
    "**Headline-style summary** 1-2 sentences of cause, effect and market implication",
    "... exactly 5 items ..."
  ],
  "overall_sentiment": "Positive | Trending Positive | Neutral | Trending Negative | Negative",
  "sentiment_explainer": "2-3 sentences explaining the label",
  "counts": { "positive": 0, "neutral": 0, "negative": 0 }
}"#;

const INSTRUCTIONS: &str = r#"From the headlines below, extract exactly FIVE high-impact insights for currency traders and institutional investors.

Each insight must:
- open with a bold headline-style summary (**like this**),
- follow with 1-2 sentences naming the cause, the effect on specific currencies and what traders should watch next,
- focus on macro developments, central bank signals, inflation, geopolitical risk or surprise data.
Order the insights from broad macro themes to specific trade implications. Avoid vague takeaways such as "Fed to pause hikes".

Then assign an overall sentiment from exactly one of: Positive, Trending Positive, Neutral, Trending Negative, Negative.
Neutral is your last option, not your default: use it only if you truly cannot place the news in one of the other four.

Explain the label in 2-3 sentences grounded in the themes you identified (central bank tone, risk sentiment, data, market reaction).

Count the sentiment-bearing headlines as positive, neutral and negative.

Ignore any input unrelated to finance, macroeconomics or currency markets. If the headlines are off-topic (science, pop culture, general knowledge), reply only with:
"#;

/// Build the single request sent for a set of headline snippets.
pub fn build_request(snippets: &[String]) -> ChatRequest {
    let joined = snippets
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "{INSTRUCTIONS}\"{REFUSAL_SENTENCE}\"\n\nHere are the latest forex headlines:\n{joined}\n"
    );

    ChatRequest {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_contract_guard_and_snippets() {
        let req = build_request(&["Dollar firm — yields up".into(), "Yen weak — BoJ".into()]);
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, 1200);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert!(req.messages[0].content.contains("senior FX analyst"));
        for key in ["summary_points", "overall_sentiment", "sentiment_explainer", "counts"] {
            assert!(req.messages[0].content.contains(key), "missing {key}");
        }

        let user = &req.messages[1].content;
        assert!(user.contains(REFUSAL_SENTENCE));
        assert!(user.contains("last option"));
        assert!(user.ends_with("- Dollar firm — yields up\n- Yen weak — BoJ\n"));
    }
}
