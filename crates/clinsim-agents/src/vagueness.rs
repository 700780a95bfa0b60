//! Case record obfuscation.
//!
//! The patient should not answer from the full clinical record, so the
//! record is degraded in two steps: a lexical dropout pass that deletes
//! segments around randomly chosen positions (biased towards numbers,
//! so dates and measurements go missing first), then an oracle rewrite
//! into the imprecise phrasing a layperson would actually use.

use clinsim_protocols::LanguageModel;
use tracing::debug;

use crate::error::AgentError;
use crate::prompts::PromptTemplates;
use crate::rng::SeededRng;

/// Splits text into punctuation tokens and runs of word/space characters,
/// preserving order and content. `"a,b"` becomes `["a", ",", "b"]`.
pub fn split_by_punctuation(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run = String::new();
    for c in text.chars() {
        let is_word = c.is_alphanumeric() || c.is_whitespace() || c == '_';
        if is_word {
            run.push(c);
        } else {
            if !run.is_empty() {
                tokens.push(std::mem::take(&mut run));
            }
            tokens.push(c.to_string());
        }
    }
    if !run.is_empty() {
        tokens.push(run);
    }
    tokens
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn is_letters(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

fn random_dropout(tokens: &[String], rng: &mut SeededRng, dropout: f32) -> Vec<String> {
    let selected = rng.sample_positions(tokens.len(), dropout);
    let mut to_delete = std::collections::BTreeSet::new();

    for pos in selected {
        let token = &tokens[pos];
        if is_digits(token) {
            // Numbers take their trailing units with them.
            to_delete.insert(pos);
            if pos + 1 < tokens.len() {
                to_delete.insert(pos + 1);
            }
            if pos + 2 < tokens.len() {
                to_delete.insert(pos + 2);
            }
        } else if is_letters(token) {
            if pos >= 2 && is_digits(&tokens[pos - 2]) {
                to_delete.insert(pos - 2);
            }
            to_delete.insert(pos);
        } else {
            if pos >= 1 && is_digits(&tokens[pos - 1]) {
                to_delete.insert(pos - 1);
            }
            if pos + 1 < tokens.len() {
                to_delete.insert(pos + 1);
            }
        }
    }

    tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| !to_delete.contains(i))
        .map(|(_, t)| t.clone())
        .collect()
}

/// Lexical dropout pass: deletes roughly `dropout` of the segments.
pub fn dropout_vague(text: &str, rng: &mut SeededRng, dropout: f32) -> String {
    let tokens = split_by_punctuation(text);
    random_dropout(&tokens, rng, dropout).concat()
}

/// Full obfuscation: dropout followed by an oracle rewrite into vague,
/// colloquial phrasing.
pub async fn obfuscate(
    resource: &str,
    oracle: &dyn LanguageModel,
    prompts: &PromptTemplates,
    rng: &mut SeededRng,
    dropout: f32,
) -> Result<String, AgentError> {
    let degraded = dropout_vague(resource, rng, dropout);
    debug!(
        original_len = resource.chars().count(),
        degraded_len = degraded.chars().count(),
        "applied dropout to case record"
    );
    let prompt = prompts.render("vagueness", &[("information", &degraded)])?;
    let vague = oracle.generate(&prompt).await?;
    Ok(vague)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinsim_protocols::ScriptedModel;

    #[test]
    fn test_split_preserves_content() {
        let text = "发热3天，咳嗽。T 38.5℃";
        let tokens = split_by_punctuation(text);
        assert_eq!(tokens.concat(), text);
    }

    #[test]
    fn test_split_isolates_punctuation() {
        let tokens = split_by_punctuation("a,b");
        assert_eq!(tokens, vec!["a", ",", "b"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_by_punctuation("").is_empty());
    }

    #[test]
    fn test_dropout_zero_keeps_everything() {
        let mut rng = SeededRng::new(1);
        let text = "患者发热3天，咳嗽咳痰，无胸痛。";
        assert_eq!(dropout_vague(text, &mut rng, 0.0), text);
    }

    #[test]
    fn test_dropout_removes_content() {
        let mut rng = SeededRng::new(1);
        let text = "患者, 男, 45, 岁, 发热, 3, 天, 咳嗽, 咳痰, 无, 胸痛, 心悸, 气短, 病程, 记录";
        let degraded = dropout_vague(text, &mut rng, 0.5);
        assert!(degraded.chars().count() < text.chars().count());
    }

    #[test]
    fn test_dropout_deterministic_per_seed() {
        let text = "发热3天，咳嗽咳痰，无胸痛心悸。体温38.5度。";
        let a = dropout_vague(text, &mut SeededRng::new(9), 0.3);
        let b = dropout_vague(text, &mut SeededRng::new(9), 0.3);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_obfuscate_uses_oracle_rewrite() {
        let oracle = ScriptedModel::always("大概发烧了几天，具体记不清了");
        let prompts = PromptTemplates::defaults();
        let mut rng = SeededRng::new(5);

        let vague = obfuscate("发热3天，咳嗽。", &oracle, &prompts, &mut rng, 0.3)
            .await
            .unwrap();
        assert_eq!(vague, "大概发烧了几天，具体记不清了");
        // The prompt carried the degraded record, not the template name.
        let prompts_seen = oracle.prompts();
        assert!(prompts_seen[0].contains("发"));
    }
}
