use super::{Judge, MAX_SCORE, MIN_SCORE};
use crate::sources::Dice;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyword groups in the prompt and the maximum bonus each can add
const KEYWORD_BONUSES: &[(&[&str], f64)] = &[
    (&["red", "blue"], 2.0),
    (&["round"], 1.5),
    (&["text"], 1.5),
    (&["snack", "food"], 1.5),
];

/// Offline score: a random base in `[5, 8]` plus small random bonuses for
/// prompt keywords, clamped to `[1, 10]` and rounded to one decimal.
/// Looks only at the prompt, so any image data is accepted.
pub fn heuristic_score(prompt: &str, dice: &Dice) -> f64 {
    let mut score = 5.0 + dice.unit() * 3.0;

    let prompt = prompt.to_lowercase();
    for (keywords, max_bonus) in KEYWORD_BONUSES {
        if keywords.iter().any(|k| prompt.contains(k)) {
            score += dice.unit() * max_bonus;
        }
    }

    ((score * 10.0).round() / 10.0).clamp(MIN_SCORE, MAX_SCORE)
}

/// Judge that needs no network at all
#[derive(Debug, Clone)]
pub struct HeuristicJudge {
    dice: Arc<Dice>,
}

impl HeuristicJudge {
    pub fn new(dice: Arc<Dice>) -> Self {
        Self { dice }
    }
}

#[async_trait]
impl Judge for HeuristicJudge {
    async fn score(&self, prompt: &str, _image_data: &str) -> f64 {
        let score = heuristic_score(prompt, &self.dice);
        tracing::info!("Heuristic scored \"{}\": {}", prompt, score);
        score
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
