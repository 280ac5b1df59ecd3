use crate::sources::Dice;

/// Photo challenges handed out at the start of a round
pub const GAME_PROMPTS: &[&str] = &[
    "Show me something red",
    "Find a round object",
    "Show me something that makes you happy",
    "Find something with text on it",
    "Show me something blue",
    "Find something made of wood",
    "Show me your favorite snack",
    "Find something soft",
    "Show me something that reflects light",
    "Find something with buttons",
];

/// Draw a prompt uniformly at random
pub fn random_prompt(dice: &Dice) -> &'static str {
    GAME_PROMPTS[dice.index(GAME_PROMPTS.len())]
}
