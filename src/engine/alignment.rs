// Dungeon Oracle — Alignment inference
// Planning vocabulary nudges LAWFUL, improvisation vocabulary nudges
// CHAOTIC; both or neither is NEUTRAL. Substring match on lowercase text.

use crate::atoms::types::Alignment;

const LAWFUL_WORDS: &[&str] = &["policy", "plan", "process", "deadline", "sprint"];
const CHAOTIC_WORDS: &[&str] = &["idk", "wing", "gamble", "chaos", "yolo", "improvise"];

pub fn infer_alignment(text: &str) -> Alignment {
    let t = text.to_lowercase();
    let mut score = 0i32;
    if LAWFUL_WORDS.iter().any(|w| t.contains(w)) {
        score += 1;
    }
    if CHAOTIC_WORDS.iter().any(|w| t.contains(w)) {
        score -= 1;
    }
    match score {
        s if s > 0 => Alignment::Lawful,
        s if s < 0 => Alignment::Chaotic,
        _ => Alignment::Neutral,
    }
}
