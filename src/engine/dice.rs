// Dungeon Oracle — Dice
// `NdM` notation: N defaults to 1 and is clamped to 1..=20, M is clamped
// to 2..=1000. Anything else in the text is ignored.

use crate::atoms::constants::{DICE_MAX_COUNT, DICE_MAX_FACES, DICE_MIN_FACES};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static DICE_NOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d*)d(\d+)").expect("dice pattern is valid"));

pub const USAGE_HINT: &str = "Try roll d20, roll 2d6, or roll d24 if you're feeling cursed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceSpec {
    pub count: u32,
    pub faces: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub spec: DiceSpec,
    pub rolls: Vec<u32>,
}

impl DiceRoll {
    pub fn total(&self) -> u32 {
        self.rolls.iter().sum()
    }

    pub fn render(&self) -> String {
        let faces: Vec<String> = self.rolls.iter().map(|r| r.to_string()).collect();
        format!("🎲 Rolls: [{}] → {}\n{}", faces.join(", "), self.total(), flavor(&self.rolls, self.spec.faces))
    }
}

/// Digits too long for u64 saturate, then clamp like any other value.
fn clamp_digits(digits: &str, default: u64, min: u32, max: u32) -> u32 {
    let n = if digits.is_empty() { default } else { digits.parse::<u64>().unwrap_or(u64::MAX) };
    n.clamp(min as u64, max as u64) as u32
}

pub fn parse(text: &str) -> Option<DiceSpec> {
    let caps = DICE_NOTATION.captures(text)?;
    let count = clamp_digits(caps.get(1).map_or("", |m| m.as_str()), 1, 1, DICE_MAX_COUNT);
    let faces = clamp_digits(caps.get(2).map_or("", |m| m.as_str()), 0, DICE_MIN_FACES, DICE_MAX_FACES);
    Some(DiceSpec { count, faces })
}

pub fn roll_with<R: Rng + ?Sized>(spec: DiceSpec, rng: &mut R) -> DiceRoll {
    let rolls = (0..spec.count).map(|_| rng.gen_range(1..=spec.faces)).collect();
    DiceRoll { spec, rolls }
}

pub fn roll(spec: DiceSpec) -> DiceRoll {
    roll_with(spec, &mut rand::thread_rng())
}

/// One line of commentary: crits and fumbles first, then ratio bands.
pub fn flavor(rolls: &[u32], faces: u32) -> &'static str {
    if rolls.is_empty() || faces == 0 {
        return "The dice vanished. Suspicious.";
    }
    if let [r] = rolls {
        let r = *r;
        if r == faces {
            return "CRITICAL SUCCESS. The bards will not shut up about this.";
        }
        if r == 1 {
            return "CRITICAL FAILURE. Even the rats look embarrassed.";
        }
        let pct = r as f64 / faces as f64;
        return if pct >= 0.85 {
            "A shining triumph, if a bit sweaty."
        } else if pct >= 0.6 {
            "A competent display. Barely."
        } else if pct >= 0.35 {
            "A wobbling maybe; fate shrugs."
        } else {
            "A tragic whiff. The floor bites back."
        };
    }

    let crit = rolls.contains(&faces);
    let fail = rolls.contains(&1);
    match (crit, fail) {
        (true, false) => "At least one die struck gold. Fortune grins with too many teeth.",
        (false, true) => "Someone rolled a one; the gods required slapstick.",
        (true, true) => "Both glory and disaster: a statistically accurate life.",
        (false, false) => {
            let total: u64 = rolls.iter().map(|&r| r as u64).sum();
            let avg = total as f64 / (rolls.len() as f64 * faces as f64);
            if avg >= 0.75 {
                "The chorus sings. Today you are tall."
            } else if avg >= 0.5 {
                "Adequate chaos. Proceed with smug caution."
            } else if avg >= 0.3 {
                "The bones mutter: 'eh'."
            } else {
                "Entropy slaps your hand and steals your lunch."
            }
        }
    }
}
