// Dungeon Oracle — Prompt Assembly
// Persona + chaos framing + curated memories → system context; the user's
// question (and active quest) → user context. Every piece of stored text
// is sanitized again here before it is replayed.

use crate::atoms::error::EngineResult;
use crate::engine::sanitize::clean_text;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub tone: String,
    pub rating: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub voice: Voice,
    #[serde(default)]
    pub style_rules: Vec<String>,
    #[serde(default)]
    pub advice_structure: Vec<String>,
}

impl Default for Persona {
    fn default() -> Self {
        Persona {
            name: "the Dungeon AI".into(),
            description: "an ancient, sardonic dungeon master who has watched a thousand parties wipe.".into(),
            voice: Voice { tone: "theatrical, dry, quietly fond of the adventurer".into(), rating: "PG-13".into() },
            style_rules: vec![
                "Stay in character; never mention being a language model.".into(),
                "Keep replies under 180 words.".into(),
                "Mock the situation, never the person.".into(),
                "Refuse anything harmful, in character, and offer a safer path.".into(),
            ],
            advice_structure: vec![
                "Read the room: one line naming the real problem.".into(),
                "The plan: two or three concrete steps.".into(),
                "The twist: one risk to watch for.".into(),
                "Optional: an ACHIEVEMENT box if they earned one.".into(),
            ],
        }
    }
}

impl Persona {
    /// Read a persona JSON file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let persona: Persona = serde_json::from_str(&raw)?;
        info!("[config] Persona '{}' loaded from {}", persona.name, path.display());
        Ok(persona)
    }

    /// `load` when a path is configured, the built-in persona otherwise.
    pub fn load_or_default(path: Option<&Path>) -> EngineResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Persona::default()),
        }
    }

    fn header(&self) -> String {
        if self.description.is_empty() {
            format!("You are {}.", self.name)
        } else {
            format!("You are {}, {}", self.name, self.description)
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|s| format!("- {}", s)).collect::<Vec<_>>().join("\n")
}

/// System context for advice and continuation replies.
pub fn build_system_prompt(persona: &Persona, memories: &[String], chaos: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", persona.header());
    let _ = writeln!(out, "Voice: {} (rating: {}).", persona.voice.tone, persona.voice.rating);
    let _ = writeln!(
        out,
        "Chaos Meter: {:.2} (0=stoic, 1.0=spicy, 1.5=unhinged-but-safe). As chaos rises, lean into theatrical \
         narration and sarcastic flair, but keep advice concrete and refusals safe.",
        chaos
    );
    if !persona.style_rules.is_empty() {
        let _ = write!(out, "\nStyle rules:\n{}\n", bullet_list(&persona.style_rules));
    }
    if !persona.advice_structure.is_empty() {
        let _ = write!(out, "\nIf giving advice, follow this structure:\n{}\n", bullet_list(&persona.advice_structure));
    }

    let cleaned: Vec<String> = memories.iter().map(|m| clean_text(m)).filter(|m| !m.is_empty()).collect();
    out.push_str("\nRecent party memories (short notes for callbacks):\n");
    if cleaned.is_empty() {
        out.push_str("None recorded.");
    } else {
        out.push_str(&bullet_list(&cleaned));
    }
    out
}

/// User context for an advice question.
pub fn build_user_prompt(display_name: &str, question: &str, active_quest: Option<&str>) -> String {
    let mut out = format!("Adventurer @{} asks:\n\"{}\"", display_name, question.trim());
    if let Some(q) = active_quest.map(clean_text).filter(|q| !q.is_empty()) {
        let _ = write!(out, "\nRelated active quest: {}", q);
    }
    out.push_str(
        "\n\nRespond in character. Include an ACHIEVEMENT box only if this is a meaningful action.",
    );
    out
}

/// System and user context asking for one fresh quest hook.
pub fn build_quest_prompts(persona: &Persona, chaos: f64) -> (String, String) {
    let system = format!(
        "{}\nVoice: {}.\nQuest hook request. Chaos meter {:.2} (0=restrained, 1=spicy, 1.5=absurd). Higher chaos \
         should lean into weirder stakes, uncanny details or surreal NPC motives.\n\n\
         Task: craft one NEW quest hook for an adventuring party.\n\
         - 1 or 2 sentences, vivid, immediately playable.\n\
         - No ACHIEVEMENT boxes, no bullet points, no meta commentary.\n\
         - Output ONLY the quest hook text.",
        persona.header(),
        persona.voice.tone,
        chaos
    );
    let user = "Deliver a brand-new quest hook that hints at a conflict, an unusual locale or relic, and a quirky \
                twist. Stay under 50 words."
        .to_string();
    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_chaos_and_clean_memories() {
        let p = Persona::default();
        let mems = vec![
            "Active quest: find the bell".to_string(),
            "🏆 ACHIEVEMENT UNLOCKED: x\nReward: y".to_string(),
        ];
        let s = build_system_prompt(&p, &mems, 0.734);
        assert!(s.contains("Chaos Meter: 0.73"));
        assert!(s.contains("- Active quest: find the bell"));
        assert!(!s.contains("ACHIEVEMENT UNLOCKED"));
        assert!(s.starts_with("You are the Dungeon AI"));
    }

    #[test]
    fn no_memories_is_stated() {
        let s = build_system_prompt(&Persona::default(), &[], 0.5);
        assert!(s.ends_with("None recorded."));
    }

    #[test]
    fn user_prompt_mentions_quest_only_when_present() {
        let with = build_user_prompt("vex", "How do I sneak?", Some("Steal  the\nledger"));
        assert!(with.contains("@vex asks:\n\"How do I sneak?\""));
        assert!(with.contains("Related active quest: Steal the ledger"));
        let without = build_user_prompt("vex", "How do I sneak?", None);
        assert!(!without.contains("Related active quest"));
    }

    #[test]
    fn quest_prompt_carries_chaos() {
        let (system, user) = build_quest_prompts(&Persona::default(), 1.3);
        assert!(system.contains("Chaos meter 1.30"));
        assert!(user.contains("under 50 words"));
    }

    #[test]
    fn persona_json_fills_optional_fields() {
        let p: Persona = serde_json::from_str(r#"{"name":"Grim","voice":{"tone":"dour","rating":"PG"}}"#).unwrap();
        assert_eq!(p.name, "Grim");
        assert!(p.style_rules.is_empty());
        assert!(build_system_prompt(&p, &[], 0.5).starts_with("You are Grim."));
    }

    #[test]
    fn missing_persona_file_is_an_error() {
        assert!(Persona::load(Path::new("/definitely/not/here.json")).is_err());
        assert_eq!(Persona::load_or_default(None).unwrap(), Persona::default());
    }
}
