//! Persona management for role agents
//!
//! A persona is the system prompt and expertise of one role, defined in a
//! TOML file under `prompts/`. The nine built-in personas are embedded in the
//! binary; a directory of TOML files can override them.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::Role;

/// A persona definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    pub persona: PersonaMetadata,
    #[serde(default)]
    pub expertise: ExpertiseConfig,
    pub prompt: PromptConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaMetadata {
    /// Role machine name, e.g. "pm"
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpertiseConfig {
    #[serde(default)]
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub system: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_format() -> String {
    "markdown".to_string()
}

const EMBEDDED: [&str; 9] = [
    include_str!("../prompts/analyst.toml"),
    include_str!("../prompts/architect.toml"),
    include_str!("../prompts/dev.toml"),
    include_str!("../prompts/pm.toml"),
    include_str!("../prompts/qa.toml"),
    include_str!("../prompts/sm.toml"),
    include_str!("../prompts/ux.toml"),
    include_str!("../prompts/master.toml"),
    include_str!("../prompts/orchestrator.toml"),
];

static BUILT_IN: LazyLock<PersonaRegistry> = LazyLock::new(|| {
    let mut registry = PersonaRegistry::new();
    for (idx, toml_str) in EMBEDDED.iter().enumerate() {
        match toml::from_str::<Persona>(toml_str) {
            Ok(persona) => registry.register(persona),
            Err(e) => warn!("Embedded persona #{} failed to parse: {}", idx, e),
        }
    }
    registry
});

/// Registry of all loaded personas, keyed by role id
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: HashMap<String, Persona>,
}

impl PersonaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The personas compiled into the binary
    pub fn embedded() -> Self {
        BUILT_IN.clone()
    }

    /// Load personas from a directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let mut registry = Self::new();
        registry.merge_dir(dir)?;
        Ok(registry)
    }

    /// Add every parsable `*.toml` persona in `dir`, replacing same-id entries
    pub fn merge_dir<P: AsRef<Path>>(&mut self, dir: P) -> std::io::Result<usize> {
        let mut loaded = 0;

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "toml") {
                continue;
            }

            let content = std::fs::read_to_string(&path)?;
            match toml::from_str::<Persona>(&content) {
                Ok(persona) => {
                    debug!("Loaded persona {} from {}", persona.persona.id, path.display());
                    self.register(persona);
                    loaded += 1;
                }
                Err(e) => warn!("Skipping persona {}: {}", path.display(), e),
            }
        }

        Ok(loaded)
    }

    /// Register a persona; disabled personas are ignored
    pub fn register(&mut self, persona: Persona) {
        if persona.persona.enabled {
            self.personas.insert(persona.persona.id.clone(), persona);
        }
    }

    /// Get a persona by ID
    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(id)
    }

    /// Persona for a role, or a minimal stand-in when none is loaded
    pub fn for_role(&self, role: Role) -> Persona {
        self.get(role.as_str())
            .cloned()
            .unwrap_or_else(|| Persona::fallback(role))
    }

    /// List all persona IDs, sorted
    pub fn list_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.personas.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Count of loaded personas
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl Persona {
    /// A bare persona built from the role alone
    pub fn fallback(role: Role) -> Self {
        Self {
            persona: PersonaMetadata {
                id: role.as_str().to_string(),
                name: role.title().to_string(),
                enabled: true,
            },
            expertise: ExpertiseConfig::default(),
            prompt: PromptConfig {
                system: format!("You are an experienced {}.", role.title()),
            },
            output: OutputConfig::default(),
        }
    }

    /// System prompt with the answer language and output format appended
    pub fn system_prompt(&self, language: &str) -> String {
        let mut prompt = self.prompt.system.trim().to_string();

        if !self.expertise.domains.is_empty() {
            prompt.push_str(&format!(
                "\n\nAreas of expertise: {}.",
                self.expertise.domains.join(", ")
            ));
        }

        prompt.push_str(&format!(
            "\n\nAnswer in {}. Format the answer as {}. When the request shows a \
             record layout (`### ` headings followed by `Label: value` lines), \
             follow it exactly, one field per line.",
            language, self.output.format
        ));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_personas_cover_every_role() {
        let registry = PersonaRegistry::embedded();
        assert_eq!(registry.len(), Role::ALL.len());
        for role in Role::ALL {
            assert!(registry.get(role.as_str()).is_some(), "missing {}", role);
        }
    }

    #[test]
    fn test_system_prompt_mentions_language() {
        let persona = PersonaRegistry::embedded().for_role(Role::Qa);
        let prompt = persona.system_prompt("French");
        assert!(prompt.contains("Answer in French"));
        assert!(prompt.contains("### "));
    }

    #[test]
    fn test_fallback_and_disabled() {
        let mut registry = PersonaRegistry::new();
        let mut disabled = Persona::fallback(Role::Ux);
        disabled.persona.enabled = false;
        registry.register(disabled);
        assert!(registry.is_empty());

        let persona = registry.for_role(Role::Ux);
        assert_eq!(persona.persona.id, "ux");
        assert!(persona.prompt.system.contains("UX Expert"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let persona: Persona = toml::from_str(
            r#"
            [persona]
            id = "pm"
            name = "Product Manager"

            [prompt]
            system = "You write PRDs."
            "#,
        )
        .unwrap();

        assert!(persona.persona.enabled);
        assert_eq!(persona.output.format, "markdown");
        assert!(persona.expertise.domains.is_empty());
    }

    #[test]
    fn test_load_from_dir_skips_bad_files() {
        let dir = std::env::temp_dir().join(format!("roster-personas-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("qa.toml"),
            "[persona]\nid = \"qa\"\nname = \"Strict QA\"\n\n[prompt]\nsystem = \"You block releases.\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("broken.toml"), "[persona\nid = ").unwrap();
        std::fs::write(dir.join("notes.md"), "# not a persona").unwrap();

        let registry = PersonaRegistry::load_from_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.for_role(Role::Qa).prompt.system, "You block releases.");
        // Roles without a file fall back rather than borrowing the embedded set
        assert!(registry.get("dev").is_none());
        assert!(PersonaRegistry::load_from_dir(std::env::temp_dir().join("roster-missing-dir")).is_err());
    }
}
