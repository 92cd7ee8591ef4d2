//! Prompt templates for policy-rag.
//!
//! Prompts can be customized by placing a `rag.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for question answering.
///
/// `user` sees `{{question}}` and `{{context}}`. `condense` sees
/// `{{question}}` and `{{history}}` and must produce a standalone question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
    pub condense: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a policy assistant that answers questions about the organisation's policy documents.

Guidelines:
- Answer using only the provided policy excerpts
- If the excerpts do not contain the answer, say that you don't know instead of guessing
- Mention the document and page an answer comes from when it helps the reader
- Keep answers short and precise"#
                .to_string(),

            user: r#"Policy excerpts:

{{context}}

Question: {{question}}
Answer:"#
                .to_string(),

            condense: r#"Given the conversation below and a follow-up question, rewrite the follow-up as a standalone question that can be understood without the conversation. Keep it in the language it was asked in. Reply with the question only.

Conversation:
{{history}}

Follow-up question: {{question}}
Standalone question:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Built-in prompts, replaced by `rag.toml` from `custom_dir` when present.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let custom_file = custom_dir
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).to_string()).join("rag.toml"));
        let rag = match custom_file {
            Some(path) if path.is_file() => toml::from_str(&std::fs::read_to_string(&path)?)?,
            _ => RagPrompts::default(),
        };

        Ok(Self {
            rag,
            variables: custom_variables.cloned().unwrap_or_default(),
        })
    }

    /// Replace each `{{name}}` in `template` with its value.
    ///
    /// Substitution is a single pass, so placeholders inside values (a user
    /// question quoting `{{context}}`, say) are left alone. Unknown
    /// placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let name = &after[..close];
                    match vars.get(name.trim()) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("{{");
                            out.push_str(name);
                            out.push_str("}}");
                        }
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Render with the configured variables plus `vars`; `vars` win on conflicts.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let merged: HashMap<String, String> = self
            .variables
            .iter()
            .chain(vars.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.rag.system.is_empty());
        assert!(prompts.rag.user.contains("{{context}}"));
        assert!(prompts.rag.user.contains("{{question}}"));
        assert!(prompts.rag.condense.contains("{{history}}"));
    }

    #[test]
    fn test_render_fills_known_placeholders_once() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "[1] Leave is 25 days.".to_string());
        vars.insert("question".to_string(), "What does {{context}} mean?".to_string());

        let rendered = Prompts::render("{{context}}\nQ: {{ question }} {{unknown}} {{", &vars);
        assert_eq!(
            rendered,
            "[1] Leave is 25 days.\nQ: What does {{context}} mean? {{unknown}} {{"
        );
    }

    #[test]
    fn test_provided_variables_override_custom() {
        let mut custom = HashMap::new();
        custom.insert("org".to_string(), "Acme".to_string());
        custom.insert("question".to_string(), "ignored".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Who approves leave?".to_string());
        let rendered = prompts.render_with_custom("{{org}}: {{question}}", &vars);
        assert_eq!(rendered, "Acme: Who approves leave?");
    }

    #[test]
    fn test_custom_dir_overrides_rag_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "system = \"Answer as the HR desk.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.rag.system, "Answer as the HR desk.");
        assert!(prompts.rag.user.contains("{{context}}"));
    }
}
