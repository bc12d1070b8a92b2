//! Prompt templates for Kosei.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub structure: StructurePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for outline generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructurePrompts {
    pub system: String,
    pub user: String,
    /// Format shown to the model when no reference template is available.
    pub default_reference: String,
}

impl Default for StructurePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert editor of medical pamphlets written for healthcare professionals.
You draft pamphlet outlines strictly from the source material you are given.

Guidelines:
- Never invent facts, figures or citations that are not in the source material
- Pull the important points out of the sources and arrange them in a logical flow
- Keep the tone professional and appropriate for medical staff"#
                .to_string(),

            user: r##"Reference format (this shows the FORMAT only, not the content):
{{reference}}

Source material:
{{corpus}}

Instructions:
1. Follow the reference format above and draft the outline of a new pamphlet from the source material only.
2. Write two blocks: a line "#大構成" followed by the major sections, then a line "#詳細構成" followed by the detailed sections.
3. Start every section with a numbered line such as "1. Section title（約800字）" that gives the title and the target length.
4. Under each section write "概要: <summary>", then the main content points as "- " bullets quoted or paraphrased from the source material, then "図表: <figures>" and "参考文献: <references>" when the sources mention any.
5. Write the outline in {{language}}.

Write the outline now:"##
                .to_string(),

            default_reference: r#"#大構成
1. セクション名（約800字）
概要: このセクションで伝える内容の説明

2. セクション名（約1200字）
概要: このセクションで伝える内容の説明

#詳細構成
1. セクション名（約400字）
概要: このセクションで伝える内容の説明
- 主要な内容の抜粋
- 主要な内容の抜粋
図表: 図1、表1
参考文献: 著者, 論文名, 雑誌名, 年"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let structure_path = custom_path.join("structure.toml");
            if structure_path.exists() {
                let content = std::fs::read_to_string(&structure_path)?;
                prompts.structure = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single left-to-right pass, so placeholder-looking text
    /// inside a substituted value is left untouched.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match vars.get(key.trim()) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
