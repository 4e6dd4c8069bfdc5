//! Decode/encode tables built from the menu descriptor

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::DescriptorNode;
use crate::types::{CommandSpec, LabeledCode, SettingCategory};
use crate::{CameraError, Result};

/// One decodable value: what to show and how to set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingEntry {
    pub value: LabeledCode,
    pub command: CommandSpec,
}

/// Per-device settings table built once from the camera's menu descriptor.
///
/// Maps raw off-frame codes to [`LabeledCode`]s for each
/// [`SettingCategory`], and logical command ids to their wire tokens.
/// Immutable once built; a menu re-read replaces it wholesale.
#[derive(Debug, Clone)]
pub struct CapabilityModel {
    model_name: Option<String>,
    language: String,
    tables: HashMap<SettingCategory, BTreeMap<i32, SettingEntry>>,
    commands: BTreeMap<String, CommandSpec>,
}

impl CapabilityModel {
    /// Build the model from a parsed `allmenu`/`curmenu` reply.
    ///
    /// `root` may be the reply root or the `menuset` node itself. Labels are
    /// taken from the `titlelist` language matching `language`; values with
    /// no localized title fall back to their raw device value.
    ///
    /// All node-level failures are collected; if any occurred the whole build
    /// fails with [`CameraError::DescriptorParse`].
    pub fn build(root: &DescriptorNode, language: &str) -> Result<Self> {
        let mut failures = Vec::new();

        let Some(menuset) = root.find("menuset") else {
            return Err(CameraError::DescriptorParse {
                failures: vec!["descriptor has no menuset element".to_string()],
            });
        };

        let titles = collect_titles(menuset, language, &mut failures);

        let mut tables: HashMap<SettingCategory, BTreeMap<i32, SettingEntry>> = HashMap::new();
        let mut commands = BTreeMap::new();

        menuset.walk(&mut |node| {
            if node.name != "item" {
                return;
            }
            let Some(mode) = node.attr("cmd_mode") else {
                return;
            };
            let Some(id) = node.attr("id").filter(|id| !id.is_empty()) else {
                failures.push(format!("command item with cmd_mode '{mode}' has no id"));
                return;
            };

            let command = CommandSpec::new(
                mode,
                node.attr("cmd_type").unwrap_or_default(),
                node.attr("cmd_value").unwrap_or_default(),
            );

            if let Some(category) = SettingCategory::from_cmd_type(&command.command_type) {
                match setting_code(node, category, &command.value) {
                    Some(code) => {
                        let text = node
                            .attr("title_id")
                            .and_then(|title_id| titles.get(title_id))
                            .cloned()
                            .unwrap_or_else(|| command.value.clone());
                        tables.entry(category).or_default().entry(code).or_insert(SettingEntry {
                            value: LabeledCode::new(text, code),
                            command: command.clone(),
                        });
                    }
                    None => failures.push(format!(
                        "item '{id}': cannot convert {category} value '{}' to a code",
                        command.value
                    )),
                }
            }

            commands.entry(id.to_string()).or_insert(command);
        });

        if !failures.is_empty() {
            warn!(count = failures.len(), "Menu descriptor rejected");
            return Err(CameraError::DescriptorParse { failures });
        }

        let model = Self {
            model_name: menuset.attr("model").map(str::to_string),
            language: language.to_string(),
            tables,
            commands,
        };

        debug!(
            model = ?model.model_name,
            language,
            commands = model.commands.len(),
            iso = model.value_count(SettingCategory::Iso),
            shutter = model.value_count(SettingCategory::Shutter),
            aperture = model.value_count(SettingCategory::Aperture),
            "Capability model built"
        );

        Ok(model)
    }

    /// Decode a raw off-frame code.
    pub fn decode(&self, category: SettingCategory, code: i32) -> Result<LabeledCode> {
        self.entry(category, code).map(|entry| entry.value.clone())
    }

    /// The command that sets `category` to `code`.
    pub fn encode(&self, category: SettingCategory, code: i32) -> Result<&CommandSpec> {
        self.entry(category, code).map(|entry| &entry.command)
    }

    fn entry(&self, category: SettingCategory, code: i32) -> Result<&SettingEntry> {
        self.tables
            .get(&category)
            .and_then(|table| table.get(&code))
            .ok_or(CameraError::CodeNotFound { category, code })
    }

    /// Command tokens for a descriptor item id.
    pub fn command(&self, id: &str) -> Option<&CommandSpec> {
        self.commands.get(id)
    }

    pub fn commands(&self) -> impl Iterator<Item = (&str, &CommandSpec)> {
        self.commands.iter().map(|(id, command)| (id.as_str(), command))
    }

    /// Known values of a category, ordered by code.
    pub fn values(&self, category: SettingCategory) -> impl Iterator<Item = &LabeledCode> {
        self.tables.get(&category).into_iter().flat_map(|table| table.values()).map(|e| &e.value)
    }

    pub fn value_count(&self, category: SettingCategory) -> usize {
        self.tables.get(&category).map_or(0, BTreeMap::len)
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

fn setting_code(node: &DescriptorNode, category: SettingCategory, value: &str) -> Option<i32> {
    match node.attr("bin") {
        Some(bin) => bin.trim().parse().ok(),
        None => category.code_from_value(value),
    }
}

/// Titles of the requested language as `title id -> text`.
fn collect_titles(
    menuset: &DescriptorNode,
    language: &str,
    failures: &mut Vec<String>,
) -> HashMap<String, String> {
    let mut titles = HashMap::new();
    let Some(titlelist) = menuset.find("titlelist") else {
        return titles;
    };

    for lang in titlelist.children.iter().filter(|node| node.name == "language") {
        let Some(code) = lang.attr("code") else {
            failures.push("language element has no code".to_string());
            continue;
        };

        let selected = code.eq_ignore_ascii_case(language);
        for title in lang.children.iter().filter(|node| node.name == "title") {
            match title.attr("id") {
                Some(id) if selected => {
                    titles.entry(id.to_string()).or_insert_with(|| title.text.clone());
                }
                Some(_) => {}
                None => failures.push(format!("title in language '{code}' has no id")),
            }
        }
    }

    titles
}
