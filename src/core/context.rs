//! Pipeline context - variables shared between stages

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Variables every run provides once the prepare stage has completed
pub const BUILTIN_VARIABLES: &[&str] = &[
    "sha",
    "ref",
    "short_sha",
    "branch_tag",
    "environment",
    "image",
];

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Names referenced by `{{ name }}` placeholders in a template
pub fn placeholders(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Execution context for a pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Built-in and user-defined variables
    pub variables: HashMap<String, String>,

    /// Outputs recorded per stage (stage_id -> key -> value)
    pub stage_outputs: BTreeMap<String, BTreeMap<String, String>>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Record the outputs of a stage and expose them as variables
    pub fn record_outputs(&mut self, stage_id: &str, outputs: &BTreeMap<String, String>) {
        for (key, value) in outputs {
            self.variables.insert(key.clone(), value.clone());
        }
        self.stage_outputs
            .entry(stage_id.to_string())
            .or_default()
            .extend(outputs.clone());
    }

    pub fn stage_output(&self, stage_id: &str, key: &str) -> Option<&str> {
        self.stage_outputs
            .get(stage_id)
            .and_then(|outputs| outputs.get(key))
            .map(String::as_str)
    }

    /// Substitute `{{ name }}` placeholders; unknown names are left as written
    pub fn render(&self, template: &str) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &Captures| match self.variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
