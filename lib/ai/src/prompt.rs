//! Prompt templates.
//!
//! Templates use `{{variable}}` placeholders. Rendering is strict: every
//! declared variable must be supplied, and substituted values are never
//! re-scanned for placeholders, so model output fed back into a chained
//! prompt is embedded exactly as received.

use crate::error::PromptError;
use std::collections::HashMap;

/// A named prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template name (used for lookup).
    pub name: String,
    /// Template content with placeholders.
    pub content: String,
    /// Variables the template requires (name -> description).
    pub variables: HashMap<String, String>,
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            variables: HashMap::new(),
        }
    }

    /// Declares a required variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.variables.insert(name.into(), description.into());
        self
    }

    /// Validates that all declared variables are provided.
    ///
    /// # Errors
    ///
    /// Returns the first missing variable, in name order.
    pub fn validate_variables(&self, variables: &HashMap<&str, String>) -> Result<(), PromptError> {
        let mut missing: Vec<&String> = self
            .variables
            .keys()
            .filter(|name| !variables.contains_key(name.as_str()))
            .collect();
        missing.sort();

        match missing.first() {
            None => Ok(()),
            Some(variable) => Err(PromptError::MissingVariable {
                template: self.name.clone(),
                variable: (*variable).clone(),
            }),
        }
    }

    /// Renders the template with the given variables.
    ///
    /// Placeholders naming an unknown variable are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a declared variable is missing.
    pub fn render(&self, variables: &HashMap<&str, String>) -> Result<String, PromptError> {
        self.validate_variables(variables)?;

        let mut output = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(open) = rest.find("{{") {
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                break;
            };

            output.push_str(&rest[..open]);
            let name = after_open[..close].trim();
            match variables.get(name) {
                Some(value) => output.push_str(value),
                None => output.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after_open[close + 2..];
        }
        output.push_str(rest);

        Ok(output)
    }
}

/// Registry of prompt templates.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: HashMap<String, PromptTemplate>,
}

impl PromptRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Registers a template, replacing any template with the same name.
    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Gets a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Renders the named template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or a variable is missing.
    pub fn render(&self, name: &str, variables: &HashMap<&str, String>) -> Result<String, PromptError> {
        self.get(name)
            .ok_or_else(|| PromptError::TemplateNotFound {
                name: name.to_string(),
            })?
            .render(variables)
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
