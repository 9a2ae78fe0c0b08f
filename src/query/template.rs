//! `${name}` templates.

use std::collections::HashMap;

use crate::error::StatisticsError;
use crate::query::Literal;

/// Named template parameters.
pub type Params = HashMap<String, Literal>;

/// A text with `${name}` placeholders. Placeholders are replaced with rendered [literals](Literal),
/// so a parameter value can never change the structure of the resulting text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template<'a> {
    text: &'a str,
}

impl<'a> Template<'a> {
    pub fn new(text: &'a str) -> Self {
        Template { text }
    }

    /// Returns names of the placeholders in the order they appear in the template.
    pub fn placeholders(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut rest = self.text;
        while let Some(((_, name), tail)) = next_placeholder(rest) {
            names.push(name);
            rest = tail;
        }
        names
    }

    /// Replaces every placeholder with the value of the corresponding parameter.
    /// Returns an [argument error](StatisticsError::Argument) if a parameter is missing.
    pub fn render(&self, params: &Params) -> Result<String, StatisticsError> {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text;
        while let Some(((prefix, name), tail)) = next_placeholder(rest) {
            let value = params
                .get(name)
                .ok_or_else(|| StatisticsError::argument(format!("Missing template parameter: {}", name)))?;
            out.push_str(prefix);
            out.push_str(&value.to_string());
            rest = tail;
        }
        out.push_str(rest);
        Ok(out)
    }
}

// Returns ((text before the placeholder, placeholder name), text after the placeholder).
fn next_placeholder(text: &str) -> Option<((&str, &str), &str)> {
    let start = text.find("${")?;
    let end = text[start + 2..].find('}')? + start + 2;
    Some(((&text[..start], &text[start + 2..end]), &text[end + 1..]))
}
