//! # Template Library Module
//!
//! Holds the reference melodies the live trajectory is matched against. Each
//! template is a frequency trajectory sampled at the same cadence as the live
//! capture, usually far longer than one trajectory window, so matching walks
//! every window-sized segment of every template.
//!
//! ## Data format
//! Templates load from a JSON array, kept in file order:
//!
//! ```json
//! [
//!   { "name": "Title Theme", "values": [523.2, 523.2, 587.3, 0.0] },
//!   { "name": "Boss Battle", "values": [311.1, 329.6, 349.2] }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::Path;

use crate::error::TemplateError;

/// A named reference trajectory. Values are frequencies in Hz; `0.0` marks
/// silence, the same way the live trajectory records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub values: Vec<f32>,
}

impl Template {
    pub fn new(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Consecutive segments of `len` values; the last one may be shorter.
    pub fn segments(&self, len: NonZeroUsize) -> std::slice::Chunks<'_, f32> {
        self.values.chunks(len.get())
    }
}

/// Immutable, validated set of templates in insertion order.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Builds a library, rejecting malformed data.
    ///
    /// # Errors
    /// * No templates at all
    /// * A template with an empty name, or a name used twice
    /// * A template without values
    /// * A value that is NaN, infinite or negative
    pub fn new(templates: Vec<Template>) -> Result<Self, TemplateError> {
        if templates.is_empty() {
            return Err(TemplateError::EmptyLibrary);
        }

        let mut seen = HashSet::with_capacity(templates.len());
        for (index, template) in templates.iter().enumerate() {
            if template.name.trim().is_empty() {
                return Err(TemplateError::EmptyName { index });
            }
            if !seen.insert(template.name.as_str()) {
                return Err(TemplateError::DuplicateName(template.name.clone()));
            }
            if template.values.is_empty() {
                return Err(TemplateError::EmptyTemplate(template.name.clone()));
            }
            if let Some((i, &value)) = template
                .values
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(TemplateError::InvalidValue {
                    name: template.name.clone(),
                    index: i,
                    value,
                });
            }
        }

        tracing::info!(templates = templates.len(), "template library loaded");
        Ok(Self { templates })
    }

    /// Parses and validates templates from a JSON reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TemplateError> {
        let templates: Vec<Template> = serde_json::from_reader(reader)?;
        Self::new(templates)
    }

    /// Parses and validates templates from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        let templates: Vec<Template> = serde_json::from_str(json)?;
        Self::new(templates)
    }

    /// Loads templates from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| TemplateError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Always false for a constructed library; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    /// Every `len`-sized segment of every template, tagged with the template
    /// name. Templates come in insertion order, segments in sequence.
    ///
    /// The iterator is lazy; call again (or clone it) to restart.
    pub fn segments(
        &self,
        len: NonZeroUsize,
    ) -> impl Iterator<Item = (&str, &[f32])> + Clone + '_ {
        self.templates.iter().flat_map(move |template| {
            template
                .segments(len)
                .map(move |segment| (template.name.as_str(), segment))
        })
    }
}

impl<'a> IntoIterator for &'a TemplateLibrary {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}
