//! Schema - field rules for document payloads.

use bson::{Bson, Document};

use super::Invalid;

/// Accepted BSON shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    ObjectId,
}

impl FieldKind {
    fn accepts(self, value: &Bson) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::String => matches!(value, Bson::String(_)),
            FieldKind::Integer => matches!(value, Bson::Int32(_) | Bson::Int64(_)),
            FieldKind::Number => {
                matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
            }
            FieldKind::Boolean => matches!(value, Bson::Boolean(_)),
            FieldKind::Object => matches!(value, Bson::Document(_)),
            FieldKind::Array => matches!(value, Bson::Array(_)),
            FieldKind::ObjectId => matches!(value, Bson::ObjectId(_)),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Any => "any value",
            FieldKind::String => "a string",
            FieldKind::Integer => "an integer",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "a boolean",
            FieldKind::Object => "an object",
            FieldKind::Array => "an array",
            FieldKind::ObjectId => "an object id",
        }
    }
}

/// Rule for one field: its kind and whether it must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub fn optional(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
        }
    }

    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
        }
    }
}

/// Declared fields of a record type.
///
/// Fields not declared are rejected unless [`Schema::allow_unknown`] is set.
/// `null` only satisfies [`FieldKind::Any`].
///
/// ```
/// use record_driver::{FieldKind, FieldRule, Schema};
///
/// let users = Schema::new()
///     .field("id", FieldRule::optional(FieldKind::Any))
///     .field("firstname", FieldRule::optional(FieldKind::String));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
    allow_unknown: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Redeclaring a field replaces its rule.
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        let name = name.into();
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, rule));
        self
    }

    /// Accept fields that are not declared.
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, rule)| rule)
    }

    /// Check `data` against the declared fields.
    pub fn validate(&self, data: &Document) -> Result<(), Invalid> {
        for (name, rule) in &self.fields {
            match data.get(name) {
                None if rule.required => {
                    return Err(Invalid::new(format!("\"{}\" is required", name)));
                }
                None => {}
                Some(value) if !rule.kind.accepts(value) => {
                    return Err(Invalid::new(format!(
                        "\"{}\" must be {}",
                        name,
                        rule.kind.describe()
                    )));
                }
                Some(_) => {}
            }
        }

        if !self.allow_unknown {
            if let Some(unknown) = data.keys().find(|key| self.rule(key).is_none()) {
                return Err(Invalid::new(format!("\"{}\" is not allowed", unknown)));
            }
        }

        Ok(())
    }
}
