use std::collections::BTreeMap;

use serde::Serialize;

/// Static descriptor of a callable tool: name, model-facing description,
/// and the parameter schema the model fills in. Constructed once at
/// startup and shared by `Arc` into the session config and its handler.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDeclaration {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Object parameter schema in the session client's wire shape:
/// `{"type": "OBJECT", "properties": {...}, "required": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: BTreeMap<String, ParamField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ParamField {
    #[serde(rename = "type")]
    kind: ParamKind,
    description: String,
}

/// Field types the session client understands.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Object,
}

impl ParameterSchema {
    pub fn object() -> Self {
        Self {
            kind: "OBJECT",
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add an optional field.
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            ParamField {
                kind,
                description: description.into(),
            },
        );
        self
    }

    /// Add a field the model must always supply.
    pub fn required(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.field(name, kind, description)
    }
}
