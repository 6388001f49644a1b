use std::sync::Arc;

use serde_json::{json, Value};

use crate::declaration::ToolDeclaration;
use crate::error::ConfigError;

/// Session-level capabilities handed to the session client at connect
/// time. Immutable once built — the client snapshots it at connect and
/// late mutation would silently diverge from what the model sees.
#[derive(Debug)]
pub struct SessionConfig {
    declarations: Vec<Arc<ToolDeclaration>>,
    system_instruction: Option<String>,
    capabilities: Vec<Value>,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    pub fn declarations(&self) -> &[Arc<ToolDeclaration>] {
        &self.declarations
    }

    pub fn declaration(&self, name: &str) -> Option<&Arc<ToolDeclaration>> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declaration(name).is_some()
    }

    /// The connect-time configuration payload: function declarations plus
    /// any opaque extra tool entries, and the system instruction if set.
    pub fn to_wire(&self) -> Value {
        let mut tools: Vec<Value> = self.capabilities.clone();
        if !self.declarations.is_empty() {
            let decls: Vec<Value> = self
                .declarations
                .iter()
                .filter_map(|d| serde_json::to_value(d.as_ref()).ok())
                .collect();
            tools.push(json!({ "functionDeclarations": decls }));
        }

        let mut wire = json!({ "tools": tools });
        if let Some(ref text) = self.system_instruction {
            wire["systemInstruction"] = json!({ "parts": [{ "text": text }] });
        }
        wire
    }
}

/// Collects declarations and other capabilities before connecting.
/// A duplicate declaration name fails `build` — the session must never
/// start with an ambiguous tool list.
#[derive(Default)]
pub struct SessionConfigBuilder {
    declarations: Vec<Arc<ToolDeclaration>>,
    system_instruction: Option<String>,
    capabilities: Vec<Value>,
}

impl SessionConfigBuilder {
    pub fn declare(mut self, declaration: Arc<ToolDeclaration>) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(text.into());
        self
    }

    /// Add an opaque session-level capability, e.g. a built-in search
    /// tool entry the session client understands natively.
    pub fn capability(mut self, entry: Value) -> Self {
        self.capabilities.push(entry);
        self
    }

    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        for (i, decl) in self.declarations.iter().enumerate() {
            if self.declarations[..i].iter().any(|d| d.name == decl.name) {
                return Err(ConfigError::DuplicateDeclaration(decl.name.clone()));
            }
        }
        Ok(SessionConfig {
            declarations: self.declarations,
            system_instruction: self.system_instruction,
            capabilities: self.capabilities,
        })
    }
}
