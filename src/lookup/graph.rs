use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::LookupAdapter;
use crate::declaration::{ParamKind, ParameterSchema, ToolDeclaration};
use crate::error::LookupError;

/// Declaration for the `render_graph` tool.
pub fn declaration() -> ToolDeclaration {
    ToolDeclaration::new(
        "render_graph",
        "Displays a graph from a JSON specification.",
        ParameterSchema::object().required(
            "json_graph",
            ParamKind::String,
            "JSON STRING representation of the graph to render. Must be a string, not a json object.",
        ),
    )
}

#[derive(Debug, Deserialize)]
pub struct GraphArgs {
    pub json_graph: String,
}

/// No external calls: parse the model-supplied graph string and hand the
/// parsed spec to the rendering side through the handler's state slot.
pub struct GraphLookup;

#[async_trait]
impl LookupAdapter for GraphLookup {
    type Args = GraphArgs;
    type Output = Value;

    async fn lookup(&self, args: GraphArgs) -> Result<Value, LookupError> {
        serde_json::from_str(&args.json_graph)
            .map_err(|e| LookupError::new(format!("graph payload is not valid JSON: {e}")))
    }
}
