/// Events emitted while dispatching tool calls, for UI streaming.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    CallReceived { id: String, name: String },
    UnknownTool { id: String, name: String },
    Responded { id: String, name: String, is_error: bool },
}
