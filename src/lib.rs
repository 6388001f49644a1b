pub mod channel;
pub mod config;
pub mod declaration;
pub mod error;
pub mod events;
pub mod handler;
pub mod lookup;
pub mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

pub use channel::{Subscription, ToolCallChannel};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use declaration::{ParamKind, ParameterSchema, ToolDeclaration};
pub use error::{ConfigError, LookupError};
pub use events::DispatchEvent;
pub use handler::ToolHandle;
pub use lookup::{Fetch, GraphLookup, HttpFetch, LookupAdapter, StaticWeatherLookup, WeatherLookup};
pub use types::{ToolCall, ToolCallNotification, ToolResponse};

/// The session-facing hub. Owns the immutable session config and the
/// tool-call channel; the transport glue pushes each incoming tool-call
/// notification in via [`deliver`](ToolDispatcher::deliver) and drains
/// correlated responses out via
/// [`next_response`](ToolDispatcher::next_response).
///
/// Calls naming a tool the config never declared are answered with a
/// synthetic failure instead of silence, so upstream is never left
/// waiting on a response that cannot come.
pub struct ToolDispatcher {
    config: SessionConfig,
    channel: ToolCallChannel,
    responses: mpsc::UnboundedReceiver<ToolResponse>,
    events: Option<mpsc::UnboundedSender<DispatchEvent>>,
}

impl ToolDispatcher {
    pub fn new(config: SessionConfig) -> Self {
        let (channel, responses) = ToolCallChannel::new();
        Self {
            config,
            channel,
            responses,
            events: None,
        }
    }

    /// Stream dispatch events, e.g. into a side panel.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<DispatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn channel(&self) -> &ToolCallChannel {
        &self.channel
    }

    /// Attach a handler for a declared tool. The declaration must be one
    /// the config carries; wiring an adapter to an undeclared name would
    /// make a handler the model can never reach.
    pub fn attach<A: LookupAdapter>(
        &self,
        declaration: Arc<ToolDeclaration>,
        adapter: A,
    ) -> Result<ToolHandle, ConfigError> {
        if !self.config.declares(&declaration.name) {
            return Err(ConfigError::Undeclared(declaration.name.clone()));
        }
        Ok(handler::spawn(declaration, adapter, &self.channel))
    }

    /// Feed one tool-call notification from the session client into the
    /// channel. Undeclared names are answered right here with a failure
    /// envelope; everything else fans out to the subscribed handlers.
    pub fn deliver(&self, notification: ToolCallNotification) {
        if let Some(calls) = &notification.function_calls {
            for call in calls {
                if self.config.declares(&call.name) {
                    self.emit(DispatchEvent::CallReceived {
                        id: call.id.clone(),
                        name: call.name.clone(),
                    });
                } else {
                    warn!(id = %call.id, tool = %call.name, "call for unknown tool");
                    self.emit(DispatchEvent::UnknownTool {
                        id: call.id.clone(),
                        name: call.name.clone(),
                    });
                    self.channel.respond(ToolResponse::failure(
                        call.id.clone(),
                        call.name.clone(),
                        LookupError::new(format!("unknown tool: {}", call.name)),
                    ));
                }
            }
        }
        self.channel.deliver(&notification);
    }

    /// Next outgoing response, in completion order. The transport glue
    /// forwards each one upstream via `sendToolResponse`. Returns `None`
    /// only if every response sender is gone.
    pub async fn next_response(&mut self) -> Option<ToolResponse> {
        let response = self.responses.recv().await?;
        self.emit(DispatchEvent::Responded {
            id: response.id.clone(),
            name: response.name.clone(),
            is_error: response.is_error(),
        });
        Some(response)
    }

    fn emit(&self, event: DispatchEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn weather_decl() -> Arc<ToolDeclaration> {
        Arc::new(lookup::weather::declaration())
    }

    fn graph_decl() -> Arc<ToolDeclaration> {
        Arc::new(lookup::graph::declaration())
    }

    fn dispatcher_with(decls: &[Arc<ToolDeclaration>]) -> ToolDispatcher {
        let mut builder = SessionConfig::builder();
        for d in decls {
            builder = builder.declare(d.clone());
        }
        ToolDispatcher::new(builder.build().unwrap())
    }

    fn note(id: &str, name: &str, args: Value) -> ToolCallNotification {
        ToolCallNotification::single(ToolCall {
            id: id.into(),
            name: name.into(),
            args,
        })
    }

    // --- Scenario: the worked search_weather example ---

    struct ScriptedWeather;

    #[async_trait]
    impl Fetch for ScriptedWeather {
        async fn get_json(&self, url: reqwest::Url) -> Result<Value, LookupError> {
            if url.path().contains("geocode") {
                Ok(json!({
                    "status": "OK",
                    "results": [{ "geometry": { "location": { "lat": 48.85, "lng": 2.35 } } }]
                }))
            } else {
                Ok(json!({
                    "temperature": 18,
                    "relativeHumidity": 60,
                    "weatherCondition": { "description": { "text": "Clear" } }
                }))
            }
        }
    }

    #[tokio::test]
    async fn search_weather_success_scenario() {
        let decl = weather_decl();
        let mut dispatcher = dispatcher_with(&[decl.clone()]);
        let adapter = WeatherLookup::new("test-key").with_fetch(ScriptedWeather);
        let handle = dispatcher.attach(decl, adapter).unwrap();

        dispatcher.deliver(note("42", "search_weather", json!({ "position": "Paris" })));

        let resp = dispatcher.next_response().await.unwrap();
        assert_eq!(
            resp.to_wire(),
            json!({
                "functionResponses": [{
                    "id": "42",
                    "name": "search_weather",
                    "response": {
                        "output": {
                            "temperature": 18,
                            "humidity": 60,
                            "text": "Clear",
                            "position": {
                                "latitude": 48.85,
                                "longitude": 2.35,
                                "name": "Paris",
                            }
                        }
                    }
                }]
            })
        );
        assert_eq!(handle.latest().unwrap()["text"], "Clear");
    }

    struct NoResultsGeocode;

    #[async_trait]
    impl Fetch for NoResultsGeocode {
        async fn get_json(&self, _url: reqwest::Url) -> Result<Value, LookupError> {
            Ok(json!({ "status": "ZERO_RESULTS", "results": [] }))
        }
    }

    #[tokio::test]
    async fn search_weather_failure_scenario() {
        let decl = weather_decl();
        let mut dispatcher = dispatcher_with(&[decl.clone()]);
        let adapter = WeatherLookup::new("test-key").with_fetch(NoResultsGeocode);
        let handle = dispatcher.attach(decl, adapter).unwrap();

        dispatcher.deliver(note("42", "search_weather", json!({ "position": "Paris" })));

        let resp = dispatcher.next_response().await.unwrap();
        assert_eq!(
            resp.to_wire(),
            json!({
                "functionResponses": [{
                    "id": "42",
                    "name": "search_weather",
                    "response": { "success": false, "error": "Failed to fetch coordinates." }
                }]
            })
        );
        assert_eq!(handle.latest(), None);
    }

    // --- Multiple handlers on one channel ---

    #[tokio::test]
    async fn each_handler_answers_only_its_own_tool() {
        let weather = weather_decl();
        let graph = graph_decl();
        let mut dispatcher = dispatcher_with(&[weather.clone(), graph.clone()]);

        let weather_handle = dispatcher
            .attach(weather, StaticWeatherLookup::default())
            .unwrap();
        let graph_handle = dispatcher.attach(graph, GraphLookup).unwrap();

        dispatcher.deliver(note(
            "g1",
            "render_graph",
            json!({ "json_graph": "{\"mark\":\"line\"}" }),
        ));

        let resp = dispatcher.next_response().await.unwrap();
        assert_eq!(resp.id, "g1");
        assert_eq!(resp.name, "render_graph");
        assert_eq!(resp.result.unwrap()["mark"], "line");

        assert_eq!(graph_handle.latest().unwrap()["mark"], "line");
        assert_eq!(weather_handle.latest(), None);
    }

    #[tokio::test]
    async fn one_notification_can_carry_calls_for_several_tools() {
        let weather = weather_decl();
        let graph = graph_decl();
        let mut dispatcher = dispatcher_with(&[weather.clone(), graph.clone()]);

        let _w = dispatcher
            .attach(weather, StaticWeatherLookup::default())
            .unwrap();
        let _g = dispatcher.attach(graph, GraphLookup).unwrap();

        dispatcher.deliver(ToolCallNotification {
            function_calls: Some(vec![
                ToolCall {
                    id: "w1".into(),
                    name: "search_weather".into(),
                    args: json!({ "position": "Oslo" }),
                },
                ToolCall {
                    id: "g1".into(),
                    name: "render_graph".into(),
                    args: json!({ "json_graph": "{}" }),
                },
            ]),
        });

        let mut ids = vec![
            dispatcher.next_response().await.unwrap().id,
            dispatcher.next_response().await.unwrap().id,
        ];
        ids.sort();
        assert_eq!(ids, vec!["g1", "w1"]);
    }

    // --- Unknown tools ---

    #[tokio::test]
    async fn undeclared_tool_gets_a_synthetic_failure() {
        let mut dispatcher = dispatcher_with(&[graph_decl()]);

        dispatcher.deliver(note("x1", "search_weather", json!({ "position": "Paris" })));

        let resp = dispatcher.next_response().await.unwrap();
        assert_eq!(resp.id, "x1");
        assert_eq!(
            resp.result.unwrap_err().message(),
            "unknown tool: search_weather"
        );
    }

    #[tokio::test]
    async fn attach_rejects_undeclared_tool() {
        let dispatcher = dispatcher_with(&[graph_decl()]);
        let err = dispatcher
            .attach(weather_decl(), StaticWeatherLookup::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Undeclared(name) if name == "search_weather"));
    }

    // --- Events ---

    #[tokio::test]
    async fn dispatch_events_stream_out() {
        let graph = graph_decl();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher = ToolDispatcher::new(
            SessionConfig::builder()
                .declare(graph.clone())
                .build()
                .unwrap(),
        )
        .with_events(tx);
        let _g = dispatcher.attach(graph, GraphLookup).unwrap();

        dispatcher.deliver(note("g1", "render_graph", json!({ "json_graph": "{}" })));
        dispatcher.deliver(note("u1", "mystery", json!({})));
        dispatcher.next_response().await.unwrap();
        dispatcher.next_response().await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(&events[0], DispatchEvent::CallReceived { id, .. } if id == "g1"));
        assert!(matches!(&events[1], DispatchEvent::UnknownTool { id, .. } if id == "u1"));
        assert!(events
            .iter()
            .any(|e| matches!(e, DispatchEvent::Responded { is_error: true, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, DispatchEvent::Responded { is_error: false, .. })));
    }

    // --- Concurrency across the full stack ---

    struct SlowStatic {
        delay: Duration,
        label: &'static str,
    }

    #[derive(Debug, Deserialize)]
    struct AnyArgs {}

    #[async_trait]
    impl LookupAdapter for SlowStatic {
        type Args = AnyArgs;
        type Output = Value;

        async fn lookup(&self, _args: AnyArgs) -> Result<Value, LookupError> {
            tokio::time::sleep(self.delay).await;
            Ok(json!({ "label": self.label }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_does_not_block_a_fast_one() {
        let weather = weather_decl();
        let graph = graph_decl();
        let mut dispatcher = dispatcher_with(&[weather.clone(), graph.clone()]);

        let _slow = dispatcher
            .attach(
                weather,
                SlowStatic {
                    delay: Duration::from_secs(2),
                    label: "slow",
                },
            )
            .unwrap();
        let _fast = dispatcher.attach(graph, GraphLookup).unwrap();

        dispatcher.deliver(note("s1", "search_weather", json!({})));
        dispatcher.deliver(note("f1", "render_graph", json!({ "json_graph": "{}" })));

        // The graph response lands first even though its call came second.
        let first = dispatcher.next_response().await.unwrap();
        assert_eq!(first.id, "f1");
        let second = dispatcher.next_response().await.unwrap();
        assert_eq!(second.id, "s1");
    }
}
