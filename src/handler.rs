use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::ToolCallChannel;
use crate::declaration::ToolDeclaration;
use crate::error::LookupError;
use crate::lookup::LookupAdapter;
use crate::types::{ToolCall, ToolResponse};

/// Bind one declaration to one adapter and subscribe it to the channel.
///
/// The spawned task watches the channel, ignores notifications without
/// function calls and calls whose name does not match the declaration,
/// and runs the adapter for each match. Overlapping calls execute
/// independently; each sends exactly one response keyed by its own id.
/// On success the handle's latest-result slot is overwritten (last
/// completion wins), on failure it is left as it was.
pub fn spawn<A: LookupAdapter>(
    declaration: Arc<ToolDeclaration>,
    adapter: A,
    channel: &ToolCallChannel,
) -> ToolHandle {
    let (state_tx, state_rx) = watch::channel(None);
    let state_tx = Arc::new(state_tx);
    let adapter = Arc::new(adapter);
    let cancel = CancellationToken::new();
    let mut subscription = channel.subscribe();
    let channel = channel.clone();

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            loop {
                let notification = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    note = subscription.next() => match note {
                        Some(note) => note,
                        None => break,
                    },
                };

                let Some(calls) = notification.function_calls else {
                    continue;
                };

                for call in calls {
                    if call.name != declaration.name {
                        continue;
                    }
                    debug!(id = %call.id, tool = %declaration.name, "tool call matched");
                    // Each call gets its own task so a slow lookup never
                    // delays delivery of the next one. An execution in
                    // flight at teardown still completes and responds.
                    tokio::spawn(execute(
                        call,
                        adapter.clone(),
                        channel.clone(),
                        state_tx.clone(),
                    ));
                }
            }
            // Subscription drops here; no further deliveries.
        }
    });

    ToolHandle {
        latest: state_rx,
        cancel,
        task: Some(task),
    }
}

async fn execute<A: LookupAdapter>(
    call: ToolCall,
    adapter: Arc<A>,
    channel: ToolCallChannel,
    state: Arc<watch::Sender<Option<Value>>>,
) {
    match run_adapter(adapter.as_ref(), call.args).await {
        Ok(output) => {
            // Send may fail if the handle was dropped; the response still
            // goes out either way.
            let _ = state.send(Some(output.clone()));
            channel.respond(ToolResponse::output(call.id, call.name, output));
        }
        Err(e) => {
            warn!(id = %call.id, tool = %call.name, error = %e, "lookup failed");
            channel.respond(ToolResponse::failure(call.id, call.name, e));
        }
    }
}

/// Decode the raw args into the adapter's typed record, run the lookup,
/// and serialize the result. Decode failures fold into the same failure
/// path as adapter failures.
async fn run_adapter<A: LookupAdapter>(adapter: &A, args: Value) -> Result<Value, LookupError> {
    let args: A::Args = serde_json::from_value(args)
        .map_err(|e| LookupError::new(format!("invalid arguments: {e}")))?;
    let output = adapter.lookup(args).await?;
    serde_json::to_value(output)
        .map_err(|e| LookupError::new(format!("unserializable result: {e}")))
}

/// Owner's view of a running handler. Dropping it unsubscribes and stops
/// the matching loop; in-flight executions are not aborted.
#[derive(Debug)]
pub struct ToolHandle {
    latest: watch::Receiver<Option<Value>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ToolHandle {
    /// The most recent successfully completed result, if any.
    pub fn latest(&self) -> Option<Value> {
        self.latest.borrow().clone()
    }

    /// Watch the latest-result slot, e.g. to drive presentation.
    pub fn watch(&self) -> watch::Receiver<Option<Value>> {
        self.latest.clone()
    }

    /// Stop the matching loop and wait for it to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ToolHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
