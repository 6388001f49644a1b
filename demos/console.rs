//! Interactive dispatch console.
//!
//! Feeds tool-call notifications typed as JSON lines into the dispatcher
//! and prints the wire form of every response, standing in for the live
//! session transport.
//!
//! Usage:
//!   GOOGLE_MAPS_API_KEY=... cargo run --example console
//!   cargo run --example console -- --mock
//!
//! Then type notifications such as:
//!   {"functionCalls":[{"id":"1","name":"search_weather","args":{"position":"Paris"}}]}
//!
//! Ctrl-D or "exit" to leave.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use live_tools::{
    lookup, GraphLookup, SessionConfig, StaticWeatherLookup, ToolCallNotification, ToolDispatcher,
    WeatherLookup,
};

#[derive(Parser)]
#[command(name = "console", about = "Drive the tool dispatcher from stdin")]
struct Cli {
    /// Use the canned weather adapter instead of real HTTP lookups
    #[arg(long)]
    mock: bool,

    /// How long to wait for responses after each notification, in ms
    #[arg(long, default_value_t = 5000)]
    response_timeout_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "live_tools=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let weather_decl = Arc::new(lookup::weather::declaration());
    let graph_decl = Arc::new(lookup::graph::declaration());

    let config = SessionConfig::builder()
        .declare(weather_decl.clone())
        .declare(graph_decl.clone())
        .system_instruction("You are my helpful assistant.")
        .build()?;
    println!("session config: {}", config.to_wire());

    let mut dispatcher = ToolDispatcher::new(config);

    let _weather = if cli.mock {
        dispatcher.attach(weather_decl, StaticWeatherLookup::default())?
    } else {
        let api_key = std::env::var("GOOGLE_MAPS_API_KEY").unwrap_or_else(|_| {
            eprintln!("error: GOOGLE_MAPS_API_KEY not set (use --mock to skip real lookups)");
            std::process::exit(1);
        });
        dispatcher.attach(weather_decl, WeatherLookup::new(api_key))?
    };
    let _graph = dispatcher.attach(graph_decl, GraphLookup)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let notification: ToolCallNotification = match serde_json::from_str(line) {
            Ok(n) => n,
            Err(e) => {
                eprintln!("not a tool-call notification: {e}");
                continue;
            }
        };
        let expected = notification
            .function_calls
            .as_ref()
            .map_or(0, |calls| calls.len());
        dispatcher.deliver(notification);

        for _ in 0..expected {
            match tokio::time::timeout(
                Duration::from_millis(cli.response_timeout_ms),
                dispatcher.next_response(),
            )
            .await
            {
                Ok(Some(response)) => println!("{}", response.to_wire()),
                Ok(None) => return Ok(()),
                Err(_) => {
                    eprintln!("no response within timeout");
                    break;
                }
            }
        }
    }

    Ok(())
}
