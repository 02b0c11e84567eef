//! Perigee runtime - the local invocation shim.
//!
//! The packaged artifact, when run locally, accepts three positional
//! inputs - an event JSON string, a context JSON string, and an
//! environment name - and emits a single JSON response on stdout.
//! Malformed event or context JSON degrades to an empty object rather
//! than failing the invocation.

use serde_json::{json, Value};

fn main() {
    let mut args = std::env::args().skip(1);
    let event_raw = args.next().unwrap_or_default();
    let context_raw = args.next().unwrap_or_default();
    let environment_arg = args.next().unwrap_or_default();

    // The exported ENVIRONMENT variable wins over the positional
    // argument, so a deployed artifact and a local run agree.
    let environment = std::env::var("ENVIRONMENT").unwrap_or(environment_arg);

    let event = parse_or_empty(&event_raw);
    let context = parse_or_empty(&context_raw);

    let response = handle(&event, &context, &environment);
    println!("{response}");
}

fn parse_or_empty(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| json!({}))
}

/// The bundled handler: echoes deployment metadata back to the caller.
fn handle(event: &Value, _context: &Value, environment: &str) -> Value {
    json!({
        "ENVIRONMENT": environment,
        "REGION": std::env::var("REGION").unwrap_or_default(),
        "statusCode": 200,
        "message": "Your function deployment was a success",
        "event": event,
    })
}
