//! WASM boundary for the browser worker.
//!
//! The worker posts the editor document plus a packet spec; the engine
//! answers with a result JSON. Infrastructure failures (malformed
//! inputs, programming bugs) come back as an `ERROR` object the UI
//! shows in a banner — the engine itself never throws on normal paths.

use wasm_bindgen::prelude::*;

use crate::convert;
use crate::error::{SimError, SimResult};
use crate::packet::PacketSpec;
use crate::simulator::{simulate, SimulationOptions};

fn error_json(message: &str) -> String {
    serde_json::json!({ "type": "ERROR", "message": message }).to_string()
}

fn run(doc_json: &str, spec_json: &str, options_json: &str) -> SimResult<String> {
    let doc = convert::from_json(doc_json)?;
    let spec: PacketSpec = serde_json::from_str(spec_json).map_err(SimError::Spec)?;
    let opts: SimulationOptions = if options_json.trim().is_empty() {
        SimulationOptions::default()
    } else {
        serde_json::from_str(options_json).map_err(SimError::Options)?
    };

    let result = simulate(&convert::to_topology(&doc), &spec, opts);
    serde_json::to_string(&result).map_err(SimError::Serialize)
}

/// Simulate one packet spec against an editor document.
///
/// `options_json` may be empty to take the defaults. Returns the
/// result JSON, or an `{"type":"ERROR",...}` object on malformed input.
#[wasm_bindgen]
pub fn simulate_json(doc_json: &str, spec_json: &str, options_json: &str) -> String {
    console_error_panic_hook::set_once();
    match run(doc_json, spec_json, options_json) {
        Ok(json) => json,
        Err(err) => error_json(&err.to_string()),
    }
}

/// Pre-flight diagnostics for the UI: isolated nodes, fragmentation,
/// duplicate MACs. Returns a JSON array of strings.
#[wasm_bindgen]
pub fn validate_json(doc_json: &str) -> String {
    console_error_panic_hook::set_once();
    match convert::from_json(doc_json) {
        Ok(doc) => {
            let topology = convert::to_topology(&doc);
            let diagnostics = crate::graph::GraphAnalyzer::new(&topology).validate();
            serde_json::to_string(&diagnostics).unwrap_or_else(|_| "[]".to_string())
        }
        Err(err) => error_json(&err.to_string()),
    }
}
