// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn success_requires_output() {
    let raw = RawResponse { status: Some("success".into()), ..Default::default() };
    assert_eq!(raw.parse(), Err(ResponseError::MissingOutput));
}

#[test]
fn error_requires_error_field() {
    let raw = RawResponse { status: Some("error".into()), ..Default::default() };
    assert_eq!(raw.parse(), Err(ResponseError::MissingError));
}

#[test]
fn missing_status_and_type_is_rejected() {
    let raw = RawResponse::default();
    assert_eq!(raw.parse(), Err(ResponseError::MissingStatus));
}

#[test]
fn handler_style_type_field_is_accepted() {
    let raw = RawResponse {
        kind: Some("response".to_string()),
        output: Some(serde_json::json!("ok")),
        ..Default::default()
    };
    assert_eq!(raw.parse(), Ok(ParsedResponse::Success { output: serde_json::json!("ok") }));
}

#[test]
fn network_debugging_phrase_is_tagged() {
    let raw = RawResponse::error("Target Windows seems lost, please retry sending", None, None);
    let parsed = raw.parse().expect("parses");
    match parsed {
        ParsedResponse::Error { network_debugging, .. } => assert!(network_debugging),
        _ => panic!("expected error variant"),
    }
}

#[test]
fn ordinary_error_is_not_tagged_network_debugging() {
    let raw = RawResponse::error("invalid syntax", None, None);
    let parsed = raw.parse().expect("parses");
    match parsed {
        ParsedResponse::Error { network_debugging, .. } => assert!(!network_debugging),
        _ => panic!("expected error variant"),
    }
}

#[test]
fn round_trip_success_preserves_output() {
    let raw = RawResponse::success(serde_json::json!({"output": "WinDbg 10.0"}));
    let bytes = serde_json::to_vec(&raw).expect("serialize");
    let back: RawResponse = serde_json::from_slice(&bytes).expect("deserialize");
    assert_eq!(raw.parse().unwrap(), back.parse().unwrap());
}
