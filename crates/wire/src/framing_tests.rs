// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn write_then_read_round_trips() {
    let (mut client, mut server) = tokio::io::duplex(256);
    let bytes = encode(&serde_json::json!({"hello": "world"})).unwrap();
    write_message(&mut client, &bytes).await.unwrap();
    drop(client);

    let mut reader = tokio::io::BufReader::new(&mut server);
    let got = read_message(&mut reader).await.unwrap();
    let value: serde_json::Value = decode(&got).unwrap();
    assert_eq!(value, serde_json::json!({"hello": "world"}));
}

#[tokio::test]
async fn partial_read_is_coalesced_until_newline() {
    let (mut client, mut server) = tokio::io::duplex(256);
    client.write_all(b"{\"a\":1}").await.unwrap();
    client.write_all(b"\n").await.unwrap();
    drop(client);

    let mut reader = tokio::io::BufReader::new(&mut server);
    let got = read_message(&mut reader).await.unwrap();
    assert_eq!(got, b"{\"a\":1}");
}

#[tokio::test]
async fn broken_stream_with_no_bytes_is_closed() {
    let (client, mut server) = tokio::io::duplex(256);
    drop(client);

    let mut reader = tokio::io::BufReader::new(&mut server);
    let err = read_message(&mut reader).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Closed));
}

#[tokio::test]
async fn broken_stream_with_partial_bytes_returns_best_effort_message() {
    let (mut client, mut server) = tokio::io::duplex(256);
    client.write_all(b"{\"partial\":true}").await.unwrap();
    drop(client);

    let mut reader = tokio::io::BufReader::new(&mut server);
    let got = read_message(&mut reader).await.unwrap();
    assert_eq!(got, b"{\"partial\":true}");
}

#[test]
fn non_utf8_bytes_are_rejected() {
    let bytes = vec![0xff, 0xfe, 0xfd];
    let err = decode::<serde_json::Value>(&bytes).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidUtf8));
}

#[test]
fn invalid_json_is_rejected() {
    let err = decode::<serde_json::Value>(b"not json").unwrap_err();
    assert!(matches!(err, ProtocolError::JsonDecode(_)));
}
