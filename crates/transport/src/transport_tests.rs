// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn error_kinds_map_as_specified() {
    assert_eq!(ErrorKind::from(&TransportError::NotFound), ErrorKind::TransportNotFound);
    assert_eq!(ErrorKind::from(&TransportError::Busy), ErrorKind::TransportBusy);
    assert_eq!(
        ErrorKind::from(&TransportError::Broken("eof".into())),
        ErrorKind::TransportBroken
    );
    assert_eq!(ErrorKind::from(&TransportError::Timeout), ErrorKind::Timeout);
}

#[test]
fn retryable_transport_errors_match_spec_classification() {
    assert!(ErrorKind::from(&TransportError::NotFound).is_retryable());
    assert!(ErrorKind::from(&TransportError::Busy).is_retryable());
    assert!(ErrorKind::from(&TransportError::Broken("x".into())).is_retryable());
    assert!(ErrorKind::from(&TransportError::Timeout).is_retryable());
}
