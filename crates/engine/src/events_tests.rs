// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use armada_core::NodeId;

#[tokio::test]
async fn subscribers_receive_events() {
    let events = RunEvents::new();
    let mut rx = events.subscribe();

    events.emit(RunEvent::NodeCompleted { node_id: NodeId::new("n1"), progress: 50 });

    let got = rx.recv().await.unwrap();
    assert_eq!(got, RunEvent::NodeCompleted { node_id: NodeId::new("n1"), progress: 50 });
}

#[test]
fn emit_without_subscribers_does_not_error() {
    let events = RunEvents::new();
    events.emit(RunEvent::WorkflowPaused);
}

#[tokio::test]
async fn slow_subscriber_lags_instead_of_blocking() {
    let events = RunEvents::with_capacity(2);
    let mut rx = events.subscribe();

    for i in 0u8..5 {
        events.emit(RunEvent::Progress { percent: i * 10, node_id: None });
    }

    // The first recv reports the lag; the channel then yields the
    // retained tail.
    assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(_))));
    assert!(rx.recv().await.is_ok());
}
