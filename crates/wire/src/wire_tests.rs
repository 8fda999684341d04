// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::{FleetEnvelope, FleetFrame, RobotEnvelope, RobotFrame};
use armada_core::JobId;
use proptest::prelude::*;

#[test]
fn encode_decode_round_trip() {
    let envelope = FleetEnvelope::new(FleetFrame::JobCancel { job_id: JobId::new("job-1") });
    let text = encode(&envelope).unwrap();
    let back: FleetEnvelope = decode(&text).unwrap();
    assert_eq!(back, envelope);
}

#[test]
fn unknown_type_tag_is_malformed() {
    let text = r#"{"id": "m1", "type": "format:disk"}"#;
    assert!(matches!(
        decode::<RobotEnvelope>(text),
        Err(ProtocolError::Malformed(_))
    ));
}

#[test]
fn truncated_json_is_malformed() {
    assert!(matches!(
        decode::<RobotEnvelope>(r#"{"id": "m1", "type": "hea"#),
        Err(ProtocolError::Malformed(_))
    ));
}

#[tokio::test]
async fn framed_stream_round_trips() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);

    let sent = RobotEnvelope::new(RobotFrame::JobAccept { job_id: JobId::new("job-9") });
    write_frame(&mut client, &sent).await.unwrap();

    let received: RobotEnvelope = read_frame(&mut server).await.unwrap();
    assert_eq!(received, sent);
}

#[tokio::test]
async fn framed_stream_handles_back_to_back_frames() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);

    for i in 0..3 {
        let frame =
            RobotEnvelope::new(RobotFrame::JobAccept { job_id: JobId::new(format!("job-{i}")) });
        write_frame(&mut client, &frame).await.unwrap();
    }

    for i in 0..3 {
        let received: RobotEnvelope = read_frame(&mut server).await.unwrap();
        match received.payload {
            RobotFrame::JobAccept { job_id } => assert_eq!(job_id.as_str(), format!("job-{i}")),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn closed_stream_reports_closed() {
    let (client, mut server) = tokio::io::duplex(1024);
    drop(client);
    assert!(matches!(
        read_frame::<_, RobotEnvelope>(&mut server).await,
        Err(ProtocolError::Closed)
    ));
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    tokio::io::AsyncWriteExt::write_all(&mut client, &u32::MAX.to_be_bytes())
        .await
        .unwrap();
    assert!(matches!(
        read_frame::<_, RobotEnvelope>(&mut server).await,
        Err(ProtocolError::FrameTooLarge(_))
    ));
}

proptest! {
    /// Any progress frame survives the codec.
    #[test]
    fn progress_frames_round_trip(progress in 0u8..=100, job in "[a-z0-9-]{1,24}") {
        let envelope = RobotEnvelope::new(RobotFrame::JobProgress {
            job_id: JobId::new(job),
            progress,
            node_id: None,
        });
        let text = encode(&envelope).unwrap();
        let back: RobotEnvelope = decode(&text).unwrap();
        prop_assert_eq!(back, envelope);
    }
}
