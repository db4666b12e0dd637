//! Integration tests for the relay server, session handler, and full
//! create → join → stream → leave flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use peerdrop::prelude::*;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    start_with(PeerdropServerBuilder::new()).await
}

async fn start_with(builder: PeerdropServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send");
}

/// Receives the next text frame as JSON.
async fn recv_json(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(WAIT, ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("recv");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("valid JSON"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

/// Asserts nothing arrives for a short while.
async fn expect_silence(ws: &mut ClientWs) {
    if let Ok(msg) = tokio::time::timeout(QUIET, ws.next()).await {
        panic!("expected silence, got {msg:?}");
    }
}

/// Asserts the server ends the connection.
async fn expect_closed(ws: &mut ClientWs) {
    loop {
        match tokio::time::timeout(WAIT, ws.next()).await {
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return,
            Ok(Some(Ok(other))) => panic!("expected close, got {other:?}"),
            Err(_) => panic!("connection was not closed"),
        }
    }
}

/// Creates a room and returns its code.
async fn create_room(ws: &mut ClientWs) -> String {
    send_json(ws, json!({ "type": "create" })).await;
    let created = recv_json(ws).await;
    assert_eq!(created["type"], "room_created");
    created["roomId"].as_str().expect("roomId").to_string()
}

/// Joins `code` and checks the host sees the expected count.
async fn join_room(client: &mut ClientWs, host: &mut ClientWs, code: &str, expected: u64) {
    send_json(client, json!({ "type": "join", "roomId": code })).await;
    assert_eq!(
        recv_json(host).await,
        json!({ "type": "participants_count", "participants": expected })
    );
}

fn chunk(code: &str, data: &str, index: u64, total: u64) -> Value {
    let mut value = json!({
        "type": "file_chunk",
        "roomId": code,
        "fileData": data,
        "chunkIndex": index,
        "totalChunks": total,
        "isFirstChunk": index == 1,
        "isLastChunk": index == total,
    });
    if index == 1 {
        value["fileName"] = json!("test.txt");
        value["fileType"] = json!("text/plain");
        value["fileSize"] = json!(11);
    }
    value
}

fn payload_of(msg: &Value) -> Vec<u8> {
    decode_payload(msg["fileData"].as_str().expect("fileData")).expect("payload")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_returns_six_digit_code() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let code = create_room(&mut ws).await;

    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_create_join_stream_leave_close() {
    let addr = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    let code = create_room(&mut a).await;
    join_room(&mut b, &mut a, &code, 1).await;

    send_json(
        &mut a,
        json!({
            "type": "file_chunk",
            "roomId": code,
            "fileData": "aGVsbG8=",
            "fileName": "test.txt",
            "fileType": "text/plain",
            "fileSize": 5,
            "chunkIndex": 1,
            "totalChunks": 1,
            "isFirstChunk": true,
            "isLastChunk": true,
        }),
    )
    .await;

    let received = recv_json(&mut b).await;
    assert_eq!(received["type"], "file_chunk");
    assert_eq!(received["roomId"], code.as_str());
    assert_eq!(received["fileName"], "test.txt");
    assert_eq!(received["fileType"], "text/plain");
    assert_eq!(received["fileSize"], 5);
    assert_eq!(received["chunkIndex"], 1);
    assert_eq!(received["totalChunks"], 1);
    assert_eq!(received["isFirstChunk"], true);
    assert_eq!(received["isLastChunk"], true);
    assert_eq!(payload_of(&received), b"hello");

    b.close(None).await.expect("close b");
    assert_eq!(
        recv_json(&mut a).await,
        json!({ "type": "participants_count", "participants": 0 })
    );

    a.close(None).await.expect("close a");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut late = connect(&addr).await;
    send_json(&mut late, json!({ "type": "join", "roomId": code })).await;
    assert_eq!(
        recv_json(&mut late).await,
        json!({ "type": "error", "fileData": "Room not found" })
    );
}

#[tokio::test]
async fn test_join_unknown_room_keeps_connection_open() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({ "type": "join", "roomId": "999999x" })).await;
    assert_eq!(
        recv_json(&mut ws).await,
        json!({ "type": "error", "fileData": "Room not found" })
    );

    // Still usable afterwards.
    let code = create_room(&mut ws).await;
    assert_eq!(code.len(), 6);
}

#[tokio::test]
async fn test_join_without_room_id_is_not_found() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({ "type": "join" })).await;
    assert_eq!(recv_json(&mut ws).await["fileData"], ROOM_NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_and_unknown_messages_are_ignored() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json".to_string()))
        .await
        .expect("send");
    send_json(&mut ws, json!({ "type": "teleport" })).await;
    send_json(&mut ws, json!({ "roomId": "123456" })).await;
    ws.send(Message::binary(vec![0xffu8, 0x00]))
        .await
        .expect("send");
    expect_silence(&mut ws).await;

    // The session survives all of it.
    create_room(&mut ws).await;
}

#[tokio::test]
async fn test_server_only_messages_from_peer_are_ignored() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut client, &mut host, &code, 1).await;

    send_json(&mut client, json!({ "type": "room_closed" })).await;
    send_json(&mut client, json!({ "type": "participants_count", "participants": 9 })).await;
    send_json(&mut client, json!({ "type": "room_created", "roomId": "000000" })).await;

    expect_silence(&mut host).await;
    expect_silence(&mut client).await;
}

#[tokio::test]
async fn test_chunks_arrive_in_order_for_every_receiver() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut b = connect(&addr).await;
    let mut c = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut b, &mut host, &code, 1).await;
    join_room(&mut c, &mut host, &code, 2).await;

    let parts = [b"hell".as_slice(), b"o wo", b"rld"];
    for (i, part) in parts.iter().enumerate() {
        let data = encode_payload(part);
        send_json(&mut host, chunk(&code, &data, i as u64 + 1, 3)).await;
    }

    for receiver in [&mut b, &mut c] {
        let mut file = Vec::new();
        for i in 1..=3u64 {
            let msg = recv_json(receiver).await;
            assert_eq!(msg["chunkIndex"], i);
            assert_eq!(msg["isLastChunk"], i == 3);
            if i == 1 {
                assert_eq!(msg["isFirstChunk"], true);
                assert_eq!(msg["fileName"], "test.txt");
            } else {
                assert!(msg.get("isFirstChunk").is_none());
                assert!(msg.get("fileName").is_none());
                assert!(msg.get("fileSize").is_none());
            }
            file.extend(payload_of(&msg));
        }
        assert_eq!(file, b"hello world");
    }

    expect_silence(&mut host).await;
}

#[tokio::test]
async fn test_outbound_payload_is_url_safe_unpadded() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut client, &mut host, &code, 1).await;

    // Standard alphabet with padding inbound: bytes fb ff fe.
    send_json(&mut host, chunk(&code, "+//+", 1, 1)).await;

    let msg = recv_json(&mut client).await;
    assert_eq!(msg["fileData"], "-__-");
    assert_eq!(payload_of(&msg), [0xfbu8, 0xff, 0xfe]);
}

#[tokio::test]
async fn test_bad_payload_is_dropped() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut client, &mut host, &code, 1).await;

    send_json(&mut host, chunk(&code, "%%% not base64 %%%", 1, 1)).await;
    expect_silence(&mut client).await;

    // The host keeps streaming afterwards.
    send_json(&mut host, chunk(&code, "aGk", 1, 1)).await;
    assert_eq!(payload_of(&recv_json(&mut client).await), b"hi");
}

#[tokio::test]
async fn test_chunk_from_non_host_is_ignored() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut b = connect(&addr).await;
    let mut c = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut b, &mut host, &code, 1).await;
    join_room(&mut c, &mut host, &code, 2).await;

    send_json(&mut b, chunk(&code, "c3Bvb2Y", 1, 1)).await;

    expect_silence(&mut c).await;
    expect_silence(&mut b).await;
    expect_silence(&mut host).await;
}

#[tokio::test]
async fn test_chunk_for_unknown_room_is_ignored() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    create_room(&mut ws).await;

    send_json(&mut ws, chunk("000000x", "aGk", 1, 1)).await;
    expect_silence(&mut ws).await;
}

#[tokio::test]
async fn test_host_disconnect_closes_every_receiver() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut b = connect(&addr).await;
    let mut c = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut b, &mut host, &code, 1).await;
    join_room(&mut c, &mut host, &code, 2).await;

    host.close(None).await.expect("close host");

    for receiver in [&mut b, &mut c] {
        assert_eq!(recv_json(receiver).await, json!({ "type": "room_closed" }));
        expect_closed(receiver).await;
    }

    let mut late = connect(&addr).await;
    send_json(&mut late, json!({ "type": "join", "roomId": code })).await;
    assert_eq!(recv_json(&mut late).await["type"], "error");
}

#[tokio::test]
async fn test_second_create_closes_previous_room() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let first = create_room(&mut host).await;
    join_room(&mut client, &mut host, &first, 1).await;

    let second = create_room(&mut host).await;
    assert_ne!(first, second);

    assert_eq!(recv_json(&mut client).await, json!({ "type": "room_closed" }));
    expect_closed(&mut client).await;
}

#[tokio::test]
async fn test_host_cannot_join_own_room() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let code = create_room(&mut host).await;

    send_json(&mut host, json!({ "type": "join", "roomId": code })).await;
    let reply = recv_json(&mut host).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["fileData"], OWN_ROOM);

    // Still the host.
    join_room(&mut client, &mut host, &code, 1).await;
    send_json(&mut host, chunk(&code, "aGk", 1, 1)).await;
    assert_eq!(payload_of(&recv_json(&mut client).await), b"hi");
}

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let code = create_room(&mut host).await;

    join_room(&mut client, &mut host, &code, 1).await;
    join_room(&mut client, &mut host, &code, 1).await;

    // One membership, so one copy of each chunk.
    send_json(&mut host, chunk(&code, "aGk", 1, 1)).await;
    recv_json(&mut client).await;
    expect_silence(&mut client).await;
}

#[tokio::test]
async fn test_switching_rooms_leaves_the_old_one() {
    let addr = start_server().await;
    let mut host_a = connect(&addr).await;
    let mut host_b = connect(&addr).await;
    let mut client = connect(&addr).await;
    let room_a = create_room(&mut host_a).await;
    let room_b = create_room(&mut host_b).await;

    join_room(&mut client, &mut host_a, &room_a, 1).await;
    join_room(&mut client, &mut host_b, &room_b, 1).await;
    assert_eq!(
        recv_json(&mut host_a).await,
        json!({ "type": "participants_count", "participants": 0 })
    );

    // A failed join leaves the current membership alone.
    send_json(&mut client, json!({ "type": "join", "roomId": "nope" })).await;
    assert_eq!(recv_json(&mut client).await["fileData"], ROOM_NOT_FOUND);
    send_json(&mut host_b, chunk(&room_b, "aGk", 1, 1)).await;
    assert_eq!(payload_of(&recv_json(&mut client).await), b"hi");
    expect_silence(&mut host_b).await;
}

#[tokio::test]
async fn test_wrong_path_is_refused() {
    let addr = start_server().await;
    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/elsewhere")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_custom_path() {
    let addr = start_with(PeerdropServerBuilder::new().path("/relay")).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/relay"))
        .await
        .expect("should connect");
    create_room(&mut ws).await;
}

#[tokio::test]
async fn test_oversized_message_ends_session() {
    let addr = start_with(PeerdropServerBuilder::new().max_message_size(1024)).await;
    let mut host = connect(&addr).await;
    let mut client = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut client, &mut host, &code, 1).await;

    let big = "A".repeat(4096);
    let _ = host
        .send(Message::text(chunk(&code, &big, 1, 1).to_string()))
        .await;

    // The host's session ends, which closes the room.
    assert_eq!(recv_json(&mut client).await, json!({ "type": "room_closed" }));
    expect_closed(&mut client).await;
}

#[tokio::test]
async fn test_many_concurrent_rooms_are_isolated() {
    let addr = start_server().await;

    let mut tasks = Vec::new();
    for n in 0..10u8 {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut host = connect(&addr).await;
            let mut client = connect(&addr).await;
            let code = create_room(&mut host).await;
            join_room(&mut client, &mut host, &code, 1).await;

            let data = encode_payload(&[n; 16]);
            send_json(&mut host, chunk(&code, &data, 1, 1)).await;
            let msg = recv_json(&mut client).await;
            assert_eq!(msg["roomId"], code.as_str());
            assert_eq!(payload_of(&msg), vec![n; 16]);
            code
        }));
    }

    let mut codes = std::collections::HashSet::new();
    for task in tasks {
        assert!(codes.insert(task.await.expect("task")));
    }
}
