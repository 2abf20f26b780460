// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests against a gateway bound to an ephemeral port.

use futures::{SinkExt, StreamExt};
use mnemo_agent::ServerFrame;
use mnemo_test_utils::{DEFAULT_REPLY, MockReply, TestHarness};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

struct TestServer {
    harness: TestHarness,
    base: String,
    http: reqwest::Client,
    handle: JoinHandle<Result<(), mnemo_core::MnemoError>>,
}

impl TestServer {
    async fn start(replies: Vec<MockReply>) -> Self {
        let harness = TestHarness::builder()
            .with_replies(replies)
            .build()
            .await
            .unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(mnemo_gateway::serve(listener, harness.state.clone()));
        Self {
            harness,
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn ws_url(&self) -> String {
        format!("{}/ws", self.base.replacen("http", "ws", 1))
    }

    async fn stop(self) {
        self.harness.shutdown().cancel();
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn health_reports_model_and_version() {
    let server = TestServer::start(vec![]).await;

    let resp = server.http.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "mock-model");
    assert!(body["uptime_secs"].is_u64());

    server.stop().await;
}

#[tokio::test]
async fn conversation_lifecycle() {
    let server = TestServer::start(vec![]).await;

    let resp = server
        .http
        .post(server.url("/api/conversations"))
        .json(&json!({ "title": "Reading list", "user_id": "u1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["title"], "Reading list");

    let list: Vec<Value> = server
        .http
        .get(server.url("/api/conversations"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id.as_str());

    let resp = server
        .http
        .get(server.url(&format!("/api/conversations/{id}/messages")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .http
        .delete(server.url(&format!("/api/conversations/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server
        .http
        .get(server.url(&format!("/api/conversations/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains(&id));

    server.stop().await;
}

#[tokio::test]
async fn clearing_unknown_conversation_is_not_found() {
    let server = TestServer::start(vec![]).await;

    let resp = server
        .http
        .post(server.url("/api/conversations/missing/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

/// Field order matches the wire shape so the snapshot is stable.
#[derive(Debug, Serialize, Deserialize)]
struct KbStatusBody {
    name: String,
    exists: bool,
    documents: usize,
    chunks: usize,
}

#[tokio::test]
async fn knowledge_base_workflow() {
    let server = TestServer::start(vec![MockReply::text("Qubits can hold superpositions.")]).await;

    let resp = server
        .http
        .post(server.url("/api/kb"))
        .json(&json!({ "name": "physics" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let status: KbStatusBody = resp.json().await.unwrap();
    insta::assert_json_snapshot!(status, @r#"
    {
      "name": "physics",
      "exists": true,
      "documents": 0,
      "chunks": 0
    }
    "#);

    let document = "Quantum computing uses qubits.\n\nA qubit can be in a superposition of states.\n\nEntanglement links qubits together.";
    let resp = server
        .http
        .post(server.url("/api/kb/physics/docs/quantum.txt"))
        .body(document)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let report: Value = resp.json().await.unwrap();
    assert!(report["chunks"].as_u64().unwrap() > 0);

    let status: KbStatusBody = server
        .http
        .get(server.url("/api/kb/physics/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status.documents, 1);
    assert!(status.chunks > 0);

    let docs: Vec<Value> = server
        .http
        .get(server.url("/api/kb/physics/docs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(docs[0]["file_name"], "quantum.txt");

    let page: Value = server
        .http
        .get(server.url("/api/kb/physics/docs/quantum.txt/segments?page=1&page_size=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let resp = server
        .http
        .get(server.url("/api/kb/physics/docs/quantum.txt/export?format=md"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[reqwest::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/markdown")
    );
    assert!(resp.text().await.unwrap().contains("qubits"));

    let answer: Value = server
        .http
        .post(server.url("/api/kb/physics/query"))
        .json(&json!({ "question": "What is a qubit?", "top_k": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer["answer"], "Qubits can hold superpositions.");
    assert!(!answer["sources"].as_array().unwrap().is_empty());

    let summary: Value = server
        .http
        .post(server.url("/api/kb/physics/docs/quantum.txt/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["file_name"], "quantum.txt");
    assert!(summary["statistics"]["character_count"].as_u64().unwrap() > 0);
    assert_eq!(summary["summaries"]["llm_summary"], DEFAULT_REPLY);
    assert!(
        summary["keywords"]
            .as_array()
            .unwrap()
            .iter()
            .any(|k| k["word"] == "qubits")
    );

    let resp = server
        .http
        .get(server.url("/api/kb/physics/docs/quantum.txt/summary/export?format=md"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().starts_with("# 文档摘要 - quantum.txt"));

    let resp = server
        .http
        .post(server.url("/api/kb/physics/docs/missing.txt/summary"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn chat_without_streaming() {
    let server = TestServer::start(vec![MockReply::increments(&["你好", "！"])]).await;

    let resp = server
        .http
        .post(server.url("/api/chat"))
        .json(&json!({ "message": "你好" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "你好！");
    assert_eq!(body["message"]["role"], "assistant");
    let id = body["conversation_id"].as_str().unwrap().to_string();

    let messages: Value = server
        .http
        .get(server.url(&format!("/api/conversations/{id}/messages")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages["messages"].as_array().unwrap().len(), 2);

    let resp = server
        .http
        .post(server.url("/api/chat"))
        .json(&json!({ "message": "hi", "kb": "manuals" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .http
        .post(server.url("/api/chat"))
        .json(&json!({ "message": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn conversation_title_can_be_renamed() {
    let server = TestServer::start(vec![]).await;
    let created = server.harness.storage().create_conversation_for(None, None).await.unwrap();

    let resp = server
        .http
        .put(server.url(&format!("/api/conversations/{}/title", created.id)))
        .json(&json!({ "title": "  周报  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "周报");

    let resp = server
        .http
        .put(server.url(&format!("/api/conversations/{}/title", created.id)))
        .json(&json!({ "title": " " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .http
        .put(server.url("/api/conversations/missing/title"))
        .json(&json!({ "title": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn conversation_files_feed_later_turns() {
    let server = TestServer::start(vec![MockReply::text("收入增长了。")]).await;
    let conversation = server.harness.storage().create_conversation_for(None, None).await.unwrap();
    let id = conversation.id;

    let resp = server
        .http
        .post(server.url(&format!("/api/conversations/{id}/files/报表.txt")))
        .body("第三季度报表：收入同比增长百分之二十。")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let upload: Value = resp.json().await.unwrap();
    assert_eq!(upload["namespace"], format!("conv_{id}"));
    assert!(upload["chunks"].as_u64().unwrap() >= 1);
    assert_eq!(upload["record"]["file_name"], "报表.txt");
    assert_eq!(upload["record"]["file_info"]["file_format"], ".txt");
    let file_id = upload["record"]["id"].as_str().unwrap().to_string();

    let listed: Vec<Value> = server
        .http
        .get(server.url(&format!("/api/conversations/{id}/files")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], file_id.as_str());

    let resp = server
        .http
        .post(server.url("/api/chat"))
        .json(&json!({ "message": "第三季度收入怎么样", "conversation_id": id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let calls = server.harness.model.calls();
    assert!(calls[0][0].content.contains("收入同比增长"));

    let resp = server
        .http
        .delete(server.url(&format!("/api/conversations/{id}/files/{file_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let index = server.harness.kb().pipeline().index();
    assert_eq!(index.count(&format!("conv_{id}")).await.unwrap(), 0);

    let resp = server
        .http
        .delete(server.url(&format!("/api/conversations/{id}/files/{file_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server
        .http
        .post(server.url("/api/conversations/missing/files/a.txt"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn renaming_onto_an_existing_kb_is_rejected() {
    let server = TestServer::start(vec![]).await;

    for name in ["alpha", "beta"] {
        let resp = server
            .http
            .post(server.url("/api/kb"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = server
        .http
        .post(server.url("/api/kb/alpha/rename"))
        .json(&json!({ "new_name": "beta" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .http
        .post(server.url("/api/kb/alpha/rename"))
        .json(&json!({ "new_name": "long_term" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let status: KbStatusBody = server
        .http
        .get(server.url("/api/kb/gamma/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!status.exists);

    let resp = server
        .http
        .get(server.url("/api/kb/gamma/docs"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn memory_namespace_is_not_a_knowledge_base() {
    let server = TestServer::start(vec![]).await;

    for name in ["long_term", "ltm_abc", "conv_abc"] {
        let resp = server
            .http
            .post(server.url("/api/kb"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{name} accepted");
    }

    let resp = server
        .http
        .post(server.url("/api/kb/long_term/rebuild"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn websocket_turn_round_trip() {
    let server = TestServer::start(vec![MockReply::increments(&["你好", "！"])]).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url()).await.unwrap();
    ws.send(Message::Text(
        json!({ "type": "user_message", "content": "你好" })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    let mut frames = Vec::new();
    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg.unwrap() else {
            continue;
        };
        let frame: ServerFrame = serde_json::from_str(text.as_str()).unwrap();
        let done = matches!(frame, ServerFrame::StreamEnd { .. });
        frames.push(frame);
        if done {
            break;
        }
    }

    assert_eq!(frames[0], ServerFrame::StreamStart);
    let ServerFrame::StreamEnd {
        content,
        conversation_id,
    } = frames.last().unwrap().clone()
    else {
        panic!("expected stream_end");
    };
    assert_eq!(content, "你好！");

    let messages: Value = server
        .http
        .get(server.url(&format!("/api/conversations/{conversation_id}/messages")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = messages["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["content"], "你好！");

    ws.close(None).await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn shutdown_closes_open_websockets() {
    let server = TestServer::start(vec![]).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url()).await.unwrap();
    server.harness.shutdown().cancel();

    let mut saw_close = false;
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Close(_)) => {
                saw_close = true;
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert!(saw_close);

    server.handle.await.unwrap().unwrap();
}
