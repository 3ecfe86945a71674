//! Remote focus sink against a mocked PostgREST endpoint.

use focusdeck_core::focus::{dispatch_increment, FocusSink, ReadModifyWriteSink, RemoteFocusSink};
use focusdeck_core::{CoreError, FocusIncrement};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn increment_calls_rpc_with_api_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/rpc/increment_focus_time")
        .match_header("apikey", "anon-key")
        .match_header("authorization", "Bearer anon-key")
        .match_body(Matcher::Json(json!({ "task_id": "t1", "inc_value": 60 })))
        .with_status(204)
        .create_async()
        .await;

    let sink = RemoteFocusSink::new(&server.url(), "anon-key").unwrap();
    sink.increment_focus_time("t1", 60).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_is_sink_write_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/rest/v1/rpc/increment_focus_time")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let sink = RemoteFocusSink::new(&server.url(), "anon-key").unwrap();
    match sink.increment_focus_time("t1", 60).await {
        Err(CoreError::SinkWriteFailure { sink, message, .. }) => {
            assert_eq!(sink, "remote");
            assert!(message.contains("500"));
        }
        other => panic!("expected SinkWriteFailure, got {other:?}"),
    }

    // Dispatch logs and swallows it.
    let inc = FocusIncrement {
        task_id: "t1".into(),
        seconds: 60,
    };
    assert!(!dispatch_increment(&sink, &inc).await);
}

#[tokio::test]
async fn update_mode_reads_then_patches_total() {
    let mut server = mockito::Server::new_async().await;
    let read = server
        .mock("GET", "/rest/v1/tasks")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("id".into(), "eq.t1".into()),
            Matcher::UrlEncoded("select".into(), "focus_time".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"focus_time": 300}]"#)
        .expect(1)
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/rest/v1/tasks")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.t1".into()))
        .match_body(Matcher::Json(json!({ "focus_time": 360 })))
        .with_status(204)
        .create_async()
        .await;

    let sink = ReadModifyWriteSink::new(RemoteFocusSink::new(&server.url(), "").unwrap());
    sink.increment_focus_time("t1", 60).await.unwrap();
    assert_eq!(sink.known_total("t1"), Some(360));

    read.assert_async().await;
    patch.assert_async().await;
}

#[tokio::test]
async fn missing_row_reads_as_none() {
    let mut server = mockito::Server::new_async().await;
    let _read = server
        .mock("GET", "/rest/v1/tasks")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let sink = RemoteFocusSink::new(&server.url(), "").unwrap();
    assert_eq!(sink.read_focus_time("ghost").await.unwrap(), None);
}
