//! Transport behavior against a local mock HTTP server

use flickr_gallery::{FlickrGateway, Gateway, GatewayError};
use mockito::{Matcher, Server};

fn gateway_for(server: &Server, api_key: &str) -> FlickrGateway {
    FlickrGateway::builder()
        .api_key(api_key)
        .endpoint(server.url())
        .build()
        .expect("gateway")
}

fn params(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn query_sends_defaults_method_and_call_params() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api_key".into(), "key123".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
            Matcher::UrlEncoded("nojsoncallback".into(), "1".into()),
            Matcher::UrlEncoded("method".into(), "flickr.photosets.getList".into()),
            Matcher::UrlEncoded("user_id".into(), "132044853@N08".into()),
        ]))
        .with_body(r#"{"stat":"ok","photosets":{"photoset":[]}}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "key123");
    let response = gateway
        .query(
            "flickr.photosets.getList",
            &params(&[("user_id", "132044853@N08")]),
        )
        .await
        .expect("response");

    assert_eq!(response["stat"], "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn call_specific_params_override_defaults() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api_key".into(), "key123".into()),
            Matcher::UrlEncoded("format".into(), "rest".into()),
        ]))
        .with_body(r#"{"stat":"ok"}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "key123");
    gateway
        .query("flickr.test.echo", &params(&[("format", "rest")]))
        .await
        .expect("response");

    mock.assert_async().await;
}

#[tokio::test]
async fn non_ok_status_fails_with_raw_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body(r#"{"stat":"fail","code":100,"message":"Invalid API Key (Key has invalid format)"}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "bad-key");
    let err = gateway
        .query("flickr.photosets.getList", &[])
        .await
        .expect_err("stat=fail must not parse as success");

    match err {
        GatewayError::UnexpectedResponse { raw } => {
            assert!(raw.contains("Invalid API Key"));
        }
        other => panic!("expected UnexpectedResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn unparsable_body_fails_with_raw_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body("this is not json")
        .create_async()
        .await;

    let gateway = gateway_for(&server, "key123");
    let err = gateway
        .query("flickr.test.echo", &[])
        .await
        .expect_err("garbage must not parse");

    match err {
        GatewayError::UnexpectedResponse { raw } => assert_eq!(raw, "this is not json"),
        other => panic!("expected UnexpectedResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn availability_probe_is_memoized() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded(
            "method".into(),
            "flickr.test.echo".into(),
        ))
        .with_body(r#"{"stat":"ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "key123");

    assert!(gateway.is_available().await);
    assert!(gateway.is_available().await);

    // One echo request served both checks
    mock.assert_async().await;
}

#[tokio::test]
async fn failed_probe_records_upstream_code_and_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body(r#"{"stat":"fail","code":100,"message":"Invalid API Key (Key has invalid format)"}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "bad-key");

    assert!(!gateway.is_available().await);

    let status = gateway.probe_status().await.expect("recorded status");
    assert!(!status.available);
    assert_eq!(status.code, Some(100));
    assert_eq!(
        status.message.as_deref(),
        Some("Invalid API Key (Key has invalid format)")
    );
}

#[tokio::test]
async fn reset_probe_forces_a_fresh_check() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body(r#"{"stat":"fail","code":105,"message":"Service currently unavailable"}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "key123");
    assert!(!gateway.is_available().await);

    // Upstream recovers; a later-created mock takes priority
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body(r#"{"stat":"ok"}"#)
        .create_async()
        .await;

    // Memoized result still says down until the probe is reset
    assert!(!gateway.is_available().await);
    gateway.reset_probe().await;
    assert!(gateway.is_available().await);
}

#[tokio::test]
async fn api_key_rotates_between_requests() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("api_key".into(), "first".into()))
        .with_body(r#"{"stat":"ok"}"#)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("api_key".into(), "second".into()))
        .with_body(r#"{"stat":"ok"}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server, "first");
    assert_eq!(gateway.api_key().await, "first");
    gateway.query("flickr.test.echo", &[]).await.expect("first key");

    gateway.set_api_key("second").await;
    assert_eq!(gateway.api_key().await, "second");
    gateway.query("flickr.test.echo", &[]).await.expect("second key");

    first.assert_async().await;
    second.assert_async().await;
}
