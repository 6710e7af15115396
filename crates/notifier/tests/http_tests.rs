//! HTTP adapter tests
//!
//! The Gmail client, the OAuth token endpoint and the Pushover sink are
//! pointed at a local server that answers with canned responses, so the
//! request shapes and response handling are exercised without the network.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use notifier::http;
use notifier::{
    GmailAuth, GmailClient, Identity, MailProvider, MessageId, Notification, NotificationSink,
    NotifierError, OAuthToken, PushoverClient, Stage,
};

/// Serves one canned response per connection, in order
struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        thread::spawn(move || {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let request = read_request(&mut stream);
                seen.lock().unwrap().push(request);

                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
        });

        Self { url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one request (head and body) off the stream
fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..end]).to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while data.len() < end + 4 + length {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
        }
        break;
    }

    String::from_utf8_lossy(&data).to_string()
}

fn identity() -> Identity {
    Identity::parse("me@example.com").unwrap()
}

fn gmail_client(server: &StubServer) -> GmailClient {
    let agent = http::agent(http::DEFAULT_TIMEOUT);
    let auth = GmailAuth::new("client-id", "client-secret", "https://example.com/cb", agent.clone())
        .with_token_url(format!("{}/token", server.url));
    GmailClient::new(auth, agent).with_base_url(&server.url)
}

fn pushover_client(server: &StubServer) -> PushoverClient {
    PushoverClient::new(
        "app-token",
        "user-key",
        http::agent_keeping_error_bodies(http::DEFAULT_TIMEOUT),
    )
    .with_endpoint(format!("{}/1/messages.json", server.url))
}

fn notification() -> Notification {
    Notification {
        title: "New email: Hello".to_string(),
        message: "From: a\nTo: b".to_string(),
        url: "googlegmail:///cv=m1".to_string(),
        url_title: "Open in Gmail for Android".to_string(),
    }
}

// === Gmail ===

#[test]
fn test_list_messages_follows_page_tokens() {
    let server = StubServer::start(vec![
        (
            200,
            r#"{"messages":[{"id":"a","threadId":"t1"},{"id":"b","threadId":"t2"}],"nextPageToken":"page-2","resultSizeEstimate":3}"#,
        ),
        (
            200,
            r#"{"messages":[{"id":"c","threadId":"t3"}],"resultSizeEstimate":3}"#,
        ),
    ]);
    let client = gmail_client(&server);

    let summaries = client
        .list_messages(&identity(), &OAuthToken::new("access"), "is:unread")
        .unwrap();

    let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /users/me%40example.com/messages?"));
    assert!(!requests[0].contains("pageToken"));
    assert!(requests[1].contains("pageToken=page-2"));
    assert!(requests[0].to_lowercase().contains("authorization: bearer access"));
}

#[test]
fn test_empty_search_result() {
    let server = StubServer::start(vec![(200, r#"{"resultSizeEstimate":0}"#)]);

    let summaries = gmail_client(&server)
        .list_messages(&identity(), &OAuthToken::new("access"), "is:unread")
        .unwrap();

    assert!(summaries.is_empty());
}

#[test]
fn test_get_message_requests_metadata_headers() {
    let server = StubServer::start(vec![(
        200,
        r#"{
            "id": "m1",
            "threadId": "t1",
            "internalDate": "1700000000000",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "subject", "value": "Quarterly report"},
                    {"name": "From", "value": "Boss <boss@example.com>"},
                    {"name": "To", "value": "me@example.com"}
                ]
            }
        }"#,
    )]);

    let candidate = gmail_client(&server)
        .get_message(&identity(), &OAuthToken::new("access"), &MessageId::new("m1"))
        .unwrap();

    assert_eq!(candidate.subject(), "Quarterly report");
    assert_eq!(candidate.received_at, 1_700_000_000_000);

    let request = &server.requests()[0];
    assert!(request.starts_with("GET /users/me%40example.com/messages/m1?"));
    assert!(request.contains("format=metadata"));
    assert!(request.contains("metadataHeaders=Subject"));
    assert!(request.contains("metadataHeaders=From"));
    assert!(request.contains("metadataHeaders=To"));
}

#[test]
fn test_unauthorized_search_is_credential_invalid() {
    let server = StubServer::start(vec![(401, r#"{"error":{"code":401}}"#)]);

    let err = gmail_client(&server)
        .list_messages(&identity(), &OAuthToken::new("dead"), "is:unread")
        .unwrap_err();

    assert!(matches!(err, NotifierError::CredentialInvalid { .. }));
}

#[test]
fn test_server_error_is_provider_unavailable() {
    let server = StubServer::start(vec![(503, r#"{"error":{"code":503}}"#)]);

    let err = gmail_client(&server)
        .get_message(&identity(), &OAuthToken::new("access"), &MessageId::new("m1"))
        .unwrap_err();

    assert!(matches!(
        err,
        NotifierError::ProviderUnavailable {
            stage: Stage::FetchDetail,
            ..
        }
    ));
}

#[test]
fn test_credential_without_expiry_is_refreshed() {
    let server = StubServer::start(vec![(
        200,
        r#"{"access_token":"fresh","expires_in":3599,"token_type":"Bearer"}"#,
    )]);
    let stale = OAuthToken::new("stale").with_refresh_token("rt");

    let fresh = gmail_client(&server)
        .refresh_credential(&identity(), &stale)
        .unwrap()
        .expect("token without expiry should be refreshed");

    assert_eq!(fresh.access_token, "fresh");
    assert_eq!(fresh.refresh_token.as_deref(), Some("rt"));
    assert!(fresh.expiry_date.is_some());

    let request = &server.requests()[0];
    assert!(request.starts_with("POST /token"));
    assert!(request.contains("grant_type=refresh_token"));
    assert!(request.contains("refresh_token=rt"));
}

#[test]
fn test_rejected_refresh_is_credential_invalid() {
    let server = StubServer::start(vec![(400, r#"{"error":"invalid_grant"}"#)]);
    let expired = OAuthToken::new("stale")
        .with_refresh_token("revoked")
        .with_expiry_date(0);

    let err = gmail_client(&server)
        .refresh_credential(&identity(), &expired)
        .unwrap_err();

    assert!(matches!(err, NotifierError::CredentialInvalid { .. }));
}

// === Pushover ===

#[test]
fn test_pushover_delivery() {
    let server = StubServer::start(vec![(200, r#"{"status":1,"request":"req-1"}"#)]);

    let receipt = pushover_client(&server).send(&notification()).unwrap();

    assert_eq!(receipt.request.as_deref(), Some("req-1"));
    let request = &server.requests()[0];
    assert!(request.starts_with("POST /1/messages.json"));
    assert!(request.contains("token=app-token"));
    assert!(request.contains("user=user-key"));
    assert!(request.contains("url_title=Open"));
}

#[test]
fn test_pushover_rejection_is_an_error() {
    let server = StubServer::start(vec![(
        400,
        r#"{"status":0,"errors":["user identifier is invalid"],"request":"req-2"}"#,
    )]);

    let err = pushover_client(&server).send(&notification()).unwrap_err();

    let text = format!("{:#}", err);
    assert!(text.contains("HTTP 400"));
    assert!(text.contains("user identifier is invalid"));
}

#[test]
fn test_pushover_status_zero_is_an_error() {
    let server = StubServer::start(vec![(
        200,
        r#"{"status":0,"errors":["application token is invalid"]}"#,
    )]);

    let err = pushover_client(&server).send(&notification()).unwrap_err();
    assert!(format!("{:#}", err).contains("application token is invalid"));
}

#[test]
fn test_pushover_unreadable_body_is_an_error() {
    let server = StubServer::start(vec![(502, "<html>bad gateway</html>")]);

    let err = pushover_client(&server).send(&notification()).unwrap_err();
    assert!(format!("{:#}", err).contains("HTTP 502"));
}
