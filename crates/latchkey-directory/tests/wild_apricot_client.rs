//! Integration tests for WildApricotClient
//!
//! These tests run the client against a small HTTP responder on localhost
//! that mimics the Wild Apricot token, accounts, contacts and picture
//! endpoints.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use latchkey_core::{Connectivity, Rfid};
use latchkey_directory::{DirectoryConfig, LookupOutcome, MembershipDirectory, WildApricotClient};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct FakeService {
    base: String,
    auth_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    reject_lookups: AtomicUsize,
}

impl FakeService {
    fn route(&self, method: &str, target: &str, head: &str, body: &str) -> (&'static str, String) {
        let head = head.to_ascii_lowercase();

        match (method, target) {
            ("POST", "/auth/token") => {
                let n = self.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if !head.contains("authorization: basic ")
                    || body != "grant_type=client_credentials&scope=auto"
                {
                    return ("401 Unauthorized", "{}".to_string());
                }
                let token = json!({"access_token": format!("token-{n}"), "expires_in": 1800});
                ("200 OK", token.to_string())
            }
            ("GET", "/v2.1/accounts") => {
                if !head.contains("authorization: bearer token-") {
                    return ("401 Unauthorized", "{}".to_string());
                }
                let accounts = json!([{
                    "Id": 1,
                    "Resources": [
                        {"Name": "Events", "Url": format!("{}/v2.1/accounts/1/events", self.base)},
                        {"Name": "Contacts", "Url": format!("{}/v2.1/accounts/1/contacts", self.base)}
                    ]
                }]);
                ("200 OK", accounts.to_string())
            }
            ("GET", t) if t.starts_with("/v2.1/accounts/1/contacts?") => {
                self.lookup_calls.fetch_add(1, Ordering::SeqCst);
                let rejected = self
                    .reject_lookups
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if rejected {
                    return ("401 Unauthorized", "{}".to_string());
                }
                assert!(t.contains("%24async=false"));
                self.contacts(t)
            }
            ("GET", "/pictures/77?asBase64=true") => ("200 OK", "aGVsbG8=".to_string()),
            _ => ("404 Not Found", "{}".to_string()),
        }
    }

    fn contacts(&self, target: &str) -> (&'static str, String) {
        let contact = |name: &str, status: &str| {
            json!({
                "Id": 9,
                "DisplayName": name,
                "FieldValues": [
                    {"FieldName": "Membership status", "Value": {"Id": 1, "Value": status}},
                    {"FieldName": "Avatar", "Value": {"Id": "77", "Url": format!("{}/pictures/77", self.base)}}
                ]
            })
        };

        if target.contains("RFID+eq+1234") {
            ("200 OK", json!({"Contacts": [contact("Ann", "Active")]}).to_string())
        } else if target.contains("RFID+eq+2222") {
            ("200 OK", json!({"Contacts": [contact("Carl", "Terminated")]}).to_string())
        } else if target.contains("RFID+eq+3333") {
            let nameless = json!({
                "Id": 12,
                "FirstName": "Dana",
                "LastName": "Ruiz",
                "FieldValues": [
                    {"FieldName": "Membership status", "Value": {"Id": 1, "Value": "Active"}}
                ]
            });
            ("200 OK", json!({"Contacts": [nameless]}).to_string())
        } else if target.contains("RFID+eq+5000") {
            ("500 Internal Server Error", "{}".to_string())
        } else {
            ("200 OK", json!({"Contacts": []}).to_string())
        }
    }
}

async fn spawn_service(reject_lookups: usize) -> Arc<FakeService> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let service = Arc::new(FakeService {
        base: format!("http://{}", listener.local_addr().unwrap()),
        auth_calls: AtomicUsize::new(0),
        lookup_calls: AtomicUsize::new(0),
        reject_lookups: AtomicUsize::new(reject_lookups),
    });

    let server = Arc::clone(&service);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let server = Arc::clone(&server);
            tokio::spawn(async move { serve_one(stream, &server).await });
        }
    });

    service
}

async fn serve_one(mut stream: TcpStream, service: &FakeService) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let target = request_line.next().unwrap_or_default();

    let (status, payload) = service.route(method, target, &head, &body);
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    let _ = stream.shutdown().await;
}

fn client_for(base: &str, connectivity: Connectivity) -> WildApricotClient {
    let config = DirectoryConfig::new("test-key")
        .with_auth_url(format!("{base}/auth/token"))
        .with_api_url(base)
        .with_timeout(Duration::from_secs(2));
    WildApricotClient::new(config, connectivity).unwrap()
}

fn rfid(id: &str) -> Rfid {
    Rfid::new(id).unwrap()
}

/// Test an active member is found and the session is reused
#[tokio::test]
async fn test_active_member_found() {
    let service = spawn_service(0).await;
    let connectivity = Connectivity::new();
    let mut client = client_for(&service.base, connectivity.clone());

    let LookupOutcome::Found(record) = client.find_by_rfid(&rfid("1234")).await else {
        panic!("expected Ann to be found");
    };
    assert_eq!(record.display_name, "Ann");
    assert!(record.is_active());
    assert!(connectivity.is_connected());

    // Second lookup reuses the token
    let outcome = client.find_by_rfid(&rfid("1234")).await;
    assert!(matches!(outcome, LookupOutcome::Found(_)));
    assert_eq!(service.auth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.lookup_calls.load(Ordering::SeqCst), 2);
}

/// Test an inactive member is found but not admitted
#[tokio::test]
async fn test_inactive_member_found() {
    let service = spawn_service(0).await;
    let mut client = client_for(&service.base, Connectivity::new());

    let LookupOutcome::Found(record) = client.find_by_rfid(&rfid("2222")).await else {
        panic!("expected Carl to be found");
    };
    assert_eq!(record.display_name, "Carl");
    assert!(!record.is_active());
}

/// Test zero matching contacts is NotFound while connected
#[tokio::test]
async fn test_unknown_card_not_found() {
    let service = spawn_service(0).await;
    let connectivity = Connectivity::new();
    let mut client = client_for(&service.base, connectivity.clone());

    assert_eq!(
        client.find_by_rfid(&rfid("9999")).await,
        LookupOutcome::NotFound
    );
    assert!(connectivity.is_connected());
}

/// Test a contact without DisplayName is still a match from a reachable service
#[tokio::test]
async fn test_contact_without_display_name_found() {
    let service = spawn_service(0).await;
    let connectivity = Connectivity::new();
    let mut client = client_for(&service.base, connectivity.clone());

    let LookupOutcome::Found(record) = client.find_by_rfid(&rfid("3333")).await else {
        panic!("expected the contact to be found");
    };
    assert_eq!(record.display_name, "Dana Ruiz");
    assert!(record.is_active());
    assert!(connectivity.is_connected());
}

/// Test an unreachable service is NetworkUnavailable
#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // Reserve a port, then close it so connections are refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let connectivity = Connectivity::new();
    connectivity.set(true);
    let mut client = client_for(&base, connectivity.clone());

    assert_eq!(
        client.find_by_rfid(&rfid("1234")).await,
        LookupOutcome::NetworkUnavailable
    );
    assert!(!connectivity.is_connected());
}

/// Test a server error on lookup is NetworkUnavailable
#[tokio::test]
async fn test_server_error_is_unavailable() {
    let service = spawn_service(0).await;
    let connectivity = Connectivity::new();
    let mut client = client_for(&service.base, connectivity.clone());

    assert_eq!(
        client.find_by_rfid(&rfid("5000")).await,
        LookupOutcome::NetworkUnavailable
    );
    assert!(!connectivity.is_connected());
}

/// Test a rejected token triggers exactly one re-authentication
#[tokio::test]
async fn test_unauthorized_lookup_reauthenticates_once() {
    let service = spawn_service(1).await;
    let mut client = client_for(&service.base, Connectivity::new());

    let outcome = client.find_by_rfid(&rfid("1234")).await;

    assert!(matches!(outcome, LookupOutcome::Found(_)));
    assert_eq!(service.auth_calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.lookup_calls.load(Ordering::SeqCst), 2);
}

/// Test a token rejected twice gives up after the single retry
#[tokio::test]
async fn test_repeated_unauthorized_gives_up() {
    let service = spawn_service(5).await;
    let connectivity = Connectivity::new();
    let mut client = client_for(&service.base, connectivity.clone());

    let outcome = client.find_by_rfid(&rfid("1234")).await;

    assert_eq!(outcome, LookupOutcome::NetworkUnavailable);
    assert!(!connectivity.is_connected());
    assert_eq!(service.auth_calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.lookup_calls.load(Ordering::SeqCst), 2);
}

/// Test the avatar is fetched as base64 keyed by file id
#[tokio::test]
async fn test_fetch_avatar() {
    let service = spawn_service(0).await;
    let mut client = client_for(&service.base, Connectivity::new());

    let LookupOutcome::Found(record) = client.find_by_rfid(&rfid("1234")).await else {
        panic!("expected Ann to be found");
    };

    let avatar = client.fetch_avatar(&record).await.unwrap();
    assert_eq!(avatar.file_id, "77");
    assert_eq!(avatar.base64, "aGVsbG8=");
}

/// Test startup authentication reports reachability
#[tokio::test]
async fn test_connect() {
    let service = spawn_service(0).await;
    let connectivity = Connectivity::new();
    let mut client = client_for(&service.base, connectivity.clone());

    assert!(client.connect().await);
    assert!(connectivity.is_connected());
    assert_eq!(service.auth_calls.load(Ordering::SeqCst), 1);
}
