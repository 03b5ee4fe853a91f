//! Mock Teller API server for testing
//!
//! Serves the three endpoints the provider uses, with the same JSON shapes
//! as the real API:
//! - GET /accounts returns [{id, name, institution: {id, name}, ...}]
//! - GET /accounts/{id}/balances returns {account_id, available, ledger}
//! - GET /accounts/{id}/transactions?count=N returns [{id, amount, date, ...}]
//!
//! Requests must carry HTTP Basic auth for `MOCK_ACCESS_TOKEN`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{Duration, NaiveDate};
use serde_json::json;

use super::teller::basic_auth_header;

pub const MOCK_ACCESS_TOKEN: &str = "test_token_mock";

pub struct MockTellerServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub num_accounts: usize,
    /// Transactions held per account; `count` truncates
    pub num_transactions_per_account: usize,
    /// Account whose balance endpoint answers 502
    pub failing_balance_account: Option<String>,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_accounts: 2,
            num_transactions_per_account: 30,
            failing_balance_account: None,
            delay_ms: 0,
        }
    }
}

impl MockTellerServer {
    /// Start on a random free port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        thread::spawn(move || handle_connection(stream, &cfg));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockTellerServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    // Accepted sockets inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);

    let mut buffer = [0; 4096];
    let Ok(n) = stream.read(&mut buffer) else {
        return;
    };
    let request = String::from_utf8_lossy(&buffer[..n]);

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "GET" {
        send_response(&mut stream, 405, "Method Not Allowed", r#"{"error": "method not allowed"}"#);
        return;
    }

    let expected_auth = format!("authorization: {}", basic_auth_header(MOCK_ACCESS_TOKEN)).to_lowercase();
    let authorized = request
        .lines()
        .any(|line| line.trim().to_lowercase() == expected_auth);
    if !authorized {
        send_response(
            &mut stream,
            401,
            "Unauthorized",
            r#"{"error": {"code": "enrollment.disconnected", "message": "The enrollment is disconnected"}}"#,
        );
        return;
    }

    let (path, query) = parts[1].split_once('?').unwrap_or((parts[1], ""));
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["accounts"] => {
            let body = json!(mock_accounts(config.num_accounts)).to_string();
            send_response(&mut stream, 200, "OK", &body);
        }
        ["accounts", id, "balances"] => {
            if config.failing_balance_account.as_deref() == Some(*id) {
                send_response(
                    &mut stream,
                    502,
                    "Bad Gateway",
                    r#"{"error": {"code": "bad_gateway", "message": "Institution unavailable"}}"#,
                );
                return;
            }
            let body = json!({
                "account_id": id,
                "available": "1250.75",
                "ledger": "1300.00",
                "links": {"account": format!("/accounts/{id}")}
            });
            send_response(&mut stream, 200, "OK", &body.to_string());
        }
        ["accounts", id, "transactions"] => {
            let count = query
                .split('&')
                .find_map(|pair| pair.strip_prefix("count="))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(config.num_transactions_per_account);
            let txs = mock_transactions(id, config.num_transactions_per_account.min(count));
            send_response(&mut stream, 200, "OK", &json!(txs).to_string());
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"error": "not found"}"#),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn mock_accounts(count: usize) -> Vec<serde_json::Value> {
    let institutions = [("chase", "Chase"), ("wells_fargo", "Wells Fargo"), ("citi", "Citibank")];
    (0..count)
        .map(|i| {
            let (inst_id, inst_name) = institutions[i % institutions.len()];
            json!({
                "id": format!("acc_mock_{}", i + 1),
                "enrollment_id": "enr_mock",
                "name": format!("{inst_name} Checking"),
                "institution": {"id": inst_id, "name": inst_name},
                "last_four": format!("{:04}", 1000 + i),
                "currency": "usd",
                "type": "depository",
                "subtype": "checking",
                "status": "open"
            })
        })
        .collect()
}

/// Newest first, one per day counting back from a fixed date
fn mock_transactions(account_id: &str, count: usize) -> Vec<serde_json::Value> {
    let newest = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap_or_default();
    (0..count)
        .map(|i| {
            let date = newest - Duration::days(i as i64);
            json!({
                "id": format!("txn_{account_id}_{}", i + 1),
                "account_id": account_id,
                "amount": if i % 5 == 0 { "2500.00".to_string() } else { format!("-{}.50", 10 + i) },
                "date": date.format("%Y-%m-%d").to_string(),
                "description": format!("Mock transaction {}", i + 1),
                "running_balance": null,
                "status": "posted",
                "type": if i % 5 == 0 { "ach" } else { "card_payment" }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::teller::{TellerClient, TellerProvider};
    use crate::ports::AccountDataProvider;
    use crate::Error;
    use rust_decimal::Decimal;

    fn provider(server: &MockTellerServer, timeout_ms: u64) -> TellerProvider {
        let client = TellerClient::new_with_base_url(
            &server.base_url(),
            None,
            std::time::Duration::from_millis(timeout_ms),
        )
        .unwrap();
        TellerProvider::new(client)
    }

    #[test]
    fn test_list_accounts() {
        let server = MockTellerServer::start(MockConfig {
            num_accounts: 3,
            ..Default::default()
        })
        .unwrap();

        let accounts = provider(&server, 5000).list_accounts(MOCK_ACCESS_TOKEN).unwrap();
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].id, "acc_mock_1");
        assert_eq!(accounts[0].institution.as_deref(), Some("Chase"));
        assert_eq!(accounts[1].last_four.as_deref(), Some("1001"));
    }

    #[test]
    fn test_bearer_prefixed_token_is_accepted() {
        let server = MockTellerServer::start(MockConfig::default()).unwrap();
        let token = format!("Bearer {MOCK_ACCESS_TOKEN}");

        assert!(provider(&server, 5000).list_accounts(&token).is_ok());
    }

    #[test]
    fn test_balance() {
        let server = MockTellerServer::start(MockConfig::default()).unwrap();

        let balance = provider(&server, 5000)
            .get_balance(MOCK_ACCESS_TOKEN, "acc_mock_1")
            .unwrap();
        assert_eq!(balance.account_id, "acc_mock_1");
        assert_eq!(balance.available, Some(Decimal::new(125075, 2)));
        assert_eq!(balance.ledger, Some(Decimal::new(130000, 2)));
    }

    #[test]
    fn test_transactions_honor_count() {
        let server = MockTellerServer::start(MockConfig::default()).unwrap();

        let txs = provider(&server, 5000)
            .get_transactions(MOCK_ACCESS_TOKEN, "acc_mock_1", 7)
            .unwrap();
        assert_eq!(txs.len(), 7);
        assert_eq!(txs[0].id, "txn_acc_mock_1_1");
        assert_eq!(txs[1].amount, Decimal::new(-1150, 2));
        assert!(txs[0].date > txs[6].date);
    }

    #[test]
    fn test_unknown_token_is_provider_error_with_status() {
        let server = MockTellerServer::start(MockConfig::default()).unwrap();

        let err = provider(&server, 5000).list_accounts("wrong_token").unwrap_err();
        match err {
            Error::Provider { status, body } => {
                assert_eq!(status, Some(401));
                assert!(body.contains("enrollment.disconnected"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_failing_balance_keeps_status() {
        let server = MockTellerServer::start(MockConfig {
            failing_balance_account: Some("acc_mock_2".to_string()),
            ..Default::default()
        })
        .unwrap();
        let provider = provider(&server, 5000);

        assert!(provider.get_balance(MOCK_ACCESS_TOKEN, "acc_mock_1").is_ok());
        let err = provider.get_balance(MOCK_ACCESS_TOKEN, "acc_mock_2").unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(502), .. }));
    }

    #[test]
    fn test_timeout_is_provider_error_without_status() {
        let server = MockTellerServer::start(MockConfig {
            delay_ms: 1500,
            ..Default::default()
        })
        .unwrap();

        let err = provider(&server, 200).list_accounts(MOCK_ACCESS_TOKEN).unwrap_err();
        assert!(matches!(err, Error::Provider { status: None, .. }), "got {err:?}");
    }

    #[test]
    fn test_connection_refused_is_provider_error() {
        let mut server = MockTellerServer::start(MockConfig::default()).unwrap();
        let url = server.base_url();
        server.stop();
        drop(server);

        // The listener is gone once the accept thread has exited
        let client =
            TellerClient::new_with_base_url(&url, None, std::time::Duration::from_millis(500)).unwrap();
        let err = TellerProvider::new(client)
            .list_accounts(MOCK_ACCESS_TOKEN)
            .unwrap_err();
        assert!(err.is_provider());
    }
}
