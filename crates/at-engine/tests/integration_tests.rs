//! Integration tests for the AT engine
//!
//! These tests drive the engine against virtual modems:
//! - The SMS send dialogue, its step log and its text-to-PDU fallback
//! - Classification of final responses and balance probes
//! - Transaction timing (early return, deadlines, cancellation)
//! - Device info collection and port status
//! - Bounded, staggered multi-port scanning

use std::time::Duration;

use at_engine::{
    EngineConfig, FailureKind, Link, ModemSession, ResolvedSend, ScanConfig, SendRequest, Timings,
};
use at_protocol::{AccessTechnology, SmsMode};
use at_sim::{Reply, VirtualConnector, VirtualModem};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub const PORT: &str = "/dev/ttyUSB0";

    /// Short timeouts so failure paths finish quickly
    pub fn fast_config() -> EngineConfig {
        EngineConfig {
            timings: Timings {
                poll_ms: 10,
                command_ms: 500,
                mode_ms: 500,
                prompt_ms: 500,
                ussd_ms: 500,
                final_ms: 2_000,
                reset_settle_ms: 50,
                status_balance_ms: 500,
            },
            scan: ScanConfig {
                max_concurrent: 2,
                stagger_ms: 20,
                per_device_ms: 5_000,
                overall_cap_ms: 20_000,
            },
            ..Default::default()
        }
    }

    /// Session with a single modem at [`PORT`]
    pub fn session_with(modem: VirtualModem) -> ModemSession<VirtualConnector> {
        ModemSession::new(VirtualConnector::new().with_modem(PORT, modem), fast_config())
    }

    pub fn request(config: &EngineConfig) -> ResolvedSend {
        SendRequest::new("+84912345678", "hello")
            .resolve(config)
            .unwrap()
    }

    pub fn has_step(steps: &[String], prefix: &str) -> bool {
        steps.iter().any(|s| s.starts_with(prefix))
    }
}

use helpers::*;

// ============================================================================
// Send dialogue
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_send_success_end_to_end() {
    let modem = VirtualModem::sim7600("SIM7600");
    let transcript = modem.transcript();
    let session = session_with(modem);
    let cancel = CancellationToken::new();

    let outcome = session.send(&request(session.config()), &cancel).await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.message_id.as_deref(), Some("42"));
    assert!(outcome.failure.is_none());

    let steps = outcome.steps.entries();
    assert_eq!(steps.len(), 17, "{:#?}", steps);
    assert_eq!(steps[0], "open /dev/ttyUSB0 @ 115200 -> connected");
    assert_eq!(steps[1], "AT -> OK");
    assert_eq!(steps[2], "ATE0 -> OK");
    assert!(has_step(steps, "AT+CSQ -> +CSQ: 20,99 OK"));
    assert!(has_step(steps, "AT+CUSD=1,\"*101#\",15 -> OK +CUSD:"));
    assert!(has_step(steps, "AT (after restart) -> OK"));
    assert!(has_step(steps, "AT+CMGS=\"+84912345678\" -> >"));
    assert!(has_step(steps, "Message body (5 chars) + Ctrl-Z -> sent"));
    assert_eq!(steps[16], "Final response -> +CMGS: 42 OK");

    let received = transcript.entries();
    let submit = received
        .iter()
        .position(|c| c == "AT+CMGS=\"+84912345678\"")
        .unwrap();
    assert_eq!(received[submit + 1], "hello");
    assert!(received.contains(&"AT+CSMP=17,167,0,0".to_string()));
    assert_eq!(session.connector().gauge().current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cms_error_classified_as_balance() {
    let modem = VirtualModem::sim7600("SIM7600").on_body(Reply::line("+CMS ERROR: 1"));
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.message_id, None);
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::InsufficientBalance);
    assert!(failure.message.contains("Unassigned (unallocated) number"));
    assert_eq!(
        outcome.steps.entries().last().unwrap(),
        "Final response -> +CMS ERROR: 1"
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_cms_code_is_protocol_error() {
    let modem = VirtualModem::sim7600("SIM7600").on_body(Reply::line("+CMS ERROR: 777"));
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    let failure = outcome.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::ProtocolError);
    assert!(failure.message.contains("Unknown error code"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_prompt_falls_back_to_pdu() {
    let modem = VirtualModem::sim7600("SIM7600").on_prefix("AT+CMGS=\"", Reply::line("ERROR"));
    let transcript = modem.transcript();
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(outcome.success, "{:?}", outcome);
    let steps = outcome.steps.entries();
    assert!(has_step(steps, "AT+CMGS=\"+84912345678\" -> ERROR"));
    assert!(steps.contains(&"Trying PDU mode as fallback...".to_string()));
    assert!(has_step(steps, "AT+CMGF=0 -> OK"));
    assert!(has_step(steps, "AT+CMGS=18 -> >"));

    let received = transcript.entries();
    assert!(received.contains(&"0011000B914819325476F800000568656C6C6F".to_string()));
    assert!(!received.contains(&"hello".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_silent_prompt_falls_back_to_pdu() {
    let modem = VirtualModem::sim7600("SIM7600").on_prefix("AT+CMGS=\"", Reply::Silent);
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert!(has_step(
        outcome.steps.entries(),
        "AT+CMGS=\"+84912345678\" -> ERROR: AT+CMGS=\"+84912345678\": timeout after 500ms"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_no_prompt_in_either_mode() {
    let modem = VirtualModem::sim7600("SIM7600").on_prefix("AT+CMGS=", Reply::line("ERROR"));
    let transcript = modem.transcript();
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(!outcome.success);
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.kind, FailureKind::NoInputPrompt);
    assert!(failure.message.ends_with("in either mode"));

    let steps = outcome.steps.entries();
    assert!(has_step(steps, "AT+CMGS=\"+84912345678\" -> ERROR"));
    assert!(has_step(steps, "AT+CMGS=18 -> ERROR"));
    assert!(!has_step(steps, "Message body"));
    assert!(!has_step(steps, "Final response"));
    assert!(transcript.contains("AT+CMGF=0"));
}

#[tokio::test(start_paused = true)]
async fn test_requested_pdu_mode_skips_text() {
    let modem = VirtualModem::sim7600("SIM7600");
    let transcript = modem.transcript();
    let session = session_with(modem);
    let mut request = request(session.config());
    request.mode = SmsMode::Pdu;

    let outcome = session.send(&request, &CancellationToken::new()).await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.mode, SmsMode::Pdu);
    assert!(!transcript.contains("AT+CMGF=1"));
    assert!(!transcript.contains("AT+CSMP=17,167,0,0"));
    assert!(transcript.contains("AT+CMGF=0"));
    assert!(transcript.contains("AT+CMGS=18"));
    assert!(!outcome
        .steps
        .iter()
        .any(|s| s == "Trying PDU mode as fallback..."));
}

#[tokio::test(start_paused = true)]
async fn test_low_balance_aborts_before_submit() {
    let modem = VirtualModem::sim7600("SIM7600").on_prefix(
        "AT+CUSD=1,",
        Reply::text("\r\nOK\r\n\r\n+CUSD: 0,\"Tai khoan cua quy khach khong du\",15\r\n"),
    );
    let transcript = modem.transcript();
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failure.unwrap().kind,
        FailureKind::InsufficientBalance
    );
    assert!(!transcript.contains("AT+CFUN=1,1"));
    assert!(!transcript
        .entries()
        .iter()
        .any(|c| c.starts_with("AT+CMGS")));
    assert_eq!(session.connector().gauge().current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_status_probe_failures_are_ignored() {
    let modem = VirtualModem::sim7600("SIM7600")
        .on("ATE0", Reply::Silent)
        .on("AT+CSCA?", Reply::line("ERROR"))
        .on("AT+CFUN=1,1", Reply::Silent);
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(outcome.success, "{:?}", outcome);
    let steps = outcome.steps.entries();
    assert!(has_step(steps, "ATE0 -> ERROR: ATE0: timeout"));
    assert!(has_step(steps, "AT+CSCA? -> ERROR"));
    assert_eq!(steps.len(), 17);
}

#[tokio::test(start_paused = true)]
async fn test_reset_can_be_disabled() {
    let modem = VirtualModem::sim7600("SIM7600");
    let transcript = modem.transcript();
    let mut config = fast_config();
    config.reset_before_send = false;
    let session = ModemSession::new(VirtualConnector::new().with_modem(PORT, modem), config);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.steps.len(), 15);
    assert!(!transcript.contains("AT+CFUN=1,1"));
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_ahead_of_ok() {
    let modem = VirtualModem::sim7600("SIM7600").on_body(Reply::Drip {
        text: "\r\n+CMGS: 42\r\n\r\nOK\r\n".into(),
        chunk: 4,
        interval: Duration::from_millis(50),
    });
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.message_id.as_deref(), Some("42"));
}

#[tokio::test(start_paused = true)]
async fn test_port_open_failure() {
    let session = session_with(VirtualModem::sim7600("SIM7600"));
    let mut request = request(session.config());
    request.port = "/dev/ttyUSB9".into();

    let outcome = session.send(&request, &CancellationToken::new()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure.unwrap().kind, FailureKind::PortOpenFailure);
    assert_eq!(outcome.steps.len(), 1);
    assert!(outcome.steps.entries()[0].starts_with("open /dev/ttyUSB9 @ 115200 -> ERROR:"));
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_modem() {
    let session = session_with(VirtualModem::new("dead").otherwise(Reply::Silent));

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome.failure.unwrap().kind,
        FailureKind::ModemUnresponsive
    );
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(session.connector().gauge().current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_final_response_timeout() {
    let modem = VirtualModem::sim7600("SIM7600").on_body(Reply::Silent);
    let session = session_with(modem);

    let outcome = session
        .send(&request(session.config()), &CancellationToken::new())
        .await;

    assert_eq!(outcome.failure.unwrap().kind, FailureKind::Timeout);
    assert!(outcome
        .steps
        .entries()
        .last()
        .unwrap()
        .starts_with("Final response -> ERROR: Final response: timeout after 2000ms"));
}

// ============================================================================
// Cancellation and deadlines
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_send_closes_link() {
    let mut config = fast_config();
    config.timings.final_ms = 60_000;
    let modem = VirtualModem::sim7600("SIM7600").on_body(Reply::Silent);
    let session = ModemSession::new(VirtualConnector::new().with_modem(PORT, modem), config);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = session.send(&request(session.config()), &cancel).await;

    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(outcome.failure.unwrap().kind, FailureKind::Cancelled);
    assert!(outcome
        .steps
        .entries()
        .last()
        .unwrap()
        .ends_with("Final response: cancelled"));
    assert_eq!(session.connector().gauge().current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_operation_deadline_is_timeout() {
    let mut config = fast_config();
    config.timings.final_ms = 60_000;
    let session = ModemSession::new(
        VirtualConnector::new().with_modem(PORT, VirtualModem::sim7600("x").on_body(Reply::Silent)),
        config,
    );
    let mut request = request(session.config());
    request.timeout = Duration::from_secs(3);

    let started = Instant::now();
    let outcome = session.send(&request, &CancellationToken::new()).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(outcome.failure.unwrap().kind, FailureKind::Timeout);
    assert_eq!(session.connector().gauge().current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_send_releases_link_and_guard() {
    let mut config = fast_config();
    config.timings.final_ms = 60_000;
    let session = ModemSession::new(
        VirtualConnector::new().with_modem(PORT, VirtualModem::sim7600("x").on_body(Reply::Silent)),
        config,
    );
    let cancel = CancellationToken::new();

    let dropped = tokio::time::timeout(
        Duration::from_secs(2),
        session.send(&request(session.config()), &cancel),
    )
    .await;
    assert!(dropped.is_err());
    assert_eq!(session.connector().gauge().current(), 0);

    let status = tokio::time::timeout(Duration::from_secs(2), session.port_status(None, &cancel))
        .await
        .expect("guard released")
        .unwrap();
    assert!(status.available);
}

#[tokio::test(start_paused = true)]
async fn test_transaction_returns_when_token_arrives() {
    let connector = VirtualConnector::new().with_modem(
        PORT,
        VirtualModem::new("drip").on(
            "AT+CSQ",
            Reply::Drip {
                text: "\r\n+CSQ: 20,99\r\n\r\nOK\r\n".into(),
                chunk: 3,
                interval: Duration::from_millis(20),
            },
        ),
    );
    let io = at_engine::Connector::open(&connector, PORT, 115200).unwrap();
    let mut link = Link::new(PORT, 115200, io, Duration::from_millis(100));

    let started = Instant::now();
    let response = link
        .transact(
            "AT+CSQ",
            &["OK", "ERROR"],
            Duration::from_secs(30),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(response.contains("+CSQ: 20,99"));
    link.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_transaction_cancel_is_prompt() {
    let connector =
        VirtualConnector::new().with_modem(PORT, VirtualModem::new("mute").otherwise(Reply::Silent));
    let io = at_engine::Connector::open(&connector, PORT, 115200).unwrap();
    let poll = Duration::from_millis(100);
    let mut link = Link::new(PORT, 115200, io, poll);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = link
        .transact("AT", &["OK"], Duration::from_secs(30), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() <= Duration::from_millis(250) + poll);
    link.close().await;
    assert_eq!(connector.gauge().current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sends_are_serialized() {
    let connector = VirtualConnector::new()
        .with_modem("/dev/ttyUSB0", VirtualModem::sim7600("a"))
        .with_modem("/dev/ttyUSB1", VirtualModem::sim7600("b"));
    let gauge = connector.gauge();
    let session = ModemSession::new(connector, fast_config());
    let cancel = CancellationToken::new();

    let first = request(session.config());
    let mut second = first.clone();
    second.port = "/dev/ttyUSB1".into();

    let (a, b) = tokio::join!(session.send(&first, &cancel), session.send(&second, &cancel));

    assert!(a.success && b.success);
    assert_eq!(gauge.peak(), 1);
    assert_eq!(gauge.total(), 2);
}

// ============================================================================
// Device info and port status
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_device_info_collects_every_field() {
    let session = session_with(VirtualModem::sim7600("SIM7600"));

    let info = session
        .device_info(None, None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(info.connected);
    assert_eq!(info.port, PORT);
    assert_eq!(info.baud_rate, 115200);
    assert_eq!(info.phone_number.as_deref(), Some("+84961234567"));
    assert_eq!(info.manufacturer.as_deref(), Some("SIMCOM INCORPORATED"));
    assert_eq!(info.model.as_deref(), Some("SIMCOM_SIM7600E-H"));
    assert_eq!(info.firmware_version.as_deref(), Some("LE20B04SIM7600M22"));
    assert_eq!(info.imei.as_deref(), Some("862636051234567"));
    assert_eq!(info.imsi.as_deref(), Some("452040123456789"));
    assert_eq!(info.operator.as_deref(), Some("Viettel"));
    assert_eq!(info.network_type, Some(AccessTechnology::Lte));
    assert_eq!(info.signal_level, -73);
    assert_eq!(
        info.balance.as_deref(),
        Some("TK chinh: 52000d, HSD 01/01/2027")
    );
    assert!(info.error.is_none());
    assert!(info.timestamp.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_device_info_is_best_effort() {
    let modem = VirtualModem::sim7600("SIM7600")
        .on("AT+CGMI", Reply::line("ERROR"))
        .on("AT+CIMI", Reply::Silent)
        .on("AT+CSQ", Reply::info("+CSQ: 99,99"));
    let session = session_with(modem);

    let info = session
        .device_info(None, None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(info.connected);
    assert_eq!(info.manufacturer, None);
    assert_eq!(info.imsi, None);
    assert_eq!(info.signal_level, 0);
    assert_eq!(info.model.as_deref(), Some("SIMCOM_SIM7600E-H"));
    assert_eq!(info.operator.as_deref(), Some("Viettel"));
}

#[tokio::test(start_paused = true)]
async fn test_device_info_unopenable_port() {
    let session = session_with(VirtualModem::sim7600("SIM7600"));

    let info = session
        .device_info(Some("/dev/ttyUSB7"), Some(9600), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!info.connected);
    assert_eq!(info.baud_rate, 9600);
    assert!(info.error.unwrap().starts_with("Failed to open port"));
}

#[tokio::test(start_paused = true)]
async fn test_port_status() {
    let session = session_with(VirtualModem::sim7600("SIM7600"));
    let cancel = CancellationToken::new();

    let status = session.port_status(None, &cancel).await.unwrap();
    assert!(status.available);
    assert_eq!(
        status.balance.as_deref(),
        Some("TK chinh: 52000d, HSD 01/01/2027")
    );
    assert!(status.error.is_none());

    let missing = session
        .port_status(Some("/dev/ttyUSB5"), &cancel)
        .await
        .unwrap();
    assert!(!missing.available);
    assert!(missing.balance.is_none());
    assert!(missing.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_port_status_without_balance_code() {
    let mut config = fast_config();
    config.balance_ussd = None;
    let modem = VirtualModem::sim7600("SIM7600");
    let transcript = modem.transcript();
    let session = ModemSession::new(VirtualConnector::new().with_modem(PORT, modem), config);

    let status = session
        .port_status(None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(status.available);
    assert!(status.balance.is_none());
    assert!(transcript.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_port_status_balance_shares_one_budget() {
    let modem = VirtualModem::sim7600("SIM7600")
        .on(
            "AT+CUSD=1",
            Reply::Delayed(Duration::from_millis(300), "\r\nOK\r\n".into()),
        )
        .on_prefix(
            "AT+CUSD=1,",
            Reply::Delayed(
                Duration::from_millis(300),
                "\r\nOK\r\n\r\n+CUSD: 0,\"TK chinh: 52000d\",15\r\n".into(),
            ),
        );
    let session = session_with(modem);

    let started = Instant::now();
    let status = session
        .port_status(None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(status.available);
    assert!(status.balance.is_none());
    assert!(started.elapsed() < Duration::from_millis(600));
}

// ============================================================================
// Port listing and scanning
// ============================================================================

fn slow_modem(name: &str) -> VirtualModem {
    VirtualModem::sim7600(name).on(
        "AT+CGMI",
        Reply::Delayed(
            Duration::from_millis(100),
            "\r\nSIMCOM INCORPORATED\r\n\r\nOK\r\n".into(),
        ),
    )
}

#[tokio::test(start_paused = true)]
async fn test_list_ports_filters_and_sorts() {
    let connector = VirtualConnector::new()
        .with_modem("/dev/ttyUSB1", VirtualModem::new("b"))
        .with_modem("/dev/ttyS0", VirtualModem::new("uart"))
        .with_modem("/dev/ttyUSB0", VirtualModem::new("a"));
    let session = ModemSession::new(connector, fast_config());

    let ports: Vec<_> = session
        .list_ports()
        .unwrap()
        .into_iter()
        .map(|p| p.port)
        .collect();
    assert_eq!(ports, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
}

#[tokio::test(start_paused = true)]
async fn test_scan_respects_concurrency_cap() {
    let mut connector = VirtualConnector::new();
    for n in [4, 2, 0, 3, 1] {
        let port = format!("/dev/ttyUSB{}", n);
        connector = connector.with_modem(port.clone(), slow_modem(&port));
    }
    let gauge = connector.gauge();
    let session = ModemSession::new(connector, fast_config());

    let results = session
        .scan_devices(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    assert!(gauge.peak() <= 2, "peak {}", gauge.peak());
    assert_eq!(gauge.peak(), 2);
    let ports: Vec<_> = results.iter().map(|r| r.port.as_str()).collect();
    assert_eq!(
        ports,
        vec![
            "/dev/ttyUSB0",
            "/dev/ttyUSB1",
            "/dev/ttyUSB2",
            "/dev/ttyUSB3",
            "/dev/ttyUSB4"
        ]
    );
    assert!(results.iter().all(|r| r.connected && r.imei.is_some()));
    assert_eq!(gauge.current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scan_single_port_runs_alone() {
    let connector = VirtualConnector::new().with_modem(PORT, VirtualModem::sim7600("only"));
    let gauge = connector.gauge();
    let session = ModemSession::new(connector, fast_config());

    let results = session
        .scan_devices(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scan_per_device_budget() {
    let mut config = fast_config();
    config.scan.per_device_ms = 300;
    let connector = VirtualConnector::new()
        .with_modem("/dev/ttyUSB0", VirtualModem::new("mute").otherwise(Reply::Silent))
        .with_modem("/dev/ttyUSB1", VirtualModem::sim7600("ok"));
    let session = ModemSession::new(connector, config);

    let results = session
        .scan_devices(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let mute = &results[0];
    assert!(mute.connected);
    assert_eq!(mute.manufacturer, None);
    assert_eq!(mute.error.as_deref(), Some("device timeout after 300ms"));
    assert!(results[1].error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_scan_overall_deadline_returns_partial() {
    let mut config = fast_config();
    config.scan.overall_cap_ms = 400;
    config.scan.stagger_ms = 0;
    let mut connector = VirtualConnector::new();
    for n in 0..4 {
        connector = connector.with_modem(
            format!("/dev/ttyUSB{}", n),
            VirtualModem::new("mute").otherwise(Reply::Silent),
        );
    }
    let gauge = connector.gauge();
    let session = ModemSession::new(connector, config);

    let started = Instant::now();
    let results = session
        .scan_devices(&CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(results.len() < 4);
    assert_eq!(gauge.current(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_scan_with_no_ports() {
    let session = ModemSession::new(VirtualConnector::new(), fast_config());
    let results = session
        .scan_devices(&CancellationToken::new())
        .await
        .unwrap();
    assert!(results.is_empty());
}
