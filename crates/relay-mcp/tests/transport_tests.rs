//! Transport tests against the real `fixture-tool-server` binary

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_mcp::{
    AgentConnection, ConnectionState, Error, Launcher, LaunchSpec, StdioLauncher,
    TransportSettings,
};
use relay_registry::RestartPolicy;
use rstest::rstest;
use serde_json::json;

const FIXTURE: &str = env!("CARGO_BIN_EXE_fixture-tool-server");

fn fixture(agent: &str) -> LaunchSpec {
    LaunchSpec::new(agent, FIXTURE).with_args(["--name", agent])
}

fn connection(policy: RestartPolicy, settings: TransportSettings) -> AgentConnection {
    AgentConnection::new(
        "fixture",
        policy,
        settings,
        Arc::new(StdioLauncher) as Arc<dyn Launcher>,
    )
}

fn quick_policy(max_attempts: u32) -> RestartPolicy {
    RestartPolicy {
        enabled: true,
        max_attempts,
        delay_ms: 0,
    }
}

#[tokio::test]
async fn test_handshake_lists_tools() {
    let mut conn = connection(quick_policy(1), TransportSettings::default());
    let tools = conn.ensure_ready(&fixture("fixture")).await.unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "fail", "env", "cwd", "sleep", "crash"]);
    assert_eq!(conn.state(), ConnectionState::Ready);

    conn.close().await;
}

#[tokio::test]
async fn test_invoke_echo() {
    let mut conn = connection(quick_policy(1), TransportSettings::default());
    conn.ensure_ready(&fixture("fixture")).await.unwrap();

    let result = conn
        .invoke("echo", json!({"text": "deploy 0x49d3"}))
        .await
        .unwrap();
    assert!(!result.is_error());
    assert_eq!(result.text_content(), "deploy 0x49d3");

    conn.close().await;
}

#[tokio::test]
async fn test_is_error_passes_through_as_result() {
    let mut conn = connection(quick_policy(1), TransportSettings::default());
    conn.ensure_ready(&fixture("fixture")).await.unwrap();

    let result = conn
        .invoke("fail", json!({"message": "insufficient balance"}))
        .await
        .unwrap();
    assert!(result.is_error());
    assert_eq!(result.text_content(), "insufficient balance");
    assert_eq!(conn.state(), ConnectionState::Ready);

    conn.close().await;
}

#[tokio::test]
async fn test_unknown_tool_is_error_result() {
    let mut conn = connection(quick_policy(1), TransportSettings::default());
    conn.ensure_ready(&fixture("fixture")).await.unwrap();

    let result = conn.invoke("transfer", json!({})).await.unwrap();
    assert!(result.is_error());
    assert!(result.text_content().contains("Unknown tool"));

    conn.close().await;
}

#[tokio::test]
async fn test_child_sees_only_declared_env() {
    let spec = fixture("fixture")
        .with_env("STARKNET_PRIVATE_KEY", "0xsecret")
        .with_env("STARKNET_PUBLIC_ADDRESS", "0xabc");
    let mut conn = connection(quick_policy(1), TransportSettings::default());
    conn.ensure_ready(&spec).await.unwrap();

    let result = conn.invoke("env", json!({})).await.unwrap();
    assert_eq!(
        result.text_content(),
        "STARKNET_PRIVATE_KEY,STARKNET_PUBLIC_ADDRESS"
    );

    conn.close().await;
}

#[tokio::test]
async fn test_working_directory_is_applied() {
    let temp = tempfile::TempDir::new().unwrap();
    let spec = fixture("fixture").with_working_dir(temp.path());
    let mut conn = connection(quick_policy(1), TransportSettings::default());
    conn.ensure_ready(&spec).await.unwrap();

    let result = conn.invoke("cwd", json!({})).await.unwrap();
    let reported = std::fs::canonicalize(result.text_content()).unwrap();
    assert_eq!(reported, std::fs::canonicalize(temp.path()).unwrap());

    conn.close().await;
}

#[tokio::test]
async fn test_crash_then_restart() {
    let mut conn = connection(quick_policy(3), TransportSettings::default());
    let spec = fixture("fixture");
    conn.ensure_ready(&spec).await.unwrap();

    let err = conn.invoke("crash", json!({})).await.unwrap_err();
    assert!(err.is_connection_loss(), "unexpected error: {err}");
    assert_eq!(conn.state(), ConnectionState::Crashed);

    conn.ensure_ready(&spec).await.unwrap();
    assert_eq!(conn.state(), ConnectionState::Ready);
    let result = conn.invoke("echo", json!({"text": "back"})).await.unwrap();
    assert_eq!(result.text_content(), "back");

    conn.close().await;
}

#[tokio::test]
async fn test_timeout_keeps_connection_and_drops_late_reply() {
    let settings = TransportSettings {
        request_timeout: Duration::from_millis(250),
        ..TransportSettings::default()
    };
    let mut conn = connection(quick_policy(1), settings);
    conn.ensure_ready(&fixture("fixture")).await.unwrap();

    let err = conn.invoke("sleep", json!({"ms": 600})).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "unexpected error: {err}");
    assert_eq!(conn.state(), ConnectionState::Ready);

    // Let the slow reply arrive and be discarded.
    tokio::time::sleep(Duration::from_millis(900)).await;

    let result = conn.invoke("echo", json!({"text": "next"})).await.unwrap();
    assert_eq!(result.text_content(), "next");

    conn.close().await;
}

#[rstest]
#[case::disabled(RestartPolicy::disabled(), 1)]
#[case::two_attempts(quick_policy(2), 2)]
#[tokio::test]
async fn test_handshake_failure_exhausts_budget(
    #[case] policy: RestartPolicy,
    #[case] expected_attempts: u32,
) {
    let spec = LaunchSpec::new("broken", FIXTURE).with_args(["--exit-immediately"]);
    let mut conn = connection(policy, TransportSettings::default());

    let err = conn.ensure_ready(&spec).await.unwrap_err();
    match err {
        Error::RestartBudgetExhausted { attempts, .. } => assert_eq!(attempts, expected_attempts),
        other => panic!("expected exhausted budget, got {other}"),
    }
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_missing_binary_reports_spawn_failure() {
    let spec = LaunchSpec::new("ghost", "/nonexistent/relay/tool-server");
    let mut conn = connection(RestartPolicy::disabled(), TransportSettings::default());

    let err = conn.ensure_ready(&spec).await.unwrap_err();
    assert!(err.to_string().contains("failed to spawn"), "got {err}");
}
