//! Facade behavior: connectivity-driven construction, mode switching with
//! snapshot carry-over, and transport-independent read/control selection.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use intellifire_api::sign::signed_body;
use intellifire_core::{
    CoreError, FireplaceCredentials, FireplaceOptions, SessionCookies, TransportMode,
    UnifiedFireplace,
};
use tokio::time::sleep;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERIAL: &str = "ABCDE12345";
const API_KEY: &str = "12345678deadbeef";
const USER_ID: &str = "user1";
const CHALLENGE: &str = "82fc1b0a";

fn local_poll_body(setpoint: u16) -> String {
    format!(
        r#"{{
            "serial": "{SERIAL}",
            "temperature": 17,
            "power": 0,
            "height": 4,
            "setpoint": {setpoint},
            "errors": [],
            "ipv4_address": "192.168.1.80"
        }}"#
    )
}

const CLOUD_POLL_BODY: &str = r#"{"temperature":"22","power":"0","errors":[]}"#;

fn credentials(local_host: &str) -> FireplaceCredentials {
    FireplaceCredentials {
        ip_address: local_host.to_owned(),
        api_key: API_KEY.into(),
        serial: SERIAL.into(),
        cookies: SessionCookies {
            user_id: USER_ID.into(),
            auth_cookie: "deadbeef".into(),
            web_client_id: "web1".into(),
        },
        read_mode: TransportMode::Local,
        control_mode: TransportMode::Local,
    }
}

fn options(cloud_uri: &str) -> FireplaceOptions {
    FireplaceOptions {
        cloud_base_url: cloud_uri.to_owned(),
        local_interval: Duration::from_millis(50),
        cloud_interval: Duration::from_millis(50),
        probe_timeout: Duration::from_secs(2),
        ..FireplaceOptions::default()
    }
}

async fn mock_local_poll(server: &MockServer, setpoint: u16) {
    Mock::given(method("GET"))
        .and(path("/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_string(local_poll_body(setpoint)))
        .mount(server)
        .await;
}

async fn mock_cloud_poll(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/a/{SERIAL}//apppoll")))
        .respond_with(ResponseTemplate::new(200).set_body_string(CLOUD_POLL_BODY))
        .mount(server)
        .await;
}

/// Cloud server whose every endpoint fails, for local-only scenarios.
async fn dead_cloud() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn connect_honors_requested_modes_when_both_transports_answer() {
    let local = MockServer::start().await;
    let cloud = MockServer::start().await;
    mock_local_poll(&local, 0).await;
    mock_cloud_poll(&cloud).await;

    let fireplace = UnifiedFireplace::connect(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .await
    .unwrap();

    assert_eq!(fireplace.read_mode(), TransportMode::Local);
    assert_eq!(fireplace.control_mode(), TransportMode::Local);
    assert!(fireplace.is_polling_in_background());
    assert_eq!(fireplace.serial(), SERIAL);

    fireplace.shutdown().await;
    assert!(!fireplace.is_polling_in_background());
}

#[tokio::test]
async fn connect_falls_back_to_cloud_when_local_is_dead() {
    let cloud = MockServer::start().await;
    mock_cloud_poll(&cloud).await;

    // Nothing listens on port 1; the local probe fails fast.
    let fireplace =
        UnifiedFireplace::connect(credentials("127.0.0.1:1"), &options(&cloud.uri()))
            .await
            .unwrap();

    assert_eq!(fireplace.read_mode(), TransportMode::Cloud);
    assert_eq!(fireplace.control_mode(), TransportMode::Cloud);
    assert!(fireplace.is_polling_in_background());
    fireplace.shutdown().await;
}

#[tokio::test]
async fn connect_fails_when_neither_transport_answers() {
    let cloud = dead_cloud().await;

    let err =
        UnifiedFireplace::connect(credentials("127.0.0.1:1"), &options(&cloud.uri()))
            .await
            .unwrap_err();
    assert!(matches!(err, CoreError::NoConnectivity));
    assert!(err.is_transient());
}

#[tokio::test]
async fn connectivity_probe_reports_each_transport_independently() {
    let local = MockServer::start().await;
    let cloud = dead_cloud().await;
    mock_local_poll(&local, 0).await;

    let fireplace = UnifiedFireplace::new(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .unwrap();

    let (local_ok, cloud_ok) =
        fireplace.validate_connectivity(Duration::from_secs(2)).await;
    assert!(local_ok);
    assert!(!cloud_ok);
}

#[tokio::test]
async fn set_read_mode_to_current_mode_is_a_noop() {
    let local = MockServer::start().await;
    let cloud = dead_cloud().await;
    mock_local_poll(&local, 0).await;

    let fireplace = UnifiedFireplace::connect(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .await
    .unwrap();

    let mut watcher = fireplace.subscribe_read_mode();
    watcher.mark_unchanged();

    fireplace.set_read_mode(TransportMode::Local).await;

    assert!(!watcher.has_changed().unwrap(), "no mode event for a no-op");
    assert!(fireplace.is_polling_in_background());
    fireplace.shutdown().await;
}

#[tokio::test]
async fn read_mode_switch_carries_the_snapshot_over() {
    let local = MockServer::start().await;
    let cloud = dead_cloud().await;
    mock_local_poll(&local, 0).await;

    let fireplace = UnifiedFireplace::connect(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .await
    .unwrap();

    // Let the local loop land at least one real snapshot.
    sleep(Duration::from_millis(120)).await;
    assert_eq!(fireplace.data().serial, SERIAL);

    fireplace.set_read_mode(TransportMode::Cloud).await;
    assert_eq!(fireplace.read_mode(), TransportMode::Cloud);

    // The cloud poller has never polled successfully; without carry-over
    // this would be the default sentinel.
    let data = fireplace.data();
    assert_eq!(data.serial, SERIAL);
    assert_eq!(data.temperature_c, 17);

    fireplace.shutdown().await;
}

#[tokio::test]
async fn commands_reflect_immediately_via_optimistic_update() {
    let local = MockServer::start().await;
    let cloud = dead_cloud().await;
    mock_local_poll(&local, 0).await;
    Mock::given(method("GET"))
        .and(path("/get_challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHALLENGE))
        .mount(&local)
        .await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&local)
        .await;

    let fireplace = UnifiedFireplace::connect(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .await
    .unwrap();

    // Freeze polling so the next real poll cannot race the assertion.
    fireplace.stop_background_polling().await;

    fireplace.set_flame_height(2).await.unwrap();
    assert_eq!(fireplace.data().flameheight, 2);
}

#[tokio::test]
async fn control_mode_routes_commands_independently_of_reads() {
    let local = MockServer::start().await;
    let cloud = MockServer::start().await;
    mock_local_poll(&local, 0).await;
    mock_cloud_poll(&cloud).await;

    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&local)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/a/{SERIAL}//apppost")))
        .and(body_string("power=1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&cloud)
        .await;

    let fireplace = UnifiedFireplace::connect(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .await
    .unwrap();

    fireplace.set_control_mode(TransportMode::Cloud);
    assert_eq!(fireplace.read_mode(), TransportMode::Local);
    assert_eq!(fireplace.control_mode(), TransportMode::Cloud);

    fireplace.flame_on().await.unwrap();
    fireplace.shutdown().await;
}

#[tokio::test]
async fn thermostat_off_then_on_restores_the_setpoint() {
    let local = MockServer::start().await;
    let cloud = dead_cloud().await;
    mock_local_poll(&local, 2500).await;
    Mock::given(method("GET"))
        .and(path("/get_challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHALLENGE))
        .mount(&local)
        .await;

    let off_body =
        signed_body(API_KEY, CHALLENGE, "thermostat_setpoint", 0, USER_ID).unwrap();
    Mock::given(method("POST"))
        .and(path("/post"))
        .and(body_string(off_body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&local)
        .await;
    let restore_body =
        signed_body(API_KEY, CHALLENGE, "thermostat_setpoint", 2500, USER_ID).unwrap();
    Mock::given(method("POST"))
        .and(path("/post"))
        .and(body_string(restore_body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&local)
        .await;

    let fireplace = UnifiedFireplace::connect(
        credentials(&local.address().to_string()),
        &options(&cloud.uri()),
    )
    .await
    .unwrap();

    // Wait for a real poll carrying the 25.00 °C setpoint, then freeze.
    sleep(Duration::from_millis(120)).await;
    assert_eq!(fireplace.data().raw_thermostat_setpoint, 2500);
    fireplace.stop_background_polling().await;

    fireplace.turn_off_thermostat().await.unwrap();
    assert_eq!(fireplace.data().raw_thermostat_setpoint, 0);

    fireplace.turn_on_thermostat().await.unwrap();
    assert_eq!(fireplace.data().raw_thermostat_setpoint, 2500);
}
