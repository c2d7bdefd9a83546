use std::net::TcpListener;

use enrollweb::configuration::{get_configuration, IdentityProviderSettings, Settings};
use enrollweb::startup::Application;
use secrecy::Secret;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_configuration() -> Settings {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.application.host = "127.0.0.1".into();
    configuration.application.port = 0;
    configuration.application.static_dir =
        concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string();
    configuration.identity_provider = None;
    configuration
}

#[tokio::test]
async fn a_malformed_public_address_aborts_startup_before_binding() {
    // Keep a port busy: binding it would fail with a different error
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut configuration = test_configuration();
    configuration.application.port = taken.local_addr().unwrap().port();

    for address in ["example.org", "not a url", "", "mailto:admin@example.org"] {
        configuration.application.public_address = address.into();

        let error = Application::build(configuration.clone())
            .await
            .err()
            .expect("Startup should have failed");

        assert_eq!(
            error.to_string(),
            "Failed to build the challenge-response URL.",
            "{:?}",
            address
        );
    }
}

#[tokio::test]
async fn an_unreachable_identity_provider_aborts_startup() {
    let identity_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&identity_server)
        .await;
    let mut configuration = test_configuration();
    configuration.identity_provider = Some(IdentityProviderSettings {
        issuer: identity_server.uri(),
        client_id: "enrollweb".into(),
        client_secret: Secret::new("client-secret".into()),
    });

    let error = Application::build(configuration)
        .await
        .err()
        .expect("Startup should have failed");

    assert_eq!(error.to_string(), "OIDC failed.");
}

#[tokio::test]
async fn a_short_session_key_aborts_startup() {
    let mut configuration = test_configuration();
    configuration.application.session_key = Secret::new("short".into());

    assert!(Application::build(configuration).await.is_err());
}

#[tokio::test]
async fn a_valid_configuration_serves_requests() {
    let application = Application::build(test_configuration())
        .await
        .expect("Failed to build the application.");
    let port = application.port();
    assert_ne!(port, 0);
    let server = tokio::spawn(application.run_until_stopped());

    let response = reqwest::get(format!("http://127.0.0.1:{}/faq", port))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 200);
    server.abort();
}
