use enrollweb::configuration::Environment;

use crate::helpers::{spawn_app_with, TestOptions};

fn failing_index_options(environment: Environment) -> TestOptions {
    // With a capacity set the index page has to ask the store first.
    TestOptions {
        environment,
        enrollment_capacity: Some(10),
        ..TestOptions::default()
    }
}

#[tokio::test]
async fn a_failing_handler_renders_a_500_page_with_the_error_message() {
    // Arrange
    let app = spawn_app_with(failing_index_options(Environment::Production)).await;
    app.store.fail();

    // Act
    let response = app.get("/").await;

    // Assert
    assert_eq!(response.status().as_u16(), 500);
    let html_page = response.text().await.unwrap();
    assert!(html_page.contains("Something went wrong"));
    assert!(html_page.contains("Failed to count enrolled members."));
}

#[tokio::test]
async fn the_error_chain_is_hidden_outside_development() {
    let app = spawn_app_with(failing_index_options(Environment::Production)).await;
    app.store.fail();

    let html_page = app.get_html("/").await;

    assert!(!html_page.contains(r#"class="stack""#));
    assert!(!html_page.contains("store unavailable"));
}

#[tokio::test]
async fn the_error_chain_is_shown_in_development() {
    let app = spawn_app_with(failing_index_options(Environment::Local)).await;
    app.store.fail();

    let html_page = app.get_html("/").await;

    assert!(html_page.contains(r#"class="stack""#));
    assert!(html_page.contains("store unavailable"));
}

#[tokio::test]
async fn error_pages_are_html() {
    let app = spawn_app_with(failing_index_options(Environment::Production)).await;
    app.store.fail();

    let response = app.get("/").await;

    let content_type = response.headers().get("Content-Type").unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
}
