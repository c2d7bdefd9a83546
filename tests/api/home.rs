use crate::helpers::{spawn_app, spawn_app_with, TestOptions};

#[tokio::test]
async fn index_renders_the_success_notice_when_requested() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get("/?success=1").await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let html_page = response.text().await.unwrap();
    assert!(html_page.contains("Thanks for enrolling!"));
}

#[tokio::test]
async fn index_omits_the_success_notice_by_default() {
    let app = spawn_app().await;

    let html_page = app.get_html("/").await;

    assert!(html_page.contains("<h1>Welcome</h1>"));
    assert!(!html_page.contains("Thanks for enrolling!"));
}

#[tokio::test]
async fn an_empty_success_parameter_counts_as_absent() {
    let app = spawn_app().await;

    let html_page = app.get_html("/?success=").await;

    assert!(!html_page.contains("Thanks for enrolling!"));
}

#[tokio::test]
async fn index_links_the_debug_email_when_given() {
    let app = spawn_app().await;

    let html_page = app
        .get_html("/?success=1&debug_email_url=https%3A%2F%2Fethereal.email%2Fmessage%2Fabc")
        .await;

    assert!(html_page.contains(r#"class="debug""#));
    assert!(html_page.contains("ethereal.email"));
}

#[tokio::test]
async fn index_has_no_debug_link_without_the_parameter() {
    let app = spawn_app().await;

    let html_page = app.get_html("/?success=1").await;

    assert!(!html_page.contains(r#"class="debug""#));
}

#[tokio::test]
async fn faq_is_served() {
    let app = spawn_app().await;

    let response = app.get("/faq").await;

    assert_eq!(response.status().as_u16(), 200);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Frequently asked questions"));
}

#[tokio::test]
async fn static_assets_are_served() {
    let app = spawn_app().await;

    let response = app.get("/static/style.css").await;

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("font-family"));
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let app = spawn_app().await;

    let response = app.get("/nowhere").await;

    assert_eq!(response.status().as_u16(), 404);
    assert!(response.text().await.unwrap().contains("Not found"));
}

#[tokio::test]
async fn index_shows_the_study_full_page_at_capacity() {
    let app = spawn_app_with(TestOptions {
        enrollment_capacity: Some(2),
        ..TestOptions::default()
    })
    .await;
    app.store.add_member("ada@example.org", "Ada");
    app.store.add_member("grace@example.org", "Grace");

    let response = app.get("/").await;

    assert_eq!(response.status().as_u16(), 200);
    let html_page = response.text().await.unwrap();
    assert!(html_page.contains("Enrollment is closed"));
    assert!(html_page.contains("capacity of 2 members"));
}

#[tokio::test]
async fn index_is_served_below_capacity() {
    let app = spawn_app_with(TestOptions {
        enrollment_capacity: Some(2),
        ..TestOptions::default()
    })
    .await;
    app.store.add_member("ada@example.org", "Ada");

    let html_page = app.get_html("/").await;

    assert!(html_page.contains("<h1>Welcome</h1>"));
}

#[tokio::test]
async fn faq_ignores_the_capacity() {
    let app = spawn_app_with(TestOptions {
        enrollment_capacity: Some(0),
        ..TestOptions::default()
    })
    .await;

    let html_page = app.get_html("/faq").await;

    assert!(html_page.contains("Frequently asked questions"));
}

#[tokio::test]
async fn repeated_query_parameters_still_render_the_index() {
    let app = spawn_app().await;

    let response = app
        .get("/?success=1&success=2&debug_email_url=first&debug_email_url=second")
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let html_page = response.text().await.unwrap();
    assert!(html_page.contains("Thanks for enrolling!"));
    assert!(html_page.contains(r#"href="first""#));
    assert!(!html_page.contains("second"));
}
