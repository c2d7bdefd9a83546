use crate::helpers::spawn_app;

#[tokio::test]
async fn pages_carry_the_security_headers() {
    let app = spawn_app().await;

    for path in ["/", "/faq", "/static/style.css", "/nowhere"] {
        let response = app.get(path).await;
        let headers = response.headers();

        let csp = headers
            .get("Content-Security-Policy")
            .unwrap_or_else(|| panic!("{} has no CSP", path))
            .to_str()
            .unwrap();
        assert!(csp.contains("default-src 'self'"));
        assert!(!csp.contains("upgrade-insecure-requests"));
        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get("Referrer-Policy").unwrap(), "no-referrer");
        assert!(headers.get("Strict-Transport-Security").is_none());
    }
}
