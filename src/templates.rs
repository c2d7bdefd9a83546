use axum::response::{Html, IntoResponse, Response};
use hyper::StatusCode;
use lazy_static::lazy_static;
use tera::{Context, Tera};

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("index.html", include_str!("../templates/index.html")),
            ("faq.html", include_str!("../templates/faq.html")),
            ("error.html", include_str!("../templates/error.html")),
            ("study_full.html", include_str!("../templates/study_full.html")),
            ("not_found.html", include_str!("../templates/not_found.html")),
            ("admin/index.html", include_str!("../templates/admin/index.html")),
            ("member/verified.html", include_str!("../templates/member/verified.html")),
            ("emails/reminder.html", include_str!("../templates/emails/reminder.html")),
            ("emails/reminder.txt", include_str!("../templates/emails/reminder.txt")),
        ])
        .expect("Failed to parse templates");
        tera
    };
}

pub fn render(name: &str, context: &Context) -> Result<String, tera::Error> {
    TEMPLATES.render(name, context)
}

/// Render an HTML page with the given status.
pub fn page(status: StatusCode, name: &str, context: &Context) -> Result<Response, tera::Error> {
    let body = render(name, context)?;
    Ok((status, Html(body)).into_response())
}
