use actix_web::HttpResponse;

/// Upload page. The assets are embedded at compile time: the service has no
/// template engine and the page never changes at runtime.
#[tracing::instrument(name = "Index page handler")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(mime::TEXT_HTML_UTF_8)
        .body(include_str!("../../static/index.html"))
}

/// Client-side script: upload validation, selection feedback, status polling
/// and the small UX affordances, mirroring the server-side rules.
#[tracing::instrument(name = "Client script handler")]
pub async fn client_script() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(include_str!("../../static/main.js"))
}
