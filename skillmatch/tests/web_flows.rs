use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use skillmatch::config::{Config, memory_pool};
use skillmatch::web::{AppState, build_router};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "skillmatch-test-boundary";

/// Value of the `csrftoken` cookie and hidden field on test posts
const CSRF: &str = "0123456789abcdef";

struct TestApp {
    router: Router,
    pool: SqlitePool,
    _media: TempDir,
    media_path: std::path::PathBuf,
}

/// Cookie header carrying the CSRF cookie plus any session cookie
fn with_csrf_cookie(cookie: Option<&str>) -> String {
    match cookie {
        Some(cookie) => format!("csrftoken={}; {}", CSRF, cookie),
        None => format!("csrftoken={}", CSRF),
    }
}

impl TestApp {
    async fn new() -> Self {
        let media = TempDir::new().unwrap();
        let config = Config {
            media_dir: media.path().to_path_buf(),
            ..Config::default()
        };
        let pool = memory_pool().await.unwrap();
        Self {
            router: build_router(AppState::new(pool.clone(), config)),
            pool,
            media_path: media.path().to_path_buf(),
            _media: media,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Urlencoded post with a matching CSRF cookie and field
    async fn post_form(&self, path: &str, body: &str, cookie: Option<&str>) -> Response {
        let body = if body.is_empty() {
            format!("csrf_token={}", CSRF)
        } else {
            format!("{}&csrf_token={}", body, CSRF)
        };
        self.post_raw(path, body, Some(&with_csrf_cookie(cookie))).await
    }

    async fn post_raw(&self, path: &str, body: String, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn post_multipart(&self, path: &str, body: Vec<u8>, cookie: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn session_rows(&self) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count
    }
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` pairs of every Set-Cookie header
fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .collect()
}

/// `sessionid=<token>` from the Set-Cookie headers
fn session_cookie(response: &Response) -> String {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with("sessionid=") && c != "sessionid=")
        .expect("response sets a session cookie")
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[tokio::test]
async fn test_healthz_and_static_assets() {
    let app = TestApp::new().await;

    let response = app.get("/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let response = app.get("/static/styles.css", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/css"
    );

    let response = app.get("/static/location-picker.js", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/javascript"
    );
    assert!(body_text(response).await.contains("getElementById(\"latitude\")"));

    let response = app.get("/static/missing.js", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/no/such/page", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_anonymous_visitors_are_sent_to_login() {
    let app = TestApp::new().await;
    for path in ["/requests/", "/requests/new/", "/dashboard/", "/services/add/"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), "/login/", "{}", path);
    }

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_seeker_registration_login_and_request() {
    let app = TestApp::new().await;

    let response = app
        .post_form(
            "/register/user/",
            "username=alice&email=alice%40example.test&password=pw123&location=Nairobi",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/");
    let cookie = session_cookie(&response);

    let page = body_text(app.get("/login/", Some(&cookie)).await).await;
    assert!(page.contains("Account created successfully. Please log in."));

    let response = app
        .post_form("/register/user/", "username=alice&password=other", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Username already taken."));

    let response = app
        .post_form("/login/", "username=alice&password=wrong", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid username or password."));

    let response = app
        .post_form("/login/", "username=alice&password=pw123", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/requests/");
    let logged_in = session_cookie(&response);
    assert_ne!(logged_in, cookie);

    // Seekers cannot reach provider pages
    let response = app.get("/dashboard/", Some(&logged_in)).await;
    assert_eq!(location(&response), "/login/");

    let response = app
        .post_form(
            "/requests/new/",
            "service_type=Plumbing&description=Leaking+sink&location=Nairobi",
            Some(&logged_in),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/requests/");

    let page = body_text(app.get("/requests/", Some(&logged_in)).await).await;
    assert!(page.contains("Leaking sink"));
    assert!(page.contains("Pending"));

    let response = app.get("/logout/", Some(&logged_in)).await;
    assert_eq!(location(&response), "/login/");
    let response = app.get("/requests/", Some(&logged_in)).await;
    assert_eq!(location(&response), "/login/");
}

#[tokio::test]
async fn test_request_form_shows_validation_errors() {
    let app = TestApp::new().await;
    app.post_form("/register/user/", "username=bob&password=pw", None)
        .await;
    let response = app
        .post_form("/login/", "username=bob&password=pw", None)
        .await;
    let cookie = session_cookie(&response);

    let response = app
        .post_form("/requests/new/", "service_type=Plumbing", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Location is required."));
    assert!(page.contains("Description is required."));
}

#[tokio::test]
async fn test_provider_onboarding_and_services() {
    let app = TestApp::new().await;

    let response = app.get("/register/company/details/", None).await;
    assert_eq!(location(&response), "/register/company/");

    let response = app
        .post_form(
            "/register/company/",
            "username=acme&email=ops%40acme.test&password=pw1&confirm_password=pw2",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Passwords do not match"));

    let response = app
        .post_form(
            "/register/company/",
            "username=acme&email=ops%40acme.test&password=pw1&confirm_password=pw1",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register/company/details/");
    let pending = session_cookie(&response);

    let page = body_text(app.get("/register/company/details/", Some(&pending)).await).await;
    assert!(page.contains("Company details for acme"));
    // Coordinates can be typed in when the map cannot load
    assert!(page.contains(r#"<input type="number" id="latitude" name="latitude""#));
    assert!(page.contains(r#"<input type="number" id="longitude" name="longitude""#));
    assert!(page.contains(r#"<script src="/static/location-picker.js">"#));

    let cookie = with_csrf_cookie(Some(&pending));
    let details = |fields: &[(&str, &str)]| {
        let mut fields = fields.to_vec();
        fields.push(("csrf_token", CSRF));
        multipart_body(&fields, &[("0-document_file", "permit.pdf", b"%PDF-1.4".as_slice())])
    };

    let response = app
        .post_multipart(
            "/register/company/details/",
            details(&[("company_name", "Acme Plumbing")]),
            &cookie,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("You must pin your company location"));

    let response = app
        .post_multipart(
            "/register/company/details/",
            details(&[
                ("company_name", "Acme Plumbing"),
                ("service_category", "Plumbing"),
                ("location", "Nairobi"),
                ("latitude", "-1.2864"),
                ("longitude", "36.8172"),
                ("0-document_name", "Business permit"),
            ]),
            &cookie,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/services/add/");
    let cookie = session_cookie(&response);

    let stored = app.media_path.join("documents/1/0_permit.pdf");
    assert_eq!(std::fs::read(stored).unwrap(), b"%PDF-1.4");

    let response = app
        .post_form(
            "/services/add/",
            "category=Plumbing&title=Leak+repair&description=Fast&min_price=500&max_price=1500",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/");

    let page = body_text(app.get("/dashboard/", Some(&cookie)).await).await;
    assert!(page.contains("Acme Plumbing"));
    assert!(page.contains("Leak repair"));
    assert!(page.contains("Business permit"));
    assert!(page.contains("Awaiting verification"));

    let page = body_text(app.get("/services/?category=plumbing", None).await).await;
    assert!(page.contains("Leak repair"));
    assert!(page.contains("500.00 - 1500.00"));

    let page = body_text(app.get("/services/?category=gardening", None).await).await;
    assert!(!page.contains("Leak repair"));

    let response = app.get("/services/99/edit/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_form("/services/1/delete/", "", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/dashboard/");
    let page = body_text(app.get("/dashboard/", Some(&cookie)).await).await;
    assert!(page.contains("No services yet."));
}

async fn pending_provider(app: &TestApp, username: &str) -> String {
    let response = app
        .post_form(
            "/register/company/",
            &format!(
                "username={}&email={}%40example.test&password=pw1&confirm_password=pw1",
                username, username
            ),
            None,
        )
        .await;
    assert_eq!(location(&response), "/register/company/details/");
    session_cookie(&response)
}

#[tokio::test]
async fn test_anonymous_failures_leave_no_sessions() {
    let app = TestApp::new().await;
    app.post_form("/register/user/", "username=alice&password=pw123", None)
        .await;
    let rows_after_signup = app.session_rows().await;

    for _ in 0..50 {
        let response = app
            .post_form("/login/", "username=alice&password=wrong", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).iter().all(|c| !c.starts_with("sessionid=")));
        assert!(body_text(response).await.contains("Invalid username or password."));
    }
    for _ in 0..5 {
        let response = app
            .post_form("/register/user/", "username=alice&password=again", None)
            .await;
        assert!(body_text(response).await.contains("Username already taken."));
    }
    assert_eq!(app.session_rows().await, rows_after_signup);

    let response = app
        .post_form("/login/", "username=alice&password=pw123", None)
        .await;
    assert_eq!(location(&response), "/requests/");
    assert_eq!(app.session_rows().await, rows_after_signup + 1);
}

#[tokio::test]
async fn test_expired_session_is_logged_out() {
    let app = TestApp::new().await;
    app.post_form("/register/user/", "username=dora&password=pw", None)
        .await;
    let response = app
        .post_form("/login/", "username=dora&password=pw", None)
        .await;
    let cookie = session_cookie(&response);
    assert_eq!(app.get("/requests/", Some(&cookie)).await.status(), StatusCode::OK);

    sqlx::query("UPDATE sessions SET created_at = datetime('now', '-15 days')")
        .execute(&app.pool)
        .await
        .unwrap();
    let response = app.get("/requests/", Some(&cookie)).await;
    assert_eq!(location(&response), "/login/");

    // Logging in again purges the stale row
    app.post_form("/login/", "username=dora&password=pw", None)
        .await;
    assert_eq!(app.session_rows().await, 1);
}

#[tokio::test]
async fn test_posts_without_csrf_token_are_forbidden() {
    let app = TestApp::new().await;

    let response = app.get("/login/", None).await;
    let issued = set_cookies(&response);
    let csrf_cookie = issued
        .iter()
        .find(|c| c.starts_with("csrftoken="))
        .expect("login page issues a CSRF cookie")
        .clone();
    let token = csrf_cookie.trim_start_matches("csrftoken=").to_string();
    assert!(body_text(response).await.contains(&format!(
        r#"name="csrf_token" value="{}""#,
        token
    )));

    // Correct cookie, no field
    let response = app
        .post_raw("/login/", "username=a&password=b".into(), Some(&csrf_cookie))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Field without the cookie, as a cross-site form would send it
    let response = app
        .post_raw("/login/", format!("username=a&password=b&csrf_token={}", token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_raw(
            "/login/",
            format!("username=a&password=b&csrf_token={}", token),
            Some(&csrf_cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let pending = pending_provider(&app, "acme").await;
    let body = multipart_body(
        &[
            ("company_name", "Acme"),
            ("latitude", "-1.2"),
            ("longitude", "36.8"),
            ("csrf_token", "forged"),
        ],
        &[],
    );
    let response = app
        .post_multipart("/register/company/details/", body, &with_csrf_cookie(Some(&pending)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_document_upload_is_reported() {
    let app = TestApp::new().await;
    let pending = pending_provider(&app, "acme").await;

    let body = multipart_body(
        &[
            ("company_name", "Acme Plumbing"),
            ("service_category", "Plumbing"),
            ("location", "Nairobi"),
            ("latitude", "-1.2864"),
            ("longitude", "36.8172"),
            ("0-document_name", "Business permit"),
            ("csrf_token", CSRF),
        ],
        &[("0-document_file", "permit.pdf", b"".as_slice())],
    );
    let response = app
        .post_multipart("/register/company/details/", body, &with_csrf_cookie(Some(&pending)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("The submitted file is empty."));
    assert!(!app.media_path.join("documents").exists());
}
