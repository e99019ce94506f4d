use std::io::Write;

use campus_core::{ExportFilters, ImportSource, JobState, UNKNOWN_ERROR};
use campus_engine::{
    task_path, ApiErrorKind, AuthenticatedClient, ClientSettings, Registration, RequestConfig,
    Session,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer, session: Session) -> AuthenticatedClient {
    let settings = ClientSettings {
        api_base: server.uri(),
        ..ClientSettings::default()
    };
    AuthenticatedClient::new(settings, session).expect("client")
}

#[tokio::test]
async fn attaches_bearer_and_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "username": "registrar",
            "role": "ADMIN",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token("secret-token"));
    let me = client.me().await.expect("me");
    assert_eq!(me.username, "registrar");
    assert_eq!(me.role.as_deref(), Some("ADMIN"));
}

#[tokio::test]
async fn omits_authorization_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .and(body_json(json!({"username": "amy", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "a1", "refresh": "r1"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token(""));
    let tokens = client.login("amy", "pw").await.expect("login");
    assert_eq!(tokens.access, "a1");
    assert_eq!(tokens.refresh.as_deref(), Some("r1"));
}

#[tokio::test]
async fn empty_and_invalid_success_bodies_decode_to_empty_object() {
    let server = MockServer::start().await;
    Mock::given(path("/no-content"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::anonymous());
    for route in ["/no-content", "/empty", "/html"] {
        let value = client
            .request(route, RequestConfig::get())
            .await
            .expect("lenient success");
        assert_eq!(value, json!({}), "route {route}");
    }
}

#[tokio::test]
async fn error_bodies_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/change_password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "new_password": ["This password is too common."],
            "old_password": "wrong",
        })))
        .mount(&server)
        .await;
    Mock::given(path("/gateway"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;
    Mock::given(path("/silent"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token("t"));

    let err = client.change_password("old", "new").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::HttpStatus(400));
    assert_eq!(err.to_string(), "This password is too common.\nwrong");

    let err = client
        .request("/gateway", RequestConfig::get())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.message, "Bad Gateway");

    let err = client
        .request("/silent", RequestConfig::get())
        .await
        .unwrap_err();
    assert_eq!(err.message, UNKNOWN_ERROR);
}

#[tokio::test]
async fn transport_failures_use_the_same_channel() {
    // Reserve a port, then close it so the connection is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let settings = ClientSettings {
        api_base: base,
        ..ClientSettings::default()
    };
    let client = AuthenticatedClient::new(settings, Session::anonymous()).expect("client");
    let err = client
        .request("/api/tasks/x", RequestConfig::get())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Network);
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn export_posts_filters_and_returns_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/exports/courses"))
        .and(body_json(json!({"code": "CS"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "exp-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token("t"));
    let filters = ExportFilters {
        code: Some("CS".into()),
        title: None,
    };
    assert_eq!(client.submit_export(&filters).await.unwrap(), "exp-1");
}

#[tokio::test]
async fn import_uploads_multipart_without_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/imports/courses"))
        .and(header("Authorization", "Bearer t"))
        .and(|req: &Request| {
            let content_type = req
                .headers
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&req.body);
            content_type.starts_with("multipart/form-data; boundary=")
                && body.contains("name=\"file\"")
                && body.contains("CS101,Intro")
        })
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "imp-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(csv, "id,code,title,description,credits").unwrap();
    writeln!(csv, ",CS101,Intro,,3").unwrap();

    let client = client_for(&server, Session::with_token("t"));
    let source = ImportSource::File(csv.path().to_path_buf());
    assert_eq!(client.submit_import(&source).await.unwrap(), "imp-1");
}

#[tokio::test]
async fn import_by_url_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/imports/courses"))
        .and(body_json(json!({"file_url": "https://files.example/c.csv"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "imp-2"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token("t"));
    let source = ImportSource::Url("https://files.example/c.csv".into());
    assert_eq!(client.submit_import(&source).await.unwrap(), "imp-2");
}

#[tokio::test]
async fn import_of_missing_file_fails_before_sending() {
    let server = MockServer::start().await;
    let client = client_for(&server, Session::with_token("t"));
    let source = ImportSource::File("/definitely/not/here.csv".into());

    let err = client.submit_import(&source).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Io);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn task_status_decodes_progress_and_results() {
    let server = MockServer::start().await;
    Mock::given(path("/api/tasks/p"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "PROGRESS",
            "meta": {"ok": 10, "fail": 0},
        })))
        .mount(&server)
        .await;
    Mock::given(path("/api/tasks/s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "SUCCESS",
            "result": {"status": "success", "download_url": "/media/export.csv", "count": 4},
        })))
        .mount(&server)
        .await;
    Mock::given(path("/api/tasks/f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "FAILURE",
            "error": "division by zero",
        })))
        .mount(&server)
        .await;
    Mock::given(path("/api/tasks/odd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "SLEEPING"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token("t"));

    let progress = client.task_status("p").await.unwrap();
    assert_eq!(progress.state, JobState::InProgress);
    assert_eq!(progress.meta.and_then(|m| m.ok), Some(10));

    let success = client.task_status("s").await.unwrap();
    assert_eq!(success.state, JobState::Succeeded);
    let result = success.result.unwrap();
    assert_eq!(result.download_url.as_deref(), Some("/media/export.csv"));
    assert_eq!(result.count, Some(4));

    let failure = client.task_status("f").await.unwrap();
    assert_eq!(failure.state, JobState::Failed);
    assert_eq!(failure.error.as_deref(), Some("division by zero"));

    let err = client.task_status("odd").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Decode);
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/export.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"id,code\n1,CS101\n".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::with_token("t"));
    let href = format!("{}/media/export.csv", server.uri());
    assert_eq!(client.download(&href).await.unwrap(), b"id,code\n1,CS101\n");
}

#[tokio::test]
async fn download_keeps_the_token_on_the_api_origin() {
    let api = MockServer::start().await;
    let cdn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/export.csv"))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id\n"))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/bucket/export.csv"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id,code\n"))
        .expect(1)
        .mount(&cdn)
        .await;

    let client = client_for(&api, Session::with_token("secret-token"));
    let own = client
        .download(&format!("{}/media/export.csv", api.uri()))
        .await
        .expect("same-origin download");
    assert_eq!(own, b"id\n");

    let foreign = client
        .download(&format!("{}/bucket/export.csv?X-Amz-Signature=abc", cdn.uri()))
        .await
        .expect("foreign download");
    assert_eq!(foreign, b"id,code\n");

    let seen = cdn.received_requests().await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].headers.get("authorization"), None);
}

#[tokio::test]
async fn task_ids_are_encoded_as_one_path_segment() {
    assert_eq!(task_path("3f2b-uuid").unwrap(), "/api/tasks/3f2b-uuid");
    assert_eq!(task_path("a b/c?d").unwrap(), "/api/tasks/a%20b%2Fc%3Fd");
    assert_eq!(task_path("..").unwrap_err().kind, ApiErrorKind::InvalidRequest);
    assert_eq!(task_path("").unwrap_err().kind, ApiErrorKind::InvalidRequest);

    let server = MockServer::start().await;
    Mock::given(path("/api/tasks/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "PENDING"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, Session::with_token("t"));
    let status = client.task_status("a/b").await.unwrap();
    assert_eq!(status.state, JobState::Pending);
}

#[tokio::test]
async fn register_sends_the_account_and_returns_the_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "username": "amy",
            "email": "amy@school.example",
            "password": "Str0ng!Passw0rd",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"detail": "注册成功"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Session::anonymous());
    let detail = client
        .register(Registration {
            username: "amy",
            email: "amy@school.example",
            password: "Str0ng!Passw0rd",
        })
        .await
        .unwrap();
    assert_eq!(detail, "注册成功");
}

#[tokio::test]
async fn register_field_errors_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "username": ["A user with that username already exists."],
            "password": ["This password is too common."],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::anonymous());
    let err = client
        .register(Registration {
            username: "amy",
            email: "amy@school.example",
            password: "Password123!",
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    // Priority key first, then the rest in server order.
    assert_eq!(
        err.message,
        "This password is too common.\nA user with that username already exists."
    );
}

#[tokio::test]
async fn forgot_requests_post_the_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot_username"))
        .and(body_json(json!({"email": "amy@school.example"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "邮件已发送"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot_password"))
        .and(body_json(json!({"email": "amy@school.example"})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot_password"))
        .and(body_json(json!({"email": "not-an-email"})))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"email": ["Enter a valid email address."]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Session::anonymous());
    assert_eq!(
        client.forgot_username("amy@school.example").await.unwrap(),
        "邮件已发送"
    );
    assert_eq!(
        client.forgot_password("amy@school.example").await.unwrap(),
        "request sent"
    );
    let err = client.forgot_password("not-an-email").await.unwrap_err();
    assert_eq!(err.message, "Enter a valid email address.");
}

#[tokio::test]
async fn reset_password_errors_follow_key_priority() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/reset_password"))
        .and(body_json(json!({"uid": "MQ", "token": "bad", "new_password": "x"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "email": ["ignored order"],
            "new_password": ["This password is too short."],
            "uid": ["链接无效"],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/reset_password"))
        .and(body_json(json!({"uid": "MQ", "token": "expired", "new_password": "N3w!Password"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "令牌无效或已过期"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/reset_password"))
        .and(body_json(json!({"uid": "MQ", "token": "good", "new_password": "N3w!Password"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "密码已重置"})))
        .mount(&server)
        .await;

    let client = client_for(&server, Session::anonymous());

    let err = client.reset_password("MQ", "bad", "x").await.unwrap_err();
    assert_eq!(
        err.message,
        "This password is too short.\n链接无效\nignored order"
    );

    let err = client
        .reset_password("MQ", "expired", "N3w!Password")
        .await
        .unwrap_err();
    assert_eq!(err.message, "令牌无效或已过期");

    let detail = client
        .reset_password("MQ", "good", "N3w!Password")
        .await
        .unwrap();
    assert_eq!(detail, "密码已重置");
}
