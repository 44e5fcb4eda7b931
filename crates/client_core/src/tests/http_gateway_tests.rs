use super::*;
use std::{
    env,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Multipart, Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{AssetId, UserId};
use tokio::{net::TcpListener, sync::Mutex};

const SESSION_SECRET: &str = "s3cr3t";

#[derive(Debug, Clone)]
struct RecordedRequest {
    route: &'static str,
    project: Option<String>,
    session: Option<String>,
    query: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct PlatformState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    profile_lookup_fails: bool,
}

impl PlatformState {
    async fn record(
        &self,
        route: &'static str,
        headers: &HeaderMap,
        query: Option<String>,
        body: Value,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().await.push(RecordedRequest {
            route,
            project: header(PROJECT_HEADER),
            session: header(SESSION_HEADER),
            query,
            body,
        });
    }

    async fn find(&self, route: &str) -> RecordedRequest {
        self.requests
            .lock()
            .await
            .iter()
            .find(|request| request.route == route)
            .cloned()
            .unwrap_or_else(|| panic!("no request recorded for {route}"))
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": message, "code": 401, "type": "user_unauthorized" })),
    )
}

async fn handle_create_account(
    State(state): State<PlatformState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record("create_account", &headers, None, body.clone()).await;
    Json(json!({ "$id": "acc-1", "email": body["email"], "name": body["name"] }))
}

async fn handle_create_session(
    State(state): State<PlatformState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.record("create_session", &headers, None, body.clone()).await;
    if body["password"] == "wrong" {
        return unauthorized("Invalid credentials. Please check the email and password.");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "$id": "sess-1",
            "userId": "acc-1",
            "secret": SESSION_SECRET,
            "expire": "2030-01-01T00:00:00.000+00:00"
        })),
    )
}

async fn handle_get_account(
    State(state): State<PlatformState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.record("get_account", &headers, None, Value::Null).await;
    let authorized = headers
        .get(SESSION_HEADER)
        .is_some_and(|value| value == SESSION_SECRET);
    if !authorized {
        return unauthorized("User (role: guests) missing scope (account)");
    }
    (
        StatusCode::OK,
        Json(json!({ "$id": "acc-1", "email": "nina@example.com", "name": "Nina" })),
    )
}

async fn handle_delete_session(
    State(state): State<PlatformState>,
    headers: HeaderMap,
) -> StatusCode {
    state.record("delete_session", &headers, None, Value::Null).await;
    StatusCode::NO_CONTENT
}

async fn handle_list_documents(
    State(state): State<PlatformState>,
    headers: HeaderMap,
    Path((_database, collection)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    let settings = Settings::default();
    if collection == settings.users_collection_id {
        state.record("list_profiles", &headers, query, Value::Null).await;
        if state.profile_lookup_fails {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Server Error", "code": 500, "type": "general_unknown" })),
            );
        }
        return (StatusCode::OK, Json(json!({
            "total": 1,
            "documents": [{
                "$id": "user-1",
                "accountId": "acc-1",
                "email": "nina@example.com",
                "username": "Nina",
                "avatar": "https://avatars/nina"
            }]
        })));
    }
    state.record("list_posts", &headers, query, Value::Null).await;
    (StatusCode::OK, Json(json!({
        "total": 2,
        "documents": [
            {
                "$id": "post-2",
                "$createdAt": "2024-12-07T09:00:00.000+00:00",
                "title": "Night city",
                "prompt": "neon streets",
                "thumbnail": "https://cdn/t2",
                "video": "https://cdn/v2",
                "creator": {
                    "$id": "user-1",
                    "accountId": "acc-1",
                    "email": "nina@example.com",
                    "username": "Nina",
                    "avatar": "https://avatars/nina"
                }
            },
            {
                "$id": "post-1",
                "$createdAt": "2024-12-06T09:00:00.000+00:00",
                "title": "Dunes",
                "prompt": "sand",
                "thumbnail": "https://cdn/t1",
                "video": "https://cdn/v1",
                "creator": "user-1"
            }
        ]
    })))
}

async fn handle_create_document(
    State(state): State<PlatformState>,
    headers: HeaderMap,
    Path((_database, collection)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let settings = Settings::default();
    let mut document = body["data"].clone();
    document["$id"] = body["documentId"].clone();
    document["$createdAt"] = json!("2024-12-08T12:00:00.000+00:00");
    if collection == settings.users_collection_id {
        state.record("create_profile", &headers, None, body).await;
    } else {
        state.record("create_post", &headers, None, body).await;
    }
    (StatusCode::CREATED, Json(document))
}

async fn handle_upload_file(
    State(state): State<PlatformState>,
    headers: HeaderMap,
    Path(_bucket): Path<String>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut file_id = String::new();
    let mut recorded = json!({});
    let mut size = 0usize;
    let mut mime = String::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        match field.name().unwrap_or_default().to_string().as_str() {
            "fileId" => file_id = field.text().await.expect("file id"),
            "file" => {
                recorded["file_name"] = json!(field.file_name());
                mime = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.expect("file bytes");
                size = bytes.len();
                recorded["content"] = json!(String::from_utf8_lossy(&bytes));
            }
            _ => {}
        }
    }
    recorded["file_id"] = json!(file_id);
    recorded["mime"] = json!(mime);
    state.record("upload_file", &headers, None, recorded).await;
    (
        StatusCode::CREATED,
        Json(json!({ "$id": file_id, "sizeOriginal": size, "mimeType": mime })),
    )
}

async fn spawn_platform() -> (HttpContentGateway, PlatformState) {
    spawn_platform_with(PlatformState::default()).await
}

async fn spawn_platform_with(state: PlatformState) -> (HttpContentGateway, PlatformState) {
    env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/v1/account", post(handle_create_account).get(handle_get_account))
        .route("/v1/account/sessions/email", post(handle_create_session))
        .route("/v1/account/sessions/current", delete(handle_delete_session))
        .route(
            "/v1/databases/:database/collections/:collection/documents",
            get(handle_list_documents).post(handle_create_document),
        )
        .route("/v1/storage/buckets/:bucket/files", post(handle_upload_file))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let gateway = HttpContentGateway::new(Settings {
        endpoint: format!("http://{addr}/v1/"),
        ..Settings::default()
    })
    .expect("gateway");
    (gateway, state)
}

fn decoded_queries(raw: &str) -> Vec<String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "queries[]")
        .map(|(_, value)| value.into_owned())
        .collect()
}

#[tokio::test]
async fn list_records_sends_platform_queries() {
    let (gateway, platform) = spawn_platform().await;
    let query = ListQuery::new()
        .equal("creator", "user-1")
        .newest_first()
        .limit(7);

    let posts = gateway.list_records(&query).await.expect("list");

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "Night city");
    assert_eq!(
        posts[0].creator.as_ref().map(|c| c.username.as_str()),
        Some("Nina")
    );
    assert_eq!(posts[1].creator_id, UserId::from("user-1"));

    let request = platform.find("list_posts").await;
    assert_eq!(request.project.as_deref(), Some(Settings::default().project_id.as_str()));
    assert!(request.session.is_none());
    let expected = query
        .to_platform_queries()
        .iter()
        .map(|q| q.to_query_string().expect("encode"))
        .collect::<Vec<_>>();
    assert_eq!(decoded_queries(&request.query.expect("query string")), expected);
}

#[tokio::test]
async fn session_secret_accompanies_later_requests() {
    let (gateway, platform) = spawn_platform().await;

    let token = gateway
        .create_session("nina@example.com", "hunter22")
        .await
        .expect("sign in");
    assert_eq!(token.secret, SESSION_SECRET);
    assert_eq!(gateway.session().await, Some(token));

    let account = gateway.current_account().await.expect("account");
    assert_eq!(account.owner_id(), Some(&UserId::from("user-1")));
    assert_eq!(account.display_name, "Nina");

    let account_request = platform.find("get_account").await;
    assert_eq!(account_request.session.as_deref(), Some(SESSION_SECRET));
    let profile_request = platform.find("list_profiles").await;
    assert_eq!(
        decoded_queries(&profile_request.query.expect("query string")),
        vec![r#"{"method":"equal","attribute":"accountId","values":["acc-1"]}"#.to_string()]
    );
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_errors() {
    let (gateway, _platform) = spawn_platform().await;

    let err = gateway
        .create_session("nina@example.com", "wrong")
        .await
        .expect_err("must fail");
    match &err {
        GatewayError::Auth(message) => assert!(message.starts_with("Invalid credentials")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_auth());
    assert!(gateway.session().await.is_none());

    let err = gateway.current_account().await.expect_err("no session");
    assert!(matches!(err, GatewayError::Auth(_)));
}

#[tokio::test]
async fn profile_lookup_outage_is_not_reported_as_auth() {
    let (gateway, _platform) = spawn_platform_with(PlatformState {
        profile_lookup_fails: true,
        ..PlatformState::default()
    })
    .await;
    gateway
        .create_session("nina@example.com", "hunter22")
        .await
        .expect("sign in");

    let err = gateway.current_account().await.expect_err("lookup fails");

    assert!(!err.is_auth(), "{err:?}");
    assert!(matches!(
        err,
        GatewayError::Platform(ApiError {
            code: ErrorCode::Internal,
            ..
        })
    ));
}

#[tokio::test]
async fn create_account_opens_session_and_writes_profile() {
    let (gateway, platform) = spawn_platform().await;

    let token = gateway
        .create_account("nina@example.com", "hunter22", "Nina")
        .await
        .expect("sign up");
    assert_eq!(token.account_id.as_str(), "acc-1");

    let profile = platform.find("create_profile").await;
    assert_eq!(profile.session.as_deref(), Some(SESSION_SECRET));
    assert_eq!(profile.body["data"]["accountId"], "acc-1");
    assert_eq!(profile.body["data"]["username"], "Nina");
    let avatar = profile.body["data"]["avatar"].as_str().expect("avatar url");
    assert!(avatar.contains("/v1/avatars/initials?name=Nina"), "{avatar}");
}

#[tokio::test]
async fn delete_session_forgets_secret() {
    let (gateway, platform) = spawn_platform().await;
    gateway
        .create_session("nina@example.com", "hunter22")
        .await
        .expect("sign in");

    gateway.delete_session().await.expect("sign out");

    assert!(gateway.session().await.is_none());
    let request = platform.find("delete_session").await;
    assert_eq!(request.session.as_deref(), Some(SESSION_SECRET));
}

#[tokio::test]
async fn create_record_posts_document_fields() {
    let (gateway, platform) = spawn_platform().await;

    let post = gateway
        .create_record(NewPost {
            title: "Dunes".into(),
            prompt: "sand".into(),
            thumbnail_url: "https://cdn/t".into(),
            video_url: "https://cdn/v".into(),
            creator_id: UserId::from("user-1"),
        })
        .await
        .expect("create");

    assert_eq!(post.creator_id, UserId::from("user-1"));
    assert_eq!(post.video_url, "https://cdn/v");
    let request = platform.find("create_post").await;
    assert_eq!(request.body["data"]["creator"], "user-1");
    assert_eq!(request.body["data"]["thumbnail"], "https://cdn/t");
    assert_eq!(
        request.body["documentId"].as_str().map(str::len),
        Some(32),
        "client-generated id"
    );
}

#[tokio::test]
async fn upload_asset_sends_multipart_file() {
    let (gateway, platform) = spawn_platform().await;
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("mediashare_upload_{suffix}.png"));
    std::fs::write(&path, b"not-really-a-png").expect("write temp file");

    let asset = AssetHandle::from_path(&path);
    assert_eq!(asset.mime_type, "image/png");
    let asset_ref = gateway.upload_asset(&asset).await.expect("upload");

    assert_eq!(asset_ref.size_bytes, 16);
    assert_eq!(asset_ref.mime_type.as_deref(), Some("image/png"));
    let request = platform.find("upload_file").await;
    assert_eq!(request.body["file_id"], asset_ref.asset_id.as_str());
    assert_eq!(request.body["file_name"], asset.file_name.as_str());
    assert_eq!(request.body["content"], "not-really-a-png");

    std::fs::remove_file(path).expect("cleanup");
}

#[tokio::test]
async fn unreadable_asset_fails_before_any_request() {
    let (gateway, platform) = spawn_platform().await;
    let asset = AssetHandle::new("/definitely/missing/clip.mp4", "clip.mp4", "video/mp4");

    let err = gateway.upload_asset(&asset).await.expect_err("missing file");

    assert!(matches!(err, GatewayError::Asset { .. }));
    assert!(platform.requests.lock().await.is_empty());
}

#[tokio::test]
async fn asset_urls_follow_variant() {
    let gateway = HttpContentGateway::new(Settings {
        endpoint: "https://cloud.example/v1".into(),
        project_id: "proj".into(),
        storage_id: "bucket".into(),
        ..Settings::default()
    })
    .expect("gateway");
    let asset = AssetRef {
        asset_id: AssetId::from("f1"),
        size_bytes: 10,
        mime_type: None,
    };

    let preview = gateway
        .resolve_asset_url(&asset, AssetKind::Image, AssetVariant::THUMBNAIL_PREVIEW)
        .await
        .expect("preview url");
    assert_eq!(
        preview.as_str(),
        "https://cloud.example/v1/storage/buckets/bucket/files/f1/preview?width=2000&height=2000&gravity=top&quality=100&project=proj"
    );

    let view = gateway
        .resolve_asset_url(&asset, AssetKind::Video, AssetVariant::View)
        .await
        .expect("view url");
    assert_eq!(
        view.as_str(),
        "https://cloud.example/v1/storage/buckets/bucket/files/f1/view?project=proj"
    );

    let err = gateway
        .resolve_asset_url(&asset, AssetKind::Video, AssetVariant::THUMBNAIL_PREVIEW)
        .await
        .expect_err("videos have no preview");
    assert_eq!(err.code(), Some(ErrorCode::Validation));
}

#[test]
fn rejects_non_http_endpoint() {
    let result = HttpContentGateway::new(Settings {
        endpoint: "ftp://cloud.example/v1".into(),
        ..Settings::default()
    });
    assert!(result.is_err());
}
