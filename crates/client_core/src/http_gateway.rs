//! `ContentGateway` over the hosted platform's REST API.

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        unique_id, AccountId, AccountInfo, AssetKind, AssetRef, AssetVariant, NewPost,
        PostRecord, SessionToken, UserProfile,
    },
    error::{ApiError, ErrorCode, PlatformErrorBody},
    protocol::{
        AccountResponse, CreateAccountRequest, CreateDocumentRequest, CreateSessionRequest,
        DocumentList, FileResponse, PlatformQuery, PostDocument, PostDocumentData,
        ProfileDocument, ProfileDocumentData, SessionResponse,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::Settings,
    error::GatewayError,
    gateway::{AssetHandle, ContentGateway, GatewayResult, ListQuery},
};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const SESSION_HEADER: &str = "X-Appwrite-Session";
const PLATFORM_HEADER: &str = "X-Appwrite-Platform";
const PROFILE_ACCOUNT_ATTR: &str = "accountId";

pub struct HttpContentGateway {
    http: Client,
    settings: Settings,
    session: RwLock<Option<SessionToken>>,
}

impl HttpContentGateway {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let mut settings = settings;
        settings.endpoint = crate::config::validate_endpoint(&settings.endpoint)?;
        Ok(Self {
            http: Client::new(),
            settings,
            session: RwLock::new(None),
        })
    }

    pub async fn session(&self) -> Option<SessionToken> {
        self.session.read().await.clone()
    }

    /// Restores a session persisted by a previous run.
    pub async fn set_session(&self, token: Option<SessionToken>) {
        *self.session.write().await = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.endpoint)
    }

    fn documents_path(&self, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{collection_id}/documents",
            self.settings.database_id
        )
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(PROJECT_HEADER, &self.settings.project_id)
            .header(PLATFORM_HEADER, &self.settings.platform);
        if let Some(token) = self.session.read().await.as_ref() {
            if !token.secret.is_empty() {
                builder = builder.header(SESSION_HEADER, &token.secret);
            }
        }
        builder
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> GatewayResult<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    fn initials_avatar_url(&self, name: &str) -> GatewayResult<Url> {
        let mut url = Url::parse(&self.url("/avatars/initials"))
            .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.settings.project_id);
        Ok(url)
    }

    async fn find_profile(&self, account_id: &AccountId) -> GatewayResult<Option<UserProfile>> {
        let query = PlatformQuery::equal(PROFILE_ACCOUNT_ATTR, account_id.as_str())
            .to_query_string()
            .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
        let builder = self
            .request(
                Method::GET,
                &self.documents_path(&self.settings.users_collection_id),
            )
            .await
            .query(&[("queries[]", query)]);
        let profiles: DocumentList<ProfileDocument> = self.send_json(builder).await?;
        Ok(profiles.documents.into_iter().next().map(UserProfile::from))
    }

    async fn create_profile(
        &self,
        account: &AccountResponse,
        display_name: &str,
    ) -> GatewayResult<UserProfile> {
        let avatar = self.initials_avatar_url(display_name)?;
        let builder = self
            .request(
                Method::POST,
                &self.documents_path(&self.settings.users_collection_id),
            )
            .await
            .json(&CreateDocumentRequest {
                document_id: unique_id(),
                data: ProfileDocumentData {
                    account_id: account.id.clone(),
                    email: account.email.clone(),
                    username: display_name.to_string(),
                    avatar: avatar.to_string(),
                },
            });
        let profile: ProfileDocument = self.send_json(builder).await?;
        Ok(UserProfile::from(profile))
    }
}

async fn check_status(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .json::<PlatformErrorBody>()
        .await
        .unwrap_or(PlatformErrorBody {
            message: String::new(),
            code: 0,
            kind: None,
        });
    Err(ApiError::from_body(status.as_u16(), body).into())
}

#[async_trait]
impl ContentGateway for HttpContentGateway {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> GatewayResult<SessionToken> {
        let builder = self
            .request(Method::POST, "/account")
            .await
            .json(&CreateAccountRequest {
                user_id: unique_id(),
                email: email.to_string(),
                password: password.to_string(),
                name: display_name.to_string(),
            });
        let account: AccountResponse = self
            .send_json(builder)
            .await
            .map_err(GatewayError::into_auth)?;
        info!(account_id = %account.id, "gateway: account created");

        let token = self.create_session(email, password).await?;
        let profile = self
            .create_profile(&account, display_name)
            .await
            .map_err(GatewayError::into_auth)?;
        info!(user_id = %profile.user_id, "gateway: profile created");
        Ok(token)
    }

    async fn create_session(&self, email: &str, password: &str) -> GatewayResult<SessionToken> {
        let builder = self
            .request(Method::POST, "/account/sessions/email")
            .await
            .json(&CreateSessionRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        let session: SessionResponse = self
            .send_json(builder)
            .await
            .map_err(GatewayError::into_auth)?;
        let token = SessionToken::from(session);
        info!(account_id = %token.account_id, "gateway: session opened");
        self.set_session(Some(token.clone())).await;
        Ok(token)
    }

    async fn current_account(&self) -> GatewayResult<AccountInfo> {
        let builder = self.request(Method::GET, "/account").await;
        let account: AccountResponse = self
            .send_json(builder)
            .await
            .map_err(GatewayError::into_auth)?;
        let mut info = AccountInfo::from(account);
        info.profile = self
            .find_profile(&info.account_id)
            .await
            .map_err(GatewayError::into_auth)?;
        if info.profile.is_none() {
            warn!(account_id = %info.account_id, "gateway: account has no profile document");
        }
        Ok(info)
    }

    async fn delete_session(&self) -> GatewayResult<()> {
        let builder = self
            .request(Method::DELETE, "/account/sessions/current")
            .await;
        check_status(builder.send().await?)
            .await
            .map_err(GatewayError::into_auth)?;
        self.set_session(None).await;
        info!("gateway: session closed");
        Ok(())
    }

    async fn list_records(&self, query: &ListQuery) -> GatewayResult<Vec<PostRecord>> {
        let queries = query
            .to_platform_queries()
            .iter()
            .map(|q| q.to_query_string().map(|encoded| ("queries[]", encoded)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
        let builder = self
            .request(
                Method::GET,
                &self.documents_path(&self.settings.videos_collection_id),
            )
            .await
            .query(&queries);
        let list: DocumentList<PostDocument> = self.send_json(builder).await?;
        debug!(
            total = list.total,
            returned = list.documents.len(),
            "gateway: documents listed"
        );
        Ok(list.documents.into_iter().map(PostRecord::from).collect())
    }

    async fn create_record(&self, post: NewPost) -> GatewayResult<PostRecord> {
        let builder = self
            .request(
                Method::POST,
                &self.documents_path(&self.settings.videos_collection_id),
            )
            .await
            .json(&CreateDocumentRequest {
                document_id: unique_id(),
                data: PostDocumentData::from(post),
            });
        let document: PostDocument = self.send_json(builder).await?;
        Ok(PostRecord::from(document))
    }

    async fn upload_asset(&self, asset: &AssetHandle) -> GatewayResult<AssetRef> {
        let bytes = asset.read_bytes().await?;
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(asset.file_name.clone())
            .mime_str(&asset.mime_type)
            .map_err(|err| GatewayError::Asset {
                path: asset.path.clone(),
                message: format!("invalid mime type {}: {err}", asset.mime_type),
            })?;
        let form = multipart::Form::new()
            .text("fileId", unique_id())
            .part("file", part);
        let builder = self
            .request(
                Method::POST,
                &format!("/storage/buckets/{}/files", self.settings.storage_id),
            )
            .await
            .multipart(form);
        let file: FileResponse = self.send_json(builder).await?;
        debug!(
            file_id = %file.id,
            size_bytes = size,
            mime_type = %asset.mime_type,
            "gateway: file stored"
        );
        Ok(AssetRef::from(file))
    }

    async fn resolve_asset_url(
        &self,
        asset: &AssetRef,
        kind: AssetKind,
        variant: AssetVariant,
    ) -> GatewayResult<Url> {
        let base = self.url(&format!(
            "/storage/buckets/{}/files/{}",
            self.settings.storage_id, asset.asset_id
        ));
        let mut url = match variant {
            AssetVariant::View => Url::parse(&format!("{base}/view")),
            AssetVariant::Preview { .. } if kind == AssetKind::Video => {
                return Err(GatewayError::Platform(ApiError::new(
                    ErrorCode::Validation,
                    "video assets have no image preview",
                )));
            }
            AssetVariant::Preview { .. } => Url::parse(&format!("{base}/preview")),
        }
        .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let AssetVariant::Preview {
                width,
                height,
                gravity,
                quality,
            } = variant
            {
                pairs
                    .append_pair("width", &width.to_string())
                    .append_pair("height", &height.to_string())
                    .append_pair("gravity", gravity.as_str())
                    .append_pair("quality", &quality.to_string());
            }
            pairs.append_pair("project", &self.settings.project_id);
        }
        Ok(url)
    }
}

#[cfg(test)]
#[path = "tests/http_gateway_tests.rs"]
mod tests;
