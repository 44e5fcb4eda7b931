//! Publishing a post: two concurrent asset uploads, then one record.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::future;
use shared::domain::{AssetKind, AssetVariant, NewPost, PostRecord, UserId};
use tracing::{info, warn};
use url::Url;

use crate::{
    error::{FormField, SubmissionError, ValidationError},
    gateway::{AssetHandle, ContentGateway, GatewayResult},
};

/// Input of a post submission, owned by the caller.
///
/// Callers reset the form with [`UploadForm::reset`] once `submit` settles,
/// whether it succeeded or failed; input is not kept for a retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub title: String,
    pub prompt: String,
    pub thumbnail: Option<AssetHandle>,
    pub video: Option<AssetHandle>,
    pub owner_id: UserId,
}

impl UploadForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.required_assets().map(|_| ())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn required_assets(&self) -> Result<(&AssetHandle, &AssetHandle), ValidationError> {
        let mut missing = Vec::new();
        if self.title.is_empty() {
            missing.push(FormField::Title);
        }
        if self.prompt.is_empty() {
            missing.push(FormField::Prompt);
        }
        if self.thumbnail.is_none() {
            missing.push(FormField::Thumbnail);
        }
        if self.video.is_none() {
            missing.push(FormField::Video);
        }
        if self.owner_id.is_empty() {
            missing.push(FormField::Owner);
        }
        match (&self.thumbnail, &self.video) {
            (Some(thumbnail), Some(video)) if missing.is_empty() => Ok((thumbnail, video)),
            _ => Err(ValidationError { missing }),
        }
    }
}

/// Clears the submitting flag on every exit path.
struct SubmittingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SubmittingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct UploadTransaction {
    gateway: Arc<dyn ContentGateway>,
    submitting: AtomicBool,
}

impl UploadTransaction {
    pub fn new(gateway: Arc<dyn ContentGateway>) -> Self {
        Self {
            gateway,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Uploads both assets concurrently and creates the post once both are stored.
    ///
    /// Invalid forms fail before any platform call. A call made while another
    /// submission is running fails with [`SubmissionError::InFlight`]. Assets
    /// already uploaded when a later step fails are left on the platform.
    /// Equivalent forms submitted twice create two posts.
    pub async fn submit(&self, form: &UploadForm) -> Result<PostRecord, SubmissionError> {
        let (thumbnail, video) = form.required_assets()?;

        let Some(_guard) = SubmittingGuard::acquire(&self.submitting) else {
            warn!(title = %form.title, "upload: rejected overlapping submission");
            return Err(SubmissionError::InFlight);
        };

        info!(
            title = %form.title,
            owner_id = %form.owner_id,
            thumbnail = %thumbnail.file_name,
            video = %video.file_name,
            "upload: submission started"
        );

        let (thumbnail_result, video_result) = future::join(
            self.store_asset(thumbnail, AssetKind::Image),
            self.store_asset(video, AssetKind::Video),
        )
        .await;

        let (thumbnail_url, video_url) = match (thumbnail_result, video_result) {
            (Ok(thumbnail_url), Ok(video_url)) => (thumbnail_url, video_url),
            (Err(source), video_result) => {
                if let Err(video_err) = video_result {
                    warn!("upload: video upload also failed: {video_err}");
                }
                warn!("upload: thumbnail upload failed: {source}");
                return Err(SubmissionError::Upload {
                    kind: AssetKind::Image,
                    source,
                });
            }
            (Ok(_), Err(source)) => {
                warn!("upload: video upload failed: {source}");
                return Err(SubmissionError::Upload {
                    kind: AssetKind::Video,
                    source,
                });
            }
        };

        let post = self
            .gateway
            .create_record(NewPost {
                title: form.title.clone(),
                prompt: form.prompt.clone(),
                thumbnail_url: thumbnail_url.to_string(),
                video_url: video_url.to_string(),
                creator_id: form.owner_id.clone(),
            })
            .await
            .map_err(|source| {
                warn!("upload: post record creation failed after assets were stored: {source}");
                SubmissionError::Persistence(source)
            })?;

        info!(post_id = %post.id, "upload: post published");
        Ok(post)
    }

    async fn store_asset(&self, asset: &AssetHandle, kind: AssetKind) -> GatewayResult<Url> {
        let asset_ref = self.gateway.upload_asset(asset).await?;
        info!(
            kind = %kind,
            asset_id = %asset_ref.asset_id,
            size_bytes = asset_ref.size_bytes,
            "upload: asset stored"
        );
        self.gateway
            .resolve_asset_url(&asset_ref, kind, AssetVariant::for_kind(kind))
            .await
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
