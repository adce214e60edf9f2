use crate::archive;
use crate::db::UserRow;
use crate::gif;
use crate::model::{Creator, ExportBundle, ExportItem};
use crate::pdf;
use crate::sanitize;
use crate::state::AppState;
use anyhow::Result;
use bytes::Bytes;
use mime::Mime;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionExportKind {
    Zip,
    SocialPack,
}

impl CollectionExportKind {
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "zip" => Some(Self::Zip),
            "social-pack" => Some(Self::SocialPack),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionExportKind {
    Zip,
    SocialPack,
    Pdf,
    Gif,
}

impl SubmissionExportKind {
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "zip" => Some(Self::Zip),
            "social-pack" => Some(Self::SocialPack),
            "pdf" => Some(Self::Pdf),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// Fully assembled export, ready to stream: the body is complete in memory
/// before the first response byte leaves the process.
#[derive(Debug)]
pub struct ExportResponse {
    pub bytes: Vec<u8>,
    pub content_type: Mime,
    pub filename: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    /// Covers both a genuinely absent entity and one owned by another user;
    /// the two cases are deliberately indistinguishable to the caller.
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

pub async fn export_collection(
    state: &AppState,
    caller: &UserRow,
    collection_id: &str,
    kind: CollectionExportKind,
) -> Result<ExportResponse> {
    let collection = state
        .db
        .collection_by_id(collection_id)
        .await?
        .ok_or(ExportError::NotFound)?;
    if collection.owner_id != caller.id {
        return Err(ExportError::NotFound.into());
    }
    let items: Vec<ExportItem> = state
        .db
        .collection_items(collection_id)
        .await?
        .into_iter()
        .map(ExportItem::from)
        .collect();
    let bundle = ExportBundle {
        name: Some(collection.name.clone()),
        description: collection.description.clone(),
        owner_id: collection.owner_id,
        items,
    };
    let creator = Creator::from(caller);
    let stem = filename_stem(Some(&collection.name), "collection");
    assemble_bundle(state, &bundle, &creator, &stem, kind).await
}

pub async fn export_submission(
    state: &AppState,
    caller: &UserRow,
    submission_id: &str,
    kind: SubmissionExportKind,
) -> Result<ExportResponse> {
    let submission = state
        .db
        .submission_by_id(submission_id)
        .await?
        .ok_or(ExportError::NotFound)?;
    if submission.owner_id != caller.id {
        return Err(ExportError::NotFound.into());
    }
    let item = ExportItem::from(submission);
    let creator = Creator::from(caller);
    let stem = filename_stem(item.title.as_deref(), "submission");
    match kind {
        SubmissionExportKind::Zip => {
            let bundle = single_item_bundle(&caller.id, item);
            assemble_bundle(state, &bundle, &creator, &stem, CollectionExportKind::Zip).await
        }
        SubmissionExportKind::SocialPack => {
            let bundle = single_item_bundle(&caller.id, item);
            assemble_bundle(
                state,
                &bundle,
                &creator,
                &stem,
                CollectionExportKind::SocialPack,
            )
            .await
        }
        SubmissionExportKind::Pdf => {
            let image_bytes = match item.image_url.as_deref() {
                Some(url) => match state.fetcher.fetch(url).await {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        warn!(error = ?err, submission = %item.id, "pdf image skipped");
                        None
                    }
                },
                None => None,
            };
            let bytes = pdf::submission_pdf(
                item.title.as_deref(),
                item.body_html.as_deref(),
                image_bytes.as_deref(),
            )?;
            Ok(ExportResponse {
                bytes,
                content_type: mime::APPLICATION_PDF,
                filename: format!("{stem}.pdf"),
            })
        }
        SubmissionExportKind::Gif => {
            let mut urls: Vec<String> = state
                .db
                .submission_progressions(&item.id)
                .await?
                .into_iter()
                .map(|row| row.image_url)
                .collect();
            if let Some(url) = item.image_url.clone() {
                urls.push(url);
            }
            if urls.len() < 2 {
                return Err(ExportError::Validation(
                    "at least 2 progression images are required to build an animation".to_string(),
                )
                .into());
            }
            // Any frame that fails to fetch aborts the whole animation.
            let mut frames: Vec<Bytes> = Vec::with_capacity(urls.len());
            for url in &urls {
                frames.push(state.fetcher.fetch(url).await?);
            }
            let bytes = gif::progression_gif(&frames)?;
            Ok(ExportResponse {
                bytes,
                content_type: mime::IMAGE_GIF,
                filename: format!("{stem}_progressions.gif"),
            })
        }
    }
}

async fn assemble_bundle(
    state: &AppState,
    bundle: &ExportBundle,
    creator: &Creator,
    stem: &str,
    kind: CollectionExportKind,
) -> Result<ExportResponse> {
    let base_url = state.config.base_url.as_str();
    match kind {
        CollectionExportKind::Zip => {
            let bytes = archive::bundle_zip(bundle, creator, &state.fetcher, base_url).await?;
            Ok(ExportResponse {
                bytes,
                content_type: zip_mime(),
                filename: format!("{stem}.zip"),
            })
        }
        CollectionExportKind::SocialPack => {
            let bytes = archive::social_pack_zip(bundle, creator, &state.fetcher, base_url).await?;
            Ok(ExportResponse {
                bytes,
                content_type: zip_mime(),
                filename: format!("{stem}_social_pack.zip"),
            })
        }
    }
}

fn single_item_bundle(owner_id: &str, item: ExportItem) -> ExportBundle {
    ExportBundle {
        name: item.title.clone(),
        description: None,
        owner_id: owner_id.to_string(),
        items: vec![item],
    }
}

fn filename_stem(name: Option<&str>, fallback: &str) -> String {
    let sanitized = name.map(sanitize::sanitize_filename).unwrap_or_default();
    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized
    }
}

fn zip_mime() -> Mime {
    "application/zip".parse().unwrap()
}
