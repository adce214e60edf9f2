use crate::caption;
use crate::fetch::ImageFetcher;
use crate::model::{Creator, ExportBundle, ExportItem};
use crate::sanitize;
use crate::social;
use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn zip_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
}

/// Full bundle archive: one folder per item in order, each holding the
/// fetched image (when retrievable), `metadata.md`, `text.md` for items with
/// body text, and a share-ready `caption.txt`. A failed image fetch degrades
/// that one folder and never aborts the bundle.
pub async fn bundle_zip(
    bundle: &ExportBundle,
    creator: &Creator,
    fetcher: &ImageFetcher,
    base_url: &str,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let total = bundle.items.len();
    for (index, item) in bundle.items.iter().enumerate() {
        let folder = sanitize::item_folder_name(index + 1, total, item.title.as_deref());
        if let Some(url) = item.image_url.as_deref() {
            match fetcher.fetch(url).await {
                Ok(bytes) => {
                    let name = format!("{folder}/image.{}", image_extension(&bytes));
                    write_entry(&mut zip, &name, &bytes)?;
                }
                Err(err) => {
                    warn!(error = ?err, item = %item.id, "bundle image skipped");
                }
            }
        }
        write_entry(
            &mut zip,
            &format!("{folder}/metadata.md"),
            item_metadata(item, bundle.description.as_deref()).as_bytes(),
        )?;
        if let Some(body) = item.body_html.as_deref() {
            let stripped = caption::strip_html(body);
            if !stripped.is_empty() {
                write_entry(
                    &mut zip,
                    &format!("{folder}/text.md"),
                    item_text(item.title.as_deref(), &stripped).as_bytes(),
                )?;
            }
        }
        write_entry(
            &mut zip,
            &format!("{folder}/caption.txt"),
            caption::build_caption(item, creator, base_url).as_bytes(),
        )?;
    }
    finish(zip)
}

/// Social pack archive: per item, one JPEG per platform preset plus the
/// caption. Items without a retrievable image keep their folder with just
/// the caption so ordinal numbering stays stable.
pub async fn social_pack_zip(
    bundle: &ExportBundle,
    creator: &Creator,
    fetcher: &ImageFetcher,
    base_url: &str,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let total = bundle.items.len();
    for (index, item) in bundle.items.iter().enumerate() {
        let folder = sanitize::item_folder_name(index + 1, total, item.title.as_deref());
        if let Some(url) = item.image_url.as_deref() {
            match fetcher.fetch(url).await {
                Ok(bytes) => {
                    for (preset_id, jpeg) in social::social_variants(&bytes, item.focal_point) {
                        write_entry(&mut zip, &format!("{folder}/{preset_id}.jpg"), &jpeg)?;
                    }
                }
                Err(err) => {
                    warn!(error = ?err, item = %item.id, "social pack image skipped");
                }
            }
        }
        write_entry(
            &mut zip,
            &format!("{folder}/caption.txt"),
            caption::build_caption(item, creator, base_url).as_bytes(),
        )?;
    }
    finish(zip)
}

fn write_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &[u8],
) -> Result<()> {
    zip.start_file(name, zip_options())
        .with_context(|| format!("start archive entry {name}"))?;
    zip.write_all(content)
        .with_context(|| format!("write archive entry {name}"))?;
    Ok(())
}

fn finish(zip: ZipWriter<Cursor<Vec<u8>>>) -> Result<Vec<u8>> {
    let cursor = zip.finish().context("finalize archive")?;
    Ok(cursor.into_inner())
}

fn item_metadata(item: &ExportItem, bundle_description: Option<&str>) -> String {
    let title = item.title.as_deref().unwrap_or("Untitled");
    let mut metadata = format!("# {title}\n");
    if let Some(description) = bundle_description.filter(|d| !d.trim().is_empty()) {
        metadata.push('\n');
        metadata.push_str(description.trim());
        metadata.push('\n');
    }
    if let Some(body) = item.body_html.as_deref() {
        let stripped = caption::strip_html(body);
        if !stripped.is_empty() {
            metadata.push('\n');
            metadata.push_str(&stripped);
            metadata.push('\n');
        }
    }
    metadata
}

fn item_text(title: Option<&str>, stripped_body: &str) -> String {
    match title {
        Some(title) => format!("# {title}\n\n{stripped_body}\n"),
        None => format!("{stripped_body}\n"),
    }
}

fn image_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(format) => format.extensions_str().first().copied().unwrap_or("bin"),
        Err(_) => "bin",
    }
}
