//! Side-file persistence for images extracted from documents.
//!
//! Extracted images are written under the configured images directory
//! and referenced from chunk content as markdown image tags of the
//! exact form `![<description>](/api/images/<filename>)`. Serving that
//! route is the web layer's concern, not ours.
//!
//! Filenames are derived deterministically from the source file stem,
//! the page/slide position, and an index, so reprocessing the same
//! source regenerates identical names (and overwrites in place rather
//! than accumulating orphans).

use std::path::Path;

use anyhow::{Context, Result};

/// Route prefix the frontend serves extracted images from.
pub const IMAGE_ROUTE: &str = "/api/images/";

/// Markdown reference for a persisted side image.
pub fn image_ref(description: &str, filename: &str) -> String {
    format!("![{}]({}{})", description, IMAGE_ROUTE, filename)
}

/// Deterministic side-file name: `<stem>_<unit><number>_img<index>.<ext>`,
/// e.g. `physics-notes_slide3_img1.png`.
pub fn side_image_name(stem: &str, unit: &str, number: u32, index: usize, ext: &str) -> String {
    format!("{}_{}{}_img{}.{}", sanitize_stem(stem), unit, number, index, ext)
}

/// Keep filenames URL- and filesystem-safe: alphanumerics, `-` and `_`
/// pass through, everything else becomes `_`.
fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write image bytes under `images_dir`, overwriting any previous
/// extraction of the same name.
pub fn persist_image(images_dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(images_dir)
        .with_context(|| format!("Failed to create images dir: {}", images_dir.display()))?;
    let path = images_dir.join(filename);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write image: {}", path.display()))?;
    Ok(())
}
