//! Image materializer: download each resolved image URL and decode it to an RGB bitmap.
//!
//! Downloads run one at a time. A failed download or undecodable payload is
//! logged and dropped; it never aborts the batch.

use crate::pipeline::{Fetch, FetchError};
use image::RgbImage;
use thiserror::Error;

/// Why a single image could not be materialized.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP {status} when fetching image: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Could not decode image at {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}

/// A decoded image and the URL it came from.
#[derive(Debug, Clone)]
pub struct MaterializedImage {
    pub url: String,
    pub image: RgbImage,
}

/// Download and decode one image, sending `referer` (the site root) like an in-page load.
pub fn materialize_one<F: Fetch + ?Sized>(
    url: &str,
    fetcher: &mut F,
    referer: Option<&str>,
) -> Result<RgbImage, MaterializeError> {
    let fetched = fetcher.get(url, referer)?;
    if !(200..300).contains(&fetched.status) {
        return Err(MaterializeError::HttpStatus {
            status: fetched.status,
            url: url.to_string(),
        });
    }
    let decoded = image::load_from_memory(&fetched.body).map_err(|e| MaterializeError::Decode {
        url: url.to_string(),
        source: e,
    })?;
    Ok(decoded.to_rgb8())
}

/// Materialize every URL in order, keeping only the ones that succeed.
pub fn materialize_images<F: Fetch + ?Sized>(
    urls: &[String],
    fetcher: &mut F,
    referer: Option<&str>,
) -> Vec<MaterializedImage> {
    let mut images = Vec::with_capacity(urls.len());
    for url in urls {
        match materialize_one(url, fetcher, referer) {
            Ok(image) => {
                tracing::debug!(%url, width = image.width(), height = image.height(), "image decoded");
                images.push(MaterializedImage {
                    url: url.clone(),
                    image,
                });
            }
            Err(e) => tracing::warn!(%url, error = %e, "image dropped"),
        }
    }
    images
}
