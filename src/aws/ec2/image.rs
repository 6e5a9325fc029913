//! Machine image fallback search.
//!
//! The primary "latest AL2023" pointer lives in SSM (see [`crate::aws::ssm`]);
//! this is the image search used when the parameter read fails.

use super::Ec2Client;
use crate::aws::error::{classify_sdk, OpsError};
use aws_sdk_ec2::types::{Filter, Image, ImageState};
use tracing::debug;

/// Name pattern of Amazon-owned AL2023 images for 64-bit x86.
const IMAGE_NAME_PATTERN: &str = "al2023-ami-*-x86_64";

impl Ec2Client {
    /// Search Amazon-owned AL2023 images and return the newest available one.
    pub async fn find_latest_image(&self) -> Result<String, OpsError> {
        let response = self
            .client
            .describe_images()
            .owners("amazon")
            .filters(
                Filter::builder()
                    .name("name")
                    .values(IMAGE_NAME_PATTERN)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("architecture")
                    .values("x86_64")
                    .build(),
            )
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(classify_sdk)?;

        let image_id = newest_available_image(response.images()).ok_or_else(|| {
            OpsError::not_found("machine image", "no AL2023 image matched the search")
        })?;

        debug!(image_id = %image_id, "Resolved image via search fallback");
        Ok(image_id)
    }
}

/// Newest available image by creation date.
///
/// Creation dates are ISO-8601-like strings, so a lexicographic comparison
/// matches the backend's own ordering.
pub fn newest_available_image(images: &[Image]) -> Option<String> {
    images
        .iter()
        .filter(|img| img.state() == Some(&ImageState::Available))
        .max_by(|a, b| {
            a.creation_date()
                .unwrap_or_default()
                .cmp(b.creation_date().unwrap_or_default())
        })
        .and_then(|img| img.image_id())
        .map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, created: &str, state: ImageState) -> Image {
        Image::builder()
            .image_id(id)
            .creation_date(created)
            .state(state)
            .build()
    }

    #[test]
    fn newest_creation_date_wins() {
        let images = vec![
            image("ami-old", "2023-01-01T00:00:00.000Z", ImageState::Available),
            image("ami-new", "2024-06-01T00:00:00.000Z", ImageState::Available),
            image("ami-mid", "2023-12-31T00:00:00.000Z", ImageState::Available),
        ];
        assert_eq!(newest_available_image(&images).as_deref(), Some("ami-new"));
    }

    #[test]
    fn non_available_images_are_ignored() {
        let images = vec![
            image("ami-pending", "2025-01-01T00:00:00.000Z", ImageState::Pending),
            image("ami-ok", "2023-06-01T00:00:00.000Z", ImageState::Available),
        ];
        assert_eq!(newest_available_image(&images).as_deref(), Some("ami-ok"));
    }

    #[test]
    fn empty_candidate_set_is_none() {
        assert_eq!(newest_available_image(&[]), None);
    }
}
