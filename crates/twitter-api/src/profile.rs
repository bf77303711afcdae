//! Profile image refresh
//!
//! Re-uploads the user's current profile image at full size: read the
//! profile, download the unscaled image once, and post it back base64
//! encoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::info;

use crate::client::ApiClient;
use crate::error::{Error, Result};

pub const VERIFY_CREDENTIALS_PATH: &str = "/account/verify_credentials.json";
pub const UPDATE_PROFILE_IMAGE_PATH: &str = "/account/update_profile_image.json";

/// Fields of the authenticated user's profile this workflow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub profile_image_url: String,
    #[serde(default)]
    pub screen_name: Option<String>,
}

/// Profile of the user the access token belongs to.
pub async fn verify_credentials(client: &ApiClient) -> Result<Profile> {
    client.get_json(VERIFY_CREDENTIALS_PATH).await
}

/// Full-size variant of a profile image URL: the first `_normal` marker is
/// dropped.
pub fn unscaled_image_url(url: &str) -> String {
    url.replacen("_normal", "", 1)
}

pub async fn fetch_image(client: &ApiClient, url: &str) -> Result<Vec<u8>> {
    client.get_bytes(url).await
}

/// Submit base64 image data as the new profile image. Any status other than
/// 200 is `Error::UpdateFailed`.
pub async fn update_profile_image(client: &ApiClient, image_base64: &str) -> Result<()> {
    let response = client
        .post_form(UPDATE_PROFILE_IMAGE_PATH, &[("image", image_base64)])
        .await?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::UpdateFailed(status.to_string()));
    }
    Ok(())
}

/// Download the current profile image unscaled and upload it as the new one.
pub async fn refresh_profile_image(client: &ApiClient) -> Result<()> {
    let profile = verify_credentials(client).await?;
    let image_url = unscaled_image_url(&profile.profile_image_url);
    info!(
        screen_name = profile.screen_name.as_deref().unwrap_or_default(),
        %image_url,
        "refreshing profile image"
    );

    let image = fetch_image(client, &image_url).await?;
    update_profile_image(client, &STANDARD.encode(&image)).await
}
