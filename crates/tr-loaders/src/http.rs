// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use crate::error::{LoadError, Result};

/// GET `url`, turning a non-success status into [`LoadError::Fetch`].
pub(crate) async fn get_checked(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    tracing::debug!(url, "fetching trajectory source");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }
    Ok(response)
}
