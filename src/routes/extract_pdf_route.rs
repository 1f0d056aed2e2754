use axum::body::Bytes;
use tracing::{info, warn};

use crate::http::error::GatewayError;
use crate::http::types::ExtractResponse;
use crate::utils::pdf::{extract_text_from_pdf_mem, is_pdf};

/// Handles `POST /extract-pdf`.
#[derive(Debug, Default)]
pub struct ExtractPdfRoute;

impl ExtractPdfRoute {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ExtractResponse, GatewayError> {
        if !is_pdf(content_type, &body) {
            warn!(
                "Upload does not look like a PDF (content-type: {}), parsing anyway",
                content_type.unwrap_or("none")
            );
        }

        let size = body.len();
        // Parsing is CPU-bound; keep it off the async workers.
        let text = tokio::task::spawn_blocking(move || extract_text_from_pdf_mem(&body))
            .await
            .map_err(|e| GatewayError::Internal(format!("extraction task failed: {}", e)))??;

        info!(
            "Extracted {} characters from {} byte PDF",
            text.chars().count(),
            size
        );

        Ok(ExtractResponse { data: text })
    }
}
