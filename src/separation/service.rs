//! # Separation Service
//!
//! Straight-line pipeline for one upload:
//!
//! 1. Parse the JSON body and check that `audio` is present
//! 2. Decode the base64 payload
//! 3. Generate a file id and the two storage keys
//! 4. Store the input copy, then the output copy
//! 5. Build the delivery URL for the output copy
//!
//! No signal processing happens: the output object holds exactly the decoded input
//! bytes. The two puts are not transactional; if the second one fails the input copy
//! stays in the bucket.

use super::{SeparateRequest, SeparateResponse, SeparationType, StorageKeys};
use crate::config::{AppConfig, SeparationConfig};
use crate::delivery::DeliveryUrls;
use crate::error::{AppError, AppResult, AUDIO_REQUIRED};
use crate::storage::ObjectStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Counters for completed separations, shared with the health endpoint.
#[derive(Debug, Default)]
pub struct SeparationStats {
    completed: AtomicU64,
    bytes_received: AtomicU64,
}

/// Point-in-time copy of [`SeparationStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeparationStatsSnapshot {
    pub completed: u64,
    pub bytes_received: u64,
}

impl SeparationStats {
    fn record(&self, bytes: usize) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SeparationStatsSnapshot {
        SeparationStatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

pub struct SeparationService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    content_type: String,
    urls: DeliveryUrls,
    defaults: SeparationConfig,
    stats: SeparationStats,
}

impl SeparationService {
    pub fn new(config: &AppConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            bucket: config.storage.bucket.clone(),
            content_type: config.storage.content_type.clone(),
            urls: DeliveryUrls::new(
                config.delivery.cdn_host.clone(),
                config.storage.access_key_id.clone(),
            ),
            defaults: config.separation.clone(),
            stats: SeparationStats::default(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn stored_objects(&self) -> Option<usize> {
        self.store.object_count()
    }

    pub fn stats(&self) -> SeparationStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one separation request end to end.
    ///
    /// `body` is the raw JSON text of the request. Returns a validation error when
    /// `audio` is missing or empty, and an internal error for every other failure.
    pub async fn separate(&self, body: &str) -> AppResult<SeparateResponse> {
        let request = SeparateRequest::parse(body)?;

        let audio = match request.audio_text()? {
            Some(audio) => audio,
            None => return Err(AppError::ValidationError(AUDIO_REQUIRED.to_string())),
        };
        let separation_type = request
            .separation_type
            .as_deref()
            .unwrap_or(&self.defaults.default_type)
            .to_string();
        let filename = request
            .filename
            .as_deref()
            .unwrap_or(&self.defaults.default_filename);

        if SeparationType::from_label(&separation_type).is_none() {
            warn!(separation_type = %separation_type, "Unknown separation type, storing anyway");
        }

        let audio = decode_audio(audio)?;
        let keys = StorageKeys::new(&Uuid::new_v4().to_string(), &separation_type, filename);
        debug!(
            file_id = %keys.file_id,
            input_key = %keys.input_key,
            output_key = %keys.output_key,
            bytes = audio.len(),
            "Storing upload"
        );

        self.store
            .put(&self.bucket, &keys.input_key, audio.clone(), &self.content_type)
            .await?;

        // The output is the input, unchanged.
        if let Err(e) = self
            .store
            .put(&self.bucket, &keys.output_key, audio.clone(), &self.content_type)
            .await
        {
            error!(
                file_id = %keys.file_id,
                orphaned_key = %keys.input_key,
                error = %e,
                "Output upload failed after input was stored"
            );
            return Err(e.into());
        }

        self.stats.record(audio.len());
        let url = self.urls.url_for(&keys.output_key);
        info!(
            file_id = %keys.file_id,
            separation_type = %separation_type,
            bytes = audio.len(),
            "Separation stored"
        );

        Ok(SeparateResponse {
            success: true,
            url,
            separation_type,
            filename: keys.output_filename,
        })
    }
}

/// Decode a standard-alphabet, padded base64 payload.
///
/// Bytes outside `[A-Za-z0-9+/=]` are dropped first, so line breaks, data-URL
/// debris and other stray characters never fail a decode. Padding is still checked
/// on what remains.
fn decode_audio(audio: &str) -> AppResult<Bytes> {
    let decoded = if audio.bytes().all(is_base64_symbol) {
        STANDARD.decode(audio)?
    } else {
        let symbols: Vec<u8> = audio.bytes().filter(|b| is_base64_symbol(*b)).collect();
        STANDARD.decode(symbols)?
    };
    Ok(Bytes::from(decoded))
}

fn is_base64_symbol(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' | b'=')
}
