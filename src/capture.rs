//! Still-image capture for clock-in registration.
//!
//! The camera itself lives in the browser. A [`FrameSource`] hands out a
//! [`CaptureSession`] holding the live tracks; the session must be released
//! once the caller is done with it, and dropping it releases it as well.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera is unavailable: {0}")]
    Unavailable(String),
    #[error("capture session was already released")]
    Released,
}

/// An encoded still frame. The contents are never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage(String);

impl CapturedImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

pub trait FrameSource {
    fn acquire(&self) -> Result<CaptureSession, CaptureError>;
}

/// A live feed. Every track is stopped on [`CaptureSession::release`] or drop.
#[derive(Debug)]
pub struct CaptureSession {
    frame: Option<String>,
    live_tracks: usize,
}

impl CaptureSession {
    pub fn new(frame: String) -> Self {
        Self {
            frame: Some(frame),
            live_tracks: 1,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live_tracks > 0
    }

    pub fn grab_frame(&self) -> Result<CapturedImage, CaptureError> {
        if !self.is_live() {
            return Err(CaptureError::Released);
        }
        self.frame
            .clone()
            .map(CapturedImage)
            .ok_or_else(|| CaptureError::Unavailable("no frame on the feed".into()))
    }

    pub fn release(&mut self) {
        if self.live_tracks == 0 {
            return;
        }
        debug!(tracks = self.live_tracks, "releasing capture session");
        self.live_tracks = 0;
        self.frame = None;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Frame uploaded by the browser as a `data:image/...;base64,` URL.
#[derive(Debug, Clone, Default)]
pub struct DataUrlSource {
    payload: Option<String>,
}

impl DataUrlSource {
    pub fn new(payload: Option<String>) -> Self {
        Self { payload }
    }
}

impl FrameSource for DataUrlSource {
    fn acquire(&self) -> Result<CaptureSession, CaptureError> {
        let payload = self
            .payload
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| CaptureError::Unavailable("no image was captured".into()))?;

        let Some((header, data)) = payload.split_once(',') else {
            return Err(CaptureError::Unavailable("image is not a data URL".into()));
        };
        if !header.starts_with("data:image/") || !header.ends_with(";base64") || data.is_empty() {
            return Err(CaptureError::Unavailable("image is not a data URL".into()));
        }

        Ok(CaptureSession::new(payload.to_string()))
    }
}
