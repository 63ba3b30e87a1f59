/// Anchor images supplied as start/end frames
use base64::Engine;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Upload limit per anchor image
pub const MAX_ANCHOR_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("image payload is empty")]
    Empty,
    #[error("image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("unrecognized image format")]
    UnsupportedFormat,
    #[error("malformed data URL: {0}")]
    InvalidDataUrl(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which of the two upload slots an anchor occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSlot {
    Primary,
    Secondary,
}

impl fmt::Display for AnchorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// A validated image payload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAnchor {
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl ImageAnchor {
    /// Validate raw bytes and sniff the image format
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AnchorError> {
        if bytes.is_empty() {
            return Err(AnchorError::Empty);
        }
        if bytes.len() > MAX_ANCHOR_BYTES {
            return Err(AnchorError::TooLarge {
                size: bytes.len(),
                limit: MAX_ANCHOR_BYTES,
            });
        }
        let format = image::guess_format(&bytes).map_err(|_| AnchorError::UnsupportedFormat)?;
        Ok(Self {
            bytes,
            mime_type: format.to_mime_type(),
        })
    }

    /// Read an image from disk
    pub fn from_path(path: &Path) -> Result<Self, AnchorError> {
        let bytes = std::fs::read(path).map_err(|source| AnchorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    /// Decode a `data:image/...;base64,...` URL
    pub fn from_data_url(url: &str) -> Result<Self, AnchorError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| AnchorError::InvalidDataUrl("missing data: scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AnchorError::InvalidDataUrl("missing payload separator".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(AnchorError::InvalidDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|err| AnchorError::InvalidDataUrl(err.to_string()))?;
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 text of the payload, as embedded in request bodies
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl fmt::Debug for ImageAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAnchor")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The two anchor slots, each cleared independently
#[derive(Debug, Clone, Default)]
pub struct Anchors {
    primary: Option<ImageAnchor>,
    secondary: Option<ImageAnchor>,
}

impl Anchors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: AnchorSlot, anchor: ImageAnchor) {
        match slot {
            AnchorSlot::Primary => self.primary = Some(anchor),
            AnchorSlot::Secondary => self.secondary = Some(anchor),
        }
    }

    pub fn clear(&mut self, slot: AnchorSlot) {
        match slot {
            AnchorSlot::Primary => self.primary = None,
            AnchorSlot::Secondary => self.secondary = None,
        }
    }

    pub fn clear_all(&mut self) {
        self.primary = None;
        self.secondary = None;
    }

    pub fn get(&self, slot: AnchorSlot) -> Option<&ImageAnchor> {
        match slot {
            AnchorSlot::Primary => self.primary.as_ref(),
            AnchorSlot::Secondary => self.secondary.as_ref(),
        }
    }

    pub fn primary(&self) -> Option<&ImageAnchor> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&ImageAnchor> {
        self.secondary.as_ref()
    }

    /// Number of occupied slots (0-2)
    pub fn count(&self) -> usize {
        self.primary.is_some() as usize + self.secondary.is_some() as usize
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};

    pub(crate) fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(4, 4);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_png_detection() {
        let anchor = ImageAnchor::from_bytes(png_bytes()).unwrap();
        assert_eq!(anchor.mime_type(), "image/png");
        assert!(!anchor.is_empty());
    }

    #[test]
    fn test_rejects_non_image() {
        let err = ImageAnchor::from_bytes(b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, AnchorError::UnsupportedFormat));
        assert!(matches!(
            ImageAnchor::from_bytes(Vec::new()).unwrap_err(),
            AnchorError::Empty
        ));
    }

    #[test]
    fn test_rejects_oversized() {
        let mut bytes = png_bytes();
        bytes.resize(MAX_ANCHOR_BYTES + 1, 0);
        let err = ImageAnchor::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, AnchorError::TooLarge { .. }));
    }

    #[test]
    fn test_data_url() {
        let anchor = ImageAnchor::from_bytes(png_bytes()).unwrap();
        let url = anchor.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(ImageAnchor::from_data_url(&url).unwrap(), anchor);

        assert!(ImageAnchor::from_data_url("image/png;base64,AAAA").is_err());
        assert!(ImageAnchor::from_data_url("data:image/png,AAAA").is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, png_bytes()).unwrap();
        assert!(ImageAnchor::from_path(&path).is_ok());
        assert!(matches!(
            ImageAnchor::from_path(&dir.path().join("missing.png")).unwrap_err(),
            AnchorError::Io { .. }
        ));
    }

    #[test]
    fn test_slots_clear_independently() {
        let anchor = ImageAnchor::from_bytes(png_bytes()).unwrap();
        let mut anchors = Anchors::new();
        anchors.set(AnchorSlot::Primary, anchor.clone());
        anchors.set(AnchorSlot::Secondary, anchor);
        assert_eq!(anchors.count(), 2);

        anchors.clear(AnchorSlot::Primary);
        assert_eq!(anchors.count(), 1);
        assert!(anchors.primary().is_none());
        assert!(anchors.secondary().is_some());

        anchors.clear_all();
        assert_eq!(anchors.count(), 0);
    }
}
