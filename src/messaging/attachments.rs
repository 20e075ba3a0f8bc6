//! Attachment pipeline: selection policy, self-contained encoding, and the
//! decoding side used for preview labels and downloads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::models::Attachment;

/// Per-file size ceiling (inclusive).
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Media types accepted for upload.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
    "text/csv",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("{name} is {} which exceeds the {} limit", size_label(.size), size_label(.limit))]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("{name}: file type {media_type} is not allowed")]
    UnsupportedType { name: String, media_type: String },

    #[error("{0}: attachment payload is not a valid data URL")]
    MalformedPayload(String),
}

/// A file picked by the operator, not yet encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its media type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?
            .to_string();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self {
            media_type: media_type_for_name(&name).to_string(),
            name,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Best-effort media type from a file name's extension.
pub fn media_type_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Check one file against the type allow-list and size ceiling.
pub fn check(file: &SelectedFile) -> Result<(), AttachmentError> {
    if file.size() > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            name: file.name.clone(),
            size: file.size(),
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    if !ALLOWED_MEDIA_TYPES.contains(&file.media_type.as_str()) {
        return Err(AttachmentError::UnsupportedType {
            name: file.name.clone(),
            media_type: file.media_type.clone(),
        });
    }
    Ok(())
}

/// Result of filtering a selection.
#[derive(Debug, Default)]
pub struct Accepted {
    pub files: Vec<SelectedFile>,
    /// Size violations; the host must surface these as blocking messages.
    pub oversized: Vec<AttachmentError>,
}

/// Filter a selection down to files that satisfy the policy. Disallowed types
/// are dropped silently; oversized files are reported.
pub fn accept(files: Vec<SelectedFile>) -> Accepted {
    let mut out = Accepted::default();
    for file in files {
        match check(&file) {
            Ok(()) => out.files.push(file),
            Err(e @ AttachmentError::TooLarge { .. }) => {
                tracing::debug!("Rejected attachment: {}", e);
                out.oversized.push(e);
            }
            Err(e) => tracing::debug!("Dropped attachment: {}", e),
        }
    }
    out
}

/// Encode a file as a self-contained attachment record.
pub fn encode(file: &SelectedFile) -> Attachment {
    Attachment {
        name: file.name.clone(),
        media_type: file.media_type.clone(),
        size: file.size(),
        data: format!("data:{};base64,{}", file.media_type, STANDARD.encode(&file.bytes)),
    }
}

/// Re-materialize the original bytes of an attachment.
pub fn decode(attachment: &Attachment) -> Result<Vec<u8>, AttachmentError> {
    let malformed = || AttachmentError::MalformedPayload(attachment.name.clone());
    let payload = match attachment.data.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',').ok_or_else(malformed)?;
            if !meta.ends_with(";base64") {
                return Err(malformed());
            }
            payload
        }
        // Bare base64 without the data URL header.
        None => attachment.data.as_str(),
    };
    STANDARD.decode(payload.trim()).map_err(|_| malformed())
}

/// Write a decoded attachment into `dir`, avoiding overwrites. Returns the path written.
pub fn save(attachment: &Attachment, dir: &Path) -> Result<PathBuf> {
    let bytes = decode(attachment)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    // Never trust a path component from the wire.
    let base = Path::new(&attachment.name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("attachment")
        .to_string();
    let mut path = dir.join(&base);
    let mut n = 1;
    while path.exists() {
        let stem = Path::new(&base)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("attachment");
        path = match Path::new(&base).extension().and_then(|e| e.to_str()) {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        };
        n += 1;
    }

    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Saved attachment to {}", path.display());
    Ok(path)
}

/// Attachment category, used for icon/label selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Document,
    Spreadsheet,
    Text,
    Other,
}

impl AttachmentKind {
    pub fn of(media_type: &str) -> Self {
        match media_type {
            t if t.starts_with("image/") => AttachmentKind::Image,
            "application/pdf" => AttachmentKind::Pdf,
            t if t.contains("word") => AttachmentKind::Document,
            t if t.contains("excel") || t.contains("spreadsheet") || t == "text/csv" => {
                AttachmentKind::Spreadsheet
            }
            t if t.starts_with("text/") => AttachmentKind::Text,
            _ => AttachmentKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Pdf => "pdf",
            AttachmentKind::Document => "doc",
            AttachmentKind::Spreadsheet => "sheet",
            AttachmentKind::Text => "text",
            AttachmentKind::Other => "file",
        }
    }

    /// Images can be opened full-size; everything else is download-only.
    pub fn has_preview(&self) -> bool {
        matches!(self, AttachmentKind::Image)
    }
}

fn size_label(bytes: &u64) -> String {
    human_size(*bytes)
}

pub fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_of(size: usize, media_type: &str) -> SelectedFile {
        SelectedFile::new("f.bin", media_type, vec![0u8; size])
    }

    #[test]
    fn test_size_boundary_is_inclusive() {
        let exact = file_of(MAX_ATTACHMENT_BYTES as usize, "image/png");
        let over = file_of(MAX_ATTACHMENT_BYTES as usize + 1, "image/png");
        let out = accept(vec![exact, over]);
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].size(), MAX_ATTACHMENT_BYTES);
        assert_eq!(out.oversized.len(), 1);
        assert!(out.oversized[0].to_string().contains("10.0 MB"));
    }

    #[test]
    fn test_disallowed_type_dropped_silently() {
        let out = accept(vec![
            file_of(10, "application/x-msdownload"),
            file_of(10, "application/pdf"),
        ]);
        assert_eq!(out.files.len(), 1);
        assert!(out.oversized.is_empty());
    }

    #[test]
    fn test_encode_decode_is_lossless() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4099).collect();
        let file = SelectedFile::new("menu.pdf", "application/pdf", bytes.clone());
        let att = encode(&file);
        assert!(att.data.starts_with("data:application/pdf;base64,"));
        assert_eq!(att.size, 4099);
        assert_eq!(decode(&att).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let att = Attachment {
            name: "x.png".into(),
            media_type: "image/png".into(),
            size: 1,
            data: "data:image/png,notbase64".into(),
        };
        assert_eq!(
            decode(&att),
            Err(AttachmentError::MalformedPayload("x.png".into()))
        );
    }

    #[test]
    fn test_save_writes_identical_bytes_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let file = SelectedFile::new("../../shift.txt", "text/plain", b"8am-4pm".to_vec());
        let att = encode(&file);

        let first = save(&att, dir.path()).unwrap();
        let second = save(&att, dir.path()).unwrap();
        assert_eq!(first, dir.path().join("shift.txt"));
        assert_eq!(second, dir.path().join("shift (1).txt"));
        assert_eq!(std::fs::read(&second).unwrap(), b"8am-4pm");
    }

    #[test]
    fn test_kind_and_media_type() {
        assert_eq!(media_type_for_name("Photo.JPG"), "image/jpeg");
        assert_eq!(media_type_for_name("noext"), "application/octet-stream");
        assert_eq!(AttachmentKind::of("image/webp"), AttachmentKind::Image);
        assert!(AttachmentKind::of("image/webp").has_preview());
        assert_eq!(
            AttachmentKind::of(media_type_for_name("roster.xlsx")),
            AttachmentKind::Spreadsheet
        );
        assert_eq!(AttachmentKind::of("application/msword"), AttachmentKind::Document);
        assert_eq!(human_size(2 * 1024 * 1024), "2.0 MB");
    }
}
