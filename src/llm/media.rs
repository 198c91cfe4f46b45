use base64::{engine::general_purpose, Engine as _};

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_image_mime_type(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        _ => essence,
    }
}

/// Image types the vision model accepts as inline data.
pub fn is_supported_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

/// Picks the MIME type to forward upstream: the declared type when it is a
/// supported image type, otherwise whatever the bytes sniff as.
pub fn resolve_image_mime(declared: Option<&str>, data: &[u8]) -> Option<String> {
    let mut candidates = Vec::new();
    if let Some(declared) = declared {
        if !declared.trim().is_empty() {
            candidates.push(declared.to_string());
        }
    }
    if let Some(detected) = detect_mime_type(data) {
        candidates.push(detected);
    }

    candidates
        .into_iter()
        .map(|candidate| normalize_image_mime_type(&candidate))
        .find(|candidate| is_supported_image_mime(candidate))
}

pub fn encode_base64(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn to_data_url(data: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, encode_base64(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R',
    ];

    #[test]
    fn declared_type_wins_when_supported() {
        assert_eq!(
            resolve_image_mime(Some("image/JPG"), b"not really a jpeg").as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn falls_back_to_sniffed_type() {
        assert_eq!(
            resolve_image_mime(Some("application/octet-stream"), PNG_HEADER).as_deref(),
            Some("image/png")
        );
        assert_eq!(resolve_image_mime(None, PNG_HEADER).as_deref(), Some("image/png"));
    }

    #[test]
    fn rejects_non_images() {
        assert_eq!(resolve_image_mime(Some("text/plain"), b"hello there"), None);
        assert_eq!(resolve_image_mime(Some("image/gif"), b"GIF89a......"), None);
    }

    #[test]
    fn strips_mime_parameters() {
        assert_eq!(normalize_image_mime_type("image/png; charset=binary"), "image/png");
    }

    #[test]
    fn builds_data_urls() {
        assert_eq!(to_data_url(b"abc", "image/png"), "data:image/png;base64,YWJj");
    }
}
