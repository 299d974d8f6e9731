use uuid::Uuid;

/// Longest extension kept from an uploaded filename.
const MAX_EXTENSION_LEN: usize = 10;
/// Longest display name kept, in characters.
const MAX_DISPLAY_LEN: usize = 255;

/// Human-readable name for an upload, safe to show and to put in a header.
///
/// Directory components, control characters and leading dots are dropped,
/// runs of whitespace collapse to one space. Never fails: an unusable name
/// becomes `file`.
pub fn display_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_start_matches('.').trim();

    if cleaned.is_empty() {
        return "file".to_string();
    }
    cleaned.chars().take(MAX_DISPLAY_LEN).collect()
}

/// Lowercase ASCII extension for stored files.
///
/// Taken from the original name when it has a usable one, else from the MIME
/// type, else `bin`.
pub fn storage_extension(original: &str, mime_type: &str) -> String {
    if let Some(ext) = original
        .rsplit(['/', '\\'])
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(stem, ext)| (stem.trim_start_matches('.'), ext))
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ascii_extension(ext))
        .filter(|ext| !ext.is_empty())
    {
        return ext;
    }

    extension_for_mime(mime_type).unwrap_or_else(|| "bin".to_string())
}

/// Collision-free storage filename: `<uuid-v4>.<ext>`.
pub fn storage_name(original: &str, mime_type: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), storage_extension(original, mime_type))
}

/// Object key for a file attached to an article.
pub fn media_key(article_id: i32, storage_name: &str) -> String {
    format!("articles/{article_id}/{storage_name}")
}

/// Content type for an upload: the declared one when it parses, else a guess
/// from the filename.
pub fn content_type(original: &str, declared: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|m| !m.is_empty() && m.parse::<mime_guess::mime::Mime>().is_ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| {
            mime_guess::from_path(original)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

fn ascii_extension(ext: &str) -> String {
    ext.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_EXTENSION_LEN)
        .collect()
}

fn extension_for_mime(mime_type: &str) -> Option<String> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case("image/jpeg") {
        return Some("jpg".to_string());
    }
    mime_guess::get_mime_extensions_str(essence)
        .and_then(|exts| exts.first())
        .map(|ext| ascii_extension(ext))
        .filter(|ext| !ext.is_empty())
}
