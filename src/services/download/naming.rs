//! Output file naming for downloaded images.

/// Extensions kept from the URL, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Used when the URL carries no usable extension.
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Allow-listed extension taken from the URL, in its original case.
///
/// The query string is dropped and the suffix after the last dot is taken.
pub fn url_extension(url: &str) -> Option<&str> {
    let without_query = url.split('?').next().unwrap_or(url);
    let (_, ext) = without_query.rsplit_once('.')?;

    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        .then_some(ext)
}

/// Extension for the file written for `url`, falling back to `jpg`.
pub fn image_extension(url: &str) -> &str {
    url_extension(url).unwrap_or(FALLBACK_EXTENSION)
}

/// Allow-listed image type detected from the content's magic bytes.
pub fn sniffed_extension(content: &[u8]) -> Option<&'static str> {
    let kind = infer::get(content)?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return None;
    }

    let ext = kind.extension();
    ALLOWED_EXTENSIONS.contains(&ext).then_some(ext)
}

/// Extension for a downloaded file.
///
/// With `sniff` set, content sniffing only replaces the fallback; an
/// allow-listed URL extension always wins.
pub fn resolve_extension<'a>(url: &'a str, content: &[u8], sniff: bool) -> &'a str {
    match url_extension(url) {
        Some(ext) => ext,
        None if sniff => sniffed_extension(content).unwrap_or(FALLBACK_EXTENSION),
        None => FALLBACK_EXTENSION,
    }
}

/// `001.jpg`, `002.png`, ... for zero-based `index`.
pub fn image_filename(index: usize, ext: &str) -> String {
    format!("{:03}.{}", index + 1, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            image_extension("https://postfiles.pstatic.net/a/b_12.png?type=w966"),
            "png"
        );
        assert_eq!(image_extension("https://x.net/p/IMG_0001.JPEG"), "JPEG");
        assert_eq!(image_extension("https://x.net/p/a.webp"), "webp");
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(image_extension("https://x.net/payload.exe"), "jpg");
        assert_eq!(image_extension("https://x.net/image?format=.png"), "jpg");
        // Suffix after the host's last dot is not an image type
        assert_eq!(image_extension("https://x.net/noext"), "jpg");
        assert_eq!(image_extension("noext"), "jpg");
    }

    #[test]
    fn test_sniffing_only_replaces_fallback() {
        assert_eq!(resolve_extension("https://x.net/noext", PNG_MAGIC, true), "png");
        assert_eq!(resolve_extension("https://x.net/noext", PNG_MAGIC, false), "jpg");
        assert_eq!(resolve_extension("https://x.net/a.gif", PNG_MAGIC, true), "gif");
        assert_eq!(resolve_extension("https://x.net/noext", b"plain text", true), "jpg");
    }

    #[test]
    fn test_filename_is_zero_padded() {
        assert_eq!(image_filename(0, "jpg"), "001.jpg");
        assert_eq!(image_filename(41, "png"), "042.png");
        assert_eq!(image_filename(999, "gif"), "1000.gif");
    }
}
