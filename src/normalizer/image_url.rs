use url::Url;

const IMAGE_CDN_HOST: &str = "geekdo-images.com";
const SITE_HOST: &str = "boardgamegeek.com";

/// Canonical form of a catalog image URL.
///
/// Forces `https`, drops query and fragment, and points geekdo `imagepage`
/// renditions at the original file. Links to `boardgamegeek.com/image/` are
/// HTML pages, not images, and yield `None`. So does anything that is not an
/// absolute http(s) URL.
pub fn normalize_image_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut url = match trimmed.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("https://{}", rest)),
        None => Url::parse(trimmed),
    }
    .ok()?;

    match url.scheme() {
        "https" => {}
        "http" => url.set_scheme("https").ok()?,
        _ => return None,
    }
    url.set_query(None);
    url.set_fragment(None);

    let host = url.host_str()?.to_ascii_lowercase();
    if host.ends_with(IMAGE_CDN_HOST) {
        let path = url
            .path()
            .replace("__imagepage", "__original")
            .replace("/imagepage/", "/original/");
        url.set_path(&path);
    } else if host.ends_with(SITE_HOST) && url.path().starts_with("/image/") {
        return None;
    }

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_is_forced_to_https() {
        assert_eq!(
            normalize_image_url("//cf.geekdo-images.com/a.jpg").as_deref(),
            Some("https://cf.geekdo-images.com/a.jpg")
        );
        assert_eq!(
            normalize_image_url("http://cf.geekdo-images.com/a.jpg").as_deref(),
            Some("https://cf.geekdo-images.com/a.jpg")
        );
        assert_eq!(
            normalize_image_url("https://cf.geekdo-images.com/a.jpg").as_deref(),
            Some("https://cf.geekdo-images.com/a.jpg")
        );
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(
            normalize_image_url("HTTP://cf.geekdo-images.com/a.jpg?x=1").as_deref(),
            Some("https://cf.geekdo-images.com/a.jpg")
        );
        assert_eq!(
            normalize_image_url("Https://CF.Geekdo-Images.com/abc__imagepage/x.jpg").as_deref(),
            Some("https://cf.geekdo-images.com/abc__original/x.jpg")
        );
    }

    #[test]
    fn test_query_and_fragment_are_stripped() {
        assert_eq!(
            normalize_image_url(" https://img.example/x.png?w=200#top ").as_deref(),
            Some("https://img.example/x.png")
        );
        assert_eq!(
            normalize_image_url("https://img.example/x.png#frag").as_deref(),
            Some("https://img.example/x.png")
        );
    }

    #[test]
    fn test_imagepage_rewritten_to_original() {
        assert_eq!(
            normalize_image_url("https://cf.geekdo-images.com/abc__imagepage/img/x.jpg").as_deref(),
            Some("https://cf.geekdo-images.com/abc__original/img/x.jpg")
        );
        assert_eq!(
            normalize_image_url("https://cf.geekdo-images.com/images/imagepage/x.jpg").as_deref(),
            Some("https://cf.geekdo-images.com/images/original/x.jpg")
        );
    }

    #[test]
    fn test_rejects_html_pages_and_blanks() {
        assert_eq!(
            normalize_image_url("https://boardgamegeek.com/image/12345/catan"),
            None
        );
        assert_eq!(normalize_image_url("   "), None);
        assert_eq!(normalize_image_url("?only=query"), None);
        assert_eq!(normalize_image_url("/relative/x.jpg"), None);
        assert_eq!(normalize_image_url("ftp://cf.geekdo-images.com/a.jpg"), None);
    }
}
