use crate::models::photos::PhotoId;

pub mod api;
pub mod html;

pub(super) fn mount(
    app: &mut tide::Server<crate::State>,
    static_path: &std::path::Path,
) -> std::io::Result<()> {
    app.at("/static").serve_dir(static_path)?;

    html::mount(app);
    api::mount(app.at("/api"));

    Ok(())
}

/// Only the canonical decimal spelling names a photo, so `+5` and `005` are not ids.
pub(crate) fn parse_photo_id(raw: &str) -> Option<PhotoId> {
    let id: PhotoId = raw.parse().ok()?;
    if id.to_string() != raw {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::parse_photo_id;

    #[test]
    fn photo_ids_must_be_canonical() {
        assert_eq!(parse_photo_id("5"), Some(5));
        assert_eq!(parse_photo_id("0"), Some(0));
        assert_eq!(parse_photo_id("+5"), None);
        assert_eq!(parse_photo_id("005"), None);
        assert_eq!(parse_photo_id("abc"), None);
        assert_eq!(parse_photo_id(""), None);
    }
}
