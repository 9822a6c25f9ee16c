use serde::Serialize;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "ico"];

const BYTECODE_EXTENSION: &str = "class";

const NESTED_ARCHIVE_EXTENSION: &str = "jar";

// Media files that are binary but have no viewer.
const OPAQUE_EXTENSIONS: [&str; 3] = ["wav", "mp3", "ogg"];

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    Directory,
    Text,
    Image,
    Bytecode,
    NestedArchive,
    OpaqueBinary,
}

/// Classifies an entry by its extension only. Content is never sniffed, so a
/// misnamed file is misclassified.
pub fn classify(full_path: &str) -> ContentKind {
    if full_path.ends_with('/') {
        return ContentKind::Directory;
    }
    let Some(extension) = extension_of(full_path) else {
        return ContentKind::Text;
    };
    let extension = extension.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        ContentKind::Image
    } else if extension == BYTECODE_EXTENSION {
        ContentKind::Bytecode
    } else if extension == NESTED_ARCHIVE_EXTENSION {
        ContentKind::NestedArchive
    } else if OPAQUE_EXTENSIONS.contains(&extension.as_str()) {
        ContentKind::OpaqueBinary
    } else {
        ContentKind::Text
    }
}

pub fn is_nested_archive_path(full_path: &str) -> bool {
    classify(full_path) == ContentKind::NestedArchive
}

/// Last path segment of an entry name.
pub fn base_name(full_path: &str) -> &str {
    full_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(full_path)
}

fn extension_of(full_path: &str) -> Option<&str> {
    let name = base_name(full_path);
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => Some(extension),
        _ => None,
    }
}

pub(crate) fn image_mime_type(full_path: &str) -> &'static str {
    match extension_of(full_path)
        .map(|value| value.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_extension_case_insensitively() {
        assert_eq!(classify("a/B$1.class"), ContentKind::Bytecode);
        assert_eq!(classify("x/y.PNG"), ContentKind::Image);
        assert_eq!(classify("x/y.Jpeg"), ContentKind::Image);
        assert_eq!(classify("lib/inner.JAR"), ContentKind::NestedArchive);
        assert_eq!(classify("readme"), ContentKind::Text);
        assert_eq!(classify("META-INF/MANIFEST.MF"), ContentKind::Text);
    }

    #[test]
    fn classify_marks_trailing_slash_as_directory() {
        assert_eq!(classify("com/app/"), ContentKind::Directory);
    }

    #[test]
    fn classify_ignores_dots_in_directories_and_dotfiles() {
        assert_eq!(classify("com.example/readme"), ContentKind::Text);
        assert_eq!(classify("config/.class"), ContentKind::Text);
        assert_eq!(classify("sounds/click.ogg"), ContentKind::OpaqueBinary);
    }

    #[test]
    fn base_name_returns_last_segment() {
        assert_eq!(base_name("com/app/Main.class"), "Main.class");
        assert_eq!(base_name("Main.class"), "Main.class");
        assert_eq!(base_name("com/app/"), "app");
    }

    #[test]
    fn image_mime_type_follows_extension() {
        assert_eq!(image_mime_type("icons/a.PNG"), "image/png");
        assert_eq!(image_mime_type("icons/a.jpg"), "image/jpeg");
        assert_eq!(image_mime_type("icons/a.ico"), "image/x-icon");
    }
}
