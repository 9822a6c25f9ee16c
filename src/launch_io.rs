use std::path::PathBuf;

const FILE_SCHEME: &str = "file://";
const LOCAL_HOST: &str = "localhost";

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

fn escaped_byte(after_percent: &[u8]) -> Option<u8> {
    match after_percent {
        [hi, lo, ..] => Some((hex_value(*hi)? << 4) | hex_value(*lo)?),
        _ => None,
    }
}

/// `%XX` escapes become bytes; malformed escapes are kept verbatim.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0usize;
    while let Some(&byte) = bytes.get(index) {
        if byte == b'%' {
            if let Some(decoded) = escaped_byte(&bytes[index + 1..]) {
                out.push(decoded);
                index += 3;
                continue;
            }
        }
        out.push(byte);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn strip_scheme(raw: &str) -> Option<&str> {
    let head = raw.get(..FILE_SCHEME.len())?;
    head.eq_ignore_ascii_case(FILE_SCHEME)
        .then(|| &raw[FILE_SCHEME.len()..])
}

/// Local path named by a `file://` URI. The authority must be empty or
/// `localhost` except on Windows, where a host names a UNC share.
fn parse_file_uri_path(raw: &str) -> Option<PathBuf> {
    let body = strip_scheme(raw)?;
    let (host, path) = match body.find('/') {
        Some(index) => body.split_at(index),
        None => (body, ""),
    };
    if path.len() <= 1 {
        return None;
    }
    let decoded = percent_decode(path);
    if host.is_empty() || host.eq_ignore_ascii_case(LOCAL_HOST) {
        return Some(local_uri_path(decoded));
    }
    remote_uri_path(host, decoded)
}

#[cfg(target_os = "windows")]
fn local_uri_path(decoded: String) -> PathBuf {
    // `/C:/libs/a.jar` carries the drive after the leading slash.
    let trimmed = match decoded.get(2..3) {
        Some(":") => &decoded[1..],
        _ => decoded.as_str(),
    };
    PathBuf::from(trimmed.replace('/', "\\"))
}

#[cfg(not(target_os = "windows"))]
fn local_uri_path(decoded: String) -> PathBuf {
    PathBuf::from(decoded)
}

#[cfg(target_os = "windows")]
fn remote_uri_path(host: &str, decoded: String) -> Option<PathBuf> {
    Some(PathBuf::from(format!(r"\\{host}{}", decoded.replace('/', "\\"))))
}

#[cfg(not(target_os = "windows"))]
fn remote_uri_path(_host: &str, _decoded: String) -> Option<PathBuf> {
    None
}

/// Accepts a plain path, a quoted path or a `file://` URI naming a `.jar`.
/// Flags and other files yield `None`.
pub fn parse_launch_jar_arg(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return None;
    }
    let path = parse_file_uri_path(trimmed).unwrap_or_else(|| PathBuf::from(trimmed));
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase());
    if extension.as_deref() != Some("jar") {
        return None;
    }
    Some(path)
}

pub fn collect_startup_jar_paths() -> Vec<PathBuf> {
    collect_jar_paths_from_args(
        std::env::args_os()
            .skip(1)
            .map(|item| item.to_string_lossy().into_owned()),
    )
}

pub fn collect_jar_paths_from_args(args: impl IntoIterator<Item = String>) -> Vec<PathBuf> {
    args.into_iter()
        .filter_map(|item| parse_launch_jar_arg(item.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{collect_jar_paths_from_args, parse_launch_jar_arg, percent_decode};

    fn ends_with_jar(path: &std::path::Path) -> bool {
        path.to_string_lossy().to_ascii_lowercase().ends_with(".jar")
    }

    #[test]
    fn parse_launch_arg_accepts_plain_jar_path() {
        let parsed = parse_launch_jar_arg("/home/dev/libs/app.jar").expect("expected jar path");
        assert!(ends_with_jar(&parsed));
    }

    #[test]
    fn parse_launch_arg_accepts_quoted_and_uppercase_jar_path() {
        let parsed = parse_launch_jar_arg(r#""C:\Users\Dev\APP.JAR""#).expect("expected quoted jar path");
        assert!(ends_with_jar(&parsed));
    }

    #[test]
    fn parse_launch_arg_accepts_file_uri_jar_path() {
        let parsed = parse_launch_jar_arg("file:///home/dev/My%20Libs/app.jar").expect("expected file uri");
        let value = parsed.to_string_lossy().to_string();
        assert!(value.contains("My Libs"));
        assert!(ends_with_jar(&parsed));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn parse_launch_arg_strips_localhost_authority() {
        let parsed = parse_launch_jar_arg("file://LOCALHOST/opt/app.jar").expect("expected path");
        assert_eq!(parsed, std::path::PathBuf::from("/opt/app.jar"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn parse_launch_arg_ignores_remote_hosts() {
        assert!(parse_launch_jar_arg("file://buildhost/share/app.jar").is_none());
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn parse_launch_arg_maps_drive_and_unc_uris() {
        assert_eq!(
            parse_launch_jar_arg("file:///C:/libs/app.jar"),
            Some(std::path::PathBuf::from(r"C:\libs\app.jar"))
        );
        assert_eq!(
            parse_launch_jar_arg("file://buildhost/share/app.jar"),
            Some(std::path::PathBuf::from(r"\\buildhost\share\app.jar"))
        );
    }

    #[test]
    fn parse_launch_arg_rejects_flags_and_non_jar() {
        assert!(parse_launch_jar_arg("--filter").is_none());
        assert!(parse_launch_jar_arg("/home/dev/Main.java").is_none());
        assert!(parse_launch_jar_arg("").is_none());
        assert!(parse_launch_jar_arg("file://").is_none());
    }

    #[test]
    fn percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("end%2F"), "end/");
    }

    #[test]
    fn collect_jar_paths_filters_invalid_entries() {
        let paths = collect_jar_paths_from_args(vec![
            "--show".to_string(),
            "/home/dev/a.jar".to_string(),
            "/home/dev/B.java".to_string(),
            "file:///home/dev/C%20D.jar".to_string(),
        ]);
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|item| ends_with_jar(item)));
    }
}
