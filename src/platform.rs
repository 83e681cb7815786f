//! Platform detection and path expansion
//!
//! The OS identifier is the distribution id on Linux (`arch`, `ubuntu`, ...),
//! `darwin` on macOS and the Rust target OS name elsewhere.

use directories::BaseDirs;
use std::env;
use std::fs;
use std::path::PathBuf;

const OS_RELEASE: &str = "/etc/os-release";

/// Detect the operating system identifier used in conditions
pub fn detect_os() -> String {
    match env::consts::OS {
        "macos" => "darwin".to_string(),
        "linux" => fs::read_to_string(OS_RELEASE)
            .ok()
            .and_then(|contents| os_release_id(&contents))
            .unwrap_or_else(|| "linux".to_string()),
        other => other.to_string(),
    }
}

/// Extract the `ID=` field from os-release contents
pub fn os_release_id(contents: &str) -> Option<String> {
    contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ID="))
        .map(|id| id.trim_matches(|c| c == '"' || c == '\'').to_string())
        .find(|id| !id.is_empty())
}

/// CPU architecture of the running binary (e.g. `x86_64`, `aarch64`)
pub fn detect_arch() -> &'static str {
    env::consts::ARCH
}

/// The current user's home directory
pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references using the process environment
pub fn expand_path(path: &str) -> String {
    let home = home_dir()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default();
    expand_with(path, &home, |name| env::var(name).ok())
}

/// Expand a path against an explicit home and variable lookup.
///
/// Unknown variables expand to the empty string.
pub fn expand_with<F>(path: &str, home: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let with_home = if path == "~" {
        home.to_string()
    } else if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", home.trim_end_matches('/'), rest)
    } else {
        path.to_string()
    };

    let mut out = String::with_capacity(with_home.len());
    let mut chars = with_home.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let rest = &with_home[i + 1..];
        if let Some(braced) = rest.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    let name = &braced[..end];
                    out.push_str(&lookup(name).unwrap_or_default());
                    // skip `{name}`
                    for _ in 0..name.chars().count() + 2 {
                        chars.next();
                    }
                }
                None => out.push(c),
            }
            continue;
        }

        let name: String = rest
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .collect();
        if name.is_empty() {
            out.push(c);
            continue;
        }
        out.push_str(&lookup(&name).unwrap_or_default());
        for _ in 0..name.len() {
            chars.next();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "XDG" => Some("/home/luke/.config".to_string()),
            "USER" => Some("luke".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_os_release_id() {
        let contents = "NAME=\"Arch Linux\"\nPRETTY_NAME=\"Arch Linux\"\nID=arch\nBUILD_ID=rolling\n";
        assert_eq!(os_release_id(contents), Some("arch".to_string()));

        let quoted = "ID=\"ubuntu\"\nID_LIKE=debian\n";
        assert_eq!(os_release_id(quoted), Some("ubuntu".to_string()));

        assert_eq!(os_release_id("NAME=foo\n"), None);
    }

    #[test]
    fn test_detect_os_is_not_empty() {
        assert!(!detect_os().is_empty());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_with("~", "/home/luke", lookup), "/home/luke");
        assert_eq!(expand_with("~/code", "/home/luke", lookup), "/home/luke/code");
        assert_eq!(expand_with("/etc/~x", "/home/luke", lookup), "/etc/~x");
    }

    #[test]
    fn test_expand_variables() {
        assert_eq!(
            expand_with("$XDG/nvim", "/h", lookup),
            "/home/luke/.config/nvim"
        );
        assert_eq!(expand_with("/srv/${USER}/www", "/h", lookup), "/srv/luke/www");
        assert_eq!(expand_with("/tmp/$MISSING/x", "/h", lookup), "/tmp//x");
    }

    #[test]
    fn test_expand_leaves_lone_dollar() {
        assert_eq!(expand_with("cost $ 5", "/h", lookup), "cost $ 5");
        assert_eq!(expand_with("open ${", "/h", lookup), "open ${");
    }
}
