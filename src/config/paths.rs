//! Command-line path expansion.
//!
//! `~/` expands to the current user's home directory, `$VAR` and `${VAR}`
//! expand from the environment (unset variables become empty), and the result
//! is cleaned lexically. `~user/` forms are left alone.

use std::path::PathBuf;

/// Expand and clean a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    let mut path = raw.to_string();
    if path.starts_with("~/") || path.starts_with("~\\") {
        if let Some(home) = dirs::home_dir() {
            path = format!("{}{}", home.display(), &path[1..]);
        }
    }
    PathBuf::from(clean(&expand_env(&path)))
}

fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..len], len)
        };

        if name.is_empty() {
            out.push('$');
            rest = after;
            continue;
        }

        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

/// Lexical cleanup: collapse separators, drop `.` segments, resolve `..`.
fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
