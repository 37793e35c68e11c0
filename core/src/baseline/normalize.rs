//! Pure, deterministic pattern normalizers. Similar invocations must
//! collapse to the same key so counting works.

use std::path::Path;

/// Base command plus its sorted flag set; positional arguments are
/// discarded. `git commit -m "x"` and `git push -m "y"` both become
/// `git -m`.
pub fn normalize_command(command: &str) -> String {
    let mut tokens = command.split_whitespace();
    let base = match tokens.next() {
        Some(t) => t,
        None => return String::new(),
    };

    let mut flags: Vec<&str> = tokens.filter(|t| t.starts_with('-')).collect();
    flags.sort_unstable();
    flags.dedup();

    if flags.is_empty() {
        base.to_string()
    } else {
        format!("{} {}", base, flags.join(" "))
    }
}

/// Directory plus extension; the filename itself is discarded.
/// `/home/a/src/main.rs` becomes `/home/a/src/*.rs`.
pub fn normalize_path(path: &str) -> String {
    let p = Path::new(path);
    let dir = p
        .parent()
        .map(|d| d.to_string_lossy().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ".".to_string());

    match p.extension() {
        Some(ext) => format!("{}/*.{}", dir, ext.to_string_lossy()),
        None => format!("{}/*", dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_collapses_positionals() {
        assert_eq!(normalize_command("git commit -m message"), "git -m");
        assert_eq!(normalize_command("git push -m other"), "git -m");
    }

    #[test]
    fn command_flag_order_is_canonical() {
        assert_eq!(
            normalize_command("ls -l -a /tmp"),
            normalize_command("ls -a -l /var")
        );
    }

    #[test]
    fn bare_command_is_its_own_pattern() {
        assert_eq!(normalize_command("ls"), "ls");
        assert_eq!(normalize_command(""), "");
    }

    #[test]
    fn path_keeps_dir_and_extension() {
        assert_eq!(normalize_path("/home/a/src/main.rs"), "/home/a/src/*.rs");
        assert_eq!(normalize_path("/home/a/src/other.rs"), "/home/a/src/*.rs");
        assert_eq!(normalize_path("/etc/hosts"), "/etc/*");
    }
}
