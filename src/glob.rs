/// Return `true` if `pattern` contains a `*` or `?` wildcard.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Match a file name against a wildcard pattern.
///
/// `*` matches any run of characters and `?` a single character. There is
/// no dotfile protection: `*.tmp` matches `.cache.tmp`.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    fnmatch(pattern.as_bytes(), name.as_bytes())
}

/// Iterative fnmatch with single-star backtracking.
fn fnmatch(pat: &[u8], name: &[u8]) -> bool {
    let mut pi = 0;
    let mut ni = 0;
    let mut star_pi = usize::MAX;
    let mut star_ni = 0;

    while ni < name.len() {
        if pi < pat.len() && (pat[pi] == b'?' || pat[pi] == name[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < pat.len() && pat[pi] == b'*' {
            star_pi = pi;
            star_ni = ni;
            pi += 1;
        } else if star_pi != usize::MAX {
            pi = star_pi + 1;
            star_ni += 1;
            ni = star_ni;
        } else {
            return false;
        }
    }

    while pi < pat.len() && pat[pi] == b'*' {
        pi += 1;
    }

    pi == pat.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star() {
        assert!(name_matches("*", "hello"));
        assert!(name_matches("*.log", "build.log"));
        assert!(!name_matches("*.log", "build.rs"));
        assert!(name_matches("t*t", "target"));
    }

    #[test]
    fn test_question() {
        assert!(name_matches("?.o", "a.o"));
        assert!(!name_matches("?.o", "ab.o"));
    }

    #[test]
    fn test_dotfiles_match() {
        assert!(name_matches("*", ".vsnap"));
        assert!(name_matches("*.tmp", ".cache.tmp"));
    }

    #[test]
    fn test_exact() {
        assert!(name_matches("target", "target"));
        assert!(!name_matches("target", "targets"));
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("*.o"));
        assert!(has_wildcard("a?c"));
        assert!(!has_wildcard("node_modules"));
    }
}
