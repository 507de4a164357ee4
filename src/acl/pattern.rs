//! Wildcard matching for rule type/name patterns.

/// Match a pattern against a value.
///
/// `*` matches zero or more arbitrary characters (including `/`); every other
/// character matches itself. Matching is case-sensitive and anchored at both
/// ends, so the whole value must be consumed.
///
/// There are no other metacharacters, so every pattern is well-formed and
/// this never fails.
///
/// # Examples
///
/// ```
/// use aclgate::acl::matches;
///
/// assert!(matches("*", ""));
/// assert!(matches("cloud/*", "cloud/centos_6.5"));
/// assert!(matches("open/consul_*", "open/consul_1.4"));
/// assert!(!matches("cloud/*", "other/centos"));
/// assert!(!matches("centos", "Centos"));
/// ```
pub fn matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == value;
    }

    // Greedy scan with backtracking to the most recent star. Working on bytes
    // is sound for UTF-8 input: literal bytes only line up on char boundaries
    // and a star may swallow any byte run.
    let pattern = pattern.as_bytes();
    let value = value.as_bytes();

    let (mut p, mut v) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while v < value.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            resume = v;
            p += 1;
        } else if p < pattern.len() && pattern[p] == value[v] {
            p += 1;
            v += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            v = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&b| b == b'*')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("*", "anything")]
    #[case("*", "")]
    #[case("**", "")]
    #[case("cloud/*", "cloud/centos_6.5")]
    #[case("cloud/*", "cloud/")]
    #[case("cloud/*", "cloud/deep/nested/path")]
    #[case("golang*", "golang")]
    #[case("golang*", "golang-1.22")]
    #[case("open/consul_*", "open/consul_agent")]
    #[case("*/centos", "library/centos")]
    #[case("lib*/cen*os", "library/centos")]
    #[case("a*b*c", "aXXbYYc")]
    #[case("a*b", "abab")]
    #[case("repository", "repository")]
    #[case("", "")]
    #[case("registry*", "registryé")]
    fn test_matches(#[case] pattern: &str, #[case] value: &str) {
        assert!(matches(pattern, value), "{pattern} should match {value}");
    }

    #[rstest]
    #[case("cloud/*", "other/centos")]
    #[case("cloud/*", "cloud")]
    #[case("golang*", "go")]
    #[case("golang*", "xgolang")]
    #[case("centos", "centos7")]
    #[case("centos", "Centos")]
    #[case("centos", "")]
    #[case("*/centos", "library/centos7")]
    #[case("a*b*c", "aXXbYY")]
    #[case("", "x")]
    #[case("repository", "repositor")]
    fn test_does_not_match(#[case] pattern: &str, #[case] value: &str) {
        assert!(!matches(pattern, value), "{pattern} should not match {value}");
    }

    #[test]
    fn test_star_is_the_only_metacharacter() {
        // Shell glob characters other than `*` are literals here
        assert!(matches("image?", "image?"));
        assert!(!matches("image?", "images"));
        assert!(matches("[abc]", "[abc]"));
        assert!(!matches("[abc]", "a"));
        assert!(matches("dots.*", "dots.v1"));
        assert!(!matches("dots.*", "dotsXv1"));
    }
}
