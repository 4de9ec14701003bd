/// Allow-list of first-party caller addresses that skip authentication.
///
/// An `Origin` header must equal an entry. A `Referer` may also carry a path,
/// so it matches an entry exactly or as a `entry/...` prefix. Comparison
/// ignores ASCII case and trailing slashes.
#[derive(Clone, Debug, Default)]
pub struct TrustedOrigins {
    entries: Vec<String>,
}

impl TrustedOrigins {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn matches(&self, origin: Option<&str>, referer: Option<&str>) -> bool {
        let origin = origin.map(normalize);
        let referer = referer.map(normalize);
        self.entries.iter().any(|entry| {
            origin.as_deref() == Some(entry.as_str())
                || referer.as_deref().is_some_and(|r| {
                    r == entry
                        || r.strip_prefix(entry.as_str())
                            .is_some_and(|rest| rest.starts_with('/'))
                })
        })
    }
}

fn normalize(value: &str) -> String {
    value.trim().trim_end_matches('/').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn allow_list() -> TrustedOrigins {
        TrustedOrigins::new(["http://localhost:63342", "https://app.example.com/"])
    }

    #[rstest]
    #[case(Some("http://localhost:63342"), None, true)]
    #[case(Some("http://LOCALHOST:63342/"), None, true)]
    #[case(Some("https://app.example.com"), None, true)]
    #[case(None, Some("http://localhost:63342/index.html"), true)]
    #[case(None, Some("https://app.example.com"), true)]
    #[case(Some("http://localhost:63343"), None, false)]
    #[case(Some("http://localhost:6334"), None, false)]
    #[case(None, Some("http://localhost:63342.evil.com/"), false)]
    #[case(None, Some("http://localhost:633420/x"), false)]
    #[case(Some("null"), Some("https://other.example.com/page"), false)]
    #[case(None, None, false)]
    fn test_matching(
        #[case] origin: Option<&str>,
        #[case] referer: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(allow_list().matches(origin, referer), expected);
    }

    #[test]
    fn test_origin_with_path_is_not_trusted() {
        // Origin headers never carry a path; only Referer gets prefix matching.
        assert!(!allow_list().matches(Some("http://localhost:63342/x"), None));
    }

    #[test]
    fn test_blank_entries_are_ignored() {
        let list = TrustedOrigins::new(["", "  ", "/"]);
        assert!(list.is_empty());
        assert!(!list.matches(Some(""), Some("")));
    }
}
