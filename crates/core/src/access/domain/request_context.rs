use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// `username:password` pair from an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    /// Parse an `Authorization` header value. Returns `None` for any other
    /// scheme or malformed payload.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        if username.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// The request attributes access control looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub api_key: Option<String>,
    pub credentials: Option<BasicCredentials>,
}
