/// Name of the cookie Sentry keeps its CSRF token in.
pub const CSRF_COOKIE: &str = "sc";

/// Supplies the CSRF token Sentry expects on state-changing requests.
pub trait CsrfTokenSource: Send + Sync {
    fn csrf_token(&self) -> Option<String>;
}

/// Reads cookies out of a raw `Cookie` header value.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    header: String,
}

impl CookieJar {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    pub fn header(&self) -> Option<&str> {
        let header = self.header.trim();
        (!header.is_empty()).then_some(header)
    }

    /// Percent-decoded value of the named cookie.
    pub fn get(&self, name: &str) -> Option<String> {
        self.header
            .split(';')
            .filter_map(|pair| pair.trim_start().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| {
                urlencoding::decode(value)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| value.to_string())
            })
    }
}

impl CsrfTokenSource for CookieJar {
    fn csrf_token(&self) -> Option<String> {
        self.get(CSRF_COOKIE)
    }
}
