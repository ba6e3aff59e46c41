use crate::core::error::ValidationError;
use crate::session::store::SessionStore;
use url::Url;

/// Address of the appliance's own access point
pub const DEFAULT_ADDRESS: &str = "192.168.4.1";

/// Port the backend API listens on
pub const DEFAULT_PORT: u16 = 8000;

const SCHEMES: [&str; 2] = ["http://", "https://"];

/// Turns user-typed server addresses into canonical base URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    default_address: String,
    default_port: u16,
}

impl Resolver {
    pub fn new(default_address: impl Into<String>, default_port: u16) -> Self {
        Self {
            default_address: default_address.into(),
            default_port,
        }
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    /// Normalize an address into `scheme://host:port/path/`.
    ///
    /// Returns an empty string for empty input so the caller can fall back
    /// to a persisted or default address.
    pub fn normalize(&self, input: &str) -> String {
        let input = input.trim();
        if input.is_empty() {
            return String::new();
        }

        let (scheme, rest) = SCHEMES
            .iter()
            .find_map(|scheme| input.strip_prefix(scheme).map(|rest| (*scheme, rest)))
            .unwrap_or(("http://", input));

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return String::new();
        }

        let mut url = String::with_capacity(input.len() + 16);
        url.push_str(scheme);
        url.push_str(authority);
        if !has_port(authority) {
            url.push(':');
            url.push_str(&self.default_port.to_string());
        }

        let path = path.trim_end_matches('/');
        url.push_str(path);
        url.push('/');
        url
    }

    /// Inverse of [`normalize`](Self::normalize) for display: drops the
    /// scheme, the default port and the trailing slash.
    pub fn strip(&self, url: &str) -> String {
        let rest = SCHEMES
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme))
            .unwrap_or(url);
        let rest = rest.trim_end_matches('/');

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        let default_suffix = format!(":{}", self.default_port);
        let authority = authority.strip_suffix(default_suffix.as_str()).unwrap_or(authority);

        format!("{}{}", authority, path)
    }

    /// Persisted base URL, or the normalized default address
    pub fn resolve(&self, session: &SessionStore) -> String {
        let saved = session.load_url();
        if saved.is_empty() {
            self.normalize(&self.default_address)
        } else {
            saved
        }
    }

    /// Value to pre-fill the address field with
    pub fn display_address(&self, session: &SessionStore) -> String {
        let saved = session.load_url();
        if saved.is_empty() {
            self.default_address.clone()
        } else {
            self.strip(&saved)
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_PORT)
    }
}

/// Normalize with the default port
pub fn normalize(input: &str) -> String {
    Resolver::default().normalize(input)
}

/// Strip with the default port
pub fn strip(url: &str) -> String {
    Resolver::default().strip(url)
}

/// Check that a normalized base URL is an http(s) URL with a host
pub fn validate(base_url: &str) -> Result<(), ValidationError> {
    if base_url.is_empty() {
        return Err(ValidationError::MissingBaseUrl);
    }
    let parsed = Url::parse(base_url).map_err(|e| ValidationError::InvalidAddress(format!("{}: {}", base_url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::InvalidAddress(base_url.to_string()));
    }
    Ok(())
}

fn has_port(authority: &str) -> bool {
    // Bracketed IPv6 literal: only a colon after the closing bracket is a port
    if authority.starts_with('[') {
        return match authority.rfind(']') {
            Some(end) => authority[end + 1..].starts_with(':'),
            None => false,
        };
    }
    authority.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::preferences::MemoryPreferences;

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("http://"), "");
    }

    #[test]
    fn test_normalize_bare_host() {
        assert_eq!(normalize("192.168.4.1"), "http://192.168.4.1:8000/");
    }

    #[test]
    fn test_normalize_keeps_explicit_port() {
        assert_eq!(normalize("192.168.4.1:9000"), "http://192.168.4.1:9000/");
        assert_eq!(normalize("https://api.local:443/"), "https://api.local:443/");
    }

    #[test]
    fn test_normalize_trailing_slash() {
        assert_eq!(normalize("http://h.local/"), "http://h.local:8000/");
        assert_eq!(normalize("h.local//"), "http://h.local:8000/");
        assert_eq!(normalize("h.local:8080/api/"), "http://h.local:8080/api/");
        assert_eq!(normalize("h.local/api"), "http://h.local:8000/api/");
    }

    #[test]
    fn test_normalize_ipv6() {
        assert_eq!(normalize("[fe80::1]"), "http://[fe80::1]:8000/");
        assert_eq!(normalize("[fe80::1]:9000"), "http://[fe80::1]:9000/");
    }

    #[test]
    fn test_normalize_custom_port() {
        let resolver = Resolver::new("10.0.0.2", 8080);
        assert_eq!(resolver.normalize("10.0.0.2"), "http://10.0.0.2:8080/");
        assert_eq!(resolver.strip("http://10.0.0.2:8080/"), "10.0.0.2");
    }

    #[test]
    fn test_strip_round_trip() {
        for host in ["192.168.4.1", "capsule.local", "localhost", "10.1.2.3"] {
            assert_eq!(strip(&normalize(host)), host);
        }
    }

    #[test]
    fn test_strip_keeps_non_default_port() {
        assert_eq!(strip("https://192.168.4.1:9000/"), "192.168.4.1:9000");
    }

    #[test]
    fn test_validate_rejects_malformed_hosts() {
        assert!(validate(&normalize("192.168.4.1")).is_ok());
        assert!(validate(&normalize("https://capsule.local/api")).is_ok());
        assert!(validate(&normalize("[fe80::1]:9000")).is_ok());

        assert_eq!(validate(""), Err(ValidationError::MissingBaseUrl));
        assert!(matches!(
            validate(&normalize("bad host name")),
            Err(ValidationError::InvalidAddress(_))
        ));
        assert!(matches!(
            validate(&normalize("host:notaport")),
            Err(ValidationError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let session = SessionStore::new(MemoryPreferences::default());
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve(&session), "http://192.168.4.1:8000/");
        assert_eq!(resolver.display_address(&session), "192.168.4.1");

        session.save_url("http://10.0.0.9:8000/").unwrap();
        assert_eq!(resolver.resolve(&session), "http://10.0.0.9:8000/");
        assert_eq!(resolver.display_address(&session), "10.0.0.9");
    }
}
