use std::{fmt, str::FromStr};

use crate::error::ConfigError;

/// The address of an endpoint, in the form `scheme:path[?options]`.
///
/// The scheme is case-insensitive and stored lowercased, so `Direct:orders` and `direct:orders`
/// name the same endpoint. The rest is kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointUri {
    scheme: String,
    rest: String,
}

impl EndpointUri {
    /// Parse an endpoint URI.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let uri = uri.trim();
        let (scheme, rest) = uri.split_once(':').ok_or_else(|| invalid("missing scheme"))?;

        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }
        if !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(invalid("scheme contains invalid characters"));
        }

        let path = rest.split('?').next().unwrap_or_default();
        if path.is_empty() {
            return Err(invalid("missing path"));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            rest: rest.to_string(),
        })
    }

    /// The scheme, e.g. `direct`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The path, without any options.
    pub fn path(&self) -> &str {
        self.rest.split('?').next().unwrap_or_default()
    }

    /// The raw option string after `?`, if any.
    pub fn options(&self) -> Option<&str> {
        self.rest.split_once('?').map(|(_, options)| options)
    }
}

impl FromStr for EndpointUri {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EndpointUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.rest)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::EndpointUri;
    use crate::error::ConfigError;

    #[test]
    fn parses_scheme_path_and_options() {
        let uri = EndpointUri::parse("Direct:orders?timeout=10").unwrap();

        assert_eq!(uri.scheme(), "direct");
        assert_eq!(uri.path(), "orders");
        assert_eq!(uri.options(), Some("timeout=10"));
        assert_eq!(uri.to_string(), "direct:orders?timeout=10");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(
            EndpointUri::parse("DIRECT:orders").unwrap(),
            EndpointUri::parse("direct:orders").unwrap()
        );
    }

    #[test]
    fn rejects_missing_parts() {
        assert_matches!(
            EndpointUri::parse("orders"),
            Err(ConfigError::InvalidUri { reason: "missing scheme", .. })
        );
        assert_matches!(
            EndpointUri::parse(":orders"),
            Err(ConfigError::InvalidUri { reason: "missing scheme", .. })
        );
        assert_matches!(
            EndpointUri::parse("direct:"),
            Err(ConfigError::InvalidUri { reason: "missing path", .. })
        );
        assert_matches!(
            EndpointUri::parse("direct:?a=b"),
            Err(ConfigError::InvalidUri { reason: "missing path", .. })
        );
        assert_matches!(
            EndpointUri::parse("di rect:orders"),
            Err(ConfigError::InvalidUri { .. })
        );
    }
}
