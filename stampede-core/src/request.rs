use crate::ConfigError;
use http::header::{HeaderName, HeaderValue};
use std::fmt;
use std::str::FromStr;
use url::Url;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(ConfigError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request every virtual user issues. Built once before the run and shared read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![],
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.url).map_err(|err| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: err.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        for (name, value) in &self.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err()
                || HeaderValue::from_str(value).is_err()
            {
                return Err(ConfigError::InvalidHeader(name.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parsing() {
        assert_eq!("get".parse::<Method>(), Ok(Method::Get));
        assert_eq!(" Delete ".parse::<Method>(), Ok(Method::Delete));
        assert_eq!(
            "FETCH".parse::<Method>(),
            Err(ConfigError::InvalidMethod("FETCH".to_string()))
        );
    }

    #[test]
    fn valid_spec() {
        let spec = RequestSpec::get("https://example.test/health").header("x-run", "smoke");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            RequestSpec::get("not a url").validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert_eq!(
            RequestSpec::get("ftp://example.test").validate(),
            Err(ConfigError::UnsupportedScheme("ftp".to_string()))
        );
    }

    #[test]
    fn rejects_bad_headers() {
        let spec = RequestSpec::get("http://example.test").header("bad name", "v");
        assert_eq!(
            spec.validate(),
            Err(ConfigError::InvalidHeader("bad name".to_string()))
        );

        let spec = RequestSpec::get("http://example.test").header("x-ok", "line\r\nbreak");
        assert!(spec.validate().is_err());

        let spec = RequestSpec::get("http://example.test").header("bad(name)", "v");
        assert_eq!(
            spec.validate(),
            Err(ConfigError::InvalidHeader("bad(name)".to_string()))
        );

        let spec = RequestSpec::get("http://example.test").header("x-ok", "a\x7fb");
        assert_eq!(
            spec.validate(),
            Err(ConfigError::InvalidHeader("x-ok".to_string()))
        );

        let spec = RequestSpec::get("http://example.test")
            .header("Accept", "text/html; q=0.9")
            .header("x-token", "abc:def");
        assert!(spec.validate().is_ok());
    }
}
