//! Pure string derivations on [`Url`]
//!
//! Helpers that need an absolute base fail with [`UrlError::Relative`] when
//! called on a relative URL; the others work on both forms.

use super::Url;
use crate::{UrlError, UrlResult};

/// Splits a raw URL into `(before_query, query, fragment)`
fn split_raw(raw: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, fragment) = match raw.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (raw, None),
    };
    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, Some(query)),
        None => (rest, None),
    };
    (rest, query, fragment)
}

impl Url {
    fn require_absolute(&self) -> UrlResult<&::url::Url> {
        self.parsed
            .as_ref()
            .ok_or_else(|| UrlError::Relative(self.raw.clone()))
    }

    /// Returns the scheme, e.g. `https`
    pub fn to_scheme(&self) -> UrlResult<&str> {
        Ok(self.require_absolute()?.scheme())
    }

    /// Returns the host, e.g. `example.com`
    pub fn to_host(&self) -> UrlResult<&str> {
        self.require_absolute()?
            .host_str()
            .ok_or_else(|| UrlError::Relative(self.raw.clone()))
    }

    /// Returns the scheme, host and port as a URL, e.g. `https://example.com:8080`
    pub fn to_base(&self) -> UrlResult<Url> {
        let parsed = self.require_absolute()?;
        let host = self.to_host()?;
        let base = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };
        Url::parse(&base)
    }

    /// Returns the path as a site key
    ///
    /// Leading and trailing slashes are removed; the root path is `/`.
    /// Query and fragment are not part of the result.
    ///
    /// ```
    /// use webcrawl::Url;
    ///
    /// assert_eq!(Url::parse("https://example.com").unwrap().to_path(), "/");
    /// assert_eq!(Url::parse("https://example.com/a/b/").unwrap().to_path(), "a/b");
    /// assert_eq!(Url::parse("/a/b?x=1").unwrap().to_path(), "a/b");
    /// ```
    pub fn to_path(&self) -> String {
        let path = match &self.parsed {
            Some(parsed) => parsed.path(),
            None => split_raw(&self.raw).0,
        };
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Returns the path with a leading slash, e.g. `/about/`
    pub fn to_endpoint(&self) -> String {
        let path = match &self.parsed {
            Some(parsed) => parsed.path(),
            None => split_raw(&self.raw).0,
        };
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    /// Returns the query string without the leading `?`
    pub fn to_query(&self) -> Option<&str> {
        split_raw(&self.raw).1
    }

    /// Returns the fragment without the leading `#`
    pub fn to_fragment(&self) -> Option<&str> {
        split_raw(&self.raw).2
    }

    /// Returns a copy without the fragment
    pub fn without_anchor(&self) -> Url {
        let (rest, query, _) = split_raw(&self.raw);
        let raw = match query {
            Some(query) => format!("{}?{}", rest, query),
            None => rest.to_string(),
        };
        let parsed = self.parsed.clone().map(|mut parsed| {
            parsed.set_fragment(None);
            parsed
        });
        Url::from_parts(raw, parsed)
    }

    /// Returns a copy without the query string (the fragment is kept)
    pub fn without_query(&self) -> Url {
        let (rest, _, fragment) = split_raw(&self.raw);
        let raw = match fragment {
            Some(fragment) => format!("{}#{}", rest, fragment),
            None => rest.to_string(),
        };
        let parsed = self.parsed.clone().map(|mut parsed| {
            parsed.set_query(None);
            parsed
        });
        Url::from_parts(raw, parsed)
    }

    /// Returns everything after the base as a relative URL
    ///
    /// `https://example.com/a/b?c#d` becomes `a/b?c#d`; the root becomes `/`.
    /// Relative URLs are returned unchanged.
    pub fn omit_base(&self) -> Url {
        let Some(parsed) = &self.parsed else {
            return self.clone();
        };

        let mut raw = parsed.path().trim_start_matches('/').to_string();
        if let Some(query) = parsed.query() {
            raw.push('?');
            raw.push_str(query);
        }
        if let Some(fragment) = parsed.fragment() {
            raw.push('#');
            raw.push_str(fragment);
        }
        if raw.is_empty() {
            raw.push('/');
        }
        Url::from_parts(raw, None)
    }

    /// Joins `link` onto this URL with exactly one separating slash
    ///
    /// The query and fragment of `link` are preserved. This is a plain
    /// string join, not RFC 3986 resolution; see [`Url::join`] for that.
    ///
    /// ```
    /// use webcrawl::Url;
    ///
    /// let base = Url::parse("https://example.com/").unwrap();
    /// let link = Url::parse("/blog/post?page=2#comments").unwrap();
    /// assert_eq!(
    ///     base.concat(&link).unwrap().as_str(),
    ///     "https://example.com/blog/post?page=2#comments"
    /// );
    /// ```
    pub fn concat(&self, link: &Url) -> UrlResult<Url> {
        let base = self.raw.as_str();
        let link = link.raw.as_str();

        let joined = if link.is_empty() || link == "/" {
            base.to_string()
        } else if link.starts_with('?') || link.starts_with('#') {
            format!("{}{}", base, link)
        } else {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                link.trim_start_matches('/')
            )
        };

        Url::parse(&joined)
    }

    /// Resolves `link` against this URL using standard reference resolution
    ///
    /// Absolute links are returned as-is. Used for redirect targets and for
    /// turning page links into absolute URLs.
    pub fn join(&self, link: &str) -> UrlResult<Url> {
        let parsed = self.require_absolute()?;
        let joined = parsed.join(link.trim()).map_err(|e| UrlError::Invalid {
            url: link.to_string(),
            reason: e.to_string(),
        })?;
        Url::parse(joined.as_str())
    }
}
