//! Root validation and path normalization.
//!
//! # Design
//! A reference's address is kept as a `Location` triple of root URL, path
//! segments and a directory flag, not as a string. Every dispatch URL is
//! rendered from that triple, so the `.json` marker and trailing-slash
//! handling live in exactly one place:
//!
//! | bound path       | leaf URL         | directory URL   |
//! |------------------|------------------|-----------------|
//! | `foo/bar`        | `/foo/bar.json`  | `/foo/bar/.json` |
//! | `foo/bar.json`   | `/foo/bar.json`  | `/foo/bar/.json` |
//! | `foo/bar/`       | `/foo/bar/.json` | `/foo/bar/.json` |
//! | `foo/bar/.json`  | `/foo/bar/.json` | `/foo/bar/.json` |
//!
//! Keys in the remote tree cannot contain `.`, so a `.json` ending on the last
//! segment is always read as the document marker, never as part of a key.
//!
//! Segments are held as raw keys and percent-encoded when a URL is rendered,
//! so `users/John Doe` goes out as `users/John%20Doe`.

use std::fmt;
use std::sync::OnceLock;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;

use crate::error::Error;

/// Domain used when the root target is a bare identifier.
pub const DEFAULT_DOMAIN: &str = "firebaseio.com";

const JSON_SUFFIX: &str = ".json";
const RULES_PATH: &str = ".settings/rules";

/// Bytes escaped inside one path segment; non-ASCII is always escaped.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]{2,}$").expect("identifier pattern compiles"))
}

fn root_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9.-]+(:[0-9]+)?/?$").expect("root url pattern compiles")
    })
}

fn absolute_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(https?://[A-Za-z0-9.-]+(?::[0-9]+)?)(/[^?#]*)?$")
            .expect("absolute url pattern compiles")
    })
}

/// The database a binder is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootTarget {
    /// A bare database name, served from `https://{name}.{domain}`.
    Identifier(String),
    /// An explicit `http(s)://host[:port]` base URL.
    Url(String),
}

impl RootTarget {
    /// Validate `target` against the identifier and root URL patterns.
    pub fn parse(target: &str) -> Result<Self, Error> {
        if identifier_pattern().is_match(target) {
            Ok(RootTarget::Identifier(target.to_string()))
        } else if root_url_pattern().is_match(target) {
            Ok(RootTarget::Url(target.to_string()))
        } else {
            Err(Error::InvalidTarget(target.to_string()))
        }
    }

    /// The root URL, never ending in `/`.
    pub fn root_url(&self, domain: &str) -> String {
        match self {
            RootTarget::Identifier(id) => format!("https://{id}.{domain}"),
            RootTarget::Url(url) => url.trim_end_matches('/').to_string(),
        }
    }
}

/// A parsed `(root, segments, directory)` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    root: String,
    segments: Vec<String>,
    directory: bool,
}

impl Location {
    /// Join `parts` onto `root` with `/`. Each part may itself contain `/`,
    /// so `["a", "b"]` and `["a/b"]` produce the same location.
    pub fn new<I, S>(root: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|part| part.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self::from_path(root.trim_end_matches('/'), &joined, false)
    }

    /// Parse an absolute URL such as `https://demo.firebaseio.com/a/b.json`.
    /// Percent-escapes in the path are decoded back to raw keys.
    pub fn parse_url(url: &str) -> Result<Self, Error> {
        let captures = absolute_url_pattern()
            .captures(url)
            .ok_or_else(|| Error::InvalidUrl(url.to_string()))?;
        let root = &captures[1];
        let path = captures.get(2).map_or("", |m| m.as_str());
        Ok(Self::from_path(root, path.trim_start_matches('/'), true))
    }

    fn from_path(root: &str, path: &str, encoded: bool) -> Self {
        let path = path.strip_suffix(JSON_SUFFIX).unwrap_or(path);
        let directory = path.is_empty() || path.ends_with('/');
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if encoded {
                    percent_decode_str(segment).decode_utf8_lossy().into_owned()
                } else {
                    segment.to_string()
                }
            })
            .collect();
        Self {
            root: root.to_string(),
            segments,
            directory,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    fn base(&self) -> String {
        let mut base = self.root.clone();
        for segment in &self.segments {
            base.push('/');
            base.extend(utf8_percent_encode(segment, SEGMENT));
        }
        base
    }

    /// URL for GET, PUT, POST and DELETE.
    pub fn leaf_url(&self) -> String {
        if self.directory {
            self.directory_url()
        } else {
            format!("{}{JSON_SUFFIX}", self.base())
        }
    }

    /// URL for PATCH: always the `/.json` form of the location.
    pub fn directory_url(&self) -> String {
        format!("{}/{JSON_SUFFIX}", self.base())
    }

    /// URL of the security rules document; ignores the bound path.
    pub fn rules_url(&self) -> String {
        format!("{}/{RULES_PATH}{JSON_SUFFIX}", self.root)
    }
}

/// Renders the location without the `.json` marker.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())?;
        if self.directory {
            f.write_str("/")?;
        }
        Ok(())
    }
}
