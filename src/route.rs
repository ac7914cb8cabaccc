//! Compiled route patterns.
//!
//! A pattern such as `/users/:id/posts` compiles into an ordered list of
//! segments. `:`-prefixed segments capture whatever the request carries at
//! that position; every other segment must match byte for byte.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::params::RouteValues;

const CAPTURE_SENTINEL: char = ':';

/// One `/`-delimited component of a compiled pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    Literal(String),
    /// Holds the parameter name, without the leading `:`.
    Capture(String),
}

/// Identity of a registration: hex SHA-256 over `METHOD:path`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteHash(String);

impl RouteHash {
    pub fn compute(method: &str, path: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.to_ascii_uppercase().as_bytes());
        hasher.update(b":");
        hasher.update(path.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered route. Immutable once built.
#[derive(Clone, Debug)]
pub struct Route {
    path: String,
    method: String,
    segments: Vec<Segment>,
    hash: RouteHash,
}

impl Route {
    pub fn parse(path: &str, method: &str) -> Self {
        let segments = split_segments(path)
            .map(|segment| match segment.strip_prefix(CAPTURE_SENTINEL) {
                Some(name) => Segment::Capture(name.to_owned()),
                None => Segment::Literal(segment.to_owned()),
            })
            .collect();

        Self {
            path: path.to_owned(),
            method: method.to_ascii_uppercase(),
            segments,
            hash: RouteHash::compute(method, path),
        }
    }

    pub fn path(&self) -> &str { &self.path }
    pub fn method(&self) -> &str { &self.method }
    pub fn segments(&self) -> &[Segment] { &self.segments }
    pub fn hash(&self) -> &RouteHash { &self.hash }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Scores this route against the segments of an incoming path.
    ///
    /// `0` means no match. Otherwise the score starts at 1, each matching
    /// literal adds 2 and each capture adds 1, so literals outrank captures
    /// at equal segment count.
    pub fn rank(&self, incoming: &[&str]) -> usize {
        if self.segments.len() != incoming.len() {
            return 0;
        }

        let mut rank = 1;
        for (segment, value) in self.segments.iter().zip(incoming) {
            match segment {
                Segment::Capture(_) => rank += 1,
                Segment::Literal(literal) if literal == value => rank += 2,
                Segment::Literal(_) => return 0,
            }
        }
        rank
    }

    /// Maps each capture name to the incoming value at the same position.
    pub fn bind(&self, incoming: &[&str]) -> RouteValues {
        self.segments
            .iter()
            .zip(incoming)
            .filter_map(|(segment, value)| match segment {
                Segment::Capture(name) => Some((name.clone(), (*value).to_owned())),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

/// Splits a path on `/`, skipping empty components.
///
/// Shared by pattern compilation and request lookup so both sides index
/// segments identically.
pub(crate) fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
