//! Ranked route table.
//!
//! Routes are bucketed by segment count, so a lookup only ever compares
//! against routes of the right length. Within a bucket every route for the
//! request method is ranked and the best one wins; on a tie the route that
//! was registered first is kept.
//!
//! Registration takes `&mut self` and lookup takes `&self`: build the table
//! at startup, then share it behind an `Arc` for concurrent lookups.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::Error;
use crate::params::RouteValues;
use crate::route::{split_segments, Route, RouteHash};

/// A successful lookup.
#[derive(Debug)]
pub struct Match<'a, H> {
    pub handler: &'a H,
    pub values: RouteValues,
    pub route: &'a Route,
}

/// Maps `(path, method)` pairs to handlers of type `H`.
#[derive(Debug)]
pub struct RouteTable<H> {
    routes: HashMap<usize, Vec<Route>>,
    handlers: HashMap<RouteHash, H>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), handlers: HashMap::new() }
    }

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// Returns `false` without touching the table when the same method and
    /// path were registered before; the first registration wins.
    pub fn register(&mut self, pattern: &str, method: &str, handler: H) -> bool {
        let route = Route::parse(pattern, method);
        if self.handlers.contains_key(route.hash()) {
            debug!(method = route.method(), path = pattern, "duplicate route ignored");
            return false;
        }

        debug!(method = route.method(), path = pattern, hash = %route.hash(), "route registered");
        self.handlers.insert(route.hash().clone(), handler);
        self.routes.entry(route.len()).or_default().push(route);
        true
    }

    /// Resolves `path` + `method` to the best-ranked handler and its bound values.
    pub fn find(&self, path: &str, method: &str) -> Result<Match<'_, H>, Error> {
        if self.routes.is_empty() {
            return Err(Error::NoRoutesRegistered);
        }

        let incoming: Vec<&str> = split_segments(path).collect();
        let bucket = self.routes.get(&incoming.len()).ok_or(Error::NoMatch)?;

        let mut best: Option<(&Route, usize)> = None;
        for route in bucket.iter().filter(|r| r.method().eq_ignore_ascii_case(method)) {
            let rank = route.rank(&incoming);
            // Strictly greater: on equal rank the earlier registration stays.
            if rank > best.map_or(0, |(_, top)| top) {
                best = Some((route, rank));
            }
        }

        let (route, rank) = best.ok_or(Error::NoMatch)?;
        let handler = self.handlers.get(route.hash()).ok_or(Error::NoMatch)?;
        trace!(method, path, route = route.path(), rank, "route resolved");

        Ok(Match { handler, values: route.bind(&incoming), route })
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterates registered routes, bucket by bucket, in registration order
    /// within each bucket.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values().flatten()
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self { Self::new() }
}
