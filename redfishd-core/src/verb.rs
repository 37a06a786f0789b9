//! The closed set of HTTP verbs the router dispatches on.

use std::fmt;

/// HTTP verbs a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Head,
    Post,
    Patch,
    Put,
    Delete,
    Options,
}

impl Verb {
    pub const COUNT: usize = 7;

    pub const ALL: [Verb; Verb::COUNT] = [
        Verb::Get,
        Verb::Head,
        Verb::Post,
        Verb::Patch,
        Verb::Put,
        Verb::Delete,
        Verb::Options,
    ];

    /// Stable index into per-node verb tables.
    pub fn index(self) -> usize {
        match self {
            Verb::Get => 0,
            Verb::Head => 1,
            Verb::Post => 2,
            Verb::Patch => 3,
            Verb::Put => 4,
            Verb::Delete => 5,
            Verb::Options => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
        }
    }

    /// Map an HTTP method onto the verb set. Anything outside the closed
    /// vocabulary is rejected.
    pub fn from_method(method: &http::Method) -> Option<Verb> {
        match *method {
            http::Method::GET => Some(Verb::Get),
            http::Method::HEAD => Some(Verb::Head),
            http::Method::POST => Some(Verb::Post),
            http::Method::PATCH => Some(Verb::Patch),
            http::Method::PUT => Some(Verb::Put),
            http::Method::DELETE => Some(Verb::Delete),
            http::Method::OPTIONS => Some(Verb::Options),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_are_unique_and_dense() {
        let mut seen = [false; Verb::COUNT];
        for verb in Verb::ALL {
            assert!(!seen[verb.index()]);
            seen[verb.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn unknown_methods_are_rejected() {
        assert_eq!(Verb::from_method(&http::Method::TRACE), None);
        assert_eq!(Verb::from_method(&http::Method::GET), Some(Verb::Get));
    }
}
