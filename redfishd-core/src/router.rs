//! The URL-template router.
//!
//! Templates are plain strings with typed holes, like
//! `/redfish/v1/Tasks/<uint>`, parsed once at registration into a trie of
//! path components. Each
//! terminal node holds a verb-indexed table of route entries. Dispatch walks
//! the trie preferring literal edges, backtracking into the typed hole when
//! a literal branch dead-ends.
//!
//! Handler signatures are typed tuples; the tuple's hole-kind descriptor is
//! checked against the template at registration, so a handler can never see
//! parameters of the wrong shape at dispatch time.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tracing::{debug, error};

use crate::async_resp::AsyncResponse;
use crate::error_messages;
use crate::privileges::PrivilegeExpr;
use crate::request::Request;
use crate::verb::Verb;

/// Typed hole kinds in a URL template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// One percent-decoded path segment.
    Str,
    /// A signed integer segment; must parse fully.
    Int,
    /// An unsigned integer segment; must parse fully.
    Uint,
    /// A floating-point segment.
    Double,
    /// The greedy remainder of the path, including `/`.
    Path,
}

impl ParamKind {
    fn token(self) -> &'static str {
        match self {
            ParamKind::Str => "<str>",
            ParamKind::Int => "<int>",
            ParamKind::Uint => "<uint>",
            ParamKind::Double => "<double>",
            ParamKind::Path => "<path>",
        }
    }
}

/// A parameter extracted from the request path.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Uint(u64),
    Double(f64),
    Path(String),
}

/// Parameters extracted by a successful match, in template order.
#[derive(Debug, Default)]
pub struct Params(pub(crate) Vec<ParamValue>);

impl Params {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.0.get(index)
    }

    /// The first `<str>` parameter; the target-user locator for the
    /// `ConfigureSelf` admission rule.
    pub fn first_str(&self) -> Option<&str> {
        self.0.iter().find_map(|p| match p {
            ParamValue::Str(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

/// The value of a `<path>` hole, for typed handler signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tail(pub String);

/// Conversion from an extracted [`ParamValue`] into a handler argument.
pub trait FromParam: Sized + Send {
    const KIND: ParamKind;
    fn from_value(value: ParamValue) -> Option<Self>;
}

impl FromParam for String {
    const KIND: ParamKind = ParamKind::Str;
    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromParam for i64 {
    const KIND: ParamKind = ParamKind::Int;
    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl FromParam for u64 {
    const KIND: ParamKind = ParamKind::Uint;
    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Uint(v) => Some(v),
            _ => None,
        }
    }
}

impl FromParam for f64 {
    const KIND: ParamKind = ParamKind::Double;
    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Double(v) => Some(v),
            _ => None,
        }
    }
}

impl FromParam for Tail {
    const KIND: ParamKind = ParamKind::Path;
    fn from_value(value: ParamValue) -> Option<Self> {
        match value {
            ParamValue::Path(s) => Some(Tail(s)),
            _ => None,
        }
    }
}

/// Descriptor tying a handler's parameter tuple to the template's hole
/// kinds, checked at registration.
pub trait HandlerArgs: Sized + Send {
    const KINDS: &'static [ParamKind];
    fn from_params(params: Params) -> Option<Self>;
}

impl HandlerArgs for () {
    const KINDS: &'static [ParamKind] = &[];
    fn from_params(params: Params) -> Option<Self> {
        params.0.is_empty().then_some(())
    }
}

macro_rules! impl_handler_args {
    ($($name:ident),+) => {
        impl<$($name: FromParam),+> HandlerArgs for ($($name,)+) {
            const KINDS: &'static [ParamKind] = &[$($name::KIND),+];
            fn from_params(params: Params) -> Option<Self> {
                let mut values = params.0.into_iter();
                let out = ($(
                    $name::from_value(values.next()?)?,
                )+);
                if values.next().is_some() {
                    return None;
                }
                Some(out)
            }
        }
    };
}

impl_handler_args!(A);
impl_handler_args!(A, B);
impl_handler_args!(A, B, C);
impl_handler_args!(A, B, C, D);

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered route handler.
pub trait Handler: Send + Sync {
    fn call(&self, req: Request, resp: Arc<AsyncResponse>, params: Params) -> BoxFuture;
}

struct FnHandler<F, A> {
    f: F,
    _args: std::marker::PhantomData<fn(A)>,
}

impl<F, A, Fut> Handler for FnHandler<F, A>
where
    F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync,
    A: HandlerArgs,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, req: Request, resp: Arc<AsyncResponse>, params: Params) -> BoxFuture {
        match A::from_params(params) {
            Some(args) => Box::pin((self.f)(req, resp, args)),
            None => {
                // Registration guarantees the shape; reaching this is a bug.
                error!("extracted parameters do not match the registered handler");
                error_messages::internal_error(&mut resp.res());
                Box::pin(std::future::ready(()))
            }
        }
    }
}

/// One `(template, verb)` registration.
pub struct RouteEntry {
    pub template: Arc<str>,
    pub privileges: PrivilegeExpr,
    pub handler: Arc<dyn Handler>,
    pub upgrade: Option<Arc<dyn Handler>>,
}

/// Registration failures. These are programmer errors; the route builder
/// turns them into panics at startup.
#[derive(Debug)]
pub enum RouterError {
    BadTemplate { template: String, reason: String },
    ConflictingParam { template: String, existing: ParamKind, new: ParamKind },
    DuplicateRoute { template: String, verb: Verb },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::BadTemplate { template, reason } => {
                write!(f, "invalid route template {template:?}: {reason}")
            }
            RouterError::ConflictingParam { template, existing, new } => write!(
                f,
                "template {template:?} puts {} where another route has {}",
                new.token(),
                existing.token()
            ),
            RouterError::DuplicateRoute { template, verb } => {
                write!(f, "route already registered for ({template:?}, {verb})")
            }
        }
    }
}

impl std::error::Error for RouterError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(ParamKind),
}

fn parse_template(template: &str) -> Result<Vec<Segment>, RouterError> {
    let bad = |reason: &str| RouterError::BadTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };
    if !template.starts_with('/') {
        return Err(bad("template must start with '/'"));
    }
    let trimmed = template.trim_end_matches('/');
    let mut segments = Vec::new();
    for part in trimmed.split('/').skip(1) {
        let segment = match part {
            "" => return Err(bad("empty path segment")),
            "<str>" => Segment::Param(ParamKind::Str),
            "<int>" => Segment::Param(ParamKind::Int),
            "<uint>" => Segment::Param(ParamKind::Uint),
            "<double>" => Segment::Param(ParamKind::Double),
            "<path>" => Segment::Param(ParamKind::Path),
            literal if literal.contains('<') || literal.contains('>') => {
                return Err(bad("unknown hole kind"));
            }
            literal => Segment::Literal(literal.to_string()),
        };
        if let Some(Segment::Param(ParamKind::Path)) = segments.last() {
            return Err(bad("<path> must be the final segment"));
        }
        segments.push(segment);
    }
    Ok(segments)
}

struct Node {
    literals: Vec<(String, usize)>,
    param: Option<(ParamKind, usize)>,
    verbs: [Option<RouteEntry>; Verb::COUNT],
    template: Option<Arc<str>>,
}

impl Node {
    fn new() -> Node {
        Node {
            literals: Vec::new(),
            param: None,
            verbs: std::array::from_fn(|_| None),
            template: None,
        }
    }

    fn has_routes(&self) -> bool {
        self.verbs.iter().any(Option::is_some)
    }

    fn allowed(&self) -> Vec<Verb> {
        Verb::ALL
            .into_iter()
            .filter(|v| self.verbs[v.index()].is_some())
            .collect()
    }
}

/// Outcome of resolving a path and verb against the route table.
pub enum Resolution<'r> {
    Found { entry: &'r RouteEntry, params: Params },
    MethodNotAllowed { allow: Vec<Verb> },
    NotFound,
}

/// The trie of registered routes.
pub struct Router {
    nodes: Vec<Node>,
    validated: bool,
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

impl Router {
    pub fn new() -> Router {
        Router {
            nodes: vec![Node::new()],
            validated: false,
        }
    }

    /// Start registering routes for a template. Panics on a malformed
    /// template; registration runs at startup and must fail loudly.
    pub fn route(&mut self, template: &str) -> RouteBuilder<'_> {
        let segments = match parse_template(template) {
            Ok(segments) => segments,
            Err(e) => panic!("{e}"),
        };
        let kinds = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(kind) => Some(*kind),
                Segment::Literal(_) => None,
            })
            .collect();
        RouteBuilder {
            router: self,
            template: template.trim_end_matches('/').to_string(),
            segments,
            kinds,
            privileges: PrivilegeExpr::default(),
            last_verb: None,
        }
    }

    fn insert(
        &mut self,
        segments: &[Segment],
        verb: Verb,
        entry: RouteEntry,
    ) -> Result<(), RouterError> {
        let template = entry.template.clone();
        let mut node = 0;
        for segment in segments {
            node = match segment {
                Segment::Literal(lit) => {
                    let existing = self.nodes[node]
                        .literals
                        .iter()
                        .find(|(l, _)| l == lit)
                        .map(|&(_, child)| child);
                    match existing {
                        Some(child) => child,
                        None => {
                            let child = self.nodes.len();
                            self.nodes.push(Node::new());
                            self.nodes[node].literals.push((lit.clone(), child));
                            child
                        }
                    }
                }
                Segment::Param(kind) => match self.nodes[node].param {
                    Some((existing, child)) => {
                        if existing != *kind {
                            return Err(RouterError::ConflictingParam {
                                template: template.to_string(),
                                existing,
                                new: *kind,
                            });
                        }
                        child
                    }
                    None => {
                        let child = self.nodes.len();
                        self.nodes.push(Node::new());
                        self.nodes[node].param = Some((*kind, child));
                        child
                    }
                },
            };
        }
        if self.nodes[node].verbs[verb.index()].is_some() {
            return Err(RouterError::DuplicateRoute {
                template: template.to_string(),
                verb,
            });
        }
        self.nodes[node].verbs[verb.index()] = Some(entry);
        if self.nodes[node].template.is_none() {
            self.nodes[node].template = Some(template);
        }
        Ok(())
    }

    fn attach_upgrade(
        &mut self,
        segments: &[Segment],
        verb: Verb,
        upgrade: Arc<dyn Handler>,
    ) -> bool {
        let Some(node) = self.find_node(segments) else {
            return false;
        };
        match &mut self.nodes[node].verbs[verb.index()] {
            Some(entry) => {
                entry.upgrade = Some(upgrade);
                true
            }
            None => false,
        }
    }

    fn find_node(&self, segments: &[Segment]) -> Option<usize> {
        let mut node = 0;
        for segment in segments {
            node = match segment {
                Segment::Literal(lit) => self.nodes[node]
                    .literals
                    .iter()
                    .find(|(l, _)| l == lit)
                    .map(|&(_, child)| child)?,
                Segment::Param(kind) => match self.nodes[node].param {
                    Some((k, child)) if k == *kind => child,
                    _ => return None,
                },
            };
        }
        Some(node)
    }

    /// Finalise the table. Must run once after all registrations; dispatch
    /// before validation is a bug.
    pub fn validate(&mut self) {
        let count = self
            .nodes
            .iter()
            .filter(|n| n.has_routes())
            .flat_map(|n| n.allowed())
            .count();
        debug!(routes = count, "route table validated");
        self.validated = true;
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Resolve a request path and verb.
    pub fn resolve(&self, path: &str, verb: Verb) -> Resolution<'_> {
        debug_assert!(self.validated, "dispatch before validate()");
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        let mut segments = Vec::new();
        for raw in trimmed.split('/').filter(|s| !s.is_empty()) {
            match percent_decode_str(raw).decode_utf8() {
                Ok(decoded) => segments.push(decoded.into_owned()),
                Err(_) => return Resolution::NotFound,
            }
        }
        let mut params = Vec::new();
        match self.walk(0, &segments, &mut params) {
            Some(node) => match &self.nodes[node].verbs[verb.index()] {
                Some(entry) => Resolution::Found {
                    entry,
                    params: Params(params),
                },
                None => Resolution::MethodNotAllowed {
                    allow: self.nodes[node].allowed(),
                },
            },
            None => Resolution::NotFound,
        }
    }

    fn walk(&self, node: usize, segments: &[String], params: &mut Vec<ParamValue>) -> Option<usize> {
        let Some((head, rest)) = segments.split_first() else {
            return self.nodes[node].has_routes().then_some(node);
        };

        // Literal edges win over the typed hole.
        let literal = self.nodes[node]
            .literals
            .iter()
            .find(|(l, _)| l == head)
            .map(|&(_, child)| child);
        if let Some(child) = literal {
            if let Some(found) = self.walk(child, rest, params) {
                return Some(found);
            }
        }

        let (kind, child) = self.nodes[node].param?;
        let value = match kind {
            ParamKind::Str => Some(ParamValue::Str(head.clone())),
            ParamKind::Int => head.parse().ok().map(ParamValue::Int),
            ParamKind::Uint => head.parse().ok().map(ParamValue::Uint),
            ParamKind::Double => head.parse().ok().map(ParamValue::Double),
            ParamKind::Path => Some(ParamValue::Path(segments.join("/"))),
        }?;
        let greedy = matches!(kind, ParamKind::Path);
        params.push(value);
        let rest: &[String] = if greedy { &[] } else { rest };
        match self.walk(child, rest, params) {
            Some(found) => Some(found),
            None => {
                params.pop();
                None
            }
        }
    }

    /// Registered template strings, optionally filtered by prefix.
    pub fn routes(&self, prefix: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.has_routes())
            .filter_map(|n| n.template.as_deref())
            .filter(|t| t.starts_with(prefix))
            .map(|t| t.to_string())
            .collect()
    }
}

/// Builder for installing verb handlers on one template.
pub struct RouteBuilder<'r> {
    router: &'r mut Router,
    template: String,
    segments: Vec<Segment>,
    kinds: Vec<ParamKind>,
    privileges: PrivilegeExpr,
    last_verb: Option<Verb>,
}

impl<'r> RouteBuilder<'r> {
    /// Set the required-privilege expression for handlers registered after
    /// this call.
    pub fn privileges(mut self, expr: PrivilegeExpr) -> Self {
        self.privileges = expr;
        self
    }

    /// Register `handler` for `verb`. The handler's parameter tuple must
    /// match the template's holes; a mismatch fails loudly at startup.
    pub fn on<F, A, Fut>(mut self, verb: Verb, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        assert!(
            A::KINDS == self.kinds.as_slice(),
            "handler parameters {:?} do not match template {:?} holes {:?}",
            A::KINDS,
            self.template,
            self.kinds,
        );
        let entry = RouteEntry {
            template: Arc::from(self.template.as_str()),
            privileges: self.privileges.clone(),
            handler: Arc::new(FnHandler {
                f: handler,
                _args: std::marker::PhantomData::<fn(A)>,
            }),
            upgrade: None,
        };
        if let Err(e) = self.router.insert(&self.segments, verb, entry) {
            panic!("{e}");
        }
        self.last_verb = Some(verb);
        self
    }

    pub fn get<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(Verb::Get, handler)
    }

    pub fn head<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(Verb::Head, handler)
    }

    pub fn post<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(Verb::Post, handler)
    }

    pub fn patch<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(Verb::Patch, handler)
    }

    pub fn put<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(Verb::Put, handler)
    }

    pub fn delete<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on(Verb::Delete, handler)
    }

    /// Attach an upgrade handler to the most recently registered verb.
    /// Invoked instead of the plain handler when the request is a protocol
    /// upgrade.
    pub fn upgrade<F, A, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Arc<AsyncResponse>, A) -> Fut + Send + Sync + 'static,
        A: HandlerArgs + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        assert!(
            A::KINDS == self.kinds.as_slice(),
            "upgrade handler parameters {:?} do not match template {:?} holes {:?}",
            A::KINDS,
            self.template,
            self.kinds,
        );
        let verb = self
            .last_verb
            .unwrap_or_else(|| panic!("register a plain handler before the upgrade handler on {:?}", self.template));
        let attached = self.router.attach_upgrade(
            &self.segments,
            verb,
            Arc::new(FnHandler {
                f: handler,
                _args: std::marker::PhantomData::<fn(A)>,
            }),
        );
        assert!(attached, "no route entry to attach the upgrade handler to");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privileges::Privilege;
    use bytes::Bytes;
    use http::HeaderMap;
    use serde_json::Value;

    fn request(verb: Verb, target: &str) -> Request {
        Request::new(verb, target.parse().unwrap(), HeaderMap::new(), Bytes::new(), None)
            .unwrap()
    }

    fn noop(mut router: Router, template: &str, verb: Verb) -> Router {
        {
            let builder = router.route(template).privileges(PrivilegeExpr::open());
            builder.on(verb, |_req, _resp, (): ()| async {});
        }
        router
    }

    #[test]
    fn empty_router_has_no_routes() {
        let mut router = Router::new();
        router.validate();
        assert!(router.routes("").is_empty());
    }

    #[test]
    fn registered_templates_are_enumerable() {
        let mut router = Router::new();
        for template in ["/foo", "/bar", "/baz", "/boo", "/moo"] {
            router = noop(router, template, Verb::Get);
        }
        router.validate();
        let mut routes = router.routes("");
        routes.sort();
        assert_eq!(routes, ["/bar", "/baz", "/boo", "/foo", "/moo"]);
        assert_eq!(router.routes("/b").len(), 3);
    }

    #[test]
    fn literal_edges_beat_typed_holes_with_backtracking() {
        let mut router = Router::new();
        router
            .route("/a/<str>/c")
            .privileges(PrivilegeExpr::open())
            .get(|_req, resp, (s,): (String,)| async move {
                resp.res().json_value = Value::String(format!("hole:{s}"));
            });
        router
            .route("/a/b/d")
            .privileges(PrivilegeExpr::open())
            .get(|_req, resp, (): ()| async move {
                resp.res().json_value = Value::String("literal".to_string());
            });
        router.validate();

        // /a/b/c: the literal edge b has no child c, so the walk backtracks
        // into the <str> hole.
        match router.resolve("/a/b/c", Verb::Get) {
            Resolution::Found { params, .. } => {
                assert_eq!(params.get(0), Some(&ParamValue::Str("b".to_string())));
            }
            _ => panic!("expected a match through the hole"),
        }
        match router.resolve("/a/b/d", Verb::Get) {
            Resolution::Found { params, .. } => assert!(params.is_empty()),
            _ => panic!("expected the literal route"),
        }
    }

    #[test]
    fn typed_holes_must_parse_fully() {
        let mut router = Router::new();
        router
            .route("/tasks/<uint>")
            .privileges(PrivilegeExpr::open())
            .get(|_req, _resp, (_id,): (u64,)| async {});
        router.validate();

        assert!(matches!(
            router.resolve("/tasks/42", Verb::Get),
            Resolution::Found { .. }
        ));
        assert!(matches!(
            router.resolve("/tasks/42x", Verb::Get),
            Resolution::NotFound
        ));
        assert!(matches!(
            router.resolve("/tasks/-1", Verb::Get),
            Resolution::NotFound
        ));
    }

    #[test]
    fn path_hole_is_greedy() {
        let mut router = Router::new();
        router
            .route("/files/<path>")
            .privileges(PrivilegeExpr::open())
            .get(|_req, _resp, (_tail,): (Tail,)| async {});
        router.validate();

        match router.resolve("/files/a/b/c", Verb::Get) {
            Resolution::Found { params, .. } => {
                assert_eq!(
                    params.get(0),
                    Some(&ParamValue::Path("a/b/c".to_string()))
                );
            }
            _ => panic!("expected greedy match"),
        }
        assert!(matches!(
            router.resolve("/files", Verb::Get),
            Resolution::NotFound
        ));
    }

    #[test]
    fn extracted_params_equal_path_substrings() {
        let mut router = Router::new();
        router
            .route("/r/<str>/t/<uint>")
            .privileges(PrivilegeExpr::open())
            .get(|_req, _resp, (_s, _n): (String, u64)| async {});
        router.validate();

        match router.resolve("/r/alpha%20beta/t/7", Verb::Get) {
            Resolution::Found { params, .. } => {
                assert_eq!(
                    params.get(0),
                    Some(&ParamValue::Str("alpha beta".to_string()))
                );
                assert_eq!(params.get(1), Some(&ParamValue::Uint(7)));
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn verb_mismatch_reports_allowed_set() {
        let mut router = Router::new();
        router
            .route("/sessions")
            .privileges(PrivilegeExpr::require(&[Privilege::Login]))
            .get(|_req, _resp, (): ()| async {})
            .post(|_req, _resp, (): ()| async {});
        router.validate();

        match router.resolve("/sessions", Verb::Patch) {
            Resolution::MethodNotAllowed { allow } => {
                assert_eq!(allow, vec![Verb::Get, Verb::Post]);
            }
            _ => panic!("expected 405"),
        }
    }

    #[test]
    fn unmatched_paths_are_not_found() {
        let mut router = noop(Router::new(), "/known", Verb::Get);
        router.validate();
        assert!(matches!(
            router.resolve("/unknown", Verb::Get),
            Resolution::NotFound
        ));
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let mut router = noop(Router::new(), "/redfish/v1/", Verb::Get);
        router.validate();
        assert!(matches!(
            router.resolve("/redfish/v1", Verb::Get),
            Resolution::Found { .. }
        ));
        assert!(matches!(
            router.resolve("/redfish/v1/", Verb::Get),
            Resolution::Found { .. }
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_fails_loudly() {
        let router = noop(Router::new(), "/dup", Verb::Get);
        noop(router, "/dup", Verb::Get);
    }

    #[test]
    #[should_panic(expected = "where another route has")]
    fn conflicting_hole_kinds_fail_loudly() {
        let router = {
            let mut r = Router::new();
            r.route("/x/<str>")
                .privileges(PrivilegeExpr::open())
                .get(|_req, _resp, (_s,): (String,)| async {});
            r
        };
        let mut router = router;
        router
            .route("/x/<uint>")
            .privileges(PrivilegeExpr::open())
            .get(|_req, _resp, (_n,): (u64,)| async {});
    }

    #[test]
    #[should_panic(expected = "do not match template")]
    fn handler_arity_is_checked_at_registration() {
        let mut router = Router::new();
        router
            .route("/x/<str>")
            .privileges(PrivilegeExpr::open())
            .get(|_req, _resp, (): ()| async {});
    }

    #[tokio::test]
    async fn handler_receives_typed_params() {
        let mut router = Router::new();
        router
            .route("/tasks/<uint>")
            .privileges(PrivilegeExpr::open())
            .get(|_req, resp, (id,): (u64,)| async move {
                resp.res().json_value = serde_json::json!({ "Id": id });
            });
        router.validate();

        let (tx, rx) = std::sync::mpsc::channel();
        let resp = AsyncResponse::new(move |res| {
            tx.send(res.json_value.clone()).unwrap();
        });
        match router.resolve("/tasks/9", Verb::Get) {
            Resolution::Found { entry, params } => {
                entry
                    .handler
                    .call(request(Verb::Get, "/tasks/9"), resp, params)
                    .await;
            }
            _ => panic!("expected match"),
        }
        let value = rx.recv().unwrap();
        assert_eq!(value["Id"], 9);
    }
}
