//! Routing stack and dispatch.
//!
//! # Responsibilities
//! - Keep an ordered stack of layers (handlers and nested routers)
//! - Dispatch a request through the stack, first match wins
//! - Append and remove layers by identity while traffic is flowing
//! - Look layers up by their [`LayerId`]
//!
//! # Design Decisions
//! - `Router` is a handle: clones share one stack
//! - Copy-on-write stack behind `ArcSwap`, so dispatch never takes a lock and
//!   in-flight requests keep the snapshot they started with
//! - Appends only ever push to the end, so a freshly mounted layer is always last
//! - A nested router that matches nothing hands the request back and the
//!   parent keeps scanning its own stack
//! - A route whose path matches but whose method does not is a miss too, so
//!   a later layer for the same path still gets the request

use std::fmt;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use futures_util::future::BoxFuture;
use tower::ServiceExt;
use uuid::Uuid;

use crate::routing::matcher::{HostMatcher, Matcher, PathPrefixMatcher, RouteMatcher};

/// Identity of a single entry in a routing stack.
///
/// Generated fresh for every appended layer and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(Uuid);

impl LayerId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What a layer delegates to once its matcher accepts a request.
#[derive(Clone)]
pub enum Endpoint {
    /// Terminal handler for a route.
    Handler(MethodRouter),
    /// Nested routing stack (a mounted service).
    Router(Router),
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Handler(_) => f.write_str("Handler"),
            Endpoint::Router(router) => f.debug_tuple("Router").field(router).finish(),
        }
    }
}

/// One entry of a routing stack.
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    matcher: Box<dyn Matcher>,
    endpoint: Endpoint,
}

impl Layer {
    fn new(matcher: Box<dyn Matcher>, endpoint: Endpoint) -> Self {
        Self {
            id: LayerId::generate(),
            matcher,
            endpoint,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn matcher(&self) -> &dyn Matcher {
        self.matcher.as_ref()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn handle(&self, mut req: Request<Body>) -> Dispatch {
        if !self.matcher.matches(&req) {
            return Dispatch::Unmatched(req);
        }

        match &self.endpoint {
            Endpoint::Handler(handler) => match handler.clone().oneshot(req).await {
                Ok(mut response) => match response.extensions_mut().remove::<MethodMiss>() {
                    Some(miss) => match miss.take() {
                        Some(req) => Dispatch::Unmatched(req),
                        None => Dispatch::Handled(response),
                    },
                    None => Dispatch::Handled(response),
                },
                Err(never) => match never {},
            },
            Endpoint::Router(router) => {
                let original = match self.matcher.downstream_path(req.uri().path()) {
                    Some(path) => {
                        let original = req.uri().clone();
                        *req.uri_mut() = with_path(&original, &path);
                        Some(original)
                    }
                    None => None,
                };

                match router.dispatch(req).await {
                    Dispatch::Unmatched(mut req) => {
                        if let Some(original) = original {
                            *req.uri_mut() = original;
                        }
                        Dispatch::Unmatched(req)
                    }
                    handled => handled,
                }
            }
        }
    }
}

/// Carries a request the route's method router did not accept back out of
/// the handler, via a response extension.
#[derive(Clone)]
struct MethodMiss(Arc<Mutex<Option<Request<Body>>>>);

impl MethodMiss {
    fn take(&self) -> Option<Request<Body>> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Method-router fallback: hand the request back instead of answering 405.
async fn method_miss(req: Request<Body>) -> Response {
    let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
    response
        .extensions_mut()
        .insert(MethodMiss(Arc::new(Mutex::new(Some(req)))));
    response
}

/// Outcome of running a request through a routing stack.
#[derive(Debug)]
pub enum Dispatch {
    Handled(Response),
    /// No layer took the request; it is returned unchanged.
    Unmatched(Request<Body>),
}

/// Replace the path of `uri`, keeping its query string.
fn with_path(uri: &Uri, path: &str) -> Uri {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    match PathAndQuery::try_from(path_and_query) {
        Ok(pq) => parts.path_and_query = Some(pq),
        Err(_) => return uri.clone(),
    }
    Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
}

/// An ordered, shareable routing stack.
#[derive(Clone)]
pub struct Router {
    stack: Arc<ArcSwap<Vec<Arc<Layer>>>>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            stack: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Register a handler for an exact path.
    ///
    /// Methods `handler` does not serve fall through to later layers; any
    /// fallback already set on `handler` is replaced.
    pub fn route(&self, path: &str, handler: MethodRouter) -> &Self {
        self.push(Layer::new(
            Box::new(RouteMatcher::new(path)),
            Endpoint::Handler(handler.fallback(method_miss)),
        ));
        self
    }

    /// Mount `router` under a path prefix. Returns the id of the new layer.
    pub fn mount_at_path(&self, prefix: &str, router: &Router) -> LayerId {
        self.push(Layer::new(
            Box::new(PathPrefixMatcher::new(prefix)),
            Endpoint::Router(router.clone()),
        ))
    }

    /// Mount `router` behind a virtual host. Returns the id of the new layer.
    pub fn mount_at_host(&self, host: &str, router: &Router) -> LayerId {
        self.push(Layer::new(
            Box::new(HostMatcher::new(host)),
            Endpoint::Router(router.clone()),
        ))
    }

    fn push(&self, layer: Layer) -> LayerId {
        let layer = Arc::new(layer);
        let id = layer.id();
        self.stack.rcu(|stack| {
            let mut next = Vec::clone(stack);
            next.push(layer.clone());
            next
        });
        id
    }

    /// Remove the layer with the given id, keeping every other entry in order.
    pub fn remove(&self, id: LayerId) -> Option<Arc<Layer>> {
        let mut removed = None;
        self.stack.rcu(|stack| {
            removed = stack.iter().find(|layer| layer.id() == id).cloned();
            stack
                .iter()
                .filter(|layer| layer.id() != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        removed
    }

    /// Look up a layer by id.
    pub fn layer(&self, id: LayerId) -> Option<Arc<Layer>> {
        self.stack.load().iter().find(|layer| layer.id() == id).cloned()
    }

    /// The most recently appended layer.
    pub fn last(&self) -> Option<Arc<Layer>> {
        self.stack.load().last().cloned()
    }

    /// Ids of every layer, in evaluation order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.stack.load().iter().map(|layer| layer.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.stack.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.load().is_empty()
    }

    /// True if both handles share the same stack.
    pub fn ptr_eq(&self, other: &Router) -> bool {
        Arc::ptr_eq(&self.stack, &other.stack)
    }

    /// True if `other` is this router or is nested anywhere below it.
    pub fn reaches(&self, other: &Router) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.stack.load().iter().any(|layer| match layer.endpoint() {
            Endpoint::Router(nested) => nested.reaches(other),
            Endpoint::Handler(_) => false,
        })
    }

    /// Run a request through the stack.
    pub fn dispatch(&self, req: Request<Body>) -> BoxFuture<'static, Dispatch> {
        let stack = self.stack.load_full();
        Box::pin(async move {
            let mut req = req;
            for layer in stack.iter() {
                match layer.handle(req).await {
                    Dispatch::Unmatched(unmatched) => req = unmatched,
                    handled => return handled,
                }
            }
            Dispatch::Unmatched(req)
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("layers", &self.stack.load().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_of(dispatch: Dispatch) -> Option<String> {
        match dispatch {
            Dispatch::Handled(response) => {
                let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                Some(String::from_utf8(bytes.to_vec()).unwrap())
            }
            Dispatch::Unmatched(_) => None,
        }
    }

    #[tokio::test]
    async fn test_routes_dispatch_in_order() {
        let router = Router::new();
        router
            .route("/", get(|| async { "root" }))
            .route("/hi", get(|| async { "hi" }))
            .route("/hi", get(|| async { "shadowed" }));

        assert_eq!(body_of(router.dispatch(request("/")).await).await.as_deref(), Some("root"));
        assert_eq!(body_of(router.dispatch(request("/hi")).await).await.as_deref(), Some("hi"));
        assert_eq!(body_of(router.dispatch(request("/nope")).await).await, None);
    }

    fn request_with(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_wrong_method_falls_through() {
        let router = Router::new();
        router.route("/", get(|| async { "root" }));

        match router.dispatch(request_with("POST", "/?keep=1")).await {
            Dispatch::Unmatched(req) => {
                assert_eq!(req.method(), "POST");
                assert_eq!(req.uri(), "/?keep=1");
            }
            Dispatch::Handled(_) => panic!("GET-only route must not take a POST"),
        }
    }

    #[tokio::test]
    async fn test_same_path_split_across_layers_by_method() {
        let router = Router::new();
        router
            .route("/x", get(|| async { "get x" }))
            .route("/x", post(|| async { "post x" }));

        assert_eq!(
            body_of(router.dispatch(request_with("GET", "/x")).await).await.as_deref(),
            Some("get x")
        );
        assert_eq!(
            body_of(router.dispatch(request_with("POST", "/x")).await).await.as_deref(),
            Some("post x")
        );
        assert_eq!(body_of(router.dispatch(request_with("PUT", "/x")).await).await, None);
    }

    #[tokio::test]
    async fn test_mounted_router_does_not_shadow_later_route() {
        let inner = Router::new();
        inner.route("/", get(|| async { "service root" }));

        let outer = Router::new();
        outer.mount_at_path("/test", &inner);
        outer.route("/test", post(|| async { "host post" }));

        assert_eq!(
            body_of(outer.dispatch(request_with("POST", "/test")).await).await.as_deref(),
            Some("host post")
        );
        assert_eq!(
            body_of(outer.dispatch(request_with("GET", "/test")).await).await.as_deref(),
            Some("service root")
        );
    }

    #[tokio::test]
    async fn test_nested_prefix_strips_and_restores_path() {
        let inner = Router::new();
        inner.route("/hi", get(|| async { "inner hi" }));

        let outer = Router::new();
        outer.mount_at_path("/svc", &inner);
        outer.route("/svc/other", get(|| async { "outer other" }));

        assert_eq!(
            body_of(outer.dispatch(request("/svc/hi?x=1")).await).await.as_deref(),
            Some("inner hi")
        );
        // Inner router misses, the original path reaches the next layer
        assert_eq!(
            body_of(outer.dispatch(request("/svc/other")).await).await.as_deref(),
            Some("outer other")
        );

        match outer.dispatch(request("/svc/missing?q=2")).await {
            Dispatch::Unmatched(req) => assert_eq!(req.uri(), "/svc/missing?q=2"),
            Dispatch::Handled(_) => panic!("nothing should match"),
        }
    }

    #[tokio::test]
    async fn test_host_layer() {
        let inner = Router::new();
        inner.route("/", get(|| async { "vhost" }));

        let outer = Router::new();
        outer.mount_at_host("api.localhost", &inner);

        let req = Request::builder()
            .uri("/")
            .header("Host", "api.localhost:8080")
            .body(Body::empty())
            .unwrap();
        assert_eq!(body_of(outer.dispatch(req).await).await.as_deref(), Some("vhost"));
        assert_eq!(body_of(outer.dispatch(request("/")).await).await, None);
    }

    #[tokio::test]
    async fn test_remove_by_identity() {
        let inner = Router::new();
        inner.route("/", get(|| async { "inner" }));

        let outer = Router::new();
        outer.route("/keep", get(|| async { "keep" }));
        let id = outer.mount_at_path("/inner", &inner);

        assert_eq!(outer.len(), 2);
        assert_eq!(outer.last().map(|l| l.id()), Some(id));
        assert!(outer.layer(id).is_some());

        let removed = outer.remove(id).expect("layer should be removed");
        assert_eq!(removed.id(), id);
        assert_eq!(outer.len(), 1);
        assert!(outer.layer(id).is_none());
        assert!(outer.remove(id).is_none());

        assert_eq!(body_of(outer.dispatch(request("/inner")).await).await, None);
        assert_eq!(body_of(outer.dispatch(request("/keep")).await).await.as_deref(), Some("keep"));
    }

    #[test]
    fn test_layer_ids_are_unique() {
        let inner = Router::new();
        let outer = Router::new();
        let a = outer.mount_at_path("/a", &inner);
        let b = outer.mount_at_path("/a", &inner);
        assert_ne!(a, b);
        assert_eq!(outer.layer_ids(), vec![a, b]);
    }

    #[test]
    fn test_reaches() {
        let a = Router::new();
        let b = Router::new();
        let c = Router::new();
        b.mount_at_path("/a", &a);
        c.mount_at_host("b.localhost", &b);

        assert!(c.reaches(&a));
        assert!(c.reaches(&c));
        assert!(!a.reaches(&c));
        assert!(a.clone().ptr_eq(&a));
    }
}
