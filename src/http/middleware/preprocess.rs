//! Operator middlewares, run in configuration order before anything else.

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

use super::{BoxHandler, Flow, PreMiddleware};

pub fn wrap(inner: BoxHandler, middlewares: Arc<[Arc<dyn PreMiddleware>]>) -> BoxHandler {
    if middlewares.is_empty() {
        return inner;
    }
    Arc::new(move |request: Request<Body>| -> BoxFuture<'static, Response> {
        let inner = Arc::clone(&inner);
        let middlewares = Arc::clone(&middlewares);
        Box::pin(async move {
            let mut request = request;
            for middleware in middlewares.iter() {
                request = match middleware.process(request).await {
                    Flow::Continue(request) => request,
                    Flow::Respond(response) => return response,
                };
            }
            inner(request).await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::VhostConfig;
    use crate::http::middleware::test_support::{get, parts};
    use crate::http::middleware::{compose, PIPELINE};
    use crate::vhost::context::VhostContext;
    use axum::http::{HeaderValue, StatusCode};
    use std::sync::Mutex;

    /// Records the path it saw and tags the request.
    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl PreMiddleware for Recorder {
        fn process<'a>(&'a self, mut request: Request<Body>) -> BoxFuture<'a, Flow> {
            Box::pin(async move {
                self.seen
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", self.name, request.uri().path()));
                request
                    .headers_mut()
                    .append("x-seen-by", HeaderValue::from_static(self.name));
                Flow::Continue(request)
            })
        }
    }

    struct Blocker;

    impl PreMiddleware for Blocker {
        fn process<'a>(&'a self, request: Request<Body>) -> BoxFuture<'a, Flow> {
            Box::pin(async move {
                if request.uri().path().starts_with("/files/blocked") {
                    let mut response = Response::new(Body::empty());
                    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                    Flow::Respond(response)
                } else {
                    Flow::Continue(request)
                }
            })
        }
    }

    fn vhost() -> VhostContext {
        VhostContext::from_config(&VhostConfig {
            prefix_urls: vec!["/files".into()],
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_middlewares_run_in_order_on_original_path() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pre: Vec<Arc<dyn PreMiddleware>> = vec![
            Arc::new(Recorder {
                name: "first",
                seen: Arc::clone(&seen),
            }),
            Arc::new(Recorder {
                name: "second",
                seen: Arc::clone(&seen),
            }),
        ];
        let handler = compose(&PIPELINE, &parts(vhost(), pre));

        let response = handler(get("/files/doc.txt")).await;
        assert_eq!(response.headers()["x-url-path"], "/doc.txt");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:/files/doc.txt".to_string(), "second:/files/doc.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_stages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pre: Vec<Arc<dyn PreMiddleware>> = vec![
            Arc::new(Blocker),
            Arc::new(Recorder {
                name: "after",
                seen: Arc::clone(&seen),
            }),
        ];
        let handler = compose(&PIPELINE, &parts(vhost(), pre));

        let response = handler(get("/files/blocked")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(!response.headers().contains_key("x-url-path"));
        assert!(seen.lock().unwrap().is_empty());
    }
}
