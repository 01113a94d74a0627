//! Core filter trait and chain types.
//!
//! Every stage of the request lifecycle implements [`Filter`]. Filters run
//! in a fixed order; a filter receives the shared transaction context, the
//! request, and a [`Next`] callback that invokes the rest of the chain.
//!
//! Filters return `Result`; a failure anywhere in the chain is classified
//! and enveloped by the failure responder before it reaches the boundary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use keel_core::{KeelError, TransactionContext};

use crate::types::{Request, Response};

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core filter trait.
///
/// # Invariants
///
/// - A filter MUST call `next.run()` exactly once unless it short-circuits
/// - A filter MUST NOT swallow a failure it cannot classify
pub trait Filter: Send + Sync + 'static {
    /// The unique name of this filter stage.
    fn name(&self) -> &'static str;

    /// Processes the request through this filter.
    fn handle<'a>(
        &'a self,
        ctx: &'a Arc<TransactionContext>,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, KeelError>>;
}

/// Callback to invoke the rest of the chain.
///
/// Consumes itself on use, so it can only be invoked once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        filter: &'a dyn Filter,
        next: Box<Next<'a>>,
    },
    Handler(
        Box<
            dyn FnOnce(&Arc<TransactionContext>, Request) -> BoxFuture<'static, Result<Response, KeelError>>
                + Send
                + 'a,
        >,
    ),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given filter.
    pub(crate) fn new(filter: &'a dyn Filter, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                filter,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&Arc<TransactionContext>, Request) -> BoxFuture<'static, Result<Response, KeelError>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next filter or the handler.
    pub async fn run(
        self,
        ctx: &Arc<TransactionContext>,
        request: Request,
    ) -> Result<Response, KeelError> {
        match self.inner {
            NextInner::Chain { filter, next } => filter.handle(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A filter created from an async function.
pub struct FnFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnFilter<F> {
    /// Creates a function-based filter.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Filter for FnFilter<F>
where
    F: for<'a> Fn(&'a Arc<TransactionContext>, Request, Next<'a>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, KeelError>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a Arc<TransactionContext>,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<Response, KeelError>> {
        Box::pin((self.func)(ctx, request, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{empty_body, full_body};
    use keel_core::TransactionId;

    fn test_ctx() -> Arc<TransactionContext> {
        Arc::new(TransactionContext::new(
            TransactionId::new(),
            http::Method::GET,
            "/test",
        ))
    }

    struct MarkerFilter {
        name: &'static str,
    }

    impl Filter for MarkerFilter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle<'a>(
            &'a self,
            ctx: &'a Arc<TransactionContext>,
            mut request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Result<Response, KeelError>> {
            Box::pin(async move {
                request
                    .headers_mut()
                    .append("x-visited", self.name.parse().unwrap());
                next.run(ctx, request).await
            })
        }
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let first = MarkerFilter { name: "first" };
        let second = MarkerFilter { name: "second" };

        let handler = Next::handler(|_ctx, req| {
            Box::pin(async move {
                let visited: Vec<_> = req
                    .headers()
                    .get_all("x-visited")
                    .iter()
                    .map(|v| v.to_str().unwrap().to_string())
                    .collect();
                assert_eq!(visited, vec!["first", "second"]);
                Ok(http::Response::new(full_body("ok")))
            })
        });

        let chain = Next::new(&first, Next::new(&second, handler));
        let request = http::Request::new(empty_body());
        let response = chain.run(&test_ctx(), request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    fn reject(
        _ctx: &Arc<TransactionContext>,
        _req: Request,
        _next: Next<'_>,
    ) -> BoxFuture<'static, Result<Response, KeelError>> {
        Box::pin(async { Err(KeelError::malformed("unreadable payload")) })
    }

    #[tokio::test]
    async fn test_fn_filter_short_circuits() {
        let reject = FnFilter::new("reject", reject);

        let handler = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(http::Response::new(empty_body())) })
        });

        let chain = Next::new(&reject, handler);
        let result = chain.run(&test_ctx(), http::Request::new(empty_body())).await;
        assert!(matches!(result, Err(KeelError::Malformed { .. })));
    }
}
