//! Handler shapes and the adapter that normalizes them.
//!
//! Four shapes are accepted at registration:
//!
//! | shape       | call                      | result            |
//! |-------------|---------------------------|-------------------|
//! | `Action`    | sync                      | none              |
//! | `Func`      | sync                      | value             |
//! | `Task`      | async                     | none              |
//! | `AsyncFunc` | async                     | value             |
//!
//! Every shape is turned into one canonical [`Handler`]:
//! `&mut RequestContext -> BoxFuture<Result<Reply, BoxError>>`. No-result
//! shapes resolve to [`Reply::NoBody`]; sync shapes run inline and resolve
//! immediately. The dispatch loop never branches on shape.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::BoxError;
use crate::handler::reply::{Completion, HandlerResult, IntoReply, Reply};
use crate::http::RequestContext;

/// Boxed future borrowing the request context.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type SyncAction = dyn Fn(&mut RequestContext) -> Result<(), BoxError> + Send + Sync;
type SyncFunc = dyn Fn(&mut RequestContext) -> HandlerResult + Send + Sync;
type AsyncAction =
    dyn for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync;
type AsyncFunc = dyn for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// The four registration shapes.
pub enum HandlerShape {
    Action(Box<SyncAction>),
    Func(Box<SyncFunc>),
    Task(Box<AsyncAction>),
    AsyncFunc(Box<AsyncFunc>),
}

impl HandlerShape {
    /// Synchronous handler without a result.
    pub fn action<F, C>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> C + Send + Sync + 'static,
        C: Completion,
    {
        HandlerShape::Action(Box::new(move |ctx: &mut RequestContext| f(ctx).into_completion()))
    }

    /// Synchronous handler producing a value.
    pub fn func<F, R>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        HandlerShape::Func(Box::new(move |ctx: &mut RequestContext| f(ctx).into_reply()))
    }

    /// Asynchronous handler without a result.
    ///
    /// ```ignore
    /// HandlerShape::task(|ctx| Box::pin(async move { ctx.write(b"hi").await }))
    /// ```
    pub fn task<F, C>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, C> + Send + Sync + 'static,
        C: Completion + 'static,
    {
        HandlerShape::Task(boxed_task(move |ctx| {
            let fut = f(ctx);
            Box::pin(async move { fut.await.into_completion() })
        }))
    }

    /// Asynchronous handler producing a value.
    pub fn async_func<F, R>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, R> + Send + Sync + 'static,
        R: IntoReply + 'static,
    {
        HandlerShape::AsyncFunc(boxed_async_func(move |ctx| {
            let fut = f(ctx);
            Box::pin(async move { fut.await.into_reply() })
        }))
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            HandlerShape::Action(_) => ShapeKind::Action,
            HandlerShape::Func(_) => ShapeKind::Func,
            HandlerShape::Task(_) => ShapeKind::Task,
            HandlerShape::AsyncFunc(_) => ShapeKind::AsyncFunc,
        }
    }
}

/// Which shape a handler was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Action,
    Func,
    Task,
    AsyncFunc,
}

/// Canonical handler: async, context in, optional value out.
#[derive(Clone)]
pub struct Handler {
    call: Arc<AsyncFunc>,
    shape: ShapeKind,
}

impl Handler {
    /// Run the handler against a request context.
    pub fn invoke<'a>(&self, ctx: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult> {
        (self.call)(ctx)
    }

    /// Shape the handler was registered with.
    pub fn shape(&self) -> ShapeKind {
        self.shape
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("shape", &self.shape).finish()
    }
}

impl From<HandlerShape> for Handler {
    fn from(shape: HandlerShape) -> Self {
        adapt(shape)
    }
}

/// Normalize any registration shape into the canonical handler.
pub fn adapt(shape: HandlerShape) -> Handler {
    let kind = shape.kind();
    let call: Arc<AsyncFunc> = match shape {
        HandlerShape::Action(f) => canonical(move |ctx| {
            let result = f(ctx).map(|()| Reply::NoBody);
            Box::pin(std::future::ready(result))
        }),
        HandlerShape::Func(f) => canonical(move |ctx| Box::pin(std::future::ready(f(ctx)))),
        HandlerShape::Task(f) => canonical(move |ctx| {
            let fut = f(ctx);
            Box::pin(async move { fut.await.map(|()| Reply::NoBody) })
        }),
        HandlerShape::AsyncFunc(f) => Arc::from(f),
    };
    Handler { call, shape: kind }
}

fn boxed_task<F>(f: F) -> Box<AsyncAction>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

fn boxed_async_func<F>(f: F) -> Box<AsyncFunc>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Box::new(f)
}

fn canonical<F>(f: F) -> Arc<AsyncFunc>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> RequestContext {
        let (ctx, _pending) =
            RequestContext::detached(http::Request::builder().uri("/t").body(()).unwrap());
        ctx
    }

    fn text_of(reply: Reply) -> Option<String> {
        match reply {
            Reply::Text(s) => Some(s),
            _ => None,
        }
    }

    #[tokio::test]
    async fn action_resolves_to_no_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: Handler = HandlerShape::action(move |_ctx: &mut RequestContext| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .into();

        let reply = handler.invoke(&mut ctx()).await.unwrap();
        assert!(reply.is_no_body());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.shape(), ShapeKind::Action);
    }

    #[tokio::test]
    async fn func_returns_value() {
        let handler: Handler =
            HandlerShape::func(|ctx: &mut RequestContext| format!("path={}", ctx.path())).into();
        let reply = handler.invoke(&mut ctx()).await.unwrap();
        assert_eq!(text_of(reply).as_deref(), Some("path=/t"));
    }

    #[tokio::test]
    async fn task_resolves_to_no_body() {
        let handler: Handler = HandlerShape::task(|ctx: &mut RequestContext| {
            Box::pin(async move {
                ctx.set_status(http::StatusCode::ACCEPTED);
            })
        })
        .into();

        let mut ctx = ctx();
        let reply = handler.invoke(&mut ctx).await.unwrap();
        assert!(reply.is_no_body());
        assert_eq!(ctx.status(), http::StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn async_func_returns_value() {
        let handler: Handler = HandlerShape::async_func(|_ctx: &mut RequestContext| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                "async"
            })
        })
        .into();
        let reply = handler.invoke(&mut ctx()).await.unwrap();
        assert_eq!(text_of(reply).as_deref(), Some("async"));
    }

    #[tokio::test]
    async fn failures_surface_as_errors() {
        let sync: Handler = HandlerShape::action(|_ctx: &mut RequestContext| -> Result<(), String> {
            Err("sync failure".into())
        })
        .into();
        let err = sync.invoke(&mut ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "sync failure");

        let asynchronous: Handler = HandlerShape::async_func(|_ctx: &mut RequestContext| {
            Box::pin(async move { Err::<String, _>(std::io::Error::other("async failure")) })
        })
        .into();
        let err = asynchronous.invoke(&mut ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "async failure");
    }
}
