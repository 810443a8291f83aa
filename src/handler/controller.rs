//! Controllers: groups of routes bound to one shared object.
//!
//! A controller lists its methods in an explicit registration table. Each
//! entry carries the method name (the route becomes `/` + name), the HTTP
//! verbs it answers, and a binding in one of the four handler shapes. A
//! binding receives the controller and, optionally, the request context;
//! any other parameter list does not type-check.
//!
//! ```ignore
//! struct Counter { value: AtomicI64 }
//!
//! impl Controller for Counter {
//!     fn routes(routes: &mut ControllerRoutes<Self>) {
//!         routes
//!             .action("Increment", &[Method::GET], |c, _| {
//!                 c.value.fetch_add(1, Ordering::SeqCst);
//!             })
//!             .func("Read", &[Method::GET], |c, _| c.value.load(Ordering::SeqCst).to_string());
//!     }
//! }
//! ```

use std::sync::Arc;

use http::Method;

use crate::error::ConfigurationError;
use crate::handler::adapter::{BoxFuture, HandlerShape};
use crate::handler::reply::{Completion, IntoReply};
use crate::handler::Handler;
use crate::http::{RequestContext, WebServerBuilder};

/// An object whose methods are exposed as routes.
pub trait Controller: Send + Sync + 'static {
    /// Describe the routed methods.
    fn routes(routes: &mut ControllerRoutes<Self>)
    where
        Self: Sized;
}

type Binding<C> = Box<dyn FnOnce(Arc<C>) -> HandlerShape>;

/// Registration table filled in by [`Controller::routes`].
pub struct ControllerRoutes<C> {
    entries: Vec<ControllerMethod<C>>,
}

/// One routed controller method.
pub struct ControllerMethod<C> {
    name: String,
    verbs: Vec<Method>,
    bind: Binding<C>,
}

impl<C> ControllerMethod<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verbs(&self) -> &[Method] {
        &self.verbs
    }

    /// Route path for this method.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let reason = if self.name.is_empty() {
            Some("method name is empty")
        } else if self
            .name
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            Some("method name is not a valid path segment")
        } else if self.verbs.is_empty() {
            Some("no HTTP method tags")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigurationError::InvalidControllerMethod {
                method: self.name.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl<C: Send + Sync + 'static> ControllerRoutes<C> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Collect the registration table of a controller type.
    pub fn of() -> Self
    where
        C: Controller,
    {
        let mut routes = Self::new();
        C::routes(&mut routes);
        routes
    }

    /// Synchronous method without a result.
    pub fn action<F, R>(&mut self, name: &str, verbs: &[Method], f: F) -> &mut Self
    where
        F: Fn(&C, &mut RequestContext) -> R + Send + Sync + 'static,
        R: Completion,
    {
        self.push(name, verbs, move |controller| {
            HandlerShape::action(move |ctx: &mut RequestContext| f(&controller, ctx))
        })
    }

    /// Synchronous method producing a value.
    pub fn func<F, R>(&mut self, name: &str, verbs: &[Method], f: F) -> &mut Self
    where
        F: Fn(&C, &mut RequestContext) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        self.push(name, verbs, move |controller| {
            HandlerShape::func(move |ctx: &mut RequestContext| f(&controller, ctx))
        })
    }

    /// Asynchronous method without a result.
    pub fn task<F, R>(&mut self, name: &str, verbs: &[Method], f: F) -> &mut Self
    where
        F: for<'a> Fn(Arc<C>, &'a mut RequestContext) -> BoxFuture<'a, R> + Send + Sync + 'static,
        R: Completion + 'static,
    {
        self.push(name, verbs, move |controller| {
            HandlerShape::task(move |ctx| f(Arc::clone(&controller), ctx))
        })
    }

    /// Asynchronous method producing a value.
    pub fn async_func<F, R>(&mut self, name: &str, verbs: &[Method], f: F) -> &mut Self
    where
        F: for<'a> Fn(Arc<C>, &'a mut RequestContext) -> BoxFuture<'a, R> + Send + Sync + 'static,
        R: IntoReply + 'static,
    {
        self.push(name, verbs, move |controller| {
            HandlerShape::async_func(move |ctx| f(Arc::clone(&controller), ctx))
        })
    }

    /// Registered methods, in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &ControllerMethod<C>> {
        self.entries.iter()
    }

    fn push<B>(&mut self, name: &str, verbs: &[Method], bind: B) -> &mut Self
    where
        B: FnOnce(Arc<C>) -> HandlerShape + 'static,
    {
        self.entries.push(ControllerMethod {
            name: name.to_owned(),
            verbs: verbs.to_vec(),
            bind: Box::new(bind),
        });
        self
    }
}

impl WebServerBuilder {
    /// Map every routed method of a controller.
    ///
    /// Invalid entries are reported by [`WebServerBuilder::build`] and are
    /// not mapped; the other entries still are.
    pub fn map_controller<C: Controller>(mut self, controller: Arc<C>) -> Self {
        for entry in ControllerRoutes::<C>::of().entries {
            if let Err(err) = entry.validate() {
                self.record_error(err);
                continue;
            }

            let path = entry.path();
            let handler: Handler = (entry.bind)(Arc::clone(&controller)).into();
            for verb in &entry.verbs {
                self.register(&path, verb, handler.clone());
            }
        }
        self
    }
}
