//! Action builder and the dispatcher it produces.
//!
//! ```ignore
//! let base = ActionBuilder::create_with(config);
//!
//! let signup: ActionHandler<Created> = base
//!     .named("signup")
//!     .input(FormSchema::<SignupForm>::new())
//!     .handler(|ActionArgs { input, .. }| async move {
//!         if exists(&input.email).await? {
//!             return Err(ActionError::business("duplicate email"));
//!         }
//!         Ok(ActionResponse::ok(create(input).await?))
//!     });
//!
//! match signup.call(form).await {
//!     Ok(envelope) => render(envelope),
//!     Err(signal) => navigate(signal),
//! }
//! ```
//!
//! One invocation runs: decode (schema-bound only) -> validate -> invoke ->
//! classify (on failure). Validation rejections never reach the business
//! function. Control-flow signals come back as `Err`; every other outcome is
//! an [`ActionResponse`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::config::ActionConfig;
use crate::envelope::{ActionResponse, FieldErrors};
use crate::error::{ActionError, ActionResult, ControlFlow};
use crate::form::{self, FormData};
use crate::report::{ErrorContext, ErrorReporter, NoRequestContext, RequestContext, TracingReporter};
use crate::schema::Schema;

/// Input marker passed to handlers built without a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoInput;

/// Arguments handed to a business function.
#[derive(Debug)]
pub struct ActionArgs<I> {
    /// Schema output, or [`NoInput`] when no schema is bound.
    pub input: I,
    /// The raw, undecoded submission.
    pub form_data: FormData,
}

/// Outcome of turning a submission into handler input.
#[derive(Debug)]
pub enum Bound<I> {
    Ready(I),
    Rejected(FieldErrors),
}

/// How a builder stage produces the business function's input.
#[async_trait]
pub trait InputBinding: Clone + Send + Sync + 'static {
    type Input: Send + 'static;

    async fn bind(&self, form: &FormData) -> ActionResult<Bound<Self::Input>>;
}

/// Unbound stage: the submission is not decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

#[async_trait]
impl InputBinding for NoSchema {
    type Input = NoInput;

    async fn bind(&self, _form: &FormData) -> ActionResult<Bound<NoInput>> {
        Ok(Bound::Ready(NoInput))
    }
}

/// Schema-bound stage.
pub struct WithSchema<S> {
    schema: Arc<S>,
}

impl<S> Clone for WithSchema<S> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
        }
    }
}

#[async_trait]
impl<S: Schema> InputBinding for WithSchema<S> {
    type Input = S::Output;

    async fn bind(&self, form: &FormData) -> ActionResult<Bound<S::Output>> {
        let data = form::decode(form)?;
        match self.schema.safe_parse(data).await {
            Ok(input) => Ok(Bound::Ready(input)),
            Err(field_errors) => Ok(Bound::Rejected(field_errors)),
        }
    }
}

/// Values a business function may return on success.
pub trait IntoActionResponse<T> {
    fn into_action_response(self) -> ActionResponse<T>;
}

impl<T: Default> IntoActionResponse<T> for () {
    fn into_action_response(self) -> ActionResponse<T> {
        ActionResponse::ok_default()
    }
}

impl<T> IntoActionResponse<T> for ActionResponse<T> {
    fn into_action_response(self) -> ActionResponse<T> {
        self
    }
}

#[derive(Clone)]
struct Settings {
    config: ActionConfig,
    reporter: Arc<dyn ErrorReporter>,
    name: Option<String>,
}

/// Immutable, staged builder for action handlers.
///
/// Every staging method takes `&self` and returns a new builder, so one base
/// builder can serve as a template for any number of handlers.
#[derive(Clone)]
pub struct ActionBuilder<B = NoSchema> {
    binding: B,
    settings: Arc<Settings>,
}

impl ActionBuilder<NoSchema> {
    /// Unbound builder with the default configuration.
    pub fn create() -> Self {
        Self::create_with(ActionConfig::default())
    }

    pub fn create_with(config: ActionConfig) -> Self {
        Self {
            binding: NoSchema,
            settings: Arc::new(Settings {
                config,
                reporter: Arc::new(TracingReporter),
                name: None,
            }),
        }
    }
}

impl<B: InputBinding> ActionBuilder<B> {
    /// Same stage, reporting unexpected errors to `reporter`.
    pub fn with_reporter(&self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.restage(|settings| settings.reporter = reporter)
    }

    /// Same stage, with `name` attached to logs and reports.
    pub fn named(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.restage(|settings| settings.name = Some(name))
    }

    /// Bind `schema`, replacing any schema bound before.
    pub fn input<S: Schema>(&self, schema: S) -> ActionBuilder<WithSchema<S>> {
        ActionBuilder {
            binding: WithSchema {
                schema: Arc::new(schema),
            },
            settings: Arc::clone(&self.settings),
        }
    }

    /// Finish the builder with the business function `f`.
    pub fn handler<T, F, Fut, R>(&self, f: F) -> ActionHandler<T>
    where
        T: Send + 'static,
        F: Fn(ActionArgs<B::Input>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<R>> + Send + 'static,
        R: IntoActionResponse<T> + Send + 'static,
    {
        ActionHandler {
            inner: Arc::new(Dispatcher {
                binding: self.binding.clone(),
                func: f,
                settings: Arc::clone(&self.settings),
            }),
        }
    }

    fn restage(&self, edit: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::clone(&self.settings);
        edit(&mut settings);
        Self {
            binding: self.binding.clone(),
            settings: Arc::new(settings),
        }
    }
}

/// A finished action. Cheap to clone and safe to share across requests.
pub struct ActionHandler<T> {
    inner: Arc<dyn Dispatch<T>>,
}

impl<T> Clone for ActionHandler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> ActionHandler<T> {
    /// Run the action outside of any request context.
    pub async fn call(&self, form: FormData) -> Result<ActionResponse<T>, ControlFlow> {
        self.inner.dispatch(form, &NoRequestContext).await
    }

    /// Run the action, using `request` for error diagnostics.
    pub async fn call_with(
        &self,
        form: FormData,
        request: &dyn RequestContext,
    ) -> Result<ActionResponse<T>, ControlFlow> {
        self.inner.dispatch(form, request).await
    }
}

#[async_trait]
trait Dispatch<T>: Send + Sync {
    async fn dispatch(
        &self,
        form: FormData,
        request: &dyn RequestContext,
    ) -> Result<ActionResponse<T>, ControlFlow>;
}

struct Dispatcher<B, F> {
    binding: B,
    func: F,
    settings: Arc<Settings>,
}

impl<B, F> Dispatcher<B, F> {
    fn action_name(&self) -> &str {
        self.settings.name.as_deref().unwrap_or("anonymous")
    }

    async fn classify<T>(
        &self,
        err: ActionError,
        request: &dyn RequestContext,
    ) -> Result<ActionResponse<T>, ControlFlow> {
        let action = self.action_name();
        let kind = err.kind();
        match err {
            ActionError::Signal(signal) => {
                tracing::debug!(action, kind, signal = %signal, "Propagating control-flow signal");
                Err(signal)
            }
            ActionError::Business(message) => {
                tracing::debug!(action, kind, message = %message, "Action failed with business error");
                Ok(ActionResponse::fail(message))
            }
            ActionError::Unexpected(error) => {
                let mut context = ErrorContext::capture(request);
                context.action = self.settings.name.clone();

                if self.settings.config.mode.is_development() {
                    tracing::warn!(action, kind, "Unexpected action error: {error:?}");
                }

                let report = AssertUnwindSafe(self.settings.reporter.capture(&error, &context))
                    .catch_unwind()
                    .await;
                match report {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(action, error = %e, "Failed to report action error");
                    }
                    Err(panic) => {
                        tracing::warn!(
                            action,
                            panic = %panic_message(panic.as_ref()),
                            "Error reporter panicked",
                        );
                    }
                }

                Ok(ActionResponse::fail(
                    self.settings.config.generic_message.clone(),
                ))
            }
        }
    }
}

#[async_trait]
impl<T, B, F, Fut, R> Dispatch<T> for Dispatcher<B, F>
where
    T: Send + 'static,
    B: InputBinding,
    F: Fn(ActionArgs<B::Input>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult<R>> + Send + 'static,
    R: IntoActionResponse<T> + Send + 'static,
{
    async fn dispatch(
        &self,
        form: FormData,
        request: &dyn RequestContext,
    ) -> Result<ActionResponse<T>, ControlFlow> {
        let input = match self.binding.bind(&form).await {
            Ok(Bound::Ready(input)) => input,
            Ok(Bound::Rejected(field_errors)) => {
                tracing::debug!(
                    action = self.action_name(),
                    fields = field_errors.len(),
                    "Action input rejected",
                );
                return Ok(ActionResponse::invalid(field_errors));
            }
            Err(err) => return self.classify(err, request).await,
        };

        let args = ActionArgs {
            input,
            form_data: form,
        };
        let outcome = AssertUnwindSafe(async { (self.func)(args).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ActionError::Unexpected(anyhow::anyhow!(
                    "action panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        match outcome {
            Ok(reply) => Ok(reply.into_action_response()),
            Err(err) => self.classify(err, request).await,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
