//! Provides a [`tracing_subscriber::Layer`] ([`FacadeLayer`]) routing `tracing` events through a
//! [`Logger`], so that libraries instrumented with `tracing` end up in the same files and streams.

use tracing::{
    Event, Id, Subscriber,
    span::{Attributes, Record},
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

use crate::{Level, Logger, record::Fields, storage::Storage};

/// A [`tracing_subscriber::Layer`] forwarding events to a [`Logger`].
///
/// The `message` field of an event becomes the record message (the event target is used if there
/// is none). Fields of the event's span and its ancestors come first among the structured fields,
/// followed by the event's own fields; an event field shadows a span field of the same name.
///
/// ```
/// use log_facade::{FacadeLayer, Logger};
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let subscriber = tracing_subscriber::registry().with(FacadeLayer::new(Logger::builder().build()));
/// tracing::subscriber::with_default(subscriber, || {
///     let _span = tracing::info_span!("checkout", cart_id = 7).entered();
///     tracing::warn!(attempt = 2, "payment retried");
/// });
/// ```
#[derive(Debug, Clone)]
pub struct FacadeLayer {
    logger: Option<Logger>,
}

impl FacadeLayer {
    /// Creates a layer forwarding events to `logger`.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }

    /// Creates a layer forwarding events to the process-wide logger current at the time of each
    /// event.
    pub fn global() -> Self {
        Self { logger: None }
    }

    fn forward<S>(logger: &Logger, event: &Event<'_>, ctx: &Context<'_, S>)
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let level = Level::from(*event.metadata().level());
        if !logger.enabled(level) {
            return;
        }

        let mut storage = Storage::default();
        event.record(&mut storage);

        let mut fields = Fields::new();
        if let Some(span) = ctx.event_span(event) {
            if let Some(span_storage) = span.extensions().get::<Storage>() {
                fields.extend(
                    span_storage
                        .values()
                        .iter()
                        .filter(|(key, _)| !storage.contains(key))
                        .map(|(key, value)| ((*key).to_string(), value.clone())),
                );
            }
        }
        fields.extend(
            storage
                .values()
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone())),
        );

        let message = storage
            .take_message()
            .unwrap_or_else(|| event.metadata().target().to_string());

        logger.emit(level, message, fields, level.is_error_or_above());
    }
}

impl<S> Layer<S> for FacadeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        // Inherit storage from the parent span if it exists
        let mut storage = span
            .parent()
            .and_then(|parent| parent.extensions().get::<Storage>().cloned())
            .unwrap_or_default();

        attrs.record(&mut storage);
        span.extensions_mut().insert(storage);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<Storage>() {
            Some(storage) => values.record(storage),
            None => {
                let mut storage = Storage::default();
                values.record(&mut storage);
                extensions.insert(storage);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        match &self.logger {
            Some(logger) => Self::forward(logger, event, &ctx),
            None => Self::forward(&crate::logger(), event, &ctx),
        }
    }
}
