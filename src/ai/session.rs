//! Active provider binding and solve dispatch.
//!
//! A [`ProviderSession`] holds at most one initialized provider together with
//! the credentials that produced it. Switching builds the new provider first
//! and only replaces the binding once it is ready, so a failed switch leaves
//! the previous provider in place. Each solve snapshots the binding when it
//! starts and finishes against that snapshot even if a switch happens while
//! the request is in flight.

use std::any::Any;
use std::future::{self, Future};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::ai::catalog::ProviderDescriptor;
use crate::ai::credentials::ProviderCredentials;
use crate::ai::error::{ProviderError, SolveError};
use crate::ai::factory::ProviderFactory;
use crate::ai::image::ImagePayload;
use crate::ai::provider::{ProviderInstance, SolutionProvider, SolveFuture};

/// Notification delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A solve started (`true`) or finished (`false`).
    Processing(bool),
    /// A solve produced a markdown answer.
    Solution(String),
    /// A solve or switch failed.
    Error(String),
    /// A new provider is bound.
    ProviderChanged {
        /// Provider identifier.
        provider: String,
        /// Bound model.
        model: String,
    },
}

/// The provider currently bound to a session.
#[derive(Debug)]
pub struct ActiveBinding {
    /// Initialized provider.
    pub instance: ProviderInstance,
    /// Credentials that produced `instance`.
    pub credentials: ProviderCredentials,
}

impl ActiveBinding {
    /// Provider identifier of the binding.
    pub fn provider_id(&self) -> &'static str {
        self.instance.kind().id()
    }

    /// Model the binding sends requests to.
    pub fn model(&self) -> &str {
        self.instance.model()
    }
}

/// Runtime-replaceable provider binding.
///
/// Clones share the same binding.
pub struct ProviderSession {
    active: Arc<RwLock<Option<Arc<ActiveBinding>>>>,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl ProviderSession {
    /// Creates a session with no provider bound.
    pub fn new() -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
            events: None,
        }
    }

    /// Creates a session that reports to the given event channel.
    pub fn with_events(events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
            events: Some(events),
        }
    }

    /// Returns a snapshot of the current binding.
    pub fn current(&self) -> Option<Arc<ActiveBinding>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if a provider is bound.
    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    /// Builds a provider from `credentials` and binds it.
    ///
    /// On failure the previous binding is kept and the error is returned.
    pub fn switch_provider(
        &self,
        credentials: ProviderCredentials,
    ) -> Result<ProviderDescriptor, ProviderError> {
        let built = ProviderFactory::create_from_credentials(&credentials).and_then(|instance| {
            let descriptor = ProviderFactory::descriptor(instance.kind())?.clone();
            Ok((instance, descriptor))
        });

        let (instance, descriptor) = match built {
            Ok(built) => built,
            Err(e) => {
                warn!(provider = %credentials.provider_id, "Provider switch failed: {e}");
                self.emit(SessionEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let binding = Arc::new(ActiveBinding {
            instance,
            credentials,
        });
        let changed = SessionEvent::ProviderChanged {
            provider: binding.provider_id().to_string(),
            model: binding.model().to_string(),
        };
        info!(
            provider = binding.provider_id(),
            model = binding.model(),
            "Switched active provider"
        );

        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(binding);
        self.emit(changed);
        Ok(descriptor)
    }

    /// Drops the current binding.
    pub fn teardown(&self) {
        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(binding) = previous {
            debug!(provider = binding.provider_id(), "Session torn down");
        }
    }

    /// Solves one screenshot with the current provider.
    pub async fn solve(&self, image: &ImagePayload) -> Result<String, SolveError> {
        self.dispatch(image, future::pending()).await
    }

    /// Solves one screenshot, abandoning the request if `cancel` resolves
    /// first.
    pub async fn solve_with_cancel<C>(
        &self,
        image: &ImagePayload,
        cancel: C,
    ) -> Result<String, SolveError>
    where
        C: Future<Output = ()>,
    {
        self.dispatch(image, cancel).await
    }

    async fn dispatch<C>(&self, image: &ImagePayload, cancel: C) -> Result<String, SolveError>
    where
        C: Future<Output = ()>,
    {
        let binding = self.current();
        let call = binding.as_ref().map(|binding| {
            debug!(
                provider = binding.provider_id(),
                model = binding.model(),
                "Dispatching solve request"
            );
            binding.instance.generate_solution(image)
        });
        self.run(call, cancel).await
    }

    /// Drives one provider call and reports its outcome.
    ///
    /// `None` means no provider is bound.
    async fn run<C>(&self, call: Option<SolveFuture<'_>>, cancel: C) -> Result<String, SolveError>
    where
        C: Future<Output = ()>,
    {
        let processing = ProcessingGuard::start(self.events.clone());

        let result = match call {
            None => Err(SolveError::NoActiveProvider),
            Some(call) => {
                let call = AssertUnwindSafe(call).catch_unwind();
                tokio::select! {
                    biased;
                    () = cancel => Err(SolveError::Cancelled),
                    outcome = call => outcome.unwrap_or_else(|panic| {
                        Err(SolveError::Internal(panic_message(panic.as_ref())))
                    }),
                }
            }
        };

        drop(processing);

        match &result {
            Ok(text) => self.emit(SessionEvent::Solution(text.clone())),
            Err(e) => {
                warn!("Solve failed: {e}");
                self.emit(SessionEvent::Error(e.to_string()));
            }
        }
        result
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                debug!("Session event receiver dropped");
            }
        }
    }
}

impl Default for ProviderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ProviderSession {
    fn clone(&self) -> Self {
        Self {
            active: Arc::clone(&self.active),
            events: self.events.clone(),
        }
    }
}

impl std::fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current();
        f.debug_struct("ProviderSession")
            .field("provider", &current.as_ref().map(|b| b.provider_id()))
            .field("model", &current.as_ref().map(|b| b.model().to_string()))
            .finish()
    }
}

/// Emits `Processing(true)` on creation and `Processing(false)` on drop.
struct ProcessingGuard {
    events: Option<UnboundedSender<SessionEvent>>,
}

impl ProcessingGuard {
    fn start(events: Option<UnboundedSender<SessionEvent>>) -> Self {
        if let Some(events) = &events {
            let _ = events.send(SessionEvent::Processing(true));
        }
        Self { events }
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if let Some(events) = &self.events {
            let _ = events.send(SessionEvent::Processing(false));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "provider panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ai::error::InitError;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn starts_uninitialized() {
        let session = ProviderSession::new();
        assert!(!session.is_ready());
        assert!(session.current().is_none());
    }

    #[test]
    fn switch_binds_provider() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);

        let descriptor = session
            .switch_provider(ProviderCredentials::new("anthropic", "sk-test", None))
            .unwrap();

        assert_eq!(descriptor.id, "anthropic");
        let current = session.current().unwrap();
        assert_eq!(current.provider_id(), "anthropic");
        assert_eq!(current.model(), descriptor.default_model);
        assert_eq!(
            drain(&mut rx),
            vec![SessionEvent::ProviderChanged {
                provider: "anthropic".to_string(),
                model: descriptor.default_model.clone(),
            }]
        );
    }

    #[test]
    fn failed_switch_keeps_previous_binding() {
        let session = ProviderSession::new();
        session
            .switch_provider(ProviderCredentials::new("anthropic", "sk-test", None))
            .unwrap();

        let err = session
            .switch_provider(ProviderCredentials::new("openai", "", None))
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Init(InitError::MissingApiKey { .. })
        ));

        let err = session
            .switch_provider(ProviderCredentials::new("gemini", "key", None))
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(_)));

        let current = session.current().unwrap();
        assert_eq!(current.provider_id(), "anthropic");
        assert_eq!(current.credentials.api_key.expose(), "sk-test");
    }

    #[test]
    fn failed_switch_reports_error_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);
        let _ = session.switch_provider(ProviderCredentials::new("openai", "", None));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SessionEvent::Error(msg) if msg.contains("API key not found")));
    }

    #[test]
    fn clones_share_binding() {
        let session = ProviderSession::new();
        let clone = session.clone();
        session
            .switch_provider(ProviderCredentials::new("openai", "sk-test", None))
            .unwrap();
        assert_eq!(clone.current().unwrap().provider_id(), "openai");

        clone.teardown();
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn solve_without_provider() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);

        let err = session
            .solve(&ImagePayload::Bytes(vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, SolveError::NoActiveProvider));

        let events = drain(&mut rx);
        assert_eq!(events[0], SessionEvent::Processing(true));
        assert_eq!(events[1], SessionEvent::Processing(false));
        assert!(matches!(events[2], SessionEvent::Error(_)));
    }

    #[tokio::test]
    async fn unreadable_image_brackets_processing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);
        session
            .switch_provider(ProviderCredentials::new("anthropic", "sk-test", None))
            .unwrap();
        drain(&mut rx);

        let err = session
            .solve(&ImagePayload::Path("/no/such/file.png".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SolveError::ImageRead { .. }));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SessionEvent::Processing(true));
        assert_eq!(events[1], SessionEvent::Processing(false));
        assert!(matches!(&events[2], SessionEvent::Error(msg) if msg.contains("/no/such/file.png")));
    }

    #[tokio::test]
    async fn cancel_signal_wins() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);
        session
            .switch_provider(
                ProviderCredentials::new("openai", "sk-test", None)
                    .with_base_url("http://127.0.0.1:9"),
            )
            .unwrap();
        drain(&mut rx);

        let err = session
            .solve_with_cancel(&ImagePayload::Bytes(vec![0x89, b'P', b'N', b'G']), async {})
            .await
            .unwrap_err();
        assert!(matches!(err, SolveError::Cancelled));

        let events = drain(&mut rx);
        assert_eq!(events[0], SessionEvent::Processing(true));
        assert_eq!(events[1], SessionEvent::Processing(false));
        assert_eq!(events[2], SessionEvent::Error("Request cancelled".to_string()));
    }

    async fn exploding_provider() -> Result<String, SolveError> {
        panic!("provider exploded")
    }

    #[tokio::test]
    async fn provider_panic_becomes_internal_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = ProviderSession::with_events(tx);

        let call: SolveFuture<'_> = Box::pin(exploding_provider());
        let err = session
            .run(Some(call), future::pending())
            .await
            .unwrap_err();
        assert!(matches!(&err, SolveError::Internal(msg) if msg == "provider exploded"));

        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::Processing(true),
                SessionEvent::Processing(false),
                SessionEvent::Error(err.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn session_survives_provider_panic() {
        let session = ProviderSession::new();
        session
            .switch_provider(ProviderCredentials::new("anthropic", "sk-test", None))
            .unwrap();

        let call: SolveFuture<'_> = Box::pin(exploding_provider());
        let _ = session.run(Some(call), future::pending()).await;

        assert_eq!(session.current().unwrap().provider_id(), "anthropic");
        let ok: SolveFuture<'_> = Box::pin(async { Ok("still here".to_string()) });
        assert_eq!(
            session.run(Some(ok), future::pending()).await.unwrap(),
            "still here"
        );
    }

    #[test]
    fn guard_releases_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let _guard = ProcessingGuard::start(Some(tx));
        }
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::Processing(true),
                SessionEvent::Processing(false)
            ]
        );
    }

    #[test]
    fn panic_payloads_become_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "provider panicked");
    }
}
