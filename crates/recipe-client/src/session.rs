use futures::StreamExt as _;
use recipe_core::{RecipeRequest, StreamEvent};
use tracing::{debug, warn};

use crate::connector::{EventStream, StreamConnector};

/// Shown when the relay cannot be reached or its stream breaks.
pub const CONNECTION_FAILURE_MESSAGE: &str = "Connection to the server failed. Please try again.";

/// Why a session finished without a recipe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server reported a failure through an `error` event.
    #[error("{0}")]
    Upstream(String),
    /// The connection failed, dropped, or carried a malformed frame.
    #[error("{0}")]
    Connection(String),
}

impl SessionError {
    fn connection() -> Self {
        Self::Connection(CONNECTION_FAILURE_MESSAGE.to_string())
    }

    /// Message to show the user.
    pub fn message(&self) -> &str {
        match self {
            Self::Upstream(message) | Self::Connection(message) => message,
        }
    }
}

/// Result of applying one stream event to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A fragment was appended to the recipe text.
    Chunk(String),
    /// The recipe is complete.
    Finished,
    /// The session ended with an error.
    Failed(SessionError),
}

/// Client-side lifecycle of recipe requests.
///
/// Holds at most one open connection. Starting a new request closes the
/// previous one first, and dropping the session closes it too.
pub struct RecipeSession<C> {
    connector: C,
    recipe_text: String,
    error: Option<SessionError>,
    loading: bool,
    active: Option<EventStream>,
}

impl<C: StreamConnector> RecipeSession<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            recipe_text: String::new(),
            error: None,
            loading: false,
            active: None,
        }
    }

    /// Recipe text received so far for the current request.
    pub fn recipe_text(&self) -> &str {
        &self.recipe_text
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_active_connection(&self) -> bool {
        self.active.is_some()
    }

    /// Opens a stream for `request`, replacing any previous one.
    ///
    /// On connect failure the error is also recorded on the session, which
    /// is then finished.
    pub async fn start(&mut self, request: &RecipeRequest) -> Result<(), SessionError> {
        self.close();
        self.recipe_text.clear();
        self.error = None;
        self.loading = true;

        match self.connector.connect(request).await {
            Ok(stream) => {
                self.active = Some(stream);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to open recipe stream");
                let error = SessionError::connection();
                self.fail(error.clone());
                Err(error)
            }
        }
    }

    /// Awaits the next event and applies it. Returns `None` when no
    /// connection is open.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let stream = self.active.as_mut()?;
        let update = match stream.next().await {
            Some(Ok(StreamEvent::Chunk { text })) => {
                self.recipe_text.push_str(&text);
                SessionUpdate::Chunk(text)
            }
            Some(Ok(StreamEvent::Close)) => {
                debug!(len = self.recipe_text.len(), "recipe complete");
                self.close();
                SessionUpdate::Finished
            }
            Some(Ok(StreamEvent::Error { message })) => self.fail(SessionError::Upstream(message)),
            Some(Err(err)) => {
                warn!(error = %err, "recipe stream failed");
                self.fail(SessionError::connection())
            }
            None => {
                warn!("recipe stream ended without a terminal event");
                self.fail(SessionError::connection())
            }
        };
        Some(update)
    }

    /// Drains the current stream, calling `render` with the whole recipe
    /// text after every chunk.
    pub async fn run_to_end<F>(&mut self, mut render: F) -> Result<&str, SessionError>
    where
        F: FnMut(&str),
    {
        while let Some(update) = self.next_update().await {
            match update {
                SessionUpdate::Chunk(_) => render(&self.recipe_text),
                SessionUpdate::Finished => break,
                SessionUpdate::Failed(err) => return Err(err),
            }
        }
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(&self.recipe_text),
        }
    }

    /// Releases the open connection, if any. Safe to call repeatedly.
    pub fn close(&mut self) {
        release(&mut self.active);
        self.loading = false;
    }

    fn fail(&mut self, error: SessionError) -> SessionUpdate {
        self.error = Some(error.clone());
        self.close();
        SessionUpdate::Failed(error)
    }
}

fn release(active: &mut Option<EventStream>) {
    if active.take().is_some() {
        debug!("closed recipe stream");
    }
}

impl<C> Drop for RecipeSession<C> {
    fn drop(&mut self) {
        release(&mut self.active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConsumerError;
    use futures::stream;
    use futures::StreamExt as _;
    use recipe_core::UPSTREAM_FAILURE_MESSAGE;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Script = Vec<Result<StreamEvent, ConsumerError>>;

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        open: AtomicUsize,
        max_open: AtomicUsize,
    }

    struct OpenGuard(Arc<Counters>);

    impl OpenGuard {
        fn new(counters: Arc<Counters>) -> Self {
            let open = counters.open.fetch_add(1, Ordering::SeqCst) + 1;
            counters.max_open.fetch_max(open, Ordering::SeqCst);
            Self(counters)
        }

        fn touch(&self) {}
    }

    impl Drop for OpenGuard {
        fn drop(&mut self) {
            self.0.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Replays `script`, then either ends or stays open forever.
    struct ScriptedConnector {
        script: Script,
        hang_after_script: bool,
        refuse: bool,
        counters: Arc<Counters>,
    }

    impl ScriptedConnector {
        fn new(script: Script) -> Self {
            Self {
                script,
                hang_after_script: false,
                refuse: false,
                counters: Arc::new(Counters::default()),
            }
        }
    }

    #[async_trait::async_trait]
    impl StreamConnector for ScriptedConnector {
        async fn connect(&self, _request: &RecipeRequest) -> Result<EventStream, ConsumerError> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(ConsumerError::Transport("connection refused".into()));
            }
            let guard = OpenGuard::new(self.counters.clone());
            let events = stream::iter(self.script.clone());
            let events: EventStream = if self.hang_after_script {
                Box::pin(events.chain(stream::pending()))
            } else {
                Box::pin(events)
            };
            Ok(Box::pin(events.map(move |event| {
                guard.touch();
                event
            })))
        }
    }

    fn chicken_soup() -> Script {
        vec![
            Ok(StreamEvent::chunk("Ch")),
            Ok(StreamEvent::chunk("icken ")),
            Ok(StreamEvent::chunk("Soup")),
            Ok(StreamEvent::Close),
        ]
    }

    fn request() -> RecipeRequest {
        RecipeRequest::with_ingredients(["Chicken"])
    }

    #[tokio::test]
    async fn chunks_accumulate_until_close() {
        let mut session = RecipeSession::new(ScriptedConnector::new(chicken_soup()));
        session.start(&request()).await.expect("start");
        assert!(session.is_loading());

        let mut updates = Vec::new();
        while let Some(update) = session.next_update().await {
            updates.push(update);
        }
        assert_eq!(
            updates,
            vec![
                SessionUpdate::Chunk("Ch".into()),
                SessionUpdate::Chunk("icken ".into()),
                SessionUpdate::Chunk("Soup".into()),
                SessionUpdate::Finished,
            ]
        );
        assert_eq!(session.recipe_text(), "Chicken Soup");
        assert_eq!(session.error(), None);
        assert!(!session.is_loading());
        assert!(!session.has_active_connection());
    }

    #[tokio::test]
    async fn upstream_error_keeps_partial_text() {
        let mut session = RecipeSession::new(ScriptedConnector::new(vec![
            Ok(StreamEvent::chunk("Ch")),
            Ok(StreamEvent::error(UPSTREAM_FAILURE_MESSAGE)),
        ]));
        session.start(&request()).await.expect("start");
        let result = session.run_to_end(|_| {}).await.map(str::to_string);
        assert_eq!(
            result,
            Err(SessionError::Upstream(UPSTREAM_FAILURE_MESSAGE.into()))
        );
        assert_eq!(session.recipe_text(), "Ch");
        assert!(!session.is_loading());
        assert_eq!(session.next_update().await, None);
    }

    #[tokio::test]
    async fn malformed_frame_and_missing_terminal_are_connection_failures() {
        for script in [
            vec![Err(ConsumerError::Malformed("not json".into()))],
            vec![Ok(StreamEvent::chunk("Ch"))],
        ] {
            let mut session = RecipeSession::new(ScriptedConnector::new(script));
            session.start(&request()).await.expect("start");
            let err = session.run_to_end(|_| {}).await.expect_err("should fail");
            assert_eq!(err.message(), CONNECTION_FAILURE_MESSAGE);
            assert!(!session.has_active_connection());
        }
    }

    #[tokio::test]
    async fn connect_failure_finishes_the_session() {
        let mut connector = ScriptedConnector::new(Vec::new());
        connector.refuse = true;
        let mut session = RecipeSession::new(connector);
        let err = session.start(&request()).await.expect_err("should fail");
        assert_eq!(err, SessionError::Connection(CONNECTION_FAILURE_MESSAGE.into()));
        assert_eq!(session.error(), Some(&err));
        assert!(!session.is_loading());
        assert_eq!(session.next_update().await, None);
    }

    #[tokio::test]
    async fn restarting_closes_the_previous_connection_first() {
        let mut connector = ScriptedConnector::new(vec![Ok(StreamEvent::chunk("Ch"))]);
        connector.hang_after_script = true;
        let counters = connector.counters.clone();
        let mut session = RecipeSession::new(connector);

        session.start(&request()).await.expect("first start");
        assert_eq!(session.next_update().await, Some(SessionUpdate::Chunk("Ch".into())));
        session.start(&request()).await.expect("second start");

        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
        assert_eq!(counters.max_open.load(Ordering::SeqCst), 1);
        assert_eq!(counters.open.load(Ordering::SeqCst), 1);
        assert_eq!(session.recipe_text(), "");

        session.close();
        session.close();
        assert_eq!(counters.open.load(Ordering::SeqCst), 0);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn dropping_the_session_releases_the_connection() {
        let mut connector = ScriptedConnector::new(Vec::new());
        connector.hang_after_script = true;
        let counters = connector.counters.clone();
        let mut session = RecipeSession::new(connector);
        session.start(&request()).await.expect("start");
        assert_eq!(counters.open.load(Ordering::SeqCst), 1);
        drop(session);
        assert_eq!(counters.open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn same_request_twice_yields_identical_text() {
        let mut session = RecipeSession::new(ScriptedConnector::new(chicken_soup()));
        session.start(&request()).await.expect("start");
        let first = session.run_to_end(|_| {}).await.expect("first").to_string();
        session.start(&request()).await.expect("restart");
        let second = session.run_to_end(|_| {}).await.expect("second").to_string();
        assert_eq!(first, "Chicken Soup");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn run_to_end_renders_progressively() {
        let mut session = RecipeSession::new(ScriptedConnector::new(chicken_soup()));
        session.start(&request()).await.expect("start");
        let mut frames = Vec::new();
        session
            .run_to_end(|text| frames.push(text.to_string()))
            .await
            .expect("recipe");
        assert_eq!(frames, vec!["Ch", "Chicken ", "Chicken Soup"]);
    }
}
