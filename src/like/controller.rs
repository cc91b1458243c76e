use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use super::client::LikeClient;
use super::dom::{ClickEvent, NodeId, SharedDocument};
use super::{ControllerError, LIKE_BUTTON_CLASS, LIKE_LABEL, LIKED_CLASS, POST_ID_ATTRIBUTE, counter_id, like_path};
use crate::model::LikeState;

/// Where the new count is written after a successful toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterTarget {
    /// Text of the element whose id is `like-count-{postId}`.
    #[default]
    Companion,
    /// The button's own text, as `"{like_count} Curtir"`.
    ButtonLabel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub button_class: String,
    pub post_id_attribute: String,
    pub liked_class: String,
    pub counter: CounterTarget,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            button_class: LIKE_BUTTON_CLASS.to_string(),
            post_id_attribute: POST_ID_ATTRIBUTE.to_string(),
            liked_class: LIKED_CLASS.to_string(),
            counter: CounterTarget::Companion,
        }
    }
}

impl ControllerConfig {
    pub fn with_counter(mut self, counter: CounterTarget) -> Self {
        self.counter = counter;
        self
    }
}

/// What a single click ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// Response applied to the document.
    Applied(LikeState),
    /// Button has no post id; no request was made.
    MissingPostId,
    /// Server answered with a non-2xx status; nothing changed.
    Rejected { status: u16 },
    /// Transport or decode failure; logged, nothing changed.
    Failed(ControllerError),
    /// Element was not a like button when the controller was initialized.
    NotBound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeEvent {
    pub post_id: Option<String>,
    pub outcome: LikeOutcome,
}

/// Entry point: configure once, then [`initialize`](Self::initialize) against
/// a mounted document.
pub struct LikeController<C> {
    client: Arc<C>,
    config: Arc<ControllerConfig>,
    events: Option<UnboundedSender<LikeEvent>>,
}

impl<C: LikeClient> LikeController<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
            config: Arc::new(ControllerConfig::default()),
            events: None,
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Every handled click is also reported on `events`, so a host page can
    /// surface failures the document itself stays silent about.
    pub fn with_events(mut self, events: UnboundedSender<LikeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Binds every element carrying the button class right now. Elements
    /// appended later are not covered; initialize again to pick them up.
    pub async fn initialize(&self, document: SharedDocument) -> LikeButtons<C> {
        let bound: BTreeSet<NodeId> = document
            .lock()
            .await
            .query_class(&self.config.button_class)
            .into_iter()
            .collect();

        tracing::debug!(buttons = bound.len(), "like buttons bound");

        LikeButtons {
            document,
            client: self.client.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            bound,
        }
    }
}

/// Handle over the buttons bound by one initialization.
pub struct LikeButtons<C> {
    document: SharedDocument,
    client: Arc<C>,
    config: Arc<ControllerConfig>,
    events: Option<UnboundedSender<LikeEvent>>,
    bound: BTreeSet<NodeId>,
}

impl<C: LikeClient> LikeButtons<C> {
    pub fn buttons(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bound.iter().copied()
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.bound.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Unbinds every button.
    pub fn dispose(self) {
        tracing::debug!(buttons = self.bound.len(), "like buttons released");
    }

    /// Runs the click handler of `node`.
    ///
    /// The document lock is released while the request is in flight, so
    /// overlapping clicks race and the response that arrives last wins.
    pub async fn click(&self, node: NodeId, event: &mut ClickEvent) -> LikeOutcome {
        if !self.is_bound(node) {
            return LikeOutcome::NotBound;
        }
        event.prevent_default();

        let post_id = {
            let document = self.document.lock().await;
            document
                .get(node)
                .and_then(|el| el.attribute(&self.config.post_id_attribute))
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
        };

        let Some(post_id) = post_id else {
            self.emit(None, LikeOutcome::MissingPostId);
            return LikeOutcome::MissingPostId;
        };

        let outcome = self.toggle(node, &post_id).await;
        self.emit(Some(post_id), outcome.clone());
        outcome
    }

    async fn toggle(&self, node: NodeId, post_id: &str) -> LikeOutcome {
        let reply = match self.client.get(&like_path(post_id)).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(post_id, e),
        };

        if !reply.is_success() {
            return LikeOutcome::Rejected {
                status: reply.status,
            };
        }

        let state: LikeState = match serde_json::from_str(&reply.body) {
            Ok(state) => state,
            Err(e) => return self.fail(post_id, ControllerError::Decode(e.to_string())),
        };

        match self.apply(node, post_id, state).await {
            Ok(()) => LikeOutcome::Applied(state),
            Err(e) => self.fail(post_id, e),
        }
    }

    fn fail(&self, post_id: &str, error: ControllerError) -> LikeOutcome {
        tracing::error!(post_id, error = %error, "like toggle failed");
        LikeOutcome::Failed(error)
    }

    async fn apply(&self, node: NodeId, post_id: &str, state: LikeState) -> Result<(), ControllerError> {
        let mut document = self.document.lock().await;
        let count = state.like_count.to_string();

        match self.config.counter {
            CounterTarget::Companion => {
                let counter = counter_id(post_id);
                let target = document
                    .element_by_id(&counter)
                    .ok_or(ControllerError::MissingCounter(counter))?;
                if let Some(el) = document.get_mut(target) {
                    el.set_text(&count);
                }
            }
            CounterTarget::ButtonLabel => {
                if let Some(el) = document.get_mut(node) {
                    el.set_text(&format!("{count} {LIKE_LABEL}"));
                }
            }
        }

        if let Some(button) = document.get_mut(node) {
            if state.liked {
                button.add_class(&self.config.liked_class);
            } else {
                button.remove_class(&self.config.liked_class);
            }
        }
        Ok(())
    }

    fn emit(&self, post_id: Option<String>, outcome: LikeOutcome) {
        if let Some(events) = &self.events {
            // A host that dropped its receiver just stops listening.
            let _ = events.send(LikeEvent { post_id, outcome });
        }
    }
}
