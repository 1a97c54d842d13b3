//! Avatar Editor - One Editing Session
//!
//! Every edit is re-normalized on the spot. Nothing leaves the session
//! until `save` is called; dropping the editor discards the draft.

use tracing::{debug, info_span};
use uuid::Uuid;

use crate::avatar::{AvatarConfig, TraitCategory, TraitValue};
use crate::engine::{AvatarEngine, EngineError, SavedAvatar};
use crate::events::{EventBus, ProfileEvent};
use crate::generator::GenderHint;

pub struct AvatarEditor<'e> {
    id: Uuid,
    engine: &'e AvatarEngine,
    config: AvatarConfig,
    events: Option<EventBus<ProfileEvent>>,
    saved: bool,
}

impl<'e> AvatarEditor<'e> {
    pub fn new(engine: &'e AvatarEngine, initial: &AvatarConfig) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "opening avatar editor");
        Self {
            id,
            engine,
            config: engine.normalize(initial),
            events: None,
            saved: false,
        }
    }

    /// Start from the stored avatar blob; an unreadable blob starts from a random avatar.
    pub fn from_stored(engine: &'e AvatarEngine, json: &str, hint: Option<GenderHint>) -> Self {
        let initial = match AvatarConfig::from_json(json) {
            Ok(config) => config,
            Err(e) => {
                debug!(error = %e, "stored avatar unreadable, shuffling");
                engine.generate_random(hint)
            }
        };
        Self::new(engine, &initial)
    }

    /// Publish `AvatarUpdated` on this bus when saving.
    pub fn with_events(mut self, events: EventBus<ProfileEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Apply one user selection. Other traits may change to keep the avatar consistent.
    pub fn set(
        &mut self,
        category: TraitCategory,
        value: impl Into<TraitValue>,
    ) -> Result<&AvatarConfig, EngineError> {
        let value = value.into();
        let _span = info_span!("avatar_edit", session = %self.id, %category).entered();
        self.engine.check_value(category, &value)?;

        let mut draft = self.config.clone();
        draft.set(category, value);
        self.config = self.engine.normalize(&draft);
        self.saved = false;
        Ok(&self.config)
    }

    pub fn shuffle(&mut self, hint: Option<GenderHint>) -> &AvatarConfig {
        self.config = self.engine.generate_random(hint);
        self.saved = false;
        &self.config
    }

    pub fn preview(&self) -> Result<String, EngineError> {
        self.engine.render(&self.config)
    }

    pub fn save(&mut self) -> Result<SavedAvatar, EngineError> {
        let saved = self.engine.save(&self.config)?;
        self.saved = true;
        if let Some(events) = &self.events {
            let delivered = events.emit(&ProfileEvent::AvatarUpdated {
                fingerprint: saved.fingerprint.clone(),
                config: saved.config.clone(),
            });
            debug!(session = %self.id, delivered, "published avatar update");
        }
        Ok(saved)
    }
}

impl Drop for AvatarEditor<'_> {
    fn drop(&mut self) {
        if !self.saved {
            debug!(session = %self.id, "discarding unsaved avatar draft");
        }
    }
}
