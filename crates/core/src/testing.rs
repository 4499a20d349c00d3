//! Fixture entity shared by the unit tests of this crate.

use serde::{Deserialize, Serialize};

use crate::entity::{Audit, Entity, PendingEvents};
use crate::identity;

identity! {
    pub struct NoteId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub body: String,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub audit: Audit,
    #[serde(skip)]
    pub events: PendingEvents<Note>,
}

impl Note {
    pub fn new(body: &str) -> Self {
        use crate::Identity;
        Self {
            id: NoteId::create_unique(),
            body: body.to_string(),
            tags: None,
            audit: Audit::default(),
            events: PendingEvents::default(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(tags.iter().map(|t| t.to_string()).collect());
        self
    }
}

impl Entity for Note {
    type Id = NoteId;
    const TYPE_NAME: &'static str = "Note";
    const NAVIGATIONS: &'static [&'static str] = &["tags"];

    fn id(&self) -> NoteId {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn pending_events(&self) -> &PendingEvents<Self> {
        &self.events
    }

    fn pending_events_mut(&mut self) -> &mut PendingEvents<Self> {
        &mut self.events
    }

    fn unload(&mut self, navigation: &str) {
        if navigation == "tags" {
            self.tags = None;
        }
    }

    fn reload_from(&mut self, navigation: &str, stored: &Self) {
        if navigation == "tags" && self.tags.is_none() {
            self.tags = stored.tags.clone();
        }
    }
}
