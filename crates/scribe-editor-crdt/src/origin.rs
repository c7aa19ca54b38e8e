//! Origin tags attached to every shared-text commit.

use loro::EventTriggerKind;
use loro::event::DiffEvent;
use serde::{Deserialize, Serialize};

/// Who caused a change to the shared text.
///
/// Written into the Loro commit origin so the session listener can tell its
/// own writes apart from changes made by peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Typed by the local user.
    Local,
    /// Arrived from another peer.
    Remote,
    /// Written by the undo/redo controller.
    UndoRedo,
}

impl Origin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
            Origin::UndoRedo => "undo-redo",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "local" => Some(Origin::Local),
            "remote" => Some(Origin::Remote),
            "undo-redo" => Some(Origin::UndoRedo),
            _ => None,
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change notification from the shared text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedTextUpdate {
    pub origin: Origin,
}

impl SharedTextUpdate {
    /// Classify a Loro diff event.
    ///
    /// Untagged imports and checkouts count as remote: they did not come from
    /// this session's editing surface. Untagged local commits count as local.
    pub fn from_event(event: &DiffEvent<'_>) -> Self {
        let origin = Origin::from_tag(event.origin).unwrap_or(match event.triggered_by {
            EventTriggerKind::Local => Origin::Local,
            _ => Origin::Remote,
        });
        Self { origin }
    }
}
