//! crates/snapstudy_core/src/session_store.rs
//!
//! An append-only list of study sessions with a "current" pointer.
//!
//! Sessions are never removed or reordered. All mutation goes through the
//! store: appending a session, moving the pointer, or replacing a session's
//! materials wholesale. Each session carries one in-flight flag per call
//! family; a second request of the same family is rejected while the first is
//! outstanding.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ChatMessage, RawInput};
use crate::materials::StudyMaterials;
use crate::ports::{PortError, PortResult};

/// The two independent kinds of model call a session can have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallFamily {
    Generation,
    Tutor,
}

impl fmt::Display for CallFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFamily::Generation => f.write_str("generation"),
            CallFamily::Tutor => f.write_str("tutor"),
        }
    }
}

/// One independent input / generation / chat-history unit.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub raw_input: Option<RawInput>,
    pub materials: StudyMaterials,
    pub chat_history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    generating: bool,
    answering: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_input: None,
            materials: StudyMaterials::default(),
            chat_history: Vec::new(),
            created_at: Utc::now(),
            generating: false,
            answering: false,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn is_answering(&self) -> bool {
        self.answering
    }

    fn flag_mut(&mut self, family: CallFamily) -> &mut bool {
        match family {
            CallFamily::Generation => &mut self.generating,
            CallFamily::Tutor => &mut self.answering,
        }
    }
}

/// Proof that a call of `family` was admitted for a session.
///
/// Handed back to the store when the call completes, which clears the flag.
#[must_use = "an admitted call must be finished, or its session stays busy"]
#[derive(Debug)]
pub struct InFlight {
    session_id: Uuid,
    family: CallFamily,
}

//=========================================================================================
// The Store
//=========================================================================================

#[derive(Debug)]
pub struct SessionStore {
    sessions: Vec<Session>,
    current: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates a store holding a single empty, current session.
    pub fn new() -> Self {
        Self {
            sessions: vec![Session::new()],
            current: 0,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn current(&self) -> &Session {
        &self.sessions[self.current]
    }

    pub fn current_id(&self) -> Uuid {
        self.current().id
    }

    pub fn get(&self, id: Uuid) -> PortResult<&Session> {
        self.sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| PortError::SessionNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: Uuid) -> PortResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PortError::SessionNotFound(id.to_string()))
    }

    fn position(&self, id: Uuid) -> PortResult<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| PortError::SessionNotFound(id.to_string()))
    }

    /// Appends a fresh session and makes it current.
    pub fn create_session(&mut self) -> Uuid {
        let session = Session::new();
        let id = session.id;
        self.sessions.push(session);
        self.current = self.sessions.len() - 1;
        info!("Created session {} ({} total).", id, self.sessions.len());
        id
    }

    /// Moves the current pointer. The list itself is untouched.
    pub fn select(&mut self, id: Uuid) -> PortResult<()> {
        self.current = self.position(id)?;
        Ok(())
    }

    pub fn set_raw_input(&mut self, id: Uuid, input: RawInput) -> PortResult<()> {
        self.get_mut(id)?.raw_input = Some(input);
        Ok(())
    }

    pub fn append_message(&mut self, id: Uuid, message: ChatMessage) -> PortResult<()> {
        self.get_mut(id)?.chat_history.push(message);
        Ok(())
    }

    /// Admits a call of `family` for a session, or rejects it when one is
    /// already outstanding.
    pub fn begin(&mut self, id: Uuid, family: CallFamily) -> PortResult<InFlight> {
        let session = self.get_mut(id)?;
        let flag = session.flag_mut(family);
        if *flag {
            warn!("Rejected {} request for session {}: one is already in flight.", family, id);
            return Err(PortError::SessionBusy(family));
        }
        *flag = true;
        Ok(InFlight {
            session_id: id,
            family,
        })
    }

    /// Completes a generation call. On success the session's materials are
    /// replaced wholesale; on failure (`None`) they are left as they were.
    pub fn finish_generation(
        &mut self,
        ticket: InFlight,
        materials: Option<StudyMaterials>,
    ) -> PortResult<()> {
        debug_assert_eq!(ticket.family, CallFamily::Generation);
        let session = self.get_mut(ticket.session_id)?;
        session.generating = false;
        if let Some(materials) = materials {
            session.materials = materials;
        }
        Ok(())
    }

    pub fn finish_tutor(&mut self, ticket: InFlight) -> PortResult<()> {
        debug_assert_eq!(ticket.family, CallFamily::Tutor);
        self.get_mut(ticket.session_id)?.answering = false;
        Ok(())
    }
}
