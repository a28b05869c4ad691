use serde_json::Value;
use shared::domain::EntityId;

/// Row-level actions the admin surfaces can request against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Approve,
    Reject,
    Block,
    Unblock,
    Delete,
    Broadcast,
}

impl MutationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Block => "block",
            Self::Unblock => "unblock",
            Self::Delete => "delete",
            Self::Broadcast => "broadcast",
        }
    }

    /// How a successful settlement reconciles the loaded list: patch the
    /// affected row, drop it, or invalidate the whole result. Approve and
    /// reject fall back to invalidation when the reply carries no entity.
    pub fn settle_policy(self) -> SettlePolicy {
        match self {
            Self::Approve | Self::Reject | Self::Block | Self::Unblock => {
                SettlePolicy::PatchInPlace
            }
            Self::Delete => SettlePolicy::RemoveRow,
            Self::Broadcast => SettlePolicy::MarkStale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    PatchInPlace,
    RemoveRow,
    MarkStale,
}

/// A requested state change that has not yet been confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationIntent {
    pub kind: MutationKind,
    pub id: EntityId,
    pub payload: Option<Value>,
}

impl MutationIntent {
    pub fn new(kind: MutationKind, id: EntityId) -> Self {
        Self {
            kind,
            id,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn approve(id: EntityId) -> Self {
        Self::new(MutationKind::Approve, id)
    }

    pub fn reject(id: EntityId, reason: Option<&str>) -> Self {
        let intent = Self::new(MutationKind::Reject, id);
        match reason {
            Some(reason) => intent.with_payload(serde_json::json!({ "reason": reason })),
            None => intent,
        }
    }

    /// Answer a support ticket. The response text rides the approve action
    /// route as its payload; the backend marks the ticket answered.
    pub fn respond(id: EntityId, response: &str) -> Self {
        Self::new(MutationKind::Approve, id)
            .with_payload(serde_json::json!({ "adminResponse": response }))
    }

    pub fn block(id: EntityId) -> Self {
        Self::new(MutationKind::Block, id)
    }

    pub fn unblock(id: EntityId) -> Self {
        Self::new(MutationKind::Unblock, id)
    }

    pub fn delete(id: EntityId) -> Self {
        Self::new(MutationKind::Delete, id)
    }

    pub fn broadcast(id: EntityId, title: &str, body: &str) -> Self {
        Self::new(MutationKind::Broadcast, id)
            .with_payload(serde_json::json!({ "title": title, "body": body }))
    }
}

/// Exclusive token for one in-flight intent. Handed out by
/// `ListView::begin_mutation` and consumed by `settle_mutation`; deliberately
/// not `Clone`, the row that began the mutation owns it.
#[derive(Debug)]
pub struct MutationHandle {
    pub(crate) id: EntityId,
    pub(crate) kind: MutationKind,
}

impl MutationHandle {
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }
}

/// Successful mutation reply as normalized by the data source. `entity` is
/// present when the backend echoes the updated record.
#[derive(Debug, Clone)]
pub struct MutationReply<T> {
    pub entity: Option<T>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum MutationOutcome<T> {
    Succeeded(MutationReply<T>),
    Failed(String),
}
