//! Per-resource glue: how each admin record is searched, filtered, and
//! decoded off the wire.

use shared::domain::{
    Address, CategorySummary, DeletionRecord, EntityId, EventStatus, EventSummary, FaqSummary,
    NotificationSummary, PersonalInfo, SubcategorySummary, SupportTicketSummary, TicketStatus,
    UserRole, UserStatus, UserSummary,
};
use shared::protocol::RawUserRecord;

use crate::error::ViewError;
use crate::list_view::ListEntity;
use crate::source::{decode_embedded_json, WireDecode};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn user_role_str(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "admin",
        UserRole::Organizer => "organizer",
        UserRole::Attendee => "attendee",
    }
}

fn user_status_str(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Active => "active",
        UserStatus::Blocked => "blocked",
    }
}

fn event_status_str(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Pending => "pending",
        EventStatus::Approved => "approved",
        EventStatus::Rejected => "rejected",
    }
}

fn ticket_status_str(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Open => "open",
        TicketStatus::Answered => "answered",
        TicketStatus::Closed => "closed",
    }
}

/// Most records arrive in their final shape; only users need the strict
/// embedded-blob decode.
macro_rules! wire_passthrough {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl WireDecode for $ty {
                type Wire = $ty;

                fn from_wire(wire: $ty) -> Result<Self, ViewError> {
                    Ok(wire)
                }
            }
        )+
    };
}

wire_passthrough!(
    EventSummary,
    CategorySummary,
    SubcategorySummary,
    FaqSummary,
    SupportTicketSummary,
    NotificationSummary,
    DeletionRecord,
);

impl WireDecode for UserSummary {
    type Wire = RawUserRecord;

    fn from_wire(wire: RawUserRecord) -> Result<Self, ViewError> {
        let personal_info = wire
            .personal_info
            .as_deref()
            .map(|raw| decode_embedded_json::<PersonalInfo>("personalInfo", raw))
            .transpose()?;
        let address = wire
            .address
            .as_deref()
            .map(|raw| decode_embedded_json::<Address>("address", raw))
            .transpose()?;
        Ok(Self {
            id: wire.id,
            email: wire.email,
            role: wire.role,
            status: wire.status,
            personal_info,
            address,
            created_at: wire.created_at,
        })
    }
}

impl ListEntity for UserSummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        if contains_ci(&self.email, term) {
            return true;
        }
        self.personal_info.as_ref().is_some_and(|info| {
            info.first_name
                .as_deref()
                .is_some_and(|name| contains_ci(name, term))
                || info
                    .last_name
                    .as_deref()
                    .is_some_and(|name| contains_ci(name, term))
        })
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "role" => user_role_str(self.role) == value,
            "status" => user_status_str(self.status) == value,
            _ => true,
        }
    }
}

impl ListEntity for EventSummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.title, term) || contains_ci(&self.venue, term)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => event_status_str(self.status) == value,
            "category" => self.category_id.as_str() == value,
            _ => true,
        }
    }
}

impl ListEntity for CategorySummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.name, term)
            || self
                .subcategories
                .iter()
                .any(|sub| contains_ci(&sub.name, term))
    }

    fn matches_filter(&self, _key: &str, _value: &str) -> bool {
        true
    }
}

impl ListEntity for SubcategorySummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.name, term)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "category" => self.category_id.as_str() == value,
            _ => true,
        }
    }
}

impl ListEntity for FaqSummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.question, term) || contains_ci(&self.answer, term)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "published" => (value == "true") == self.published,
            _ => true,
        }
    }
}

impl ListEntity for SupportTicketSummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.subject, term) || contains_ci(&self.message, term)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => ticket_status_str(self.status) == value,
            _ => true,
        }
    }
}

impl ListEntity for NotificationSummary {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.title, term) || contains_ci(&self.body, term)
    }

    fn matches_filter(&self, _key: &str, _value: &str) -> bool {
        true
    }
}

impl ListEntity for DeletionRecord {
    fn entity_id(&self) -> EntityId {
        EntityId::new(self.id.as_str())
    }

    fn matches_search(&self, term: &str) -> bool {
        contains_ci(&self.email, term)
            || self
                .reason
                .as_deref()
                .is_some_and(|reason| contains_ci(reason, term))
    }

    fn matches_filter(&self, _key: &str, _value: &str) -> bool {
        true
    }
}
