//! # Guest collection
//!
//! The whole guest list is one JSON document: an ordered list of guest
//! records plus metadata. It is persisted as a single opaque blob, so this
//! module owns the schema and the two merge operations that mutate it.
//!
//! ## Merge semantics
//!
//! The guest-facing RSVP path and the admin path deliberately treat missing
//! and empty values differently:
//!
//! - RSVP ([`GuestRecord::apply_rsvp`]): `status`, `email` and `phone`
//!   ignore empty values ("no change"), while `companion`, `dietary` and
//!   `additionalInfo` overwrite with whatever was sent, empty string
//!   included. `accommodation`/`transport` are cleared by an explicit empty
//!   value.
//! - Admin ([`GuestRecord::apply_patch`]): a plain shallow merge, any field
//!   present in the patch overwrites. `id` and `token` are not patchable.
//!
//! The asymmetry is relied on by the existing pages and is kept as is.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::utils::normalize_token;

/// Sentinel value in `companion` meaning the guest may bring someone but has
/// not named them yet. An empty string means no companion, anything else is
/// the companion's name.
pub const COMPANION_OPEN: &str = "TAK";

/// RSVP state, wire values as the original guest list uses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsvpStatus {
    #[serde(rename = "OCZEKUJE")]
    Pending,
    #[serde(rename = "TAK")]
    Attending,
    #[serde(rename = "NIE")]
    Declined,
}

/// Yes/no answer for the accommodation and transport questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    #[serde(rename = "TAK")]
    Yes,
    #[serde(rename = "NIE")]
    No,
}

/// One row of the guest collection. Unknown keys survive a
/// read-modify-write cycle through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRecord {
    pub id: u32,
    pub token: String,
    pub name: String,
    pub status: RsvpStatus,
    #[serde(default)]
    pub companion: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<Choice>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Collection metadata. `totalGuests` comes from the seed file and is not
/// recomputed on update, so it can go stale; a mismatch is only ever logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub total_guests: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The single persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCollection {
    #[serde(default)]
    pub guests: Vec<GuestRecord>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GuestCollection {
    /// Linear scan by token; input is uppercased first. Tokens are unique by
    /// construction, not enforced here, so the first match wins.
    pub fn find_by_token(&self, token: &str) -> Option<&GuestRecord> {
        let token = normalize_token(token);
        self.guests.iter().find(|g| g.token == token)
    }

    pub fn position_by_token(&self, token: &str) -> Option<usize> {
        let token = normalize_token(token);
        self.guests.iter().position(|g| g.token == token)
    }

    pub fn position_by_id(&self, id: u32) -> Option<usize> {
        self.guests.iter().position(|g| g.id == id)
    }

    /// Stamp the collection-level write timestamp.
    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}

/// Guest-facing RSVP fields. Deserialization encodes the falsy rules: empty
/// `status`/`email`/`phone` come out as `None`, an explicit empty
/// `accommodation`/`transport` comes out as `Some(None)` (clear).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RsvpUpdate {
    #[serde(deserialize_with = "empty_as_none")]
    pub status: Option<RsvpStatus>,
    pub companion: Option<String>,
    #[serde(deserialize_with = "clearable")]
    pub accommodation: Option<Option<Choice>>,
    #[serde(deserialize_with = "clearable")]
    pub transport: Option<Option<Choice>>,
    pub dietary: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub email: Option<String>,
    #[serde(deserialize_with = "empty_as_none")]
    pub phone: Option<String>,
    pub additional_info: Option<String>,
}

/// Admin-side partial update. Any field present overwrites; `id` and
/// `token` are deliberately absent, unknown keys in the updates object are
/// dropped on deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub status: Option<RsvpStatus>,
    pub companion: Option<String>,
    #[serde(deserialize_with = "clearable")]
    pub accommodation: Option<Option<Choice>>,
    #[serde(deserialize_with = "clearable")]
    pub transport: Option<Option<Choice>>,
    pub dietary: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub additional_info: Option<String>,
    pub notes: Option<String>,
}

impl GuestRecord {
    /// Merge an RSVP submission into the record and stamp `updatedAt`.
    pub fn apply_rsvp(&mut self, update: RsvpUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(companion) = update.companion {
            self.companion = companion;
        }
        if let Some(accommodation) = update.accommodation {
            self.accommodation = accommodation;
        }
        if let Some(transport) = update.transport {
            self.transport = transport;
        }
        if let Some(dietary) = update.dietary {
            self.dietary = Some(dietary);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(additional_info) = update.additional_info {
            self.additional_info = Some(additional_info);
        }

        self.updated_at = Some(Utc::now());
    }

    /// Merge an admin patch into the record and stamp `updatedAt`.
    pub fn apply_patch(&mut self, patch: GuestPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(companion) = patch.companion {
            self.companion = companion;
        }
        if let Some(accommodation) = patch.accommodation {
            self.accommodation = accommodation;
        }
        if let Some(transport) = patch.transport {
            self.transport = transport;
        }
        if let Some(dietary) = patch.dietary {
            self.dietary = Some(dietary);
        }
        if let Some(email) = patch.email {
            self.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            self.phone = Some(phone);
        }
        if let Some(additional_info) = patch.additional_info {
            self.additional_info = Some(additional_info);
        }
        if let Some(notes) = patch.notes {
            self.notes = Some(notes);
        }

        self.updated_at = Some(Utc::now());
    }
}

/// Missing, null and `""` all deserialize to `None`; anything else must
/// parse as `T`.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(ref s)) if s.is_empty() => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Three-state field: absent is "no change", null or `""` is "clear",
/// anything else must parse as `T`.
fn clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(Some(None)),
        Value::String(ref s) if s.is_empty() => Ok(Some(None)),
        value => T::deserialize(value)
            .map(|parsed| Some(Some(parsed)))
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
pub fn sample_guest(id: u32, token: &str, status: RsvpStatus) -> GuestRecord {
    GuestRecord {
        id,
        token: token.to_string(),
        name: format!("Guest {id}"),
        status,
        companion: String::new(),
        accommodation: None,
        transport: None,
        dietary: None,
        email: None,
        phone: None,
        additional_info: None,
        notes: None,
        category: None,
        updated_at: None,
        extra: Map::new(),
    }
}

#[cfg(test)]
pub fn sample_collection() -> GuestCollection {
    let mut first = sample_guest(1, "ABC123XY", RsvpStatus::Pending);
    first.companion = COMPANION_OPEN.to_string();

    GuestCollection {
        guests: vec![first, sample_guest(2, "DEF456ZW", RsvpStatus::Pending)],
        metadata: Metadata {
            total_guests: 2,
            extra: Map::new(),
        },
        last_updated: None,
        extra: Map::new(),
    }
}
