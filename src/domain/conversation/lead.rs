//! Lead data accumulated on a conversation, and the partial updates that
//! extraction passes produce.
//!
//! Updates use [`Patch`] rather than `Option` so a field the model left out
//! and a field the model explicitly nulled are distinguishable. Only
//! `Patch::Value` ever changes stored data, so an extraction pass that
//! mentions nothing new can never erase what is already known.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ListingId;

/// What the prospect is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Rent,
    Buy,
    Viewing,
    Inquiry,
    #[serde(other)]
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Rent => "rent",
            Intent::Buy => "buy",
            Intent::Viewing => "viewing",
            Intent::Inquiry => "inquiry",
            Intent::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Intent {
        match s {
            "rent" => Intent::Rent,
            "buy" => Intent::Buy,
            "viewing" => Intent::Viewing,
            "inquiry" => Intent::Inquiry,
            _ => Intent::Other,
        }
    }
}

/// Housing preferences stated by the prospect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_locations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_in_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_notes: Option<String>,
}

/// Viewing schedule negotiated in the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_dates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Everything extraction has learned about a prospect so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub prospect_name: Option<String>,
    pub intent: Option<Intent>,
    pub preferences: Preferences,
    pub interested_property_ids: Option<Vec<ListingId>>,
    pub schedule: Schedule,
    pub summary: Option<String>,
}

/// Tri-state field update.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Key missing from the update.
    Absent,
    /// Key present with an explicit null.
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, Patch::Value(_))
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Writes a present value into `slot`. Returns whether anything changed.
    pub fn apply_to(self, slot: &mut Option<T>) -> bool
    where
        T: PartialEq,
    {
        match self {
            Patch::Value(v) => {
                let changed = slot.as_ref() != Some(&v);
                *slot = Some(v);
                changed
            }
            Patch::Absent | Patch::Null => false,
        }
    }
}

// A missing key never reaches this impl (`#[serde(default)]` yields Absent),
// so a successful deserialize means the key was present.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub budget_min: Patch<f64>,
    #[serde(default)]
    pub budget_max: Patch<f64>,
    #[serde(default)]
    pub preferred_locations: Patch<Vec<String>>,
    #[serde(default)]
    pub bedrooms: Patch<u32>,
    #[serde(default)]
    pub move_in_date: Patch<String>,
    #[serde(default)]
    pub property_type: Patch<String>,
    #[serde(default)]
    pub other_notes: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default)]
    pub requested_dates: Patch<Vec<String>>,
    #[serde(default)]
    pub confirmed_date: Patch<String>,
    #[serde(default)]
    pub notes: Patch<String>,
}

/// One extraction pass's findings, in the shape the model is asked to emit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LeadUpdate {
    #[serde(default, rename = "name")]
    pub prospect_name: Patch<String>,
    #[serde(default)]
    pub intent: Patch<Intent>,
    #[serde(default)]
    pub preferences: Patch<PreferencesUpdate>,
    #[serde(default)]
    pub schedule: Patch<ScheduleUpdate>,
    /// Listing names the prospect showed interest in, as the model saw them.
    #[serde(default)]
    pub interested_properties: Patch<Vec<String>>,
    #[serde(default)]
    pub summary: Patch<String>,
    /// Resolved from `interested_properties` against the live catalogue.
    #[serde(skip)]
    pub interested_property_ids: Patch<Vec<ListingId>>,
}

impl LeadUpdate {
    /// True when applying this update cannot change anything.
    pub fn is_empty(&self) -> bool {
        let prefs_empty = self
            .preferences
            .as_value()
            .map_or(true, |p| !p.has_values());
        let schedule_empty = self.schedule.as_value().map_or(true, |s| !s.has_values());
        !self.prospect_name.is_value()
            && !self.intent.is_value()
            && prefs_empty
            && schedule_empty
            && !self.summary.is_value()
            && !self.interested_property_ids.is_value()
    }
}

impl PreferencesUpdate {
    fn has_values(&self) -> bool {
        self.budget_min.is_value()
            || self.budget_max.is_value()
            || self.preferred_locations.is_value()
            || self.bedrooms.is_value()
            || self.move_in_date.is_value()
            || self.property_type.is_value()
            || self.other_notes.is_value()
    }
}

impl ScheduleUpdate {
    fn has_values(&self) -> bool {
        self.requested_dates.is_value() || self.confirmed_date.is_value() || self.notes.is_value()
    }
}

impl Preferences {
    fn merge(&mut self, update: PreferencesUpdate) -> bool {
        let mut changed = false;
        changed |= update.budget_min.apply_to(&mut self.budget_min);
        changed |= update.budget_max.apply_to(&mut self.budget_max);
        changed |= update
            .preferred_locations
            .apply_to(&mut self.preferred_locations);
        changed |= update.bedrooms.apply_to(&mut self.bedrooms);
        changed |= update.move_in_date.apply_to(&mut self.move_in_date);
        changed |= update.property_type.apply_to(&mut self.property_type);
        changed |= update.other_notes.apply_to(&mut self.other_notes);
        changed
    }
}

impl Schedule {
    fn merge(&mut self, update: ScheduleUpdate) -> bool {
        let mut changed = false;
        changed |= update.requested_dates.apply_to(&mut self.requested_dates);
        changed |= update.confirmed_date.apply_to(&mut self.confirmed_date);
        changed |= update.notes.apply_to(&mut self.notes);
        changed
    }
}

impl LeadProfile {
    /// Folds an extraction pass into the profile.
    ///
    /// Top-level fields are replaced only by present non-null values;
    /// `preferences` and `schedule` merge key by key. Returns whether the
    /// profile changed.
    pub fn merge(&mut self, update: LeadUpdate) -> bool {
        let mut changed = false;
        changed |= update.prospect_name.apply_to(&mut self.prospect_name);
        changed |= update.intent.apply_to(&mut self.intent);
        if let Patch::Value(prefs) = update.preferences {
            changed |= self.preferences.merge(prefs);
        }
        if let Patch::Value(schedule) = update.schedule {
            changed |= self.schedule.merge(schedule);
        }
        changed |= update
            .interested_property_ids
            .apply_to(&mut self.interested_property_ids);
        changed |= update.summary.apply_to(&mut self.summary);
        changed
    }
}
