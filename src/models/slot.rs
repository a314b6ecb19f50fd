use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
    Cancelled,
    Maintenance,
    Expired,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Cancelled => "cancelled",
            SlotStatus::Maintenance => "maintenance",
            SlotStatus::Expired => "expired",
        }
    }
}

/// A bookable visit window as last reported by the backend.
///
/// This is a point-in-time snapshot: other visitors may book the slot at any
/// moment, so derived values must be recomputed on every check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "RawVisitSlot")]
pub struct VisitSlot {
    pub id: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_time")]
    pub start_time: NaiveTime,
    #[serde(serialize_with = "serialize_time")]
    pub end_time: NaiveTime,
    pub capacity: u32,
    pub booked: u32,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Wire shape of a slot. The list endpoint reports `bookedCount` while the
/// detail endpoint may report `booked`; both end up in `VisitSlot::booked`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVisitSlot {
    id: String,
    date: NaiveDate,
    #[serde(deserialize_with = "deserialize_time")]
    start_time: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    end_time: NaiveTime,
    capacity: u32,
    #[serde(default)]
    booked: Option<u32>,
    #[serde(default)]
    booked_count: Option<u32>,
    status: SlotStatus,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    description: Option<String>,
}

impl From<RawVisitSlot> for VisitSlot {
    fn from(raw: RawVisitSlot) -> Self {
        let booked = raw
            .booked_count
            .filter(|n| *n > 0)
            .or(raw.booked)
            .unwrap_or(0);
        VisitSlot {
            id: raw.id,
            date: raw.date,
            start_time: raw.start_time,
            end_time: raw.end_time,
            capacity: raw.capacity,
            booked,
            status: raw.status,
            duration_minutes: raw.duration_minutes,
            description: raw.description,
        }
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_slot_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_slot_time(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid time: {s}")))
}

fn serialize_time<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.format("%H:%M:%S").to_string())
}

impl VisitSlot {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Seats still open. Never negative, even if the snapshot reports more
    /// bookings than capacity.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.booked)
    }

    pub fn is_past(&self, now: NaiveDateTime) -> bool {
        self.starts_at() < now
    }

    pub fn is_selectable(&self, now: NaiveDateTime) -> bool {
        self.status == SlotStatus::Available && self.remaining() > 0 && !self.is_past(now)
    }

    pub fn view(&self, now: NaiveDateTime) -> SlotView {
        SlotView {
            slot: self.clone(),
            remaining: self.remaining(),
            is_past: self.is_past(now),
            selectable: self.is_selectable(now),
        }
    }
}

/// A slot annotated with the availability derived at one instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: VisitSlot,
    pub remaining: u32,
    pub is_past: bool,
    pub selectable: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub slots: Vec<SlotView>,
}

/// Groups upcoming open slots by day for the schedule browser.
///
/// Slots that already started or are not open for booking are dropped. Fully
/// booked slots stay listed but are marked as not selectable.
pub fn schedule_board(slots: &[VisitSlot], now: NaiveDateTime) -> Vec<ScheduleDay> {
    let mut by_date: BTreeMap<NaiveDate, Vec<SlotView>> = BTreeMap::new();

    for slot in slots {
        if slot.is_past(now) || slot.status != SlotStatus::Available {
            continue;
        }
        by_date.entry(slot.date).or_default().push(slot.view(now));
    }

    by_date
        .into_iter()
        .map(|(date, mut slots)| {
            slots.sort_by_key(|v| v.slot.start_time);
            ScheduleDay { date, slots }
        })
        .collect()
}
