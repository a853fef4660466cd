//! Events exchanged through the hub.
//!
//! Inbound frames are parsed by the DTO layer and converted into these types,
//! which are only constructible through validating constructors. Anything that
//! reaches a usecase is therefore already within its documented bounds.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

pub const DEFAULT_HAMSTER_VARIANT: &str = "default";
pub const DEFAULT_HAMSTER_DURATION_MS: u64 = 3_000;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 4_000;

const HAMSTER_VARIANT_CHARS: RangeInclusive<usize> = 1..=64;
const HAMSTER_DURATION_MS: RangeInclusive<u64> = 300..=30_000;
const TOAST_MESSAGE_CHARS: RangeInclusive<usize> = 1..=280;
const TOAST_DURATION_MS: RangeInclusive<u64> = 500..=10_000;

/// Visual severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Blue,
    Green,
    Pink,
    Red,
    Info,
    Success,
    Warn,
    Critical,
}

/// The fixed set of reactions a participant can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Love,
    Like,
    Dislike,
    Party,
}

/// Who an event is addressed to: one identifier or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    One(String),
    Many(Vec<String>),
}

impl Target {
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Target::One(id) => vec![id.as_str()],
            Target::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.identifiers().iter().any(|id| id.is_empty()) {
            return Err(ValidationError::EmptyIdentifier { field: "target" });
        }
        Ok(())
    }
}

fn check_chars(
    field: &'static str,
    value: &str,
    range: RangeInclusive<usize>,
) -> Result<(), ValidationError> {
    if range.contains(&value.chars().count()) {
        Ok(())
    } else {
        Err(ValidationError::Length {
            field,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn check_range(
    field: &'static str,
    value: u64,
    range: RangeInclusive<u64>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn check_target(target: Option<&Target>) -> Result<(), ValidationError> {
    target.map_or(Ok(()), Target::validate)
}

/// A hamster animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hamster {
    pub variant: String,
    pub duration: u64,
    pub target: Option<Target>,
    pub sender: Option<String>,
}

impl Hamster {
    pub fn new(
        variant: Option<String>,
        duration: Option<u64>,
        target: Option<Target>,
        sender: Option<String>,
    ) -> Result<Self, ValidationError> {
        let variant = variant.unwrap_or_else(|| DEFAULT_HAMSTER_VARIANT.to_string());
        let duration = duration.unwrap_or(DEFAULT_HAMSTER_DURATION_MS);
        check_chars("variant", &variant, HAMSTER_VARIANT_CHARS)?;
        check_range("duration", duration, HAMSTER_DURATION_MS)?;
        check_target(target.as_ref())?;
        Ok(Self {
            variant,
            duration,
            target,
            sender,
        })
    }
}

/// A toast message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
    pub duration: u64,
    pub spoiler: bool,
    pub target: Option<Target>,
    pub sender: Option<String>,
}

impl Toast {
    pub fn new(
        message: Option<String>,
        severity: Option<Severity>,
        duration: Option<u64>,
        spoiler: Option<bool>,
        target: Option<Target>,
        sender: Option<String>,
    ) -> Result<Self, ValidationError> {
        let message = message.ok_or(ValidationError::Missing { field: "message" })?;
        let duration = duration.unwrap_or(DEFAULT_TOAST_DURATION_MS);
        check_chars("message", &message, TOAST_MESSAGE_CHARS)?;
        check_range("duration", duration, TOAST_DURATION_MS)?;
        check_target(target.as_ref())?;
        Ok(Self {
            message,
            severity: severity.unwrap_or_default(),
            duration,
            spoiler: spoiler.unwrap_or(false),
            target,
            sender,
        })
    }
}

/// A point-to-point reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub target_user_id: String,
    pub reaction: ReactionKind,
    pub from_user: String,
}

impl Reaction {
    pub fn new(
        target_user_id: Option<String>,
        reaction: Option<ReactionKind>,
        from_user: Option<String>,
    ) -> Result<Self, ValidationError> {
        let non_empty = |field: &'static str, value: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(ValidationError::Missing { field })
        };
        Ok(Self {
            target_user_id: non_empty("targetUserId", target_user_id)?,
            reaction: reaction.ok_or(ValidationError::Missing { field: "reaction" })?,
            from_user: non_empty("fromUser", from_user)?,
        })
    }
}

/// Events that fan out through the delivery router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEvent {
    Hamster(Hamster),
    Toast(Toast),
}

impl BroadcastEvent {
    /// Wire name of the event type
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastEvent::Hamster(_) => "hamster",
            BroadcastEvent::Toast(_) => "toast",
        }
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            BroadcastEvent::Hamster(h) => h.target.as_ref(),
            BroadcastEvent::Toast(t) => t.target.as_ref(),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match self {
            BroadcastEvent::Hamster(h) => h.sender.as_deref(),
            BroadcastEvent::Toast(t) => t.sender.as_deref(),
        }
    }

    /// Replace whatever sender the event claimed
    pub fn set_sender(&mut self, sender: String) {
        match self {
            BroadcastEvent::Hamster(h) => h.sender = Some(sender),
            BroadcastEvent::Toast(t) => t.sender = Some(sender),
        }
    }
}

/// Every event a live connection may send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Broadcast(BroadcastEvent),
    Reaction(Reaction),
    UpdateName(String),
}
