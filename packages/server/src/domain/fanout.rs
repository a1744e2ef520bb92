//! Fan-out rules: which roles may emit an event type, and which rooms
//! receive a copy.
//!
//! | type | producer role | recipients |
//! |---|---|---|
//! | `location_update` | STAFF | `role:ENDUSER`, `role:OPERATOR` (origin excluded) |
//! | `chat_message` | any | `user:<recipientId>`; plus `role:OPERATOR` unless the origin is an OPERATOR |
//! | `trip_status` | STAFF, OPERATOR | every connection |
//! | `check_in` / `check_out` | STAFF | `role:ENDUSER`, `role:OPERATOR` |
//! | `emergency_alert` | any | `role:OPERATOR`; plus `role:ENDUSER` when the payload carries a `tripId` |
//! | `typing` | any | `user:<recipientId>` |
//!
//! Decisions are made from the authenticated role only. The payload is read
//! solely for addressing fields (`recipientId`, `tripId`).

use convoy_shared::{EventType, Role};
use serde_json::Value;

use super::{error::RoutingPolicyError, room::RoomName, value_object::UserId};

/// Target room set computed for a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutPlan {
    pub rooms: Vec<RoomName>,
    pub exclude_origin: bool,
}

pub struct FanoutPolicy;

impl FanoutPolicy {
    /// Whether `role` may emit `event_type`.
    pub fn is_permitted(role: Role, event_type: EventType) -> bool {
        match event_type {
            EventType::LocationUpdate | EventType::CheckIn | EventType::CheckOut => {
                role == Role::Staff
            }
            EventType::TripStatus => matches!(role, Role::Staff | Role::Operator),
            EventType::ChatMessage | EventType::EmergencyAlert | EventType::Typing => true,
        }
    }

    /// Compute the rooms that receive `event_type` emitted by `origin_role`.
    ///
    /// # Errors
    ///
    /// - `NotPermitted` when the role may not emit this type
    /// - `PayloadNotObject` when the payload is not a JSON object
    /// - `MissingRecipient` when a directed event has no usable `recipientId`
    pub fn plan(
        origin_role: Role,
        event_type: EventType,
        payload: &Value,
    ) -> Result<FanoutPlan, RoutingPolicyError> {
        if !Self::is_permitted(origin_role, event_type) {
            return Err(RoutingPolicyError::NotPermitted {
                event_type,
                role: origin_role,
            });
        }
        let Some(fields) = payload.as_object() else {
            return Err(RoutingPolicyError::PayloadNotObject { event_type });
        };

        let plan = match event_type {
            EventType::LocationUpdate => FanoutPlan {
                rooms: vec![RoomName::Role(Role::Enduser), RoomName::Role(Role::Operator)],
                exclude_origin: true,
            },
            EventType::CheckIn | EventType::CheckOut => FanoutPlan {
                rooms: vec![RoomName::Role(Role::Enduser), RoomName::Role(Role::Operator)],
                exclude_origin: false,
            },
            EventType::TripStatus => FanoutPlan {
                rooms: Role::ALL.into_iter().map(RoomName::Role).collect(),
                exclude_origin: false,
            },
            EventType::ChatMessage => {
                let recipient = recipient_of(event_type, fields.get("recipientId"))?;
                let mut rooms = vec![RoomName::User(recipient)];
                // Audit copy for operators, except when an operator is the sender
                if origin_role != Role::Operator {
                    rooms.push(RoomName::Role(Role::Operator));
                }
                FanoutPlan {
                    rooms,
                    exclude_origin: false,
                }
            }
            EventType::Typing => FanoutPlan {
                rooms: vec![RoomName::User(recipient_of(
                    event_type,
                    fields.get("recipientId"),
                )?)],
                exclude_origin: false,
            },
            EventType::EmergencyAlert => {
                let mut rooms = vec![RoomName::Role(Role::Operator)];
                if fields.get("tripId").is_some_and(|trip| !trip.is_null()) {
                    rooms.push(RoomName::Role(Role::Enduser));
                }
                FanoutPlan {
                    rooms,
                    exclude_origin: false,
                }
            }
        };

        Ok(plan)
    }
}

fn recipient_of(
    event_type: EventType,
    value: Option<&Value>,
) -> Result<UserId, RoutingPolicyError> {
    value
        .and_then(Value::as_str)
        .and_then(|id| UserId::new(id.to_string()).ok())
        .ok_or(RoutingPolicyError::MissingRecipient { event_type })
}
