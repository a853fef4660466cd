//! Target resolution.
//!
//! Pure functions mapping an event's `target` onto connections. The registry
//! evaluates them against its own snapshot; nothing here touches membership
//! state.
//!
//! Resolution order:
//!
//! 1. no target / empty list → everyone
//! 2. `"all"` → everyone
//! 3. `"me"` → the connection whose display name equals the event's sender
//! 4. otherwise, case-insensitive match on display name, session id or
//!    `"<displayName> (<remoteAddress>)"`

use super::{connection::Connection, event::Target};

const TARGET_ALL: &str = "all";
const TARGET_ME: &str = "me";
const MAPPED_ADDRESS_SEPARATOR: &str = "-::ffff:";

/// Whether `connection` should receive an event with the given target and sender.
pub fn should_deliver(connection: &Connection, target: Option<&Target>, sender: Option<&str>) -> bool {
    let Some(target) = target else {
        return true;
    };
    let identifiers = target.identifiers();
    if identifiers.is_empty() || identifiers.contains(&TARGET_ALL) {
        return true;
    }

    identifiers.iter().any(|id| {
        if *id == TARGET_ME {
            sender.is_some_and(|s| connection.display_name.as_str() == s)
        } else {
            matches_identifier(connection, id)
        }
    })
}

fn matches_identifier(connection: &Connection, identifier: &str) -> bool {
    let wanted = identifier.to_lowercase();
    connection.display_name.as_str().to_lowercase() == wanted
        || connection.id.as_str().to_lowercase() == wanted
        || connection.composite_label().to_lowercase() == wanted
}

/// Whether `connection` is the one a reaction's `targetUserId` points at.
///
/// Session ids match exactly; names and aliases case-insensitively.
pub fn matches_reaction_target(connection: &Connection, target_user_id: &str) -> bool {
    connection.id.as_str() == target_user_id
        || connection.display_name.eq_ignore_case(target_user_id)
        || connection.composite_label().eq_ignore_ascii_case(target_user_id)
        || connection.dashed_alias().eq_ignore_ascii_case(target_user_id)
}

/// Human-readable recipient summary attached to toasts, e.g. "to alice and bob".
pub fn describe_recipients(target: Option<&Target>) -> String {
    const EVERYONE: &str = "to everyone";

    let Some(target) = target else {
        return EVERYONE.to_string();
    };
    let identifiers = target.identifiers();
    if identifiers.is_empty()
        || identifiers
            .iter()
            .any(|id| *id == TARGET_ALL || *id == TARGET_ME)
    {
        return EVERYONE.to_string();
    }

    let names: Vec<&str> = identifiers.into_iter().map(strip_address_suffix).collect();
    match names.as_slice() {
        [single] => format!("to {single}"),
        [init @ .., last] => format!("to {} and {}", init.join(", "), last),
        [] => EVERYONE.to_string(),
    }
}

/// `"alice-::ffff:10.0.0.1"` → `"alice"`
fn strip_address_suffix(identifier: &str) -> &str {
    identifier
        .find(MAPPED_ADDRESS_SEPARATOR)
        .map_or(identifier, |idx| &identifier[..idx])
}
