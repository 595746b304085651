//! Fixed catalog of platform resources and the events each one emits.
//!
//! Every resource is selected by a short alias at the prompt. Events have no
//! alias of their own: the first letter of the event name is used, which is
//! unambiguous inside any single resource's event pool.

use std::fmt;

use crate::error::InputError;

/// Event name that expands to every concrete event of a resource.
pub const ALL_EVENTS: &str = "all";

/// Alias that selects every resource at once.
pub const ALL_RESOURCES_ALIAS: &str = "a";

/// A category of platform entity that can emit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Rooms,
    Messages,
    Memberships,
    AttachmentActions,
}

impl Resource {
    /// Firehose ordering of the catalog.
    pub const ALL: [Resource; 4] = [
        Resource::Rooms,
        Resource::Messages,
        Resource::Memberships,
        Resource::AttachmentActions,
    ];

    /// Name used by the platform for this resource.
    pub fn name(self) -> &'static str {
        match self {
            Resource::Rooms => "rooms",
            Resource::Messages => "messages",
            Resource::Memberships => "memberships",
            Resource::AttachmentActions => "attachmentActions",
        }
    }

    /// Short alias typed at the resource prompt.
    pub fn alias(self) -> &'static str {
        match self {
            Resource::Rooms => "r",
            Resource::Messages => "m",
            Resource::Memberships => "mm",
            Resource::AttachmentActions => "aa",
        }
    }

    /// Supported events, in prompt order.
    ///
    /// Membership `seen` events (read receipts) are not relayed.
    pub fn events(self) -> &'static [&'static str] {
        match self {
            Resource::Rooms => &["all", "created", "updated"],
            Resource::Messages => &["all", "created", "deleted"],
            Resource::Memberships => &["all", "created", "updated", "deleted"],
            Resource::AttachmentActions => &["created"],
        }
    }

    /// Events with the synthetic `all` removed.
    pub fn concrete_events(self) -> impl Iterator<Item = &'static str> {
        self.events().iter().copied().filter(|e| *e != ALL_EVENTS)
    }

    /// Looks a resource up by its prompt alias.
    pub fn from_alias(alias: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|r| r.alias() == alias)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which events of a resource to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSelection {
    All,
    One(&'static str),
}

impl EventSelection {
    /// Expands the selection into concrete event names for `resource`.
    pub fn concrete_events(&self, resource: Resource) -> Vec<&'static str> {
        match self {
            EventSelection::All => resource.concrete_events().collect(),
            EventSelection::One(event) => vec![*event],
        }
    }

    /// Whether `event` is covered by this selection.
    pub fn matches(&self, event: &str) -> bool {
        match self {
            EventSelection::All => event != ALL_EVENTS,
            EventSelection::One(selected) => *selected == event,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventSelection::All => ALL_EVENTS,
            EventSelection::One(event) => *event,
        }
    }
}

impl fmt::Display for EventSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of the resource prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSelection {
    All,
    One(Resource),
}

/// Parses an answer to the resource prompt.
pub fn parse_resource_alias(answer: &str) -> Result<ResourceSelection, InputError> {
    let answer = answer.trim();

    if answer.is_empty() {
        return Err(InputError::ResponseEmpty);
    }

    if answer == ALL_RESOURCES_ALIAS {
        return Ok(ResourceSelection::All);
    }

    Resource::from_alias(answer)
        .map(ResourceSelection::One)
        .ok_or(InputError::InvalidSelection)
}

/// Parses an answer to the event prompt against the pool of `resource`.
pub fn parse_event_alias(resource: Resource, answer: &str) -> Result<EventSelection, InputError> {
    let answer = answer.trim();

    if answer.is_empty() {
        return Err(InputError::ResponseEmpty);
    }

    let event = resource
        .events()
        .iter()
        .copied()
        .find(|event| event_alias(event) == answer)
        .ok_or(InputError::EventInvalid)?;

    if event == ALL_EVENTS {
        Ok(EventSelection::All)
    } else {
        Ok(EventSelection::One(event))
    }
}

/// Prompt alias of an event name.
pub fn event_alias(event: &str) -> &str {
    event.get(..1).unwrap_or(event)
}

/// Renders the choices of the resource prompt.
pub fn resource_choices() -> String {
    let mut choices = vec![format!("{ALL_RESOURCES_ALIAS} - all")];
    choices.extend(
        Resource::ALL
            .iter()
            .map(|r| format!("{} - {}", r.alias(), r.name())),
    );
    format!("[ {} ]", choices.join(", "))
}

/// Renders the choices of the event prompt for `resource`.
pub fn event_choices(resource: Resource) -> String {
    let choices: Vec<String> = resource
        .events()
        .iter()
        .map(|e| format!("{} - {e}", event_alias(e)))
        .collect();
    format!("[ {} ]", choices.join(", "))
}
