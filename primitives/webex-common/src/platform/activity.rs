//! Translation of raw conversation activities into webhook-shaped events.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde_json::{Map, Value, json};

use super::PlatformEvent;
use crate::catalog::Resource;

/// Encodes an internal UUID as the platform's public identifier.
///
/// Public ids are the unpadded base64 of `ciscospark://us/{KIND}/{uuid}`.
pub fn public_id(kind: &str, uuid: &str) -> String {
    STANDARD_NO_PAD.encode(format!("ciscospark://us/{kind}/{uuid}"))
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Maps an activity verb to the resource/event it represents.
fn classify(verb: &str, object_type: Option<&str>) -> Option<(Resource, &'static str)> {
    let mapped = match verb {
        "post" | "share" => (Resource::Messages, "created"),
        "delete" => (Resource::Messages, "deleted"),
        "add" => (Resource::Memberships, "created"),
        "leave" => (Resource::Memberships, "deleted"),
        "assignModerator" | "unassignModerator" => (Resource::Memberships, "updated"),
        "create" if object_type == Some("conversation") => (Resource::Rooms, "created"),
        "update" | "lock" | "unlock" => (Resource::Rooms, "updated"),
        "cardAction" => (Resource::AttachmentActions, "created"),
        _ => return None,
    };
    Some(mapped)
}

/// Translates one `conversation.activity` payload.
///
/// Returns `None` for verbs that have no resource/event counterpart.
pub fn translate_activity(activity: &Value) -> Option<PlatformEvent> {
    let verb = str_at(activity, "/verb")?;
    let object_type = str_at(activity, "/object/objectType");
    let (resource, event) = classify(verb, object_type)?;

    let actor_uuid = str_at(activity, "/actor/entryUUID").or_else(|| str_at(activity, "/actor/id"));
    let room_uuid = str_at(activity, "/target/id");
    let object_uuid = str_at(activity, "/object/id");
    let created = activity.get("published").cloned().unwrap_or(Value::Null);

    let mut data = Map::new();
    match resource {
        Resource::Messages => {
            insert_id(&mut data, "id", "MESSAGE", object_uuid);
            insert_id(&mut data, "roomId", "ROOM", room_uuid);
            insert_id(&mut data, "personId", "PEOPLE", actor_uuid);
            insert_str(&mut data, "personEmail", str_at(activity, "/actor/emailAddress"));
        }
        Resource::Memberships => {
            if let (Some(person), Some(room)) = (object_uuid, room_uuid) {
                data.insert(
                    "id".into(),
                    Value::String(public_id("MEMBERSHIP", &format!("{person}:{room}"))),
                );
            }
            insert_id(&mut data, "roomId", "ROOM", room_uuid);
            insert_id(&mut data, "personId", "PEOPLE", object_uuid);
            insert_str(&mut data, "personEmail", str_at(activity, "/object/emailAddress"));
            data.insert(
                "isModerator".into(),
                Value::Bool(verb == "assignModerator"),
            );
        }
        Resource::Rooms => {
            let room = if verb == "create" { object_uuid } else { room_uuid.or(object_uuid) };
            insert_id(&mut data, "id", "ROOM", room);
            insert_id(&mut data, "creatorId", "PEOPLE", actor_uuid);
            data.insert("isLocked".into(), Value::Bool(verb == "lock"));
        }
        Resource::AttachmentActions => {
            insert_id(&mut data, "id", "ATTACHMENT_ACTION", object_uuid);
            insert_str(&mut data, "type", Some("submit"));
            insert_id(&mut data, "messageId", "MESSAGE", str_at(activity, "/parent/id"));
            insert_id(&mut data, "personId", "PEOPLE", actor_uuid);
            insert_id(&mut data, "roomId", "ROOM", room_uuid);
        }
    }
    data.insert("created".into(), created.clone());

    let mut value = json!({
        "resource": resource.name(),
        "event": event,
        "created": created,
        "data": Value::Object(data),
    });
    if let (Some(actor), Some(obj)) = (actor_uuid, value.as_object_mut()) {
        obj.insert("actorId".into(), Value::String(public_id("PEOPLE", actor)));
    }

    Some(PlatformEvent::new(resource, event, value))
}

fn insert_id(data: &mut Map<String, Value>, key: &str, kind: &str, uuid: Option<&str>) {
    if let Some(uuid) = uuid {
        data.insert(key.into(), Value::String(public_id(kind, uuid)));
    }
}

fn insert_str(data: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        data.insert(key.into(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_activity() -> Value {
        json!({
            "id": "a1",
            "verb": "post",
            "published": "2024-05-01T10:00:00.000Z",
            "actor": {
                "id": "p1",
                "entryUUID": "p1",
                "emailAddress": "alice@example.com"
            },
            "object": { "objectType": "comment", "id": "m1" },
            "target": { "objectType": "conversation", "id": "r1" }
        })
    }

    #[test]
    fn public_ids_use_unpadded_base64() {
        assert_eq!(
            public_id("PEOPLE", "p1"),
            STANDARD_NO_PAD.encode("ciscospark://us/PEOPLE/p1")
        );
        assert!(!public_id("ROOM", "r").ends_with('='));
    }

    #[test]
    fn post_becomes_message_created() {
        let event = translate_activity(&post_activity()).unwrap();

        assert_eq!(event.key(), "messages:created");
        assert_eq!(event.value["resource"], "messages");
        assert_eq!(event.value["event"], "created");
        assert_eq!(event.value["data"]["id"], public_id("MESSAGE", "m1"));
        assert_eq!(event.value["data"]["roomId"], public_id("ROOM", "r1"));
        assert_eq!(event.value["data"]["personEmail"], "alice@example.com");
        assert_eq!(event.value["actorId"], public_id("PEOPLE", "p1"));
    }

    #[test]
    fn membership_verbs_are_classified() {
        let mut activity = post_activity();
        activity["verb"] = json!("add");
        activity["object"] = json!({ "objectType": "person", "id": "p2", "emailAddress": "bob@example.com" });

        let event = translate_activity(&activity).unwrap();
        assert_eq!(event.key(), "memberships:created");
        assert_eq!(event.value["data"]["personEmail"], "bob@example.com");
        assert_eq!(event.value["data"]["id"], public_id("MEMBERSHIP", "p2:r1"));

        activity["verb"] = json!("assignModerator");
        let event = translate_activity(&activity).unwrap();
        assert_eq!(event.key(), "memberships:updated");
        assert_eq!(event.value["data"]["isModerator"], true);
    }

    #[test]
    fn create_only_counts_for_conversations() {
        let mut activity = post_activity();
        activity["verb"] = json!("create");
        assert!(translate_activity(&activity).is_none());

        activity["object"] = json!({ "objectType": "conversation", "id": "r9" });
        let event = translate_activity(&activity).unwrap();
        assert_eq!(event.key(), "rooms:created");
        assert_eq!(event.value["data"]["id"], public_id("ROOM", "r9"));
    }

    #[test]
    fn unknown_verbs_are_dropped() {
        let mut activity = post_activity();
        activity["verb"] = json!("acknowledge");
        assert!(translate_activity(&activity).is_none());
    }
}
