use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::error::HookError;

/// One line of post-receive input: `<old> <new> <ref>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub old: String,
    pub new: String,
    pub refname: String,
}

impl PushEvent {
    /// An all-zero new pointer means the push removed the ref.
    pub fn is_ref_deletion(&self) -> bool {
        is_null_oid(&self.new)
    }

    /// Ref name without the `refs/heads/` prefix.
    pub fn short_ref(&self) -> &str {
        self.refname
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.refname)
    }
}

impl FromStr for PushEvent {
    type Err = HookError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [old, new, refname] => Ok(PushEvent {
                old: old.to_string(),
                new: new.to_string(),
                refname: refname.to_string(),
            }),
            _ => Err(HookError::MalformedPushLine(line.trim().to_string())),
        }
    }
}

pub fn is_null_oid(oid: &str) -> bool {
    !oid.is_empty() && oid.bytes().all(|b| b == b'0')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `%Y-%m-%dT%H:%M:%S` followed by the commit's own `+hhmm` offset.
    pub date: String,
    /// Seconds since the epoch, 0 when the date could not be parsed.
    pub timestamp: i64,
    pub message: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    /// Remaining header fields (`merge`, `commit`, ...), keys lower-cased.
    pub fields: BTreeMap<String, String>,
}

impl Revision {
    pub fn short_id(&self) -> &str {
        abbreviate(&self.id)
    }
}

/// First seven characters of an object id.
pub fn abbreviate(id: &str) -> &str {
    match id.char_indices().nth(7) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Attachment {
    pub fallback: String,
    pub author_name: String,
    pub author_link: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    pub text: String,
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Payload {
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_line() {
        let event: PushEvent = "1111111 2222222 refs/heads/main\n".parse().unwrap();
        assert_eq!(event.old, "1111111");
        assert_eq!(event.new, "2222222");
        assert_eq!(event.short_ref(), "main");
        assert!(!event.is_ref_deletion());
    }

    #[test]
    fn rejects_short_push_line() {
        let err = "abc refs/heads/main".parse::<PushEvent>().unwrap_err();
        assert!(matches!(err, HookError::MalformedPushLine(_)));
    }

    #[test]
    fn detects_ref_deletion() {
        let event = PushEvent {
            old: "abc".to_string(),
            new: "0".repeat(40),
            refname: "refs/tags/v1".to_string(),
        };
        assert!(event.is_ref_deletion());
        assert_eq!(event.short_ref(), "refs/tags/v1");
    }

    #[test]
    fn abbreviates_ids() {
        assert_eq!(abbreviate("0123456789abcdef"), "0123456");
        assert_eq!(abbreviate("abc"), "abc");
    }

    #[test]
    fn attachment_omits_unset_optional_fields() {
        let attachment = Attachment {
            fallback: "f".to_string(),
            author_name: "A".to_string(),
            author_link: "mailto:a@b".to_string(),
            title: "0123456".to_string(),
            title_link: None,
            text: "t".to_string(),
            ts: 1,
            color: None,
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert!(json.get("title_link").is_none());
        assert!(json.get("color").is_none());
        assert_eq!(json["ts"], 1);
    }
}
