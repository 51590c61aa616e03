//! Effect vocabulary and wire format.
//!
//! Everything the client does is expressed as an [`EffectEvent`]: a tagged
//! value from a closed set of kinds. The server pushes them, the reload
//! sequencer produces them, and handlers may return more of them. The kind
//! set is fixed; there is no dynamic registration of new kinds.
//!
//! # Wire format
//!
//! On the wire an effect is a JSON array of tag plus optional payload,
//! mirroring what the push channel delivers:
//!
//! ```text
//! ["@@SetOptions", { "tagNames": ["script"] }]
//! ["@@BrowserReload"]
//! ```
//!
//! Decoding is permissive where the payload is concerned: missing payload
//! fields fall back to defaults, unknown payload fields are retained, and
//! trailing array elements are ignored. The tag itself is strict: an unknown
//! tag fails decode so the transport can drop the frame.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EffectError;

// =============================================================================
// Effect Kinds
// =============================================================================

/// The closed set of effect identifiers.
///
/// Each kind has a stable string tag (the `@@`-prefixed form used on the
/// wire) available through [`EffectKind::as_str`] and `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectKind {
    /// A watched file changed; attempt an in-place patch.
    FileReload,
    /// A hard reload is imminent; subscribers get one turn to prepare.
    PreBrowserReload,
    /// Hard-reload the page, bypassing caches.
    BrowserReload,
    /// Point the browser at a different path or url.
    BrowserSetLocation,
    /// Replace the client options snapshot.
    SetOptions,
}

impl EffectKind {
    /// Every kind, in declaration order.
    pub const ALL: [EffectKind; 5] = [
        EffectKind::FileReload,
        EffectKind::PreBrowserReload,
        EffectKind::BrowserReload,
        EffectKind::BrowserSetLocation,
        EffectKind::SetOptions,
    ];

    /// The stable wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::FileReload => "@@FileReload",
            EffectKind::PreBrowserReload => "@@PreBrowserReload",
            EffectKind::BrowserReload => "@@BrowserReload",
            EffectKind::BrowserSetLocation => "@@BrowserSetLocation",
            EffectKind::SetOptions => "@@SetOptions",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = EffectError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| EffectError::UnknownEffect {
                tag: tag.to_string(),
            })
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Client options as pushed by the server via `SetOptions`.
///
/// The engine itself reads only `tag_names` (to derive the asset patcher's
/// config); everything else the server sends is retained untouched in
/// `extra` so collaborators watching the options slot can read their own
/// fields. `Default` is the defined initial value of the options slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Element tag names the asset patcher may rewrite in place.
    pub tag_names: Vec<String>,
    /// All other option fields, preserved as sent.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A file-change notification from the server's watcher.
///
/// Consumed opaquely: the engine forwards it to the asset patcher without
/// interpreting it. The typed fields cover the common shape; anything else
/// rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileEvent {
    /// Path of the changed file, relative to the served root.
    pub path: String,
    /// File name without directories.
    pub basename: String,
    /// Extension without the leading dot.
    pub ext: String,
    /// Watcher verb, e.g. `"change"`.
    pub event: String,
    /// All other payload fields, preserved as sent.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Payload of `BrowserSetLocation`.
///
/// `path` takes precedence over `url`; with neither present the effect is a
/// no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationChange {
    /// Path to append to the window's current protocol and host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Full url to navigate to verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl LocationChange {
    /// A change that navigates to `{protocol}//{host}{path}`.
    pub fn to_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            url: None,
        }
    }

    /// A change that navigates to `url` exactly.
    pub fn to_url(url: impl Into<String>) -> Self {
        Self {
            path: None,
            url: Some(url.into()),
        }
    }
}

// =============================================================================
// Effect Events
// =============================================================================

/// A tagged effect value: one variant per [`EffectKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEvent {
    /// A watched file changed.
    FileReload(FileEvent),
    /// Announcement that a hard reload lands next turn.
    PreBrowserReload,
    /// Hard-reload the page now.
    BrowserReload,
    /// Navigate the window.
    BrowserSetLocation(LocationChange),
    /// Replace the client options.
    SetOptions(ClientOptions),
}

impl EffectEvent {
    /// The kind tag of this event.
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectEvent::FileReload(_) => EffectKind::FileReload,
            EffectEvent::PreBrowserReload => EffectKind::PreBrowserReload,
            EffectEvent::BrowserReload => EffectKind::BrowserReload,
            EffectEvent::BrowserSetLocation(_) => EffectKind::BrowserSetLocation,
            EffectEvent::SetOptions(_) => EffectKind::SetOptions,
        }
    }

    /// Decode one wire frame (`[tag]` or `[tag, payload]`).
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::MalformedFrame`] when the frame is not a valid
    /// effect tuple; an unknown tag is reported inside that error so the
    /// transport can log and drop the frame.
    pub fn from_wire(frame: &str) -> Result<Self, EffectError> {
        serde_json::from_str(frame).map_err(EffectError::from)
    }

    /// Encode this event as a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::MalformedFrame`] if serialization fails.
    /// Practically infallible for this vocabulary; the `Result` keeps the
    /// codec surface symmetric with [`EffectEvent::from_wire`].
    pub fn to_wire(&self) -> Result<String, EffectError> {
        serde_json::to_string(self).map_err(EffectError::from)
    }
}

impl Serialize for EffectEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            EffectEvent::PreBrowserReload | EffectEvent::BrowserReload => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(self.kind().as_str())?;
                seq.end()
            }
            EffectEvent::FileReload(payload) => serialize_tagged(serializer, self.kind(), payload),
            EffectEvent::BrowserSetLocation(payload) => {
                serialize_tagged(serializer, self.kind(), payload)
            }
            EffectEvent::SetOptions(payload) => serialize_tagged(serializer, self.kind(), payload),
        }
    }
}

fn serialize_tagged<S, P>(serializer: S, kind: EffectKind, payload: &P) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    P: Serialize,
{
    let mut seq = serializer.serialize_seq(Some(2))?;
    seq.serialize_element(kind.as_str())?;
    seq.serialize_element(payload)?;
    seq.end()
}

impl<'de> Deserialize<'de> for EffectEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FrameVisitor;

        impl<'de> Visitor<'de> for FrameVisitor {
            type Value = EffectEvent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an effect frame [tag] or [tag, payload]")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let tag: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let kind: EffectKind = tag.parse().map_err(de::Error::custom)?;

                let event = match kind {
                    EffectKind::FileReload => {
                        EffectEvent::FileReload(seq.next_element()?.unwrap_or_default())
                    }
                    EffectKind::PreBrowserReload => EffectEvent::PreBrowserReload,
                    EffectKind::BrowserReload => EffectEvent::BrowserReload,
                    EffectKind::BrowserSetLocation => {
                        EffectEvent::BrowserSetLocation(seq.next_element()?.unwrap_or_default())
                    }
                    EffectKind::SetOptions => {
                        EffectEvent::SetOptions(seq.next_element()?.unwrap_or_default())
                    }
                };

                // Drain anything past the payload so sloppy frames still parse.
                while seq.next_element::<IgnoredAny>()?.is_some() {}

                Ok(event)
            }
        }

        deserializer.deserialize_seq(FrameVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_tags_round_trip() {
        for kind in EffectKind::ALL {
            assert_eq!(kind.as_str().parse::<EffectKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_tag_is_rejected_with_the_tag_named() {
        let err = "@@Nonsense".parse::<EffectKind>().unwrap_err();
        assert!(matches!(
            err,
            EffectError::UnknownEffect { ref tag } if tag == "@@Nonsense"
        ));
    }

    #[test]
    fn display_matches_wire_tag() {
        assert_eq!(EffectKind::FileReload.to_string(), "@@FileReload");
        assert_eq!(EffectKind::SetOptions.to_string(), "@@SetOptions");
    }

    #[test]
    fn event_kind_accessor_matches_variant() {
        assert_eq!(
            EffectEvent::FileReload(FileEvent::default()).kind(),
            EffectKind::FileReload
        );
        assert_eq!(
            EffectEvent::PreBrowserReload.kind(),
            EffectKind::PreBrowserReload
        );
        assert_eq!(EffectEvent::BrowserReload.kind(), EffectKind::BrowserReload);
        assert_eq!(
            EffectEvent::BrowserSetLocation(LocationChange::default()).kind(),
            EffectKind::BrowserSetLocation
        );
        assert_eq!(
            EffectEvent::SetOptions(ClientOptions::default()).kind(),
            EffectKind::SetOptions
        );
    }

    #[test]
    fn decodes_tag_only_frame() {
        let event = EffectEvent::from_wire(r#"["@@BrowserReload"]"#).unwrap();
        assert_eq!(event, EffectEvent::BrowserReload);
    }

    #[test]
    fn decodes_set_options_payload() {
        let event =
            EffectEvent::from_wire(r#"["@@SetOptions", {"tagNames": ["script", "link"]}]"#)
                .unwrap();
        let EffectEvent::SetOptions(options) = event else {
            panic!("expected SetOptions");
        };
        assert_eq!(options.tag_names, vec!["script", "link"]);
        assert!(options.extra.is_empty());
    }

    #[test]
    fn unknown_payload_fields_are_retained() {
        let event = EffectEvent::from_wire(
            r#"["@@SetOptions", {"tagNames": [], "notify": true, "scroll": {"sync": false}}]"#,
        )
        .unwrap();
        let EffectEvent::SetOptions(options) = event else {
            panic!("expected SetOptions");
        };
        assert_eq!(options.extra.get("notify"), Some(&json!(true)));
        assert_eq!(options.extra.get("scroll"), Some(&json!({"sync": false})));
    }

    #[test]
    fn missing_payload_decodes_to_defaults() {
        let event = EffectEvent::from_wire(r#"["@@BrowserSetLocation"]"#).unwrap();
        assert_eq!(
            event,
            EffectEvent::BrowserSetLocation(LocationChange::default())
        );

        let event = EffectEvent::from_wire(r#"["@@FileReload"]"#).unwrap();
        assert_eq!(event, EffectEvent::FileReload(FileEvent::default()));
    }

    #[test]
    fn partial_location_payload_fills_missing_fields() {
        let event = EffectEvent::from_wire(r#"["@@BrowserSetLocation", {"path": "/docs"}]"#)
            .unwrap();
        assert_eq!(
            event,
            EffectEvent::BrowserSetLocation(LocationChange::to_path("/docs"))
        );
    }

    #[test]
    fn trailing_frame_elements_are_ignored() {
        let event =
            EffectEvent::from_wire(r#"["@@BrowserReload", null, "stray"]"#).unwrap();
        assert_eq!(event, EffectEvent::BrowserReload);
    }

    #[test]
    fn unknown_tag_frame_fails_decode() {
        let err = EffectEvent::from_wire(r#"["@@Mystery", {}]"#).unwrap_err();
        assert!(matches!(err, EffectError::MalformedFrame(_)));
        assert!(err.to_string().contains("@@Mystery"));
    }

    #[test]
    fn non_array_frame_fails_decode() {
        let err = EffectEvent::from_wire(r#"{"kind": "@@BrowserReload"}"#).unwrap_err();
        assert!(matches!(err, EffectError::MalformedFrame(_)));
    }

    #[test]
    fn serializes_tag_only_kinds_as_single_element() {
        let value = serde_json::to_value(EffectEvent::PreBrowserReload).unwrap();
        assert_eq!(value, json!(["@@PreBrowserReload"]));
    }

    #[test]
    fn serializes_payload_kinds_as_tag_plus_payload() {
        let event = EffectEvent::SetOptions(ClientOptions {
            tag_names: vec!["img".to_string()],
            ..ClientOptions::default()
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!(["@@SetOptions", {"tagNames": ["img"]}]));
    }

    #[test]
    fn wire_encode_then_decode_preserves_payload() {
        let event = EffectEvent::FileReload(FileEvent {
            path: "css/site.css".to_string(),
            basename: "site.css".to_string(),
            ext: "css".to_string(),
            event: "change".to_string(),
            ..FileEvent::default()
        });
        let frame = event.to_wire().unwrap();
        assert_eq!(EffectEvent::from_wire(&frame).unwrap(), event);
    }

    #[test]
    fn location_change_constructors() {
        assert_eq!(
            LocationChange::to_path("/a"),
            LocationChange {
                path: Some("/a".to_string()),
                url: None
            }
        );
        assert_eq!(
            LocationChange::to_url("http://y.test/bar"),
            LocationChange {
                path: None,
                url: Some("http://y.test/bar".to_string())
            }
        );
    }
}
