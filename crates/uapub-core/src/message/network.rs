//! Network message encoder: envelope fields and document shape.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{PubSubError, Result};
use crate::json::decode::{as_object, opt_string, parse_document, required_string};
use crate::json::writer::JsonWriter;
use crate::mask::{DataSetFieldContentMask, DataSetMessageContentMask, NetworkMessageContentMask as N};
use crate::message::dataset::DataSetMessage;

/// `MessageType` of every data network message.
pub const MESSAGE_TYPE_DATA: &str = "ua-data";

/// Outermost JSON container of a network message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// Envelope object; dataset messages under `Messages`.
    Envelope,
    /// Bare array of dataset message objects.
    Array,
    /// The lone dataset message object promoted to the root.
    SingleMessage,
}

/// Document shape derived from the network content mask.
///
/// | NetworkMessageHeader | SingleDataSetMessage | root |
/// |---|---|---|
/// | set | set | envelope, `Messages` is one object |
/// | set | unset | envelope, `Messages` is an array |
/// | unset | set | single message object |
/// | unset | unset | bare array |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub root: Root,
    pub single: bool,
    pub dataset_header: bool,
}

impl Layout {
    pub fn for_mask(mask: N) -> Self {
        let single = mask.contains(N::SINGLE_DATA_SET_MESSAGE);
        let root = match (mask.contains(N::NETWORK_MESSAGE_HEADER), single) {
            (true, _) => Root::Envelope,
            (false, true) => Root::SingleMessage,
            (false, false) => Root::Array,
        };
        Self {
            root,
            single,
            dataset_header: mask.contains(N::DATA_SET_MESSAGE_HEADER),
        }
    }
}

/// Masks a reader is configured with; they must match the publisher's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderSettings {
    pub network_content_mask: N,
    pub data_set_content_mask: DataSetMessageContentMask,
    pub field_content_mask: DataSetFieldContentMask,
}

/// Top-level PubSub message.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMessage {
    pub message_id: String,
    pub publisher_id: Option<String>,
    pub dataset_class_id: Option<Uuid>,
    pub reply_to: Option<String>,
    pub messages: Vec<DataSetMessage>,
    pub content_mask: N,
}

impl NetworkMessage {
    /// Empty message with a fresh UUID v4 message id.
    pub fn new(content_mask: N) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            publisher_id: None,
            dataset_class_id: None,
            reply_to: None,
            messages: Vec::new(),
            content_mask,
        }
    }

    /// Caller-contract checks run before anything is written.
    pub fn validate(&self) -> Result<()> {
        if self.content_mask.contains(N::SINGLE_DATA_SET_MESSAGE) && self.messages.len() > 1 {
            tracing::debug!(messages = self.messages.len(), "single dataset message mode with a list");
            return Err(PubSubError::SingleMessageCount(self.messages.len()));
        }
        Ok(())
    }

    /// Encode into a caller-supplied writer. The writer must be fresh.
    pub fn encode_with(&self, w: &mut JsonWriter) -> Result<()> {
        self.validate()?;
        let layout = Layout::for_mask(self.content_mask);
        tracing::trace!(?layout, messages = self.messages.len(), "encoding network message");

        match layout.root {
            Root::Envelope => w.structure(None, |w| {
                w.write_string(Some("MessageId"), &self.message_id)?;
                w.write_string(Some("MessageType"), MESSAGE_TYPE_DATA)?;
                w.write_opt_string(Some("PublisherId"), self.envelope_str(N::PUBLISHER_ID, self.publisher_id.as_deref()))?;
                let class_id = self
                    .dataset_class_id
                    .filter(|_| self.content_mask.contains(N::DATA_SET_CLASS_ID))
                    .map(|id| id.hyphenated().to_string());
                w.write_opt_string(Some("DataSetClassId"), class_id.as_deref())?;
                w.write_opt_string(Some("ReplyTo"), self.envelope_str(N::REPLY_TO, self.reply_to.as_deref()))?;
                if self.messages.is_empty() {
                    return Ok(());
                }
                self.write_messages(w, Some("Messages"), layout)
            }),
            Root::Array => self.write_messages(w, None, layout),
            Root::SingleMessage => match self.messages.first() {
                Some(m) => m.write(w, None, layout.dataset_header),
                None => w.structure(None, |_| Ok(())),
            },
        }
    }

    pub fn encode_json(&self) -> Result<String> {
        let mut w = JsonWriter::new();
        self.encode_with(&mut w)?;
        w.finish()
    }

    pub fn encode_bytes(&self) -> Result<Bytes> {
        self.encode_json().map(Bytes::from)
    }

    fn envelope_str<'a>(&self, flag: N, value: Option<&'a str>) -> Option<&'a str> {
        value.filter(|_| self.content_mask.contains(flag))
    }

    fn write_messages(&self, w: &mut JsonWriter, name: Option<&str>, layout: Layout) -> Result<()> {
        if layout.single {
            return match self.messages.first() {
                Some(m) => m.write(w, name, layout.dataset_header),
                None => Ok(()),
            };
        }
        if layout.dataset_header {
            return w.write_encodeable_array(name, &self.messages);
        }
        w.array(name, |w| self.messages.iter().try_for_each(|m| m.write(w, None, false)))
    }

    /// Parse a document produced under the reader's masks.
    ///
    /// Fields switched off by the masks come back empty. A promoted single
    /// message root of `{}` decodes as an empty message list. Repeated keys
    /// anywhere in the document are rejected.
    pub fn decode_json(text: &str, settings: &ReaderSettings) -> Result<Self> {
        let doc = parse_document(text)?;
        let layout = Layout::for_mask(settings.network_content_mask);
        let mut msg = NetworkMessage {
            message_id: String::new(),
            publisher_id: None,
            dataset_class_id: None,
            reply_to: None,
            messages: Vec::new(),
            content_mask: settings.network_content_mask,
        };

        let messages = match layout.root {
            Root::Envelope => {
                let obj = as_object(&doc, "network message")?;
                msg.message_id = required_string(obj, "MessageId")?;
                let ty = required_string(obj, "MessageType")?;
                if ty != MESSAGE_TYPE_DATA {
                    return Err(PubSubError::decode(format!("unsupported MessageType {ty:?}")));
                }
                msg.publisher_id = opt_string(obj, "PublisherId")?;
                msg.dataset_class_id = opt_string(obj, "DataSetClassId")?
                    .map(|s| {
                        Uuid::parse_str(&s).map_err(|e| PubSubError::decode(format!("DataSetClassId {s:?}: {e}")))
                    })
                    .transpose()?;
                msg.reply_to = opt_string(obj, "ReplyTo")?;
                obj.get("Messages").filter(|v| !v.is_null())
            }
            Root::SingleMessage if doc.as_object().is_some_and(|o| o.is_empty()) => None,
            Root::Array | Root::SingleMessage => Some(&doc),
        };

        if let Some(v) = messages {
            msg.messages = if layout.single {
                vec![DataSetMessage::read(v, layout.dataset_header, settings)?]
            } else {
                v.as_array()
                    .ok_or_else(|| PubSubError::decode(format!("expected array of dataset messages, got {v}")))?
                    .iter()
                    .map(|m| DataSetMessage::read(m, layout.dataset_header, settings))
                    .collect::<Result<Vec<_>>>()?
            };
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::dataset::DataSetPayload;
    use crate::types::Variant;

    fn msg(mask: N, n: usize) -> NetworkMessage {
        let mut m = NetworkMessage::new(mask);
        m.message_id = "id-1".into();
        for i in 0..n {
            let payload = DataSetPayload::from_pairs([("v", Variant::Int32(i as i32))]).unwrap();
            m.messages.push(DataSetMessage::new(1, payload));
        }
        m
    }

    #[test]
    fn layout_table() {
        assert_eq!(Layout::for_mask(N::empty()).root, Root::Array);
        assert_eq!(Layout::for_mask(N::SINGLE_DATA_SET_MESSAGE).root, Root::SingleMessage);
        assert_eq!(Layout::for_mask(N::NETWORK_MESSAGE_HEADER).root, Root::Envelope);
        let l = Layout::for_mask(N::NETWORK_MESSAGE_HEADER | N::SINGLE_DATA_SET_MESSAGE);
        assert_eq!(l.root, Root::Envelope);
        assert!(l.single);
        assert!(!l.dataset_header);
    }

    #[test]
    fn envelope_nulls_when_flags_unset() {
        let mut m = msg(N::NETWORK_MESSAGE_HEADER, 0);
        m.publisher_id = Some("p".into());
        m.reply_to = Some("r".into());
        assert_eq!(
            m.encode_json().unwrap(),
            r#"{"MessageId":"id-1","MessageType":"ua-data","PublisherId":null,"DataSetClassId":null,"ReplyTo":null}"#
        );
    }

    #[test]
    fn empty_lists_per_root() {
        assert_eq!(msg(N::empty(), 0).encode_json().unwrap(), "[]");
        assert_eq!(msg(N::SINGLE_DATA_SET_MESSAGE, 0).encode_json().unwrap(), "{}");
    }

    #[test]
    fn headerless_envelope_array() {
        let m = msg(N::NETWORK_MESSAGE_HEADER | N::REPLY_TO, 2);
        let mut with_reply = m.clone();
        with_reply.reply_to = Some("opc.udp://10.0.0.1:4840".into());
        assert_eq!(
            with_reply.encode_json().unwrap(),
            concat!(
                r#"{"MessageId":"id-1","MessageType":"ua-data","PublisherId":null,"DataSetClassId":null,"#,
                r#""ReplyTo":"opc.udp://10.0.0.1:4840","Messages":[{"v":{"Type":6,"Body":0}},{"v":{"Type":6,"Body":1}}]}"#
            )
        );
    }

    #[test]
    fn single_mode_rejects_lists() {
        let err = msg(N::SINGLE_DATA_SET_MESSAGE, 2).encode_json().unwrap_err();
        assert_eq!(err.code().as_str(), "SINGLE_MESSAGE_COUNT");
    }

    #[test]
    fn promoted_single_message() {
        let out = msg(N::SINGLE_DATA_SET_MESSAGE | N::DATA_SET_MESSAGE_HEADER, 1).encode_json().unwrap();
        assert!(out.starts_with(r#"{"DataSetWriterId":"1""#), "{out}");
    }

    #[test]
    fn decode_rejects_other_message_types() {
        let settings = ReaderSettings {
            network_content_mask: N::NETWORK_MESSAGE_HEADER,
            ..ReaderSettings::default()
        };
        let err = NetworkMessage::decode_json(r#"{"MessageId":"x","MessageType":"ua-metadata"}"#, &settings)
            .unwrap_err();
        assert_eq!(err.code().as_str(), "DECODE");
        assert!(NetworkMessage::decode_json("not json", &settings).is_err());
    }

    #[test]
    fn decode_promoted_empty_object() {
        let settings = ReaderSettings {
            network_content_mask: N::SINGLE_DATA_SET_MESSAGE,
            ..ReaderSettings::default()
        };
        let m = NetworkMessage::decode_json("{}", &settings).unwrap();
        assert!(m.messages.is_empty());
    }
}
