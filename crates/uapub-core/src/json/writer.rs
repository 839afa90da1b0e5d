//! Container-stack JSON writer.
//!
//! Every encoder in this crate drives a [`JsonWriter`]: containers are opened
//! and closed explicitly (or through the scoped [`JsonWriter::structure`] /
//! [`JsonWriter::array`] wrappers) and leaves are written with typed methods.
//!
//! Rules enforced on every call:
//! - inside an object a field name is required;
//! - inside an array, and at the document root, a name is forbidden;
//! - the document has exactly one root value;
//! - a pop must match the innermost open container.
//!
//! Any violation poisons the writer: every later call fails and
//! [`JsonWriter::finish`] never hands out the partial buffer.

use base64::Engine;
use serde::Serialize;

use crate::error::{PubSubError, Result};
use crate::types::{DataValue, DateTime, StatusCode, Variant};

/// Kind of an open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Object,
    Array,
}

/// Open/close counters, for checking that encoders stay balanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterStats {
    pub opens: usize,
    pub closes: usize,
    pub max_depth: usize,
}

/// A value that writes its own fields into an already-open object.
pub trait JsonEncodable {
    fn encode_fields(&self, w: &mut JsonWriter) -> Result<()>;
}

#[derive(Debug)]
struct Frame {
    kind: Container,
    len: usize,
}

/// Streaming JSON writer with an explicit container stack.
#[derive(Debug)]
pub struct JsonWriter {
    out: String,
    stack: Vec<Frame>,
    root_written: bool,
    poisoned: bool,
    reversible: bool,
    stats: WriterStats,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWriter {
    /// Writer whose status codes default to the reversible form.
    pub fn new() -> Self {
        Self::with_reversible(true)
    }

    pub fn with_reversible(reversible: bool) -> Self {
        Self {
            out: String::with_capacity(256),
            stack: Vec::with_capacity(8),
            root_written: false,
            poisoned: false,
            reversible,
            stats: WriterStats::default(),
        }
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Hand out the finished document.
    pub fn finish(self) -> Result<String> {
        if self.poisoned {
            return Err(PubSubError::Writer("document abandoned after an earlier error".into()));
        }
        if !self.stack.is_empty() {
            return Err(PubSubError::Writer(format!(
                "{} container(s) left open",
                self.stack.len()
            )));
        }
        if !self.root_written {
            return Err(PubSubError::Writer("empty document".into()));
        }
        Ok(self.out)
    }

    // ---- containers

    pub fn push_structure(&mut self, name: Option<&str>) -> Result<()> {
        self.open(name, Container::Object)
    }

    pub fn pop_structure(&mut self) -> Result<()> {
        self.close(Container::Object)
    }

    pub fn push_array(&mut self, name: Option<&str>) -> Result<()> {
        self.open(name, Container::Array)
    }

    pub fn pop_array(&mut self) -> Result<()> {
        self.close(Container::Array)
    }

    /// Open an object, run `body`, close it. An error inside `body` poisons
    /// the writer so the unfinished document cannot be shipped.
    pub fn structure<F>(&mut self, name: Option<&str>, body: F) -> Result<()>
    where
        F: FnOnce(&mut JsonWriter) -> Result<()>,
    {
        self.push_structure(name)?;
        if let Err(e) = body(self) {
            self.poisoned = true;
            return Err(e);
        }
        self.pop_structure()
    }

    /// Array counterpart of [`JsonWriter::structure`].
    pub fn array<F>(&mut self, name: Option<&str>, body: F) -> Result<()>
    where
        F: FnOnce(&mut JsonWriter) -> Result<()>,
    {
        self.push_array(name)?;
        if let Err(e) = body(self) {
            self.poisoned = true;
            return Err(e);
        }
        self.pop_array()
    }

    fn open(&mut self, name: Option<&str>, kind: Container) -> Result<()> {
        self.begin_value(name)?;
        self.out.push(match kind {
            Container::Object => '{',
            Container::Array => '[',
        });
        self.stack.push(Frame { kind, len: 0 });
        self.stats.opens += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.stack.len());
        Ok(())
    }

    fn close(&mut self, kind: Container) -> Result<()> {
        self.ensure_usable()?;
        match self.stack.last() {
            Some(frame) if frame.kind == kind => {}
            Some(frame) => {
                let open = frame.kind;
                return Err(self.misuse(format!("pop {kind:?} while {open:?} is open")));
            }
            None => return Err(self.misuse(format!("pop {kind:?} with nothing open"))),
        }
        self.stack.pop();
        self.out.push(match kind {
            Container::Object => '}',
            Container::Array => ']',
        });
        self.stats.closes += 1;
        Ok(())
    }

    // ---- leaves

    pub fn write_null(&mut self, name: Option<&str>) -> Result<()> {
        self.begin_value(name)?;
        self.out.push_str("null");
        Ok(())
    }

    pub fn write_bool(&mut self, name: Option<&str>, v: bool) -> Result<()> {
        self.write_serialized(name, &v)
    }

    pub fn write_string(&mut self, name: Option<&str>, v: &str) -> Result<()> {
        self.write_serialized(name, v)
    }

    /// `null` when absent.
    pub fn write_opt_string(&mut self, name: Option<&str>, v: Option<&str>) -> Result<()> {
        match v {
            Some(s) => self.write_string(name, s),
            None => self.write_null(name),
        }
    }

    pub fn write_u16(&mut self, name: Option<&str>, v: u16) -> Result<()> {
        self.write_serialized(name, &v)
    }

    pub fn write_u32(&mut self, name: Option<&str>, v: u32) -> Result<()> {
        self.write_serialized(name, &v)
    }

    pub fn write_date_time(&mut self, name: Option<&str>, v: DateTime) -> Result<()> {
        self.write_string(name, &v.to_json_string())
    }

    /// Status code in the writer's default form.
    pub fn write_status_code(&mut self, name: Option<&str>, v: StatusCode) -> Result<()> {
        self.write_status_code_as(name, v, self.reversible)
    }

    /// Reversible: the numeric code. Otherwise `{"Code":n,"Symbol":".."}`.
    pub fn write_status_code_as(&mut self, name: Option<&str>, v: StatusCode, reversible: bool) -> Result<()> {
        if reversible {
            return self.write_u32(name, v.bits());
        }
        self.structure(name, |w| {
            w.write_u32(Some("Code"), v.bits())?;
            if let Some(symbol) = v.symbol() {
                w.write_string(Some("Symbol"), symbol)?;
            }
            Ok(())
        })
    }

    /// Reversible: `{"Type":id,"Body":..}`. Otherwise the bare body.
    /// A null variant is `null` either way.
    pub fn write_variant(&mut self, name: Option<&str>, v: &Variant, reversible: bool) -> Result<()> {
        match v.variant_type() {
            None => self.write_null(name),
            Some(ty) if reversible => self.structure(name, |w| {
                w.write_u32(Some("Type"), u32::from(ty.id()))?;
                w.write_variant_body(Some("Body"), v, true)
            }),
            Some(_) => self.write_variant_body(name, v, false),
        }
    }

    /// DataValue object. Absent attributes are left out; `Value` is always
    /// written.
    pub fn write_data_value(&mut self, name: Option<&str>, v: &DataValue, reversible: bool) -> Result<()> {
        self.structure(name, |w| {
            w.write_variant(Some("Value"), &v.value, reversible)?;
            if let Some(status) = v.status {
                w.write_status_code_as(Some("Status"), status, reversible)?;
            }
            if let Some(ts) = v.source_timestamp {
                w.write_date_time(Some("SourceTimestamp"), ts)?;
            }
            if let Some(ps) = v.source_picoseconds {
                w.write_u16(Some("SourcePicoseconds"), ps)?;
            }
            if let Some(ts) = v.server_timestamp {
                w.write_date_time(Some("ServerTimestamp"), ts)?;
            }
            if let Some(ps) = v.server_picoseconds {
                w.write_u16(Some("ServerPicoseconds"), ps)?;
            }
            Ok(())
        })
    }

    pub fn write_encodeable<T: JsonEncodable + ?Sized>(&mut self, name: Option<&str>, v: &T) -> Result<()> {
        self.structure(name, |w| v.encode_fields(w))
    }

    pub fn write_encodeable_array<T: JsonEncodable>(&mut self, name: Option<&str>, items: &[T]) -> Result<()> {
        self.array(name, |w| items.iter().try_for_each(|item| w.write_encodeable(None, item)))
    }

    fn write_variant_body(&mut self, name: Option<&str>, v: &Variant, reversible: bool) -> Result<()> {
        match v {
            Variant::Null => self.write_null(name),
            Variant::Boolean(b) => self.write_bool(name, *b),
            Variant::SByte(x) => self.write_serialized(name, x),
            Variant::Byte(x) => self.write_serialized(name, x),
            Variant::Int16(x) => self.write_serialized(name, x),
            Variant::UInt16(x) => self.write_serialized(name, x),
            Variant::Int32(x) => self.write_serialized(name, x),
            Variant::UInt32(x) => self.write_serialized(name, x),
            // 64-bit integers travel as strings so JavaScript readers keep precision.
            Variant::Int64(x) => self.write_string(name, &x.to_string()),
            Variant::UInt64(x) => self.write_string(name, &x.to_string()),
            Variant::Float(x) => match non_finite(f64::from(*x)) {
                Some(text) => self.write_string(name, text),
                None => self.write_serialized(name, x),
            },
            Variant::Double(x) => match non_finite(*x) {
                Some(text) => self.write_string(name, text),
                None => self.write_serialized(name, x),
            },
            Variant::String(s) => self.write_string(name, s),
            Variant::DateTime(dt) => self.write_date_time(name, *dt),
            Variant::Guid(g) => self.write_string(name, &g.hyphenated().to_string()),
            Variant::ByteString(b) => {
                let text = base64::engine::general_purpose::STANDARD.encode(b);
                self.write_string(name, &text)
            }
            Variant::StatusCode(code) => self.write_status_code_as(name, *code, reversible),
            Variant::Array(_, items) => self.array(name, |w| {
                items
                    .iter()
                    .try_for_each(|item| w.write_variant_body(None, item, reversible))
            }),
        }
    }

    // ---- plumbing

    fn write_serialized<T: Serialize + ?Sized>(&mut self, name: Option<&str>, v: &T) -> Result<()> {
        let text = serde_json::to_string(v)
            .map_err(|e| PubSubError::Internal(format!("json serialize failed: {e}")))?;
        self.begin_value(name)?;
        self.out.push_str(&text);
        Ok(())
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(PubSubError::Writer("writer poisoned by an earlier error".into()));
        }
        Ok(())
    }

    fn misuse(&mut self, msg: String) -> PubSubError {
        self.poisoned = true;
        tracing::debug!(error = %msg, "json writer misuse");
        PubSubError::Writer(msg)
    }

    /// Separator and key for the next value in the innermost container.
    fn begin_value(&mut self, name: Option<&str>) -> Result<()> {
        self.ensure_usable()?;
        let (kind, len) = match self.stack.last() {
            Some(frame) => (frame.kind, frame.len),
            None => {
                if self.root_written {
                    return Err(self.misuse("document already has a root value".into()));
                }
                if let Some(n) = name {
                    return Err(self.misuse(format!("field name {n:?} at document root")));
                }
                self.root_written = true;
                return Ok(());
            }
        };

        match (kind, name) {
            (Container::Object, None) => {
                return Err(self.misuse("field name required inside an object".into()));
            }
            (Container::Array, Some(n)) => {
                return Err(self.misuse(format!("field name {n:?} inside an array")));
            }
            _ => {}
        }

        if len > 0 {
            self.out.push(',');
        }
        if let Some(n) = name {
            let key = serde_json::to_string(n)
                .map_err(|e| PubSubError::Internal(format!("json serialize failed: {e}")))?;
            self.out.push_str(&key);
            self.out.push(':');
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.len += 1;
        }
        Ok(())
    }
}

fn non_finite(v: f64) -> Option<&'static str> {
    if v.is_nan() {
        Some("NaN")
    } else if v == f64::INFINITY {
        Some("Infinity")
    } else if v == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}
