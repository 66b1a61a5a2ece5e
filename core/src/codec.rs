//! Leaf-level bidirectional conversion between raw wire values and typed
//! values.
//!
//! # Design
//! A `Codec` pairs a total, non-panicking `decode` (failures carry the
//! offending raw value) with a total `encode`. Raw types follow the wire
//! location a codec is bound to:
//!
//! | location                  | raw              |
//! |---------------------------|------------------|
//! | path segment              | `String`         |
//! | remaining path            | `Vec<String>`    |
//! | query / header / cookie   | `Vec<String>`    |
//! | all query parameters      | `QueryParams`    |
//! | all headers               | `Vec<Header>`    |
//! | status code               | `u16`            |
//! | body                      | any `BodyRaw`    |
//!
//! Multi-valued locations are adapted to scalar codecs with `Required`,
//! `Optional` and `List`. Nodes store codecs type-erased behind
//! `ErasedCodec`, which moves values in and out of `Params`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::body::{BodyKind, BodyRaw, ByteStream, RawBody};
use crate::error::{DecodeError, DecodeResult};
use crate::params::Params;
use crate::schema::Schema;

/// Media type family of a codec's raw representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFormat {
    TextPlain,
    Json,
    OctetStream,
}

impl CodecFormat {
    pub fn media_type(self) -> &'static str {
        match self {
            CodecFormat::TextPlain => "text/plain; charset=utf-8",
            CodecFormat::Json => "application/json",
            CodecFormat::OctetStream => "application/octet-stream",
        }
    }
}

pub trait Codec: Send + Sync + 'static {
    type Raw;
    type Value: Send + 'static;

    fn decode(&self, raw: Self::Raw) -> DecodeResult<Self::Value>;

    fn encode(&self, value: Self::Value) -> Self::Raw;

    fn schema(&self) -> Schema;

    fn format(&self) -> CodecFormat {
        CodecFormat::TextPlain
    }

    fn map<B: Send + 'static>(self, mapping: Mapping<Self::Value, B>) -> MappedCodec<Self, B>
    where
        Self: Sized,
    {
        MappedCodec {
            inner: self,
            mapping,
        }
    }

    /// Rejects decoded values for which `check` returns an error message.
    fn validate<F>(self, check: F) -> Validated<Self, F>
    where
        Self: Sized,
        F: Fn(&Self::Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Validated { inner: self, check }
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// A bidirectional transform, partial in the decode direction.
pub struct Mapping<A, B> {
    decode: Arc<dyn Fn(A) -> DecodeResult<B> + Send + Sync>,
    encode: Arc<dyn Fn(B) -> A + Send + Sync>,
}

impl<A: 'static, B: 'static> Mapping<A, B> {
    /// A mapping that cannot fail.
    pub fn from_fn<F, G>(f: F, g: G) -> Self
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        G: Fn(B) -> A + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(move |a| Ok(f(a))),
            encode: Arc::new(g),
        }
    }

    pub fn from_decode<F, G>(f: F, g: G) -> Self
    where
        F: Fn(A) -> DecodeResult<B> + Send + Sync + 'static,
        G: Fn(B) -> A + Send + Sync + 'static,
    {
        Self {
            decode: Arc::new(f),
            encode: Arc::new(g),
        }
    }

    pub fn decode(&self, a: A) -> DecodeResult<B> {
        (self.decode)(a)
    }

    pub fn encode(&self, b: B) -> A {
        (self.encode)(b)
    }
}

impl<A: 'static> Mapping<A, A> {
    pub fn identity() -> Self {
        Self::from_fn(|a| a, |a| a)
    }

    /// Identity in both directions, rejecting values `check` refuses.
    pub fn validating<F>(check: F) -> Self
    where
        F: Fn(&A) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::from_decode(
            move |a| match check(&a) {
                Ok(()) => Ok(a),
                Err(msg) => Err(DecodeError::Invalid(msg)),
            },
            |a| a,
        )
    }
}

impl<A, B> Clone for Mapping<A, B> {
    fn clone(&self) -> Self {
        Self {
            decode: Arc::clone(&self.decode),
            encode: Arc::clone(&self.encode),
        }
    }
}

impl<A, B> fmt::Debug for Mapping<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mapping(..)")
    }
}

pub struct MappedCodec<C: Codec, B> {
    inner: C,
    mapping: Mapping<C::Value, B>,
}

impl<C: Codec, B: Send + 'static> Codec for MappedCodec<C, B> {
    type Raw = C::Raw;
    type Value = B;

    fn decode(&self, raw: C::Raw) -> DecodeResult<B> {
        self.mapping.decode(self.inner.decode(raw)?)
    }

    fn encode(&self, value: B) -> C::Raw {
        self.inner.encode(self.mapping.encode(value))
    }

    fn schema(&self) -> Schema {
        self.inner.schema()
    }

    fn format(&self) -> CodecFormat {
        self.inner.format()
    }
}

pub struct Validated<C, F> {
    inner: C,
    check: F,
}

impl<C, F> Codec for Validated<C, F>
where
    C: Codec,
    F: Fn(&C::Value) -> Result<(), String> + Send + Sync + 'static,
{
    type Raw = C::Raw;
    type Value = C::Value;

    fn decode(&self, raw: C::Raw) -> DecodeResult<C::Value> {
        let value = self.inner.decode(raw)?;
        (self.check)(&value).map_err(DecodeError::Invalid)?;
        Ok(value)
    }

    fn encode(&self, value: C::Value) -> C::Raw {
        self.inner.encode(value)
    }

    fn schema(&self) -> Schema {
        self.inner.schema()
    }

    fn format(&self) -> CodecFormat {
        self.inner.format()
    }
}

// ---------------------------------------------------------------------------
// Plain text scalars
// ---------------------------------------------------------------------------

/// A scalar carried as plain text in paths, queries, headers and cookies.
pub trait PlainValue: Sized + Send + 'static {
    fn parse_plain(raw: &str) -> DecodeResult<Self>;

    fn to_plain(&self) -> String;

    fn schema() -> Schema;
}

impl PlainValue for String {
    fn parse_plain(raw: &str) -> DecodeResult<Self> {
        Ok(raw.to_string())
    }

    fn to_plain(&self) -> String {
        self.clone()
    }

    fn schema() -> Schema {
        Schema::string()
    }
}

macro_rules! impl_plain_value {
    ($t:ty, $schema:expr) => {
        impl PlainValue for $t {
            fn parse_plain(raw: &str) -> DecodeResult<Self> {
                raw.parse::<$t>().map_err(|e| DecodeError::malformed(raw, e))
            }

            fn to_plain(&self) -> String {
                self.to_string()
            }

            fn schema() -> Schema {
                $schema
            }
        }
    };
}

impl_plain_value!(bool, Schema::boolean());
impl_plain_value!(i8, Schema::integer("int8"));
impl_plain_value!(i16, Schema::integer("int16"));
impl_plain_value!(i32, Schema::integer("int32"));
impl_plain_value!(i64, Schema::integer("int64"));
impl_plain_value!(u8, Schema::integer("uint8"));
impl_plain_value!(u16, Schema::integer("uint16"));
impl_plain_value!(u32, Schema::integer("uint32"));
impl_plain_value!(u64, Schema::integer("uint64"));
impl_plain_value!(usize, Schema::integer("uint64"));
impl_plain_value!(f32, Schema::number("float"));
impl_plain_value!(f64, Schema::number("double"));
impl_plain_value!(Uuid, Schema::string().with_format("uuid"));

pub struct PlainCodec<T>(PhantomData<fn() -> T>);

impl<T: PlainValue> Codec for PlainCodec<T> {
    type Raw = String;
    type Value = T;

    fn decode(&self, raw: String) -> DecodeResult<T> {
        T::parse_plain(&raw)
    }

    fn encode(&self, value: T) -> String {
        value.to_plain()
    }

    fn schema(&self) -> Schema {
        T::schema()
    }
}

pub fn plain<T: PlainValue>() -> PlainCodec<T> {
    PlainCodec(PhantomData)
}

// ---------------------------------------------------------------------------
// Multi-value adapters
// ---------------------------------------------------------------------------

/// Exactly one value.
pub struct Required<C>(pub C);

impl<C: Codec<Raw = String>> Codec for Required<C> {
    type Raw = Vec<String>;
    type Value = C::Value;

    fn decode(&self, mut raw: Vec<String>) -> DecodeResult<C::Value> {
        match raw.len() {
            0 => Err(DecodeError::Missing),
            1 => self.0.decode(raw.remove(0)),
            _ => Err(DecodeError::Multiple(raw)),
        }
    }

    fn encode(&self, value: C::Value) -> Vec<String> {
        vec![self.0.encode(value)]
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }
}

/// Zero or one value.
pub struct Optional<C>(pub C);

impl<C: Codec<Raw = String>> Codec for Optional<C> {
    type Raw = Vec<String>;
    type Value = Option<C::Value>;

    fn decode(&self, mut raw: Vec<String>) -> DecodeResult<Option<C::Value>> {
        match raw.len() {
            0 => Ok(None),
            1 => self.0.decode(raw.remove(0)).map(Some),
            _ => Err(DecodeError::Multiple(raw)),
        }
    }

    fn encode(&self, value: Option<C::Value>) -> Vec<String> {
        value.map(|v| self.0.encode(v)).into_iter().collect()
    }

    fn schema(&self) -> Schema {
        self.0.schema().as_optional()
    }
}

/// Any number of values; the first malformed one fails the whole list.
pub struct List<C>(pub C);

impl<C: Codec<Raw = String>> Codec for List<C> {
    type Raw = Vec<String>;
    type Value = Vec<C::Value>;

    fn decode(&self, raw: Vec<String>) -> DecodeResult<Vec<C::Value>> {
        raw.into_iter().map(|v| self.0.decode(v)).collect()
    }

    fn encode(&self, value: Vec<C::Value>) -> Vec<String> {
        value.into_iter().map(|v| self.0.encode(v)).collect()
    }

    fn schema(&self) -> Schema {
        self.0.schema().as_array()
    }
}

/// Passes the raw value through unchanged.
pub struct Identity<T>(PhantomData<fn() -> T>);

impl<T: Send + 'static> Codec for Identity<T> {
    type Raw = T;
    type Value = T;

    fn decode(&self, raw: T) -> DecodeResult<T> {
        Ok(raw)
    }

    fn encode(&self, value: T) -> T {
        value
    }

    fn schema(&self) -> Schema {
        Schema::any()
    }
}

pub fn identity<T: Send + 'static>() -> Identity<T> {
    Identity(PhantomData)
}

// ---------------------------------------------------------------------------
// Body codecs
// ---------------------------------------------------------------------------

pub struct TextCodec;

impl Codec for TextCodec {
    type Raw = String;
    type Value = String;

    fn decode(&self, raw: String) -> DecodeResult<String> {
        Ok(raw)
    }

    fn encode(&self, value: String) -> String {
        value
    }

    fn schema(&self) -> Schema {
        Schema::string()
    }
}

pub struct BytesCodec;

impl Codec for BytesCodec {
    type Raw = Bytes;
    type Value = Bytes;

    fn decode(&self, raw: Bytes) -> DecodeResult<Bytes> {
        Ok(raw)
    }

    fn encode(&self, value: Bytes) -> Bytes {
        value
    }

    fn schema(&self) -> Schema {
        Schema::binary()
    }

    fn format(&self) -> CodecFormat {
        CodecFormat::OctetStream
    }
}

pub struct StreamCodec;

impl Codec for StreamCodec {
    type Raw = ByteStream;
    type Value = ByteStream;

    fn decode(&self, raw: ByteStream) -> DecodeResult<ByteStream> {
        Ok(raw)
    }

    fn encode(&self, value: ByteStream) -> ByteStream {
        value
    }

    fn schema(&self) -> Schema {
        Schema::binary()
    }

    fn format(&self) -> CodecFormat {
        CodecFormat::OctetStream
    }
}

/// JSON text via serde.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> Codec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Raw = String;
    type Value = T;

    fn decode(&self, raw: String) -> DecodeResult<T> {
        serde_json::from_str(&raw).map_err(|e| DecodeError::malformed(raw, e))
    }

    /// # Panics
    /// If `T`'s `Serialize` implementation fails, which makes `T` unusable
    /// as a JSON body type (e.g. a map with non-string keys).
    fn encode(&self, value: T) -> String {
        match serde_json::to_string(&value) {
            Ok(json) => json,
            Err(e) => panic!(
                "`{}` cannot be serialized as JSON: {e}",
                std::any::type_name::<T>()
            ),
        }
    }

    fn schema(&self) -> Schema {
        Schema::object::<T>()
    }

    fn format(&self) -> CodecFormat {
        CodecFormat::Json
    }
}

pub fn json<T: Serialize + DeserializeOwned + Send + 'static>() -> JsonCodec<T> {
    JsonCodec(PhantomData)
}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

/// A codec as stored in a node: values move through `Params`.
pub trait ErasedCodec<Raw>: Send + Sync {
    fn decode_params(&self, raw: Raw) -> DecodeResult<Params>;

    /// # Panics
    /// If `value` is not a `Single` of the codec's value type.
    fn encode_params(&self, value: Params) -> Raw;

    fn schema(&self) -> Schema;

    fn format(&self) -> CodecFormat;
}

pub(crate) struct Erased<C>(pub C);

impl<C: Codec> ErasedCodec<C::Raw> for Erased<C> {
    fn decode_params(&self, raw: C::Raw) -> DecodeResult<Params> {
        self.0.decode(raw).map(Params::single)
    }

    fn encode_params(&self, value: Params) -> C::Raw {
        self.0.encode(value.downcast::<C::Value>())
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    fn format(&self) -> CodecFormat {
        self.0.format()
    }
}

/// Erases a body codec down to `RawBody`, converting through `BodyRaw`.
pub(crate) struct ErasedBody<C>(pub C);

impl<C> ErasedCodec<RawBody> for ErasedBody<C>
where
    C: Codec,
    C::Raw: BodyRaw,
{
    fn decode_params(&self, raw: RawBody) -> DecodeResult<Params> {
        let raw = C::Raw::from_raw(raw)?;
        self.0.decode(raw).map(Params::single)
    }

    fn encode_params(&self, value: Params) -> RawBody {
        self.0.encode(value.downcast::<C::Value>()).into_raw()
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    fn format(&self) -> CodecFormat {
        self.0.format()
    }
}

pub(crate) fn body_kind<C>() -> BodyKind
where
    C: Codec,
    C::Raw: BodyRaw,
{
    <C::Raw as BodyRaw>::KIND
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn plain_int_reports_the_raw_value() {
        let err = plain::<i32>().decode("xyz".to_string()).unwrap_err();
        match err {
            DecodeError::Malformed { original, .. } => assert_eq!(original, "xyz"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(plain::<i32>().decode("10".to_string()).unwrap(), 10);
    }

    #[test]
    fn required_rejects_missing_and_repeated() {
        let codec = Required(plain::<u8>());
        assert_eq!(codec.decode(vec![]).unwrap_err(), DecodeError::Missing);
        assert!(matches!(
            codec.decode(vec!["1".into(), "2".into()]).unwrap_err(),
            DecodeError::Multiple(_)
        ));
        assert_eq!(codec.encode(3), vec!["3".to_string()]);
    }

    #[test]
    fn optional_is_none_when_absent() {
        let codec = Optional(plain::<bool>());
        assert_eq!(codec.decode(vec![]).unwrap(), None);
        assert_eq!(codec.decode(vec!["true".into()]).unwrap(), Some(true));
        assert!(codec.encode(None).is_empty());
        assert!(codec.schema().optional);
    }

    #[test]
    fn list_fails_on_first_malformed_value() {
        let codec = List(plain::<i64>());
        let err = codec
            .decode(vec!["1".into(), "x".into(), "y".into()])
            .unwrap_err();
        assert_eq!(err, DecodeError::malformed("x", "invalid digit found in string"));
    }

    #[test]
    fn validated_codec_reports_invalid() {
        let codec = Required(plain::<i32>()).validate(|v| {
            if *v >= 0 {
                Ok(())
            } else {
                Err("must not be negative".to_string())
            }
        });
        assert_eq!(
            codec.decode(vec!["-1".into()]).unwrap_err(),
            DecodeError::Invalid("must not be negative".to_string())
        );
    }

    #[test]
    fn mapped_codec_applies_both_directions() {
        #[derive(Debug, PartialEq)]
        struct Limit(u32);
        let codec = Required(plain::<u32>()).map(Mapping::from_fn(Limit, |l: Limit| l.0));
        assert_eq!(codec.decode(vec!["5".into()]).unwrap(), Limit(5));
        assert_eq!(codec.encode(Limit(9)), vec!["9".to_string()]);
    }

    #[test]
    fn json_codec_round_trip_and_failure() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Item {
            name: String,
        }
        let codec = json::<Item>();
        let encoded = codec.encode(Item { name: "a".into() });
        assert_eq!(encoded, r#"{"name":"a"}"#);
        assert_eq!(codec.decode(encoded).unwrap(), Item { name: "a".into() });
        assert!(matches!(
            codec.decode("not json".to_string()).unwrap_err(),
            DecodeError::Malformed { .. }
        ));
        assert_eq!(codec.format().media_type(), "application/json");
    }

    #[test]
    fn erased_body_codec_converts_raw_kind() {
        let erased = ErasedBody(TextCodec);
        let params = erased
            .decode_params(RawBody::Bytes(Bytes::from_static(b"hi")))
            .unwrap();
        assert_eq!(params.downcast::<String>(), "hi");
        assert_eq!(body_kind::<TextCodec>(), BodyKind::Text);
    }
}
