//! Records: the immutable documents committed to the ledger.
//!
//! A record is a JSON-LD style object carrying an `@context`, an `@type`
//! tag, and links (`{"@id": "<hex>"}`) to other records. Raw records are kept
//! as [`serde_json::Value`] so that the exact content a party signed is never
//! lost in a round trip through a typed struct; the typed views in this module
//! are read-only projections decoded after a record has passed its structural
//! gate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, Result};
use crate::types::RecordId;

/// The `@context` every record declares.
pub const CONTEXT: &str = "http://schema.org";

/// The declared kind of a record, read from its `@type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Person,
    MusicGroup,
    Organization,
    Album,
    Track,
    Signature,
    Right,
}

impl RecordKind {
    /// The `@type` tag for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::MusicGroup => "MusicGroup",
            Self::Organization => "Organization",
            Self::Album => "MusicAlbum",
            Self::Track => "MusicRecording",
            Self::Signature => "Signature",
            Self::Right => "Right",
        }
    }

    /// Parse an `@type` tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Person" => Some(Self::Person),
            "MusicGroup" => Some(Self::MusicGroup),
            "Organization" => Some(Self::Organization),
            "MusicAlbum" => Some(Self::Album),
            "MusicRecording" => Some(Self::Track),
            "Signature" => Some(Self::Signature),
            "Right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Read the `@type` tag of a raw record, if it has one.
pub fn declared_tag(record: &Value) -> Option<&str> {
    record.get("@type").and_then(Value::as_str)
}

/// Read and parse the declared kind of a raw record.
pub fn declared_kind(record: &Value) -> Option<RecordKind> {
    declared_tag(record).and_then(RecordKind::from_tag)
}

/// The shape a record is checked against by the structural gate.
///
/// Artist and publisher are narrowed agent shapes: an artist is a person or a
/// musical group, a publisher is an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Agent,
    Artist,
    Publisher,
    Album,
    Track,
    Signature,
    Right,
}

impl ShapeKind {
    /// All shapes, in a stable order.
    pub const ALL: [ShapeKind; 7] = [
        Self::Agent,
        Self::Artist,
        Self::Publisher,
        Self::Album,
        Self::Track,
        Self::Signature,
        Self::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Artist => "artist",
            Self::Publisher => "publisher",
            Self::Album => "album",
            Self::Track => "track",
            Self::Signature => "signature",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to another record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "@id")]
    pub id: RecordId,
}

impl Link {
    pub fn new(id: RecordId) -> Self {
        Self { id }
    }

    fn to_value(self) -> Value {
        let mut map = Map::new();
        map.insert("@id".into(), Value::String(self.id.to_hex()));
        Value::Object(map)
    }
}

/// Agent sub-kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Person,
    MusicGroup,
    Organization,
}

impl AgentKind {
    pub fn record_kind(self) -> RecordKind {
        match self {
            Self::Person => RecordKind::Person,
            Self::MusicGroup => RecordKind::MusicGroup,
            Self::Organization => RecordKind::Organization,
        }
    }
}

/// Decode a typed view from a raw record.
pub fn view<T: DeserializeOwned>(record: &Value) -> Result<T> {
    T::deserialize(record).map_err(CoreError::from)
}

/// A party: person, musical group, or organization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(rename = "@type")]
    pub kind: AgentKind,
    pub name: String,
    pub email: String,
    pub public_key: Ed25519PublicKey,
    pub ipi_number: Option<String>,
    pub isni_number: Option<String>,
    pub pro: Option<String>,
    pub same_as: Option<String>,
    #[serde(default)]
    pub member: Vec<Link>,
}

/// An album: one artist, one publisher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub name: String,
    pub by_artist: Link,
    pub publisher: Link,
    pub date_published: Option<String>,
    pub same_as: Option<String>,
}

/// A track: one artist, and either a publisher or a parent album.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    pub by_artist: Link,
    pub publisher: Option<Link>,
    pub in_album: Option<Link>,
    pub isrc_code: Option<String>,
    pub duration: Option<String>,
    pub same_as: Option<String>,
}

/// Music: the licensable creative-work kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Music {
    Album(Album),
    Track(Track),
}

impl Music {
    /// Decode a music view by the record's declared tag.
    pub fn from_record(record: &Value) -> Result<Self> {
        match declared_kind(record) {
            Some(RecordKind::Album) => Ok(Self::Album(view(record)?)),
            Some(RecordKind::Track) => Ok(Self::Track(view(record)?)),
            _ => Err(CoreError::MalformedRecord(format!(
                "not a music record: {:?}",
                declared_tag(record)
            ))),
        }
    }

    /// The artist every music record names.
    pub fn artist(&self) -> RecordId {
        match self {
            Self::Album(album) => album.by_artist.id,
            Self::Track(track) => track.by_artist.id,
        }
    }
}

/// A signature record: `signer` attests to the canonical bytes of `model`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub model: Link,
    pub signer: Link,
    pub signature_value: Ed25519Signature,
}

/// A right: `recipient` holds an entitlement over `music`, attested by the
/// music's artist through the embedded signature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Right {
    pub music: Link,
    pub recipient: Link,
    /// The embedded signature record, kept raw so it can be gated as a record.
    pub signature: Value,
    #[serde(default)]
    pub territory: Vec<String>,
    pub valid_from: Option<String>,
    pub valid_through: Option<String>,
    pub usage: Option<Vec<String>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Builders (producer side)
// ─────────────────────────────────────────────────────────────────────────────

fn base(kind: RecordKind) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("@context".into(), Value::String(CONTEXT.into()));
    map.insert("@type".into(), Value::String(kind.tag().into()));
    map
}

fn put_opt(map: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(v) = value {
        map.insert(key.into(), Value::String(v));
    }
}

/// Builder for agent records.
#[derive(Debug, Clone)]
pub struct AgentBuilder {
    kind: AgentKind,
    name: String,
    email: String,
    public_key: Ed25519PublicKey,
    ipi_number: Option<String>,
    isni_number: Option<String>,
    pro: Option<String>,
    same_as: Option<String>,
    member: Vec<RecordId>,
}

impl AgentBuilder {
    pub fn new(
        kind: AgentKind,
        name: impl Into<String>,
        email: impl Into<String>,
        public_key: Ed25519PublicKey,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            email: email.into(),
            public_key,
            ipi_number: None,
            isni_number: None,
            pro: None,
            same_as: None,
            member: Vec::new(),
        }
    }

    pub fn ipi_number(mut self, ipi: impl Into<String>) -> Self {
        self.ipi_number = Some(ipi.into());
        self
    }

    pub fn isni_number(mut self, isni: impl Into<String>) -> Self {
        self.isni_number = Some(isni.into());
        self
    }

    pub fn pro(mut self, pro: impl Into<String>) -> Self {
        self.pro = Some(pro.into());
        self
    }

    pub fn same_as(mut self, url: impl Into<String>) -> Self {
        self.same_as = Some(url.into());
        self
    }

    pub fn member(mut self, id: RecordId) -> Self {
        self.member.push(id);
        self
    }

    pub fn build(self) -> Value {
        let mut map = base(self.kind.record_kind());
        map.insert("name".into(), Value::String(self.name));
        map.insert("email".into(), Value::String(self.email));
        map.insert("publicKey".into(), Value::String(self.public_key.to_hex()));
        put_opt(&mut map, "ipiNumber", self.ipi_number);
        put_opt(&mut map, "isniNumber", self.isni_number);
        put_opt(&mut map, "pro", self.pro);
        put_opt(&mut map, "sameAs", self.same_as);
        if !self.member.is_empty() {
            let members = self
                .member
                .into_iter()
                .map(|id| Link::new(id).to_value())
                .collect();
            map.insert("member".into(), Value::Array(members));
        }
        Value::Object(map)
    }
}

/// Builder for album records.
#[derive(Debug, Clone)]
pub struct AlbumBuilder {
    name: String,
    artist: RecordId,
    publisher: RecordId,
    date_published: Option<String>,
    same_as: Option<String>,
}

impl AlbumBuilder {
    pub fn new(name: impl Into<String>, artist: RecordId, publisher: RecordId) -> Self {
        Self {
            name: name.into(),
            artist,
            publisher,
            date_published: None,
            same_as: None,
        }
    }

    pub fn date_published(mut self, date: impl Into<String>) -> Self {
        self.date_published = Some(date.into());
        self
    }

    pub fn same_as(mut self, url: impl Into<String>) -> Self {
        self.same_as = Some(url.into());
        self
    }

    pub fn build(self) -> Value {
        let mut map = base(RecordKind::Album);
        map.insert("name".into(), Value::String(self.name));
        map.insert("byArtist".into(), Link::new(self.artist).to_value());
        map.insert("publisher".into(), Link::new(self.publisher).to_value());
        put_opt(&mut map, "datePublished", self.date_published);
        put_opt(&mut map, "sameAs", self.same_as);
        Value::Object(map)
    }
}

/// Builder for track records.
///
/// A track names either a publisher or a parent album. Setting both is
/// allowed by the shape; validation then follows the publisher only.
#[derive(Debug, Clone)]
pub struct TrackBuilder {
    name: String,
    artist: RecordId,
    publisher: Option<RecordId>,
    album: Option<RecordId>,
    isrc_code: Option<String>,
    duration: Option<String>,
    same_as: Option<String>,
}

impl TrackBuilder {
    pub fn new(name: impl Into<String>, artist: RecordId) -> Self {
        Self {
            name: name.into(),
            artist,
            publisher: None,
            album: None,
            isrc_code: None,
            duration: None,
            same_as: None,
        }
    }

    pub fn publisher(mut self, id: RecordId) -> Self {
        self.publisher = Some(id);
        self
    }

    pub fn album(mut self, id: RecordId) -> Self {
        self.album = Some(id);
        self
    }

    pub fn isrc_code(mut self, isrc: impl Into<String>) -> Self {
        self.isrc_code = Some(isrc.into());
        self
    }

    /// ISO 8601 duration, e.g. `PT5M37S`.
    pub fn duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn same_as(mut self, url: impl Into<String>) -> Self {
        self.same_as = Some(url.into());
        self
    }

    pub fn build(self) -> Value {
        let mut map = base(RecordKind::Track);
        map.insert("name".into(), Value::String(self.name));
        map.insert("byArtist".into(), Link::new(self.artist).to_value());
        if let Some(id) = self.publisher {
            map.insert("publisher".into(), Link::new(id).to_value());
        }
        if let Some(id) = self.album {
            map.insert("inAlbum".into(), Link::new(id).to_value());
        }
        put_opt(&mut map, "isrcCode", self.isrc_code);
        put_opt(&mut map, "duration", self.duration);
        put_opt(&mut map, "sameAs", self.same_as);
        Value::Object(map)
    }
}

/// Builder for signature records.
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    model: RecordId,
    signer: RecordId,
}

impl SignatureBuilder {
    pub fn new(model: RecordId, signer: RecordId) -> Self {
        Self { model, signer }
    }

    /// Assemble the record around an already computed signature.
    pub fn with_value(self, signature: Ed25519Signature) -> Value {
        let mut map = base(RecordKind::Signature);
        map.insert("model".into(), Link::new(self.model).to_value());
        map.insert("signer".into(), Link::new(self.signer).to_value());
        map.insert(
            "signatureValue".into(),
            Value::String(signature.to_hex()),
        );
        Value::Object(map)
    }

    /// Sign the model record's canonical bytes and assemble the record.
    ///
    /// `model_record` must be the record committed under `model`.
    pub fn sign(self, keypair: &Keypair, model_record: &Value) -> Result<Value> {
        let signature = keypair.sign_record(model_record)?;
        Ok(self.with_value(signature))
    }
}

/// Builder for right records.
#[derive(Debug, Clone)]
pub struct RightBuilder {
    music: RecordId,
    recipient: RecordId,
    signature: Value,
    territory: Vec<String>,
    valid_from: Option<String>,
    valid_through: Option<String>,
    usage: Option<Vec<String>>,
}

impl RightBuilder {
    pub fn new(music: RecordId, recipient: RecordId, signature: Value) -> Self {
        Self {
            music,
            recipient,
            signature,
            territory: Vec::new(),
            valid_from: None,
            valid_through: None,
            usage: None,
        }
    }

    pub fn territory(mut self, code: impl Into<String>) -> Self {
        self.territory.push(code.into());
        self
    }

    pub fn valid_from(mut self, date: impl Into<String>) -> Self {
        self.valid_from = Some(date.into());
        self
    }

    pub fn valid_through(mut self, date: impl Into<String>) -> Self {
        self.valid_through = Some(date.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage.get_or_insert_with(Vec::new).push(usage.into());
        self
    }

    pub fn build(self) -> Value {
        let mut map = base(RecordKind::Right);
        map.insert("music".into(), Link::new(self.music).to_value());
        map.insert("recipient".into(), Link::new(self.recipient).to_value());
        map.insert("signature".into(), self.signature);
        if !self.territory.is_empty() {
            let codes = self.territory.into_iter().map(Value::String).collect();
            map.insert("territory".into(), Value::Array(codes));
        }
        put_opt(&mut map, "validFrom", self.valid_from);
        put_opt(&mut map, "validThrough", self.valid_through);
        if let Some(usage) = self.usage {
            let items = usage.into_iter().map(Value::String).collect();
            map.insert("usage".into(), Value::Array(items));
        }
        Value::Object(map)
    }
}
