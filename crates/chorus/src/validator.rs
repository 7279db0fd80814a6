//! The link validator: recursive validation of records and everything they
//! reference.
//!
//! A record is valid only when it has the right shape, every record it links
//! to resolves and has the shape its position requires, every nested model is
//! itself valid, and every signature verifies over the canonical bytes of the
//! record it attests to. The walk is depth-first and sequential; the first
//! failure aborts it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use chorus_core::{
    content_address, declared_kind, declared_tag, view, Agent, Album, CoreError,
    Ed25519PublicKey, Ed25519Signature, Music, RecordId, RecordKind, Right, SchemaGate,
    ShapeCheck, ShapeError, ShapeKind, Signature, Track,
};
use chorus_ledger::Ledger;

use crate::error::{LinkError, Result};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Configuration for the validator.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum number of nested model descents in one walk.
    pub max_depth: usize,
    /// Re-derive the content address of every resolved record.
    pub verify_addresses: bool,
    /// Require a right's embedded signature to attest to the right's music.
    pub require_signature_binding: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            verify_addresses: true,
            require_signature_binding: true,
        }
    }
}

/// Validates records against the ledger they link into.
///
/// Holds no state beyond its collaborators and configuration; one validator
/// can serve any number of concurrent calls.
pub struct LinkValidator<L: Ledger, G: ShapeCheck = SchemaGate> {
    ledger: Arc<L>,
    gate: G,
    config: ValidatorConfig,
}

impl<L: Ledger> LinkValidator<L, SchemaGate> {
    /// Create a validator with the embedded schema gate.
    pub fn new(ledger: L, config: ValidatorConfig) -> Result<Self> {
        Self::from_shared(Arc::new(ledger), config)
    }

    /// Create a validator over a ledger handle shared with other owners.
    pub fn from_shared(ledger: Arc<L>, config: ValidatorConfig) -> Result<Self> {
        let gate = SchemaGate::new().map_err(LinkError::Gate)?;
        Ok(Self {
            ledger,
            gate,
            config,
        })
    }
}

impl<L: Ledger, G: ShapeCheck> LinkValidator<L, G> {
    /// Create a validator with a custom structural gate.
    pub fn with_gate(ledger: Arc<L>, gate: G, config: ValidatorConfig) -> Self {
        Self {
            ledger,
            gate,
            config,
        }
    }

    /// Get the ledger reference.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Get the validator configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building blocks
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a content address to the record committed under it.
    pub async fn resolve(&self, id: &RecordId) -> Result<Value> {
        let tx = self
            .ledger
            .get_transaction(id)
            .await
            .map_err(|source| LinkError::Ledger { id: *id, source })?
            .ok_or(LinkError::NotFound(*id))?;
        let record = tx.into_payload();

        if self.config.verify_addresses {
            let actual = content_address(&record)?;
            if actual != *id {
                warn!(expected = %id, %actual, "ledger served content under the wrong address");
                return Err(LinkError::AddressMismatch {
                    expected: *id,
                    actual,
                });
            }
        }

        debug!(%id, tag = declared_tag(&record).unwrap_or("-"), "resolved reference");
        Ok(record)
    }

    /// Run the structural gate on `record` as `kind`.
    pub fn check_shape(&self, record: &Value, kind: ShapeKind, at: Option<RecordId>) -> Result<()> {
        match self.gate.check_shape(record, kind) {
            Ok(()) => Ok(()),
            Err(ShapeError::Violations { .. }) => Err(LinkError::InvalidModel { kind, at }),
            Err(e) => Err(LinkError::Gate(e)),
        }
    }

    /// Resolve a party reference and gate it as `kind`.
    async fn party(&self, id: RecordId, kind: ShapeKind) -> Result<Value> {
        let record = self.resolve(&id).await?;
        self.check_shape(&record, kind, Some(id))?;
        Ok(record)
    }

    /// Enter a referenced model one level below `depth`.
    fn descend(&self, depth: usize) -> Result<usize> {
        let next = depth + 1;
        if next > self.config.max_depth {
            warn!(limit = self.config.max_depth, "link depth limit reached");
            return Err(LinkError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }
        Ok(next)
    }

    /// Verify `signature` over the canonical bytes of `model` under `key`.
    fn verify(
        &self,
        key: &Ed25519PublicKey,
        model: &Value,
        model_id: RecordId,
        signature: &Ed25519Signature,
    ) -> Result<()> {
        match key.verify_record(model, signature) {
            Ok(()) => Ok(()),
            Err(CoreError::InvalidSignature | CoreError::InvalidPublicKey) => {
                warn!(model = %model_id, signer = ?key, "signature verification failed");
                Err(LinkError::InvalidSignature { model: model_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate any licensable or attesting record by its declared type.
    ///
    /// Albums and tracks go to the music rules, signatures and rights to
    /// their own. Any other tag, including agent tags, is rejected.
    pub async fn validate_model(&self, record: &Value) -> Result<()> {
        debug!(tag = declared_tag(record).unwrap_or("-"), "validating model");
        self.model_at(record, None, 0).await
    }

    /// Validate an album or track.
    pub async fn validate_music(&self, record: &Value) -> Result<()> {
        debug!(tag = declared_tag(record).unwrap_or("-"), "validating music");
        self.music_at(record, None, 0).await
    }

    /// Validate an album, its artist, and its publisher.
    pub async fn validate_album(&self, record: &Value) -> Result<()> {
        self.album_at(record, None, 0).await
    }

    /// Validate a track, its artist, and its publisher or album.
    pub async fn validate_track(&self, record: &Value) -> Result<()> {
        self.track_at(record, None, 0).await
    }

    /// Validate a signature, the model it attests to, and its signer.
    pub async fn validate_signature(&self, record: &Value) -> Result<()> {
        self.signature_at(record, None, 0).await
    }

    /// Validate a right, its music, its parties, and its embedded signature.
    pub async fn validate_right(&self, record: &Value) -> Result<()> {
        self.right_at(record, None, 0).await
    }

    fn model_at<'a>(
        &'a self,
        record: &'a Value,
        at: Option<RecordId>,
        depth: usize,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match declared_kind(record) {
                Some(RecordKind::Album) => self.album_at(record, at, depth).await,
                Some(RecordKind::Track) => self.track_at(record, at, depth).await,
                Some(RecordKind::Signature) => self.signature_at(record, at, depth).await,
                Some(RecordKind::Right) => self.right_at(record, at, depth).await,
                _ => Err(invalid_type(record)),
            }
        })
    }

    async fn music_at(&self, record: &Value, at: Option<RecordId>, depth: usize) -> Result<()> {
        match declared_kind(record) {
            Some(RecordKind::Album) => self.album_at(record, at, depth).await,
            Some(RecordKind::Track) => self.track_at(record, at, depth).await,
            _ => Err(invalid_type(record)),
        }
    }

    async fn album_at(&self, record: &Value, at: Option<RecordId>, _depth: usize) -> Result<()> {
        self.check_shape(record, ShapeKind::Album, at)?;
        let album: Album = view(record)?;

        self.party(album.by_artist.id, ShapeKind::Artist).await?;
        self.party(album.publisher.id, ShapeKind::Publisher).await?;
        Ok(())
    }

    async fn track_at(&self, record: &Value, at: Option<RecordId>, depth: usize) -> Result<()> {
        self.check_shape(record, ShapeKind::Track, at)?;
        let track: Track = view(record)?;

        self.party(track.by_artist.id, ShapeKind::Artist).await?;

        // A publisher link settles the track; the album link is not consulted.
        if let Some(publisher) = track.publisher {
            self.party(publisher.id, ShapeKind::Publisher).await?;
            return Ok(());
        }

        match track.in_album {
            Some(album) => {
                let next = self.descend(depth)?;
                let record = self.resolve(&album.id).await?;
                self.album_at(&record, Some(album.id), next).await
            }
            None => Err(LinkError::InvalidModel {
                kind: ShapeKind::Track,
                at,
            }),
        }
    }

    async fn signature_at(&self, record: &Value, at: Option<RecordId>, depth: usize) -> Result<()> {
        self.check_shape(record, ShapeKind::Signature, at)?;
        let signature: Signature = view(record)?;
        let model_id = signature.model.id;

        let next = self.descend(depth)?;
        let model = self.resolve(&model_id).await?;
        self.model_at(&model, Some(model_id), next).await?;

        let signer = self.party(signature.signer.id, ShapeKind::Agent).await?;
        let signer: Agent = view(&signer)?;

        self.verify(&signer.public_key, &model, model_id, &signature.signature_value)
    }

    async fn right_at(&self, record: &Value, at: Option<RecordId>, depth: usize) -> Result<()> {
        self.check_shape(record, ShapeKind::Right, at)?;
        let right: Right = view(record)?;
        let music_id = right.music.id;

        let next = self.descend(depth)?;
        let music = self.resolve(&music_id).await?;
        self.music_at(&music, Some(music_id), next).await?;

        let artist_id = Music::from_record(&music)?.artist();
        let artist = self.party(artist_id, ShapeKind::Artist).await?;
        let artist: Agent = view(&artist)?;

        self.party(right.recipient.id, ShapeKind::Agent).await?;

        self.signature_at(&right.signature, None, next).await?;
        let embedded: Signature = view(&right.signature)?;

        self.verify(&artist.public_key, &music, music_id, &embedded.signature_value)?;

        if self.config.require_signature_binding && embedded.model.id != music_id {
            warn!(music = %music_id, model = %embedded.model.id, "embedded signature attests to another model");
            return Err(LinkError::SignatureBindingMismatch {
                music: music_id,
                model: embedded.model.id,
            });
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Id entry points
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve and validate any model, returning the validated record.
    pub async fn validate_model_id(&self, id: &RecordId) -> Result<Value> {
        debug!(%id, "validating model");
        let record = self.resolve(id).await?;
        self.model_at(&record, Some(*id), 0).await?;
        Ok(record)
    }

    /// Resolve and validate an album or track.
    pub async fn validate_music_id(&self, id: &RecordId) -> Result<Value> {
        debug!(%id, "validating music");
        let record = self.resolve(id).await?;
        self.music_at(&record, Some(*id), 0).await?;
        Ok(record)
    }

    /// Resolve and validate an album.
    pub async fn validate_album_id(&self, id: &RecordId) -> Result<Value> {
        let record = self.resolve(id).await?;
        self.album_at(&record, Some(*id), 0).await?;
        Ok(record)
    }

    /// Resolve and validate a track.
    pub async fn validate_track_id(&self, id: &RecordId) -> Result<Value> {
        let record = self.resolve(id).await?;
        self.track_at(&record, Some(*id), 0).await?;
        Ok(record)
    }

    /// Resolve and validate a signature.
    pub async fn validate_signature_id(&self, id: &RecordId) -> Result<Value> {
        let record = self.resolve(id).await?;
        self.signature_at(&record, Some(*id), 0).await?;
        Ok(record)
    }

    /// Resolve and validate a right.
    pub async fn validate_right_id(&self, id: &RecordId) -> Result<Value> {
        debug!(%id, "validating right");
        let record = self.resolve(id).await?;
        self.right_at(&record, Some(*id), 0).await?;
        Ok(record)
    }

    /// Resolve a party and check it against the generic agent shape.
    pub async fn validate_agent_id(&self, id: &RecordId) -> Result<Value> {
        self.party(*id, ShapeKind::Agent).await
    }
}

fn invalid_type(record: &Value) -> LinkError {
    let tag = declared_tag(record).unwrap_or_default();
    debug!(tag, "no validation rule for record type");
    LinkError::InvalidType(tag.to_owned())
}
