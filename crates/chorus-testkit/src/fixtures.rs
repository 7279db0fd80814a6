//! Test fixtures and helpers.
//!
//! [`Catalog`] commits a small, fully valid rights graph to a memory ledger:
//! one artist, one publisher, one recipient, an album, two tracks, the
//! artist's signature over one of the tracks, and a right over that track.

use std::sync::Arc;

use serde_json::Value;

use chorus_core::{
    AgentBuilder, AgentKind, AlbumBuilder, Keypair, RecordId, RightBuilder, SignatureBuilder,
    TrackBuilder,
};
use chorus_ledger::{Ledger, LedgerError, MemoryLedger, Result};

pub const ARTIST_SEED: [u8; 32] = [0xa1; 32];
pub const PUBLISHER_SEED: [u8; 32] = [0xb2; 32];
pub const RECIPIENT_SEED: [u8; 32] = [0xc3; 32];

/// A committed, valid rights graph.
pub struct Catalog {
    pub ledger: Arc<MemoryLedger>,

    pub artist_keypair: Keypair,
    pub publisher_keypair: Keypair,
    pub recipient_keypair: Keypair,

    /// `MusicGroup`.
    pub artist: RecordId,
    /// `Organization`.
    pub publisher: RecordId,
    /// `Person`.
    pub recipient: RecordId,

    /// Album by `artist`, published by `publisher`.
    pub album: RecordId,
    /// Track on `album`, no publisher link.
    pub album_track: RecordId,
    /// Track with a direct publisher link.
    pub publisher_track: RecordId,

    /// The artist's signature over `publisher_track`.
    pub signature: RecordId,
    /// Right over `publisher_track` for `recipient`, embedding `signature`.
    pub right: RecordId,
}

impl Catalog {
    /// Build the catalog in a fresh memory ledger.
    pub async fn build() -> Result<Self> {
        Self::build_in(Arc::new(MemoryLedger::new())).await
    }

    /// Build the catalog in the given ledger.
    pub async fn build_in(ledger: Arc<MemoryLedger>) -> Result<Self> {
        let artist_keypair = Keypair::from_seed(&ARTIST_SEED);
        let publisher_keypair = Keypair::from_seed(&PUBLISHER_SEED);
        let recipient_keypair = Keypair::from_seed(&RECIPIENT_SEED);

        let artist = commit(
            &ledger,
            &AgentBuilder::new(
                AgentKind::MusicGroup,
                "The Modal Quintet",
                "quintet@example.com",
                artist_keypair.public_key(),
            )
            .isni_number("000000012146438X")
            .build(),
        )
        .await?;

        let publisher = commit(
            &ledger,
            &AgentBuilder::new(
                AgentKind::Organization,
                "Blue Harbor Records",
                "rights@blueharbor.example",
                publisher_keypair.public_key(),
            )
            .pro("ASCAP")
            .build(),
        )
        .await?;

        let recipient = commit(
            &ledger,
            &AgentBuilder::new(
                AgentKind::Person,
                "Nina Park",
                "nina@example.com",
                recipient_keypair.public_key(),
            )
            .ipi_number("00052210040")
            .build(),
        )
        .await?;

        let album = commit(
            &ledger,
            &AlbumBuilder::new("Kind of Modal", artist, publisher)
                .date_published("1959-08-17")
                .build(),
        )
        .await?;

        let album_track = commit(
            &ledger,
            &TrackBuilder::new("So Modal", artist)
                .album(album)
                .isrc_code("USSM15900113")
                .duration("PT9M22S")
                .build(),
        )
        .await?;

        let track_record = TrackBuilder::new("Blue in Harbor", artist)
            .publisher(publisher)
            .isrc_code("US-SM1-59-00114")
            .duration("PT5M37S")
            .build();
        let publisher_track = commit(&ledger, &track_record).await?;

        let signature_record =
            SignatureBuilder::new(publisher_track, artist).sign(&artist_keypair, &track_record)?;
        let signature = commit(&ledger, &signature_record).await?;

        let right = commit(
            &ledger,
            &RightBuilder::new(publisher_track, recipient, signature_record)
                .territory("US")
                .territory("GB")
                .valid_from("2024-01-01")
                .valid_through("2029-12-31")
                .usage("streaming")
                .build(),
        )
        .await?;

        Ok(Self {
            ledger,
            artist_keypair,
            publisher_keypair,
            recipient_keypair,
            artist,
            publisher,
            recipient,
            album,
            album_track,
            publisher_track,
            signature,
            right,
        })
    }

    /// Commit a record to the catalog's ledger.
    pub async fn commit(&self, record: &Value) -> Result<RecordId> {
        commit(&self.ledger, record).await
    }

    /// Fetch a committed record.
    pub async fn record(&self, id: &RecordId) -> Result<Value> {
        self.ledger
            .get_transaction(id)
            .await?
            .map(|tx| tx.into_payload())
            .ok_or_else(|| LedgerError::InvalidData(format!("no record {id}")))
    }

    /// Sign the committed record `model` with `keypair`, naming `signer`.
    ///
    /// Returns the signature record without committing it.
    pub async fn sign(&self, keypair: &Keypair, signer: RecordId, model: RecordId) -> Result<Value> {
        let model_record = self.record(&model).await?;
        Ok(SignatureBuilder::new(model, signer).sign(keypair, &model_record)?)
    }

    /// The right record committed under [`Catalog::right`].
    pub async fn right_record(&self) -> Result<Value> {
        self.record(&self.right).await
    }
}

async fn commit(ledger: &MemoryLedger, record: &Value) -> Result<RecordId> {
    Ok(ledger.commit(record).await?.id())
}
