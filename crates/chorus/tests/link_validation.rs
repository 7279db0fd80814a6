//! End-to-end link validation over committed rights graphs.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use chorus::core::{
    content_address, AgentBuilder, AgentKind, AlbumBuilder, Ed25519Signature, RecordId,
    RightBuilder, SignatureBuilder, ShapeKind, TrackBuilder,
};
use chorus::ledger::{Ledger, MemoryLedger, SqliteLedger};
use chorus::{LinkError, LinkValidator, ValidatorConfig};
use chorus_testkit::{small_order_key, universal_signature, Catalog, FailingLedger, TamperingLedger};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

async fn setup() -> Result<(Catalog, LinkValidator<Arc<MemoryLedger>>)> {
    init_tracing();
    let catalog = Catalog::build().await?;
    let validator = LinkValidator::new(catalog.ledger.clone(), ValidatorConfig::default())?;
    Ok((catalog, validator))
}

fn same_failure<T: std::fmt::Debug>(a: &chorus::Result<T>, b: &chorus::Result<T>) -> bool {
    match (a, b) {
        (Err(a), Err(b)) => format!("{a:?}") == format!("{b:?}"),
        (Ok(_), Ok(_)) => true,
        _ => false,
    }
}

/// An album whose publisher link points at a person.
async fn album_with_person_publisher(catalog: &Catalog) -> Result<RecordId> {
    let record = AlbumBuilder::new("Misfiled", catalog.artist, catalog.recipient).build();
    Ok(catalog.commit(&record).await?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Music
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_valid_album() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let record = validator.validate_album_id(&catalog.album).await?;
    validator.validate_album(&record).await?;
    validator.validate_music(&record).await?;
    Ok(())
}

#[tokio::test]
async fn test_album_with_wrong_publisher_kind() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let album = album_with_person_publisher(&catalog).await?;

    let err = validator.validate_album_id(&album).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidModel { kind: ShapeKind::Publisher, at: Some(at) } if at == catalog.recipient
    ));
    Ok(())
}

#[tokio::test]
async fn test_album_with_organization_as_artist() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let record = AlbumBuilder::new("Label Compilation", catalog.publisher, catalog.publisher).build();

    let err = validator.validate_album(&record).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidModel { kind: ShapeKind::Artist, at: Some(at) } if at == catalog.publisher
    ));
    Ok(())
}

#[tokio::test]
async fn test_album_shape_checked_first() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let mut record = AlbumBuilder::new("No Date", catalog.artist, catalog.publisher).build();
    record["datePublished"] = json!("last summer");

    let err = validator.validate_album(&record).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidModel { kind: ShapeKind::Album, at: None }));
    Ok(())
}

#[tokio::test]
async fn test_track_with_publisher_never_consults_album() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let missing_album = RecordId::from_bytes([0x77; 32]);

    let good = TrackBuilder::new("Direct", catalog.artist)
        .publisher(catalog.publisher)
        .album(missing_album)
        .build();
    validator.validate_track(&good).await?;

    let bad = TrackBuilder::new("Direct", catalog.artist)
        .publisher(catalog.recipient)
        .album(missing_album)
        .build();
    let err = validator.validate_track(&bad).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidModel { kind: ShapeKind::Publisher, at: Some(at) } if at == catalog.recipient
    ));
    Ok(())
}

#[tokio::test]
async fn test_track_without_publisher_follows_album() -> Result<()> {
    let (catalog, validator) = setup().await?;

    let via_track = validator.validate_track_id(&catalog.album_track).await;
    let direct = validator.validate_album_id(&catalog.album).await;
    assert!(via_track.is_ok());
    assert!(same_failure(&via_track.map(|_| ()), &direct.map(|_| ())));

    let bad_album = album_with_person_publisher(&catalog).await?;
    let track = TrackBuilder::new("On a Misfiled Album", catalog.artist)
        .album(bad_album)
        .build();
    let via_track = validator.validate_track(&track).await;
    let direct = validator.validate_album_id(&bad_album).await.map(|_| ());
    assert!(via_track.is_err());
    assert!(same_failure(&via_track, &direct));
    Ok(())
}

#[tokio::test]
async fn test_track_artist_checked_before_publisher() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let missing_artist = RecordId::from_bytes([0x42; 32]);
    let track = TrackBuilder::new("Ghost", missing_artist)
        .publisher(catalog.recipient)
        .build();

    let err = validator.validate_track(&track).await.unwrap_err();
    assert!(matches!(err, LinkError::NotFound(id) if id == missing_artist));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Signatures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_valid_signature() -> Result<()> {
    let (catalog, validator) = setup().await?;
    validator.validate_signature_id(&catalog.signature).await?;
    Ok(())
}

#[tokio::test]
async fn test_signature_over_invalid_model_reports_model_failure() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let bad_album = album_with_person_publisher(&catalog).await?;
    let signature = catalog
        .sign(&catalog.artist_keypair, catalog.artist, bad_album)
        .await?;

    let via_signature = validator.validate_signature(&signature).await;
    let direct = validator.validate_album_id(&bad_album).await.map(|_| ());
    assert!(via_signature.is_err());
    assert!(same_failure(&via_signature, &direct));
    Ok(())
}

#[tokio::test]
async fn test_signature_with_wrong_key() -> Result<()> {
    let (catalog, validator) = setup().await?;
    // Signed by the publisher but naming the artist as signer.
    let signature = catalog
        .sign(&catalog.publisher_keypair, catalog.artist, catalog.publisher_track)
        .await?;

    let err = validator.validate_signature(&signature).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidSignature { model } if model == catalog.publisher_track
    ));
    Ok(())
}

#[tokio::test]
async fn test_signature_with_invalid_signer() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let signer = AgentBuilder::new(
        AgentKind::Person,
        "Unreachable",
        "no-email",
        catalog.artist_keypair.public_key(),
    )
    .build();
    let signer = catalog.commit(&signer).await?;
    let signature = catalog
        .sign(&catalog.artist_keypair, signer, catalog.publisher_track)
        .await?;

    let err = validator.validate_signature(&signature).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidModel { kind: ShapeKind::Agent, at: Some(at) } if at == signer
    ));
    Ok(())
}

#[tokio::test]
async fn test_signature_depth_limit() -> Result<()> {
    init_tracing();
    let catalog = Catalog::build().await?;

    // signature over signature over signature over a track
    let second = catalog
        .sign(&catalog.artist_keypair, catalog.artist, catalog.signature)
        .await?;
    let second = catalog.commit(&second).await?;
    let third = catalog
        .sign(&catalog.artist_keypair, catalog.artist, second)
        .await?;
    let third = catalog.commit(&third).await?;

    let shallow = LinkValidator::new(
        catalog.ledger.clone(),
        ValidatorConfig {
            max_depth: 2,
            ..ValidatorConfig::default()
        },
    )?;
    assert!(matches!(
        shallow.validate_signature_id(&third).await,
        Err(LinkError::DepthExceeded { limit: 2 })
    ));
    shallow.validate_signature_id(&second).await?;

    let default = LinkValidator::new(catalog.ledger.clone(), ValidatorConfig::default())?;
    default.validate_signature_id(&third).await?;
    default.validate_model_id(&third).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Rights
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_valid_right() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let record = validator.validate_right_id(&catalog.right).await?;
    assert_eq!(record, catalog.right_record().await?);
    validator.validate_model(&record).await?;
    Ok(())
}

#[tokio::test]
async fn test_round_trip_then_mutated_track() -> Result<()> {
    let (catalog, validator) = setup().await?;
    validator.validate_right_id(&catalog.right).await?;

    // The track is edited after the artist signed it.
    let mut altered = catalog.record(&catalog.publisher_track).await?;
    altered["name"] = json!("Blue in Harbor (Remastered)");
    let altered = catalog.commit(&altered).await?;
    validator.validate_track_id(&altered).await?;

    let embedded = catalog.record(&catalog.signature).await?;
    let right = RightBuilder::new(altered, catalog.recipient, embedded).build();

    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidSignature { model } if model == altered));
    Ok(())
}

#[tokio::test]
async fn test_committed_right_after_track_edited_in_place() -> Result<()> {
    init_tracing();
    let catalog = Catalog::build().await?;

    // The ledger serves an edited track under the id the artist signed.
    let mut altered = catalog.record(&catalog.publisher_track).await?;
    altered["name"] = json!("Blue in Harbor (Remastered)");
    let altered_id = content_address(&altered)?;

    // Address checks catch the edit before any signature is looked at.
    let ledger = TamperingLedger::new(catalog.ledger.clone())
        .forge(catalog.publisher_track, altered.clone());
    let validator = LinkValidator::new(ledger, ValidatorConfig::default())?;
    let err = validator.validate_right_id(&catalog.right).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::AddressMismatch { expected, actual }
            if expected == catalog.publisher_track && actual == altered_id
    ));

    // Without them the artist's signature no longer verifies.
    let ledger = TamperingLedger::new(catalog.ledger.clone()).forge(catalog.publisher_track, altered);
    let validator = LinkValidator::new(
        ledger,
        ValidatorConfig {
            verify_addresses: false,
            ..ValidatorConfig::default()
        },
    )?;
    let err = validator.validate_right_id(&catalog.right).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidSignature { model } if model == catalog.publisher_track
    ));
    Ok(())
}

#[tokio::test]
async fn test_right_recipient_must_be_an_agent() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let embedded = catalog.record(&catalog.signature).await?;
    let right = RightBuilder::new(catalog.publisher_track, catalog.album, embedded).build();

    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidModel { kind: ShapeKind::Agent, at: Some(at) } if at == catalog.album
    ));
    Ok(())
}

#[tokio::test]
async fn test_right_over_track_on_invalid_album() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let bad_album = album_with_person_publisher(&catalog).await?;
    let track = TrackBuilder::new("On a Misfiled Album", catalog.artist)
        .album(bad_album)
        .build();
    let track = catalog.commit(&track).await?;
    let embedded = catalog
        .sign(&catalog.artist_keypair, catalog.artist, track)
        .await?;
    let right = RightBuilder::new(track, catalog.recipient, embedded).build();

    let via_right = validator.validate_right(&right).await;
    let direct = validator.validate_album_id(&bad_album).await.map(|_| ());
    assert!(matches!(
        via_right,
        Err(LinkError::InvalidModel { kind: ShapeKind::Publisher, at: Some(at) }) if at == catalog.recipient
    ));
    assert!(same_failure(&via_right, &direct));
    Ok(())
}

#[tokio::test]
async fn test_right_with_swapped_signature_bytes() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let mut embedded = catalog.record(&catalog.signature).await?;
    let foreign = catalog.artist_keypair.sign(b"some other payload");
    embedded["signatureValue"] = json!(foreign.to_hex());

    let right = RightBuilder::new(catalog.publisher_track, catalog.recipient, embedded).build();
    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidSignature { model } if model == catalog.publisher_track
    ));
    Ok(())
}

#[tokio::test]
async fn test_right_must_be_attested_by_the_artist() -> Result<()> {
    let (catalog, validator) = setup().await?;
    // A perfectly valid signature, but by the publisher.
    let embedded = catalog
        .sign(&catalog.publisher_keypair, catalog.publisher, catalog.publisher_track)
        .await?;
    validator.validate_signature(&embedded).await?;

    let right = RightBuilder::new(catalog.publisher_track, catalog.recipient, embedded).build();
    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidSignature { model } if model == catalog.publisher_track
    ));
    Ok(())
}

#[tokio::test]
async fn test_right_over_album_track() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let embedded = catalog
        .sign(&catalog.artist_keypair, catalog.artist, catalog.album_track)
        .await?;
    let right = RightBuilder::new(catalog.album_track, catalog.recipient, embedded)
        .territory("JP")
        .build();
    validator.validate_right(&right).await?;
    Ok(())
}

#[tokio::test]
async fn test_right_with_missing_recipient() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let missing = RecordId::from_bytes([0x13; 32]);
    let embedded = catalog.record(&catalog.signature).await?;
    let right = RightBuilder::new(catalog.publisher_track, missing, embedded).build();

    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(err, LinkError::NotFound(id) if id == missing));
    Ok(())
}

#[tokio::test]
async fn test_right_over_non_music() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let embedded = catalog.record(&catalog.signature).await?;
    let right = RightBuilder::new(catalog.signature, catalog.recipient, embedded).build();

    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidType(ref tag) if tag == "Signature"));
    Ok(())
}

#[tokio::test]
async fn test_right_missing_signature_is_malformed() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let mut right = catalog.right_record().await?;
    if let Some(fields) = right.as_object_mut() {
        fields.remove("signature");
    }

    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidModel { kind: ShapeKind::Right, at: None }));
    Ok(())
}

#[tokio::test]
async fn test_signature_binding_with_small_order_key() -> Result<()> {
    let (catalog, validator) = setup().await?;

    // A small-order artist key accepts one signature value for every
    // message, so only the model link ties the signature to the music.
    let artist = AgentBuilder::new(
        AgentKind::MusicGroup,
        "Weak Keys",
        "weak@example.com",
        small_order_key(),
    )
    .build();
    let artist = catalog.commit(&artist).await?;
    let one = TrackBuilder::new("One", artist).publisher(catalog.publisher).build();
    let one = catalog.commit(&one).await?;
    let two = TrackBuilder::new("Two", artist).publisher(catalog.publisher).build();
    let two = catalog.commit(&two).await?;

    let over_two = SignatureBuilder::new(two, artist).with_value(universal_signature());
    let right = RightBuilder::new(one, catalog.recipient, over_two).build();

    let err = validator.validate_right(&right).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::SignatureBindingMismatch { music, model } if music == one && model == two
    ));

    let lenient = LinkValidator::new(
        catalog.ledger.clone(),
        ValidatorConfig {
            require_signature_binding: false,
            ..ValidatorConfig::default()
        },
    )?;
    lenient.validate_right(&right).await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch, ledger faults, concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dispatcher() -> Result<()> {
    let (catalog, validator) = setup().await?;

    for id in [
        catalog.album,
        catalog.album_track,
        catalog.publisher_track,
        catalog.signature,
        catalog.right,
    ] {
        validator.validate_model_id(&id).await?;
    }

    for (id, tag) in [
        (catalog.artist, "MusicGroup"),
        (catalog.publisher, "Organization"),
        (catalog.recipient, "Person"),
    ] {
        let err = validator.validate_model_id(&id).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidType(ref t) if t == tag));
    }

    let err = validator.validate_music_id(&catalog.right).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidType(ref t) if t == "Right"));
    Ok(())
}

#[tokio::test]
async fn test_validation_is_idempotent() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let first = validator.validate_right_id(&catalog.right).await?;
    let second = validator.validate_right_id(&catalog.right).await?;
    assert_eq!(first, second);

    let bad_album = album_with_person_publisher(&catalog).await?;
    let a = validator.validate_album_id(&bad_album).await;
    let b = validator.validate_album_id(&bad_album).await;
    assert!(a.is_err());
    assert!(same_failure(&a, &b));
    Ok(())
}

#[tokio::test]
async fn test_ledger_failure_is_fatal() -> Result<()> {
    init_tracing();
    let catalog = Catalog::build().await?;

    let ledger = FailingLedger::new(catalog.ledger.clone()).fail_on(catalog.publisher);
    let validator = LinkValidator::new(ledger, ValidatorConfig::default())?;
    let err = validator.validate_right_id(&catalog.right).await.unwrap_err();
    assert!(matches!(err, LinkError::Ledger { id, .. } if id == catalog.publisher));

    let ledger = FailingLedger::new(catalog.ledger.clone());
    let validator = LinkValidator::new(ledger, ValidatorConfig::default())?;
    let err = validator.validate_album_id(&catalog.album).await.unwrap_err();
    assert!(matches!(err, LinkError::Ledger { id, .. } if id == catalog.album));
    Ok(())
}

#[tokio::test]
async fn test_forged_payload_detected() -> Result<()> {
    init_tracing();
    let catalog = Catalog::build().await?;
    let person = catalog.record(&catalog.recipient).await?;

    let ledger = TamperingLedger::new(catalog.ledger.clone()).forge(catalog.publisher, person.clone());
    let validator = LinkValidator::new(ledger, ValidatorConfig::default())?;
    let err = validator.validate_album_id(&catalog.album).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::AddressMismatch { expected, actual }
            if expected == catalog.publisher && actual == catalog.recipient
    ));

    // Without address checks the forged record is judged on its shape alone.
    let ledger = TamperingLedger::new(catalog.ledger.clone()).forge(catalog.publisher, person);
    let validator = LinkValidator::new(
        ledger,
        ValidatorConfig {
            verify_addresses: false,
            ..ValidatorConfig::default()
        },
    )?;
    let err = validator.validate_album_id(&catalog.album).await.unwrap_err();
    assert!(matches!(
        err,
        LinkError::InvalidModel { kind: ShapeKind::Publisher, at: Some(at) } if at == catalog.publisher
    ));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_validation() -> Result<()> {
    let (catalog, validator) = setup().await?;
    let validator = Arc::new(validator);

    let mut handles = Vec::new();
    for i in 0..8 {
        let validator = Arc::clone(&validator);
        let id = if i % 2 == 0 { catalog.right } else { catalog.album_track };
        handles.push(tokio::spawn(async move { validator.validate_model_id(&id).await }));
    }

    for handle in handles {
        handle.await??;
    }
    Ok(())
}

#[tokio::test]
async fn test_sqlite_ledger_end_to_end() -> Result<()> {
    init_tracing();
    let catalog = Catalog::build().await?;
    let sqlite = SqliteLedger::open_memory()?;

    for id in catalog.ledger.list_ids().await? {
        let record = catalog.record(&id).await?;
        assert_eq!(sqlite.commit(&record).await?.id(), id);
    }

    let validator = LinkValidator::new(sqlite, ValidatorConfig::default())?;
    validator.validate_right_id(&catalog.right).await?;
    validator.validate_track_id(&catalog.album_track).await?;

    let bogus = Ed25519Signature::from_bytes([0x55; 64]);
    let forged = SignatureBuilder::new(catalog.publisher_track, catalog.artist).with_value(bogus);
    assert!(matches!(
        validator.validate_signature(&forged).await,
        Err(LinkError::InvalidSignature { .. })
    ));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

mod properties {
    use super::*;
    use chorus_testkit::generators::{agent_record, record_id, track_record};
    use proptest::prelude::*;
    use proptest::test_runner::TestRunner;

    #[test]
    fn prop_publisher_link_settles_track() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (catalog, validator) = runtime.block_on(setup()).unwrap();
        let artist = catalog.artist;

        // The album link never resolves; only the publisher decides.
        let tracks = (
            prop_oneof![Just(catalog.publisher), Just(catalog.recipient)],
            record_id(),
        )
            .prop_flat_map(move |(publisher, album)| {
                track_record(artist, publisher).prop_map(move |track| (publisher, album, track))
            });

        let mut runner = TestRunner::new(ProptestConfig::with_cases(32));
        runner
            .run(&tracks, |(publisher, album, mut track)| {
                track["inAlbum"] = json!({"@id": album.to_hex()});
                let result = runtime.block_on(validator.validate_track(&track));

                if publisher == catalog.publisher {
                    prop_assert!(result.is_ok());
                } else {
                    let is_publisher_failure = matches!(
                        result,
                        Err(LinkError::InvalidModel { kind: ShapeKind::Publisher, at: Some(at) })
                            if at == catalog.recipient
                    );
                    prop_assert!(is_publisher_failure);
                }
                Ok(())
            })
            .unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_only_organizations_publish((kind, _keypair, publisher) in agent_record()) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let result = runtime.block_on(async {
                let catalog = Catalog::build().await.unwrap();
                let publisher = catalog.commit(&publisher).await.unwrap();
                let validator =
                    LinkValidator::new(catalog.ledger.clone(), ValidatorConfig::default()).unwrap();
                let album = AlbumBuilder::new("Generated", catalog.artist, publisher).build();
                validator.validate_album(&album).await
            });

            if kind == AgentKind::Organization {
                prop_assert!(result.is_ok());
            } else {
                let is_publisher_failure = matches!(
                    result,
                    Err(LinkError::InvalidModel { kind: ShapeKind::Publisher, .. })
                );
                prop_assert!(is_publisher_failure);
            }
        }
    }
}
