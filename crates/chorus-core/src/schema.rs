//! # Structural Gate
//!
//! Shape and format conformance for records, checked before any field of a
//! record is trusted or any of its links is followed.
//!
//! The gate is a trait ([`ShapeCheck`]) so the validator can run against any
//! conformance checker. [`SchemaGate`] is the default: one JSON Schema
//! document per record kind, embedded in the crate and compiled once with the
//! `jsonschema` crate. Regex-level format rules (identifiers, e-mail, IPI,
//! ISNI, PRO codes, ISRC, dates, territory codes, hex keys and signatures)
//! live in those documents.
//!
//! Artist and publisher are not separate documents: they are the agent
//! document with its `@type` narrowed.

use std::collections::HashMap;
use std::fmt;

use jsonschema::Validator;
use serde_json::{json, Value};
use thiserror::Error;

use crate::record::ShapeKind;

const AGENT_SCHEMA: &str = include_str!("../schemas/agent.schema.json");
const ALBUM_SCHEMA: &str = include_str!("../schemas/album.schema.json");
const TRACK_SCHEMA: &str = include_str!("../schemas/track.schema.json");
const SIGNATURE_SCHEMA: &str = include_str!("../schemas/signature.schema.json");
const RIGHT_SCHEMA: &str = include_str!("../schemas/right.schema.json");

/// A structural/schema conformance checker.
pub trait ShapeCheck: Send + Sync {
    /// Check `record` against the shape for `kind`.
    fn check_shape(&self, record: &Value, kind: ShapeKind) -> Result<(), ShapeError>;
}

/// Errors from the structural gate.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// The record does not conform to the shape.
    #[error("record does not conform to the {kind} shape:\n{violations}")]
    Violations {
        kind: ShapeKind,
        violations: Violations,
    },

    /// No schema is registered for the shape.
    #[error("no schema registered for the {0} shape")]
    UnknownShape(ShapeKind),

    /// A schema document could not be parsed or compiled.
    #[error("schema for the {kind} shape failed to build: {reason}")]
    SchemaBuild { kind: ShapeKind, reason: String },
}

/// A single violation: where in the record, and what is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the violating field.
    pub instance_path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// All violations found for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// The JSON Schema document for a shape.
pub fn schema_document(kind: ShapeKind) -> Result<Value, ShapeError> {
    let parse = |text: &str| {
        serde_json::from_str::<Value>(text).map_err(|e| ShapeError::SchemaBuild {
            kind,
            reason: e.to_string(),
        })
    };

    match kind {
        ShapeKind::Agent => parse(AGENT_SCHEMA),
        ShapeKind::Artist => {
            let mut schema = parse(AGENT_SCHEMA)?;
            narrow_type(&mut schema, kind, json!(["Person", "MusicGroup"]))?;
            Ok(schema)
        }
        ShapeKind::Publisher => {
            let mut schema = parse(AGENT_SCHEMA)?;
            narrow_type(&mut schema, kind, json!(["Organization"]))?;
            Ok(schema)
        }
        ShapeKind::Album => parse(ALBUM_SCHEMA),
        ShapeKind::Track => parse(TRACK_SCHEMA),
        ShapeKind::Signature => parse(SIGNATURE_SCHEMA),
        ShapeKind::Right => parse(RIGHT_SCHEMA),
    }
}

/// Restrict the `@type` enum of an agent schema.
fn narrow_type(schema: &mut Value, kind: ShapeKind, allowed: Value) -> Result<(), ShapeError> {
    let slot = schema
        .pointer_mut("/properties/@type/enum")
        .ok_or_else(|| ShapeError::SchemaBuild {
            kind,
            reason: "agent schema has no @type enum".into(),
        })?;
    *slot = allowed;
    Ok(())
}

/// The default structural gate: compiled JSON Schema validators per shape.
///
/// Compiled validators are `Send + Sync`; one gate can be shared by every
/// validation call.
pub struct SchemaGate {
    validators: HashMap<ShapeKind, Validator>,
}

impl SchemaGate {
    /// Parse and compile every embedded schema.
    pub fn new() -> Result<Self, ShapeError> {
        let mut validators = HashMap::with_capacity(ShapeKind::ALL.len());

        for kind in ShapeKind::ALL {
            let schema = schema_document(kind)?;
            let mut opts = jsonschema::options();
            opts.with_draft(jsonschema::Draft::Draft7);
            let validator = opts.build(&schema).map_err(|e| ShapeError::SchemaBuild {
                kind,
                reason: e.to_string(),
            })?;
            validators.insert(kind, validator);
        }

        Ok(Self { validators })
    }
}

impl fmt::Debug for SchemaGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut shapes: Vec<&str> = self.validators.keys().map(|k| k.as_str()).collect();
        shapes.sort_unstable();
        f.debug_struct("SchemaGate").field("shapes", &shapes).finish()
    }
}

impl ShapeCheck for SchemaGate {
    fn check_shape(&self, record: &Value, kind: ShapeKind) -> Result<(), ShapeError> {
        let validator = self
            .validators
            .get(&kind)
            .ok_or(ShapeError::UnknownShape(kind))?;

        let violations: Vec<Violation> = validator
            .iter_errors(record)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            tracing::debug!(%kind, count = violations.len(), "record rejected by structural gate");
            Err(ShapeError::Violations {
                kind,
                violations: Violations(violations),
            })
        }
    }
}
