//! Event-signature hashing and classification.
//!
//! An event signature is the human-readable text form, e.g.
//! `"Transfer(address,address,uint256)"`. Its identifier is the keccak-256
//! digest of that exact text, which is what appears as `topic0` on every
//! matching log record. The display name is the text before the first `(`.
//!
//! Signatures are hashed unmodified. Canonicalization (whitespace, type
//! aliases such as `uint` for `uint256`) is the caller's responsibility;
//! a non-canonical signature simply hashes to an identifier no real log
//! will carry.

use std::collections::HashMap;

use alloy::primitives::{B256, keccak256};

/// Identifier index for one configured signature set.
///
/// Order is preserved from the input (first occurrence wins); exact
/// duplicate signatures collapse into one entry.
#[derive(Debug, Clone)]
pub struct SignatureIndex {
    /// Identifiers in input order. Drives the remote topic filter.
    topics: Vec<B256>,
    /// Display names, parallel to `topics`.
    names: Vec<String>,
    /// identifier -> position in `names`.
    slots: HashMap<B256, usize>,
}

impl SignatureIndex {
    /// Build an index over `signatures`.
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut topics = Vec::new();
        let mut names = Vec::new();
        let mut slots = HashMap::new();
        for signature in signatures {
            let signature = signature.as_ref();
            let topic = topic0(signature);
            if slots.contains_key(&topic) {
                continue;
            }
            slots.insert(topic, names.len());
            topics.push(topic);
            names.push(display_name(signature).to_owned());
        }
        Self {
            topics,
            names,
            slots,
        }
    }

    /// Identifiers in input order.
    #[must_use]
    pub fn topics(&self) -> &[B256] {
        &self.topics
    }

    /// Display names in input order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Display name for an identifier, if it is part of this set.
    #[must_use]
    pub fn name_of(&self, topic: &B256) -> Option<&str> {
        let slot = self.slots.get(topic)?;
        self.names.get(*slot).map(String::as_str)
    }

    /// Position of an identifier within [`Self::names`].
    #[must_use]
    pub fn slot_of(&self, topic: &B256) -> Option<usize> {
        self.slots.get(topic).copied()
    }

    /// Number of distinct identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Identifier of a signature string: keccak-256 of the exact text.
#[must_use]
pub fn topic0(signature: &str) -> B256 {
    keccak256(signature)
}

/// Short display name: the text before the first `(`.
///
/// A string without parentheses is returned whole, so malformed input
/// still renders as something legible.
#[must_use]
pub fn display_name(signature: &str) -> &str {
    signature.split('(').next().unwrap_or(signature)
}
