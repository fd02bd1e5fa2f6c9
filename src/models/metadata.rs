//! Checkout session metadata.
//!
//! The payment provider stores metadata as a flat string map. This module is
//! the only place that knows the key names and the encoding of id lists; the
//! rest of the crate works with [`SessionMetadata`].
//!
//! Sessions are written with camelCase keys, the shape the storefront has
//! always used. Sessions written with the older snake_case keys are still read.
//!
//! Id lists are joined with `,`. A `,` or `\` inside an id is written with a
//! preceding `\`, so `a,b` and `a\,b` decode to two ids and one id respectively.

use std::collections::HashMap;

use thiserror::Error;

pub const KEY_IS_CART: &str = "isCart";
pub const KEY_ANIMATION_ID: &str = "animationId";
pub const KEY_ANIMATION_IDS: &str = "animationIds";
pub const KEY_ANIMATION_TITLE: &str = "animationTitle";

/// Read-only fallbacks, paired with the key they stand in for.
const LEGACY_KEYS: [(&str, &str); 4] = [
    (KEY_IS_CART, "is_cart"),
    (KEY_ANIMATION_ID, "animation_id"),
    (KEY_ANIMATION_IDS, "animation_ids"),
    (KEY_ANIMATION_TITLE, "animation_title"),
];

fn lookup<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a String> {
    map.get(key).or_else(|| {
        LEGACY_KEYS
            .iter()
            .find(|(current, _)| *current == key)
            .and_then(|(_, legacy)| map.get(*legacy))
    })
}

pub const ID_DELIMITER: char = ',';
pub const ID_ESCAPE: char = '\\';

/// Stripe rejects metadata values longer than this.
pub const MAX_METADATA_VALUE_LEN: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata has no animationId")]
    MissingAnimationId,

    #[error("metadata has no animationIds")]
    MissingAnimationIds,

    #[error("metadata value for {0} exceeds {MAX_METADATA_VALUE_LEN} characters")]
    ValueTooLong(&'static str),
}

/// What a checkout session paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMetadata {
    Single {
        animation_id: String,
        animation_title: Option<String>,
    },
    Cart {
        /// Never empty once parsed.
        animation_ids: Vec<String>,
        animation_title: Option<String>,
    },
}

impl SessionMetadata {
    /// Parse the provider's metadata map.
    ///
    /// `isCart` is a boolean flag; anything other than `"true"` (including
    /// absence) means a single-item purchase.
    pub fn parse(map: &HashMap<String, String>) -> Result<Self, MetadataError> {
        let is_cart = lookup(map, KEY_IS_CART)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let animation_title = lookup(map, KEY_ANIMATION_TITLE)
            .filter(|t| !t.is_empty())
            .cloned();

        if is_cart {
            let animation_ids = lookup(map, KEY_ANIMATION_IDS)
                .map(|v| decode_id_list(v))
                .unwrap_or_default();
            if animation_ids.is_empty() {
                return Err(MetadataError::MissingAnimationIds);
            }
            Ok(SessionMetadata::Cart {
                animation_ids,
                animation_title,
            })
        } else {
            let animation_id = lookup(map, KEY_ANIMATION_ID)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or(MetadataError::MissingAnimationId)?;
            Ok(SessionMetadata::Single {
                animation_id: animation_id.to_string(),
                animation_title,
            })
        }
    }

    /// Flatten into `(key, value)` pairs for the provider.
    pub fn to_pairs(&self) -> Result<Vec<(&'static str, String)>, MetadataError> {
        let mut pairs = Vec::with_capacity(3);
        match self {
            SessionMetadata::Single {
                animation_id,
                animation_title,
            } => {
                pairs.push((KEY_IS_CART, "false".to_string()));
                pairs.push((KEY_ANIMATION_ID, animation_id.clone()));
                if let Some(title) = animation_title {
                    pairs.push((KEY_ANIMATION_TITLE, title.clone()));
                }
            }
            SessionMetadata::Cart {
                animation_ids,
                animation_title,
            } => {
                pairs.push((KEY_IS_CART, "true".to_string()));
                pairs.push((KEY_ANIMATION_IDS, encode_id_list(animation_ids)));
                if let Some(title) = animation_title {
                    pairs.push((KEY_ANIMATION_TITLE, title.clone()));
                }
            }
        }

        for (key, value) in &pairs {
            if value.chars().count() > MAX_METADATA_VALUE_LEN {
                return Err(MetadataError::ValueTooLong(*key));
            }
        }
        Ok(pairs)
    }

    pub fn is_cart(&self) -> bool {
        matches!(self, SessionMetadata::Cart { .. })
    }

    /// Purchased ids in checkout order.
    pub fn animation_ids(&self) -> Vec<&str> {
        match self {
            SessionMetadata::Single { animation_id, .. } => vec![animation_id.as_str()],
            SessionMetadata::Cart { animation_ids, .. } => {
                animation_ids.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn animation_title(&self) -> Option<&str> {
        match self {
            SessionMetadata::Single {
                animation_title, ..
            }
            | SessionMetadata::Cart {
                animation_title, ..
            } => animation_title.as_deref(),
        }
    }
}

pub fn encode_id_list<S: AsRef<str>>(ids: &[S]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(ID_DELIMITER);
        }
        for c in id.as_ref().chars() {
            if c == ID_DELIMITER || c == ID_ESCAPE {
                out.push(ID_ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// Inverse of [`encode_id_list`]. Segments are trimmed, empty ones dropped,
/// and a trailing lone escape is kept literally.
pub fn decode_id_list(encoded: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut current = String::new();
    let mut chars = encoded.chars();

    while let Some(c) = chars.next() {
        match c {
            ID_ESCAPE => match chars.next() {
                Some(next) => current.push(next),
                None => current.push(ID_ESCAPE),
            },
            ID_DELIMITER => {
                push_id(&mut ids, &mut current);
            }
            _ => current.push(c),
        }
    }
    push_id(&mut ids, &mut current);
    ids
}

fn push_id(ids: &mut Vec<String>, current: &mut String) {
    let id = std::mem::take(current);
    let trimmed = id.trim();
    if !trimmed.is_empty() {
        ids.push(trimmed.to_string());
    }
}
