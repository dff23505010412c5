//! A single named mask bit.

use std::fmt;
use std::ops::BitOr;

use serde::Serialize;

use crate::value::{AttrValue, Extras};

/// Attribute names every bit already carries, under their accessor and
/// definition-file spellings; extras may not reuse them.
pub const RESERVED_ATTRIBUTES: [&str; 7] = [
    "name",
    "bit",
    "mask",
    "comment",
    "bitnum",
    "bitPosition",
    "maskValue",
];

/// Immutable definition of one mask bit.
///
/// `mask` is always `1 << bit`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BitDefinition {
    name: String,
    bit: u32,
    mask: u64,
    comment: String,
    #[serde(skip_serializing_if = "Extras::is_empty")]
    extra: Extras,
}

impl BitDefinition {
    /// Callers validate `bit < 64` and the extra keys.
    pub(crate) fn new(name: String, bit: u32, comment: String, extra: Extras) -> Self {
        Self {
            name,
            bit,
            mask: 1u64 << bit,
            comment,
            extra,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bit position; the mask value is `2^bit`.
    #[inline]
    pub fn bit(&self) -> u32 {
        self.bit
    }

    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    #[inline]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// All extra attributes, sorted by key.
    #[inline]
    pub fn extra(&self) -> &Extras {
        &self.extra
    }

    /// A single extra attribute, e.g. `get_extra("blat")`.
    pub fn get_extra(&self, key: &str) -> Option<&AttrValue> {
        self.extra.get(key)
    }

    /// True if this bit is set in `mask`.
    #[inline]
    pub fn is_set(&self, mask: u64) -> bool {
        mask & self.mask != 0
    }
}

/// `<name padded to 16> bit <n> mask 0x<HEX> - <comment>`
impl fmt::Display for BitDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} bit {} mask 0x{:X} - {}",
            self.name, self.bit, self.mask, self.comment
        )
    }
}

impl From<&BitDefinition> for u64 {
    fn from(def: &BitDefinition) -> Self {
        def.mask
    }
}

impl BitOr for &BitDefinition {
    type Output = u64;

    fn bitor(self, rhs: Self) -> u64 {
        self.mask | rhs.mask
    }
}

impl BitOr<u64> for &BitDefinition {
    type Output = u64;

    fn bitor(self, rhs: u64) -> u64 {
        self.mask | rhs
    }
}

impl BitOr<&BitDefinition> for u64 {
    type Output = u64;

    fn bitor(self, rhs: &BitDefinition) -> u64 {
        self | rhs.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bit(name: &str, n: u32, comment: &str) -> BitDefinition {
        BitDefinition::new(name.into(), n, comment.into(), Extras::new())
    }

    #[test]
    fn mask_is_power_of_two() {
        for n in [0, 1, 13, 63] {
            assert_eq!(bit("X", n, "").mask(), 1u64 << n);
        }
    }

    #[test]
    fn describe_line() {
        assert_eq!(
            bit("BAD", 0, "Pre-determined bad pixel (any reason)").to_string(),
            "BAD              bit 0 mask 0x1 - Pre-determined bad pixel (any reason)"
        );
        assert_eq!(
            bit("COSMIC", 4, "Cosmic ray").to_string(),
            "COSMIC           bit 4 mask 0x10 - Cosmic ray"
        );
    }

    #[test]
    fn combine_with_or() {
        let cosmic = bit("COSMIC", 4, "");
        let saturated = bit("SATURATED", 3, "");

        assert_eq!(&cosmic | &saturated, 24);
        assert_eq!(&cosmic | 1u64, 17);
        assert_eq!(1u64 | &cosmic, 17);
        assert_eq!(u64::from(&cosmic), 16);
        assert!(cosmic.is_set(24));
        assert!(!cosmic.is_set(8));
    }

    #[test]
    fn serializes_fields() {
        let mut extra = Extras::new();
        extra.insert("blat".into(), "foo".into());
        let hot = BitDefinition::new("HOT".into(), 1, "Hot pixel".into(), extra);

        let json = serde_json::to_value(&hot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "HOT",
                "bit": 1,
                "mask": 2,
                "comment": "Hot pixel",
                "extra": {"blat": "foo"}
            })
        );

        let plain = serde_json::to_value(bit("BAD", 0, "x")).unwrap();
        assert!(plain.get("extra").is_none());
    }
}
