//! Bit registry: name ↔ number ↔ mask lookup and bitmask decoding.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::bit::{BitDefinition, RESERVED_ATTRIBUTES};
use crate::error::MaskError;
use crate::table::{DefinitionTable, RawBitEntry};
use crate::value::{write_quoted, AttrValue, Extras};

/// Separator accepted by [`BitRegistry::mask`] to OR several names together.
pub const NAME_SEPARATOR: char = '|';

/// Prefix for decoded bits that have no definition.
pub const UNKNOWN_PREFIX: &str = "UNKNOWN";

/// Masks are `u64`, so bit positions are `0..64`.
pub const MAX_BITS: u32 = u64::BITS;

/// A lookup key: a bit name or a bit number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitKey<'a> {
    Name(&'a str),
    Number(i64),
}

impl fmt::Display for BitKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Anything usable as a registry key: bit names and bit numbers.
///
/// Definitions are not keys; a definition from one registry would otherwise
/// resolve to whatever sits at the same position in another.
///
/// ```compile_fail
/// use maskbits::{BitRegistry, RawBitEntry};
///
/// let a = BitRegistry::from_entries("a", &[RawBitEntry::new("A", 0, "a")]).unwrap();
/// let b = BitRegistry::from_entries("b", &[RawBitEntry::new("B", 0, "b")]).unwrap();
/// let _ = b.get(a.get("A").unwrap());
/// ```
pub trait IntoBitKey<'a> {
    fn into_bit_key(self) -> BitKey<'a>;
}

impl<'a> IntoBitKey<'a> for BitKey<'a> {
    fn into_bit_key(self) -> BitKey<'a> {
        self
    }
}

impl<'a> IntoBitKey<'a> for &'a str {
    fn into_bit_key(self) -> BitKey<'a> {
        BitKey::Name(self)
    }
}

impl<'a> IntoBitKey<'a> for &'a String {
    fn into_bit_key(self) -> BitKey<'a> {
        BitKey::Name(self.as_str())
    }
}

macro_rules! impl_into_bit_key_int {
    ($($ty:ty),*) => {
        $(
            impl<'a> IntoBitKey<'a> for $ty {
                fn into_bit_key(self) -> BitKey<'a> {
                    BitKey::Number(i64::try_from(self).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

impl_into_bit_key_int!(i32, u32, i64, u64, usize);

/// Registry of named mask bits for one mask family (e.g. `ccdmask`).
///
/// Provides:
/// - name ↔ bit number ↔ mask ↔ comment lookup
/// - `"A|B"` expressions combined into a single mask
/// - lenient decoding of a mask back into names (`UNKNOWN<n>` for unregistered bits)
/// - serialization back into the YAML definition format
///
/// Immutable once built; share it by reference, `Arc`, or a `LazyLock` static.
#[derive(Clone, Debug, PartialEq)]
pub struct BitRegistry {
    name: String,
    /// Sorted by bit number.
    bits: Vec<BitDefinition>,
    name_to_idx: HashMap<String, usize>,
    bit_to_idx: HashMap<u32, usize>,
}

impl BitRegistry {
    /// Build registry `name` from its entries in `table`.
    pub fn new(name: &str, table: &DefinitionTable) -> Result<Self, MaskError> {
        let entries = table
            .get(name)
            .ok_or_else(|| MaskError::UnknownRegistry(name.to_string()))?;
        Self::from_entries(name, entries)
    }

    /// Build a registry directly from raw entries.
    pub fn from_entries(name: impl Into<String>, entries: &[RawBitEntry]) -> Result<Self, MaskError> {
        let name = name.into();

        let mut bits = Vec::with_capacity(entries.len());
        let mut names = HashSet::new();
        let mut positions = HashSet::new();

        for entry in entries {
            let def = Self::validate_entry(&name, entry)?;
            if !names.insert(def.name().to_string()) {
                return Err(MaskError::validation(
                    &name,
                    format!("duplicate bit name {}", def.name()),
                ));
            }
            if !positions.insert(def.bit()) {
                return Err(MaskError::validation(
                    &name,
                    format!("bit {} of {} is already defined", def.bit(), def.name()),
                ));
            }
            tracing::trace!(registry = %name, bit = def.bit(), bit_name = def.name(), "mask bit");
            bits.push(def);
        }

        bits.sort_by_key(BitDefinition::bit);

        let name_to_idx = bits
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name().to_string(), i))
            .collect();
        let bit_to_idx = bits.iter().enumerate().map(|(i, b)| (b.bit(), i)).collect();

        tracing::debug!(registry = %name, bits = bits.len(), "built bit registry");

        Ok(Self {
            name,
            bits,
            name_to_idx,
            bit_to_idx,
        })
    }

    /// Parse YAML definitions and build registry `name` from them.
    pub fn from_yaml_str(name: &str, content: &str) -> Result<Self, MaskError> {
        let table = DefinitionTable::from_yaml_str(content)?;
        Self::new(name, &table)
    }

    fn validate_entry(registry: &str, entry: &RawBitEntry) -> Result<BitDefinition, MaskError> {
        let values = entry.values();
        let (name, bit, comment, extra) = match values {
            [name, bit, comment] => (name, bit, comment, None),
            [name, bit, comment, extra] => (name, bit, comment, Some(extra)),
            _ => {
                return Err(MaskError::validation(
                    registry,
                    format!(
                        "entry must be [name, bit, comment] or [name, bit, comment, extra], got {} values",
                        values.len()
                    ),
                ));
            }
        };

        let name = match name {
            AttrValue::String(s) if !s.is_empty() => s.clone(),
            other => {
                return Err(MaskError::validation(
                    registry,
                    format!("bit name must be a non-empty string, got {other}"),
                ));
            }
        };

        let bit = match bit.as_i64() {
            Some(n) if (0..i64::from(MAX_BITS)).contains(&n) => n as u32,
            _ => {
                return Err(MaskError::validation(
                    registry,
                    format!("{name} bit number must be an integer in 0..{MAX_BITS}, got {bit}"),
                ));
            }
        };

        let comment = match comment {
            AttrValue::String(s) => s.clone(),
            other => {
                return Err(MaskError::validation(
                    registry,
                    format!("{name} comment must be a string, got {}", other.kind()),
                ));
            }
        };

        let extra = match extra {
            None => Extras::new(),
            Some(AttrValue::Map(map)) => map.clone(),
            Some(other) => {
                return Err(MaskError::validation(
                    registry,
                    format!("{name} extra values must be a mapping, got {}", other.kind()),
                ));
            }
        };

        if let Some(key) = extra.keys().find(|k| RESERVED_ATTRIBUTES.contains(&k.as_str())) {
            return Err(MaskError::validation(
                registry,
                format!("bit {name} extra key '{key}' is reserved"),
            ));
        }

        Ok(BitDefinition::new(name, bit, comment, extra))
    }

    /// Registry name (the key it was built from).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// All definitions in ascending bit order.
    pub fn iter(&self) -> impl Iterator<Item = &BitDefinition> {
        self.bits.iter()
    }

    fn lookup(&self, key: BitKey<'_>) -> Option<&BitDefinition> {
        let idx = match key {
            BitKey::Name(name) => self.name_to_idx.get(name),
            BitKey::Number(n) => u32::try_from(n).ok().and_then(|n| self.bit_to_idx.get(&n)),
        }?;
        Some(&self.bits[*idx])
    }

    pub fn contains<'k>(&self, key: impl IntoBitKey<'k>) -> bool {
        self.lookup(key.into_bit_key()).is_some()
    }

    /// Definition by name or bit number.
    pub fn get<'k>(&self, key: impl IntoBitKey<'k>) -> Result<&BitDefinition, MaskError> {
        let key = key.into_bit_key();
        self.lookup(key)
            .ok_or_else(|| MaskError::key_not_found(&self.name, key))
    }

    /// Attribute-style access (`ccdmask.COSMIC`).
    ///
    /// Fails with [`MaskError::UnknownAttribute`] rather than `KeyNotFound`.
    pub fn bit(&self, name: &str) -> Result<&BitDefinition, MaskError> {
        self.lookup(BitKey::Name(name))
            .ok_or_else(|| MaskError::UnknownAttribute(name.to_string()))
    }

    pub fn bit_number<'k>(&self, key: impl IntoBitKey<'k>) -> Result<u32, MaskError> {
        self.get(key).map(BitDefinition::bit)
    }

    pub fn bit_name<'k>(&self, key: impl IntoBitKey<'k>) -> Result<&str, MaskError> {
        self.get(key).map(BitDefinition::name)
    }

    pub fn comment<'k>(&self, key: impl IntoBitKey<'k>) -> Result<&str, MaskError> {
        self.get(key).map(BitDefinition::comment)
    }

    /// Mask value for a bit number, a name, or `"NAME1|NAME2|..."`.
    ///
    /// ```text
    /// ccdmask.mask(3)               → 8
    /// ccdmask.mask("COSMIC")        → 16
    /// ccdmask.mask("BAD|COSMIC")    → 17
    /// ```
    pub fn mask<'k>(&self, key: impl IntoBitKey<'k>) -> Result<u64, MaskError> {
        match key.into_bit_key() {
            BitKey::Name(expr) => {
                let mut mask = 0;
                for name in expr.split(NAME_SEPARATOR) {
                    mask |= self.get(name)?.mask();
                }
                Ok(mask)
            }
            number => self.get(number).map(BitDefinition::mask),
        }
    }

    /// Names of all registered bits, ascending by bit number.
    pub fn names(&self) -> Vec<&str> {
        self.bits.iter().map(BitDefinition::name).collect()
    }

    /// Names of the bits set in `mask`, ascending by bit number.
    ///
    /// Bits without a definition come back as `UNKNOWN<n>` instead of being
    /// dropped.
    pub fn names_in(&self, mask: u64) -> Vec<String> {
        let mut names = Vec::new();
        let mut unknown = 0u64;

        let mut bit = 0;
        while bit < MAX_BITS && (1u64 << bit) <= mask {
            if mask & (1u64 << bit) != 0 {
                match self.bit_to_idx.get(&bit) {
                    Some(&idx) => names.push(self.bits[idx].name().to_string()),
                    None => {
                        unknown |= 1u64 << bit;
                        names.push(format!("{UNKNOWN_PREFIX}{bit}"));
                    }
                }
            }
            bit += 1;
        }

        if unknown != 0 {
            tracing::warn!(
                registry = %self.name,
                mask,
                unknown = %format!("{unknown:#x}"),
                "mask has bits with no definition"
            );
        }
        names
    }

    /// `names()` when `mask` is `None`, `names_in(mask)` otherwise.
    pub fn names_in_mask(&self, mask: Option<u64>) -> Vec<String> {
        match mask {
            None => self.names().into_iter().map(str::to_string).collect(),
            Some(mask) => self.names_in(mask),
        }
    }

    /// YAML definition text; loading it back yields an equivalent registry.
    pub fn to_yaml(&self) -> String {
        self.to_string()
    }
}

/// Definition lines are laid out as `[NAME,<pad> NN, "comment"]`.
struct EntryLine<'a>(&'a BitDefinition);

impl fmt::Display for EntryLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = self.0;
        let name = if is_plain_name(bit.name()) {
            format!("{},", bit.name())
        } else {
            format!("{},", AttrValue::from(bit.name()))
        };
        write!(f, "  - [{name:<16} {:>2}, ", bit.bit())?;
        write_quoted(f, bit.comment())?;
        if !bit.extra().is_empty() {
            write!(f, ", {}", AttrValue::Map(bit.extra().clone()))?;
        }
        f.write_str("]")
    }
}

/// Names that YAML reads back as the same plain string.
fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let keyword = matches!(
        name.to_ascii_lowercase().as_str(),
        "true" | "false" | "null" | "nan" | "inf" | "infinity"
    );
    starts_ok && !keyword && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for BitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_plain_name(&self.name) {
            f.write_str(&self.name)?;
        } else {
            write_quoted(f, &self.name)?;
        }
        f.write_str(":")?;
        for bit in &self.bits {
            write!(f, "\n{}", EntryLine(bit))?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;

    const CCD_YAML: &str = r#"ccdmask:
  - [BAD,              0, "Pre-determined bad pixel (any reason)"]
  - [HOT,              1, "Hot pixel", {"blat": "foo"}]
  - [DEAD,             2, "Dead pixel"]
  - [SATURATED,        3, "Saturated pixel from object"]
  - [COSMIC,           4, "Cosmic ray"]"#;

    fn ccdmask() -> BitRegistry {
        BitRegistry::from_yaml_str("ccdmask", CCD_YAML).unwrap()
    }

    fn entry(values: Vec<AttrValue>) -> Vec<RawBitEntry> {
        vec![RawBitEntry::from_values(values)]
    }

    #[test]
    fn build_and_lookup() {
        let m = ccdmask();

        assert_eq!(m.name(), "ccdmask");
        assert_eq!(m.len(), 5);
        assert_eq!(m.bit_number("COSMIC").unwrap(), 4);
        assert_eq!(m.bit_name(4).unwrap(), "COSMIC");
        assert_eq!(m.comment(0).unwrap(), "Pre-determined bad pixel (any reason)");
        assert_eq!(m.comment("COSMIC").unwrap(), "Cosmic ray");
        assert!(m.contains("HOT"));
        assert!(m.contains(1u32));
        assert!(!m.contains(7));
    }

    #[test]
    fn name_number_mask_consistency() {
        let m = ccdmask();
        for name in m.names() {
            let n = m.bit_number(name).unwrap();
            assert_eq!(m.bit_name(n).unwrap(), name);
            assert_eq!(m.mask(name).unwrap(), 1u64 << n);
            assert_eq!(m.mask(name).unwrap(), m.mask(n).unwrap());
            assert!(std::ptr::eq(m.get(name).unwrap(), m.get(n).unwrap()));
        }
    }

    #[test]
    fn mask_expressions() {
        let m = ccdmask();

        for i in 0..4u32 {
            assert_eq!(m.mask(i).unwrap(), 1u64 << i);
        }
        assert_eq!(m.mask("COSMIC").unwrap(), 16);
        assert_eq!(m.mask("COSMIC").unwrap() | m.mask("SATURATED").unwrap(), 24);
        assert_eq!(
            m.mask("BAD|COSMIC").unwrap(),
            m.bit("BAD").unwrap() | m.bit("COSMIC").unwrap()
        );
    }

    #[test]
    fn mask_expression_with_unknown_name_fails() {
        let m = ccdmask();
        let err = m.mask("BAD|NOPE").unwrap_err();
        assert!(err.is_key_not_found());
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn names_all_in_bit_order() {
        let m = ccdmask();
        assert_eq!(m.names(), ["BAD", "HOT", "DEAD", "SATURATED", "COSMIC"]);
        assert_eq!(
            m.names_in_mask(None),
            ["BAD", "HOT", "DEAD", "SATURATED", "COSMIC"]
        );
    }

    #[test]
    fn names_in_mask_decodes_unknown_bits() {
        let m = ccdmask();
        let mask = m.mask("COSMIC").unwrap() | m.mask("BAD").unwrap() | (1 << 13);

        assert_eq!(m.names_in(mask), ["BAD", "COSMIC", "UNKNOWN13"]);
        assert_eq!(m.names_in(3), ["BAD", "HOT"]);
        assert_eq!(m.names_in_mask(Some(0)), Vec::<String>::new());
    }

    #[test]
    fn names_in_mask_covers_top_bit() {
        let m = ccdmask();
        assert_eq!(m.names_in(1 << 63), ["UNKNOWN63"]);
        assert_eq!(m.names_in(u64::MAX).len(), 64);
    }

    #[test]
    fn extras_are_reachable() {
        let m = ccdmask();
        let hot = m.bit("HOT").unwrap();

        assert_eq!(hot.get_extra("blat").and_then(AttrValue::as_str), Some("foo"));
        assert_eq!(hot.name(), "HOT");
        assert_eq!(hot.bit(), 1);
        assert_eq!(hot.mask(), 2);
        assert_eq!(hot.comment(), "Hot pixel");
    }

    #[test]
    fn missing_keys() {
        let m = ccdmask();

        assert!(m.get("BLATFOO").unwrap_err().is_key_not_found());
        assert!(m.get(9).unwrap_err().is_key_not_found());
        assert!(m.get(-1).unwrap_err().is_key_not_found());
        assert!(m.bit_name(12).is_err());
        assert!(matches!(
            m.bit("BLATFOO"),
            Err(MaskError::UnknownAttribute(name)) if name == "BLATFOO"
        ));
    }

    #[test]
    fn unknown_registry() {
        let table = DefinitionTable::from_yaml_str(CCD_YAML).unwrap();
        assert!(matches!(
            BitRegistry::new("fibermask", &table),
            Err(MaskError::UnknownRegistry(name)) if name == "fibermask"
        ));
    }

    #[test]
    fn input_order_does_not_matter() {
        let entries = vec![
            RawBitEntry::new("C", 2, "c"),
            RawBitEntry::new("A", 0, "a"),
            RawBitEntry::new("B", 1, "b"),
        ];
        let m = BitRegistry::from_entries("m", &entries).unwrap();
        assert_eq!(m.names(), ["A", "B", "C"]);
        assert_eq!(m.bit_name(2).unwrap(), "C");
    }

    #[test]
    fn rejects_non_mapping_extra() {
        let err = BitRegistry::from_yaml_str(
            "ccdmask",
            r#"
ccdmask:
    - [BAD,       0, "Pre-determined bad pixel (any reason)"]
    - [HOT,       1, "Hot pixel", 1]
"#,
        )
        .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn rejects_reserved_extra_keys() {
        for key in RESERVED_ATTRIBUTES {
            let mut extra = Extras::new();
            extra.insert(key.to_string(), "foo".into());
            let entries = vec![RawBitEntry::new("BAD", 0, "comment").with_extra(extra)];

            let err = BitRegistry::from_entries("ccdmask", &entries).unwrap_err();
            assert!(err.is_validation(), "{key} should be reserved");
        }
    }

    #[test]
    fn rejects_malformed_entries() {
        let cases = [
            vec!["BAD".into(), AttrValue::Integer(0)],
            vec!["BAD".into(), AttrValue::Integer(0), "c".into(), Extras::new().into(), "x".into()],
            vec![AttrValue::Integer(1), AttrValue::Integer(0), "c".into()],
            vec!["".into(), AttrValue::Integer(0), "c".into()],
            vec!["BAD".into(), AttrValue::Integer(-1), "c".into()],
            vec!["BAD".into(), AttrValue::Integer(64), "c".into()],
            vec!["BAD".into(), AttrValue::Float(1.0), "c".into()],
            vec!["BAD".into(), AttrValue::Integer(0), AttrValue::Integer(3)],
        ];

        for values in cases {
            let err = BitRegistry::from_entries("m", &entry(values.clone())).unwrap_err();
            assert!(err.is_validation(), "should reject {values:?}");
        }
    }

    #[test]
    fn rejects_duplicates() {
        let dup_name = vec![RawBitEntry::new("A", 0, "a"), RawBitEntry::new("A", 1, "a")];
        let dup_bit = vec![RawBitEntry::new("A", 0, "a"), RawBitEntry::new("B", 0, "b")];

        assert!(BitRegistry::from_entries("m", &dup_name).unwrap_err().is_validation());
        assert!(BitRegistry::from_entries("m", &dup_bit).unwrap_err().is_validation());
    }

    #[test]
    fn serialize_matches_definition_layout() {
        assert_eq!(ccdmask().to_yaml(), CCD_YAML);
    }

    #[test]
    fn serialize_round_trip() {
        let m = ccdmask();
        let back = BitRegistry::from_yaml_str("ccdmask", &m.to_string()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn serialize_quotes_awkward_names_and_comments() {
        let entries = vec![
            RawBitEntry::new("null", 0, "looks like null"),
            RawBitEntry::new("2ND", 1, "starts with a digit"),
            RawBitEntry::new("Q", 2, r#"has "quotes" and \ slash"#),
        ];
        let m = BitRegistry::from_entries("odd", &entries).unwrap();

        let back = BitRegistry::from_yaml_str("odd", &m.to_yaml()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn serialize_quotes_awkward_registry_names() {
        for name in ["ccd mask #1", "a: b", "- x", "true", "2nd"] {
            let m = BitRegistry::from_entries(name, &[RawBitEntry::new("A", 0, "a")]).unwrap();

            let back = BitRegistry::from_yaml_str(name, &m.to_yaml())
                .unwrap_or_else(|e| panic!("{name:?} did not reload: {e}"));
            assert_eq!(back, m);
        }
        assert!(ccdmask().to_yaml().starts_with("ccdmask:\n"));
    }

    #[test]
    fn serialize_escapes_control_characters() {
        let mut extra = Extras::new();
        extra.insert("note".into(), "tab\there\u{1b}[0m".into());
        let entries = vec![
            RawBitEntry::new("BELL", 0, "bell\u{7}"),
            RawBitEntry::new("NUL", 1, "nul\0"),
            RawBitEntry::new("NEL", 2, "nel\u{85}x"),
            RawBitEntry::new("SEP", 3, "line\u{2028}para\u{2029}end"),
            RawBitEntry::new("DEL", 4, "del\u{7f}").with_extra(extra),
        ];
        let m = BitRegistry::from_entries("ctl", &entries).unwrap();

        let text = m.to_yaml();
        assert!(!text.chars().any(|c| c.is_control() && c != '\n'));

        let back = BitRegistry::from_yaml_str("ctl", &text).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.comment("NEL").unwrap(), "nel\u{85}x");
    }

    #[test]
    fn yaml_parse_errors_keep_their_source() {
        let err = BitRegistry::from_yaml_str("ccdmask", "ccdmask: [unclosed").unwrap_err();

        assert!(matches!(err, MaskError::Table(TableError::Yaml(_))));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BitRegistry>();
    }
}
