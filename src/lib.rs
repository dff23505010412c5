//! # Named mask bits (maskbits)
//!
//! Define a family of named status bits once, then look bits up by name or
//! number, combine them, and decode integer masks back into names.
//!
//! ## Definitions
//!
//! Packages declare their bits in a definition table, usually YAML:
//!
//! ```yaml
//! ccdmask:
//!   - [BAD,       0, "Pre-determined bad pixel (any reason)"]
//!   - [HOT,       1, "Hot pixel", {"blat": "foo"}]
//!   - [DEAD,      2, "Dead pixel"]
//!   - [SATURATED, 3, "Saturated pixel from object"]
//!   - [COSMIC,    4, "Cosmic ray"]
//! ```
//!
//! ## Usage
//!
//! ```
//! use maskbits::BitRegistry;
//!
//! let ccdmask = BitRegistry::from_yaml_str("ccdmask", r#"
//! ccdmask:
//!   - [BAD,       0, "Pre-determined bad pixel (any reason)"]
//!   - [HOT,       1, "Hot pixel", {"blat": "foo"}]
//!   - [DEAD,      2, "Dead pixel"]
//!   - [SATURATED, 3, "Saturated pixel from object"]
//!   - [COSMIC,    4, "Cosmic ray"]
//! "#)?;
//!
//! assert_eq!(ccdmask.mask("COSMIC|SATURATED")?, 24);
//! assert_eq!(ccdmask.bit_number("COSMIC")?, 4);
//! assert_eq!(ccdmask.bit_name(4)?, "COSMIC");
//! assert_eq!(ccdmask.names_in(ccdmask.mask("COSMIC|BAD")? | 1 << 13), ["BAD", "COSMIC", "UNKNOWN13"]);
//! assert_eq!(ccdmask.bit("HOT")?.get_extra("blat").and_then(|v| v.as_str()), Some("foo"));
//! # Ok::<(), maskbits::MaskError>(())
//! ```
//!
//! A registry is immutable after construction. Build it once at startup and
//! share it (`&BitRegistry`, `Arc<BitRegistry>` or a `LazyLock` static).

pub mod bit;
pub mod error;
pub mod registry;
pub mod table;
pub mod value;

pub use bit::{BitDefinition, RESERVED_ATTRIBUTES};
pub use error::{MaskError, TableError};
pub use registry::{BitKey, BitRegistry, IntoBitKey, MAX_BITS, NAME_SEPARATOR, UNKNOWN_PREFIX};
pub use table::{DefinitionTable, RawBitEntry};
pub use value::{AttrValue, Extras};
