//! Build-time utilities for maskbits.
//!
//! This crate:
//! - Loads a mask definition file (`.yaml`/`.yml` or `.toml`)
//! - Validates every registry in it
//! - Generates Rust source with one module of `u64` constants per registry,
//!   plus the definition text and a `registry()` constructor
//!
//! # Usage in build.rs
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     println!("cargo:rerun-if-changed=masks.yaml");
//!     let out = std::path::Path::new(&std::env::var("OUT_DIR").unwrap()).join("masks.rs");
//!     maskbits_build::generate("masks.yaml", out).expect("Failed to generate masks");
//! }
//! ```
//!
//! ```ignore
//! // src/masks.rs
//! include!(concat!(env!("OUT_DIR"), "/masks.rs"));
//!
//! pub static CCDMASK: std::sync::LazyLock<maskbits::BitRegistry> =
//!     std::sync::LazyLock::new(|| ccdmask::registry().expect("validated at build time"));
//! ```

mod codegen;

pub use codegen::generate_code;

use std::path::Path;

use maskbits::{BitRegistry, DefinitionTable, MaskError, TableError};
use thiserror::Error;

/// Main entry point for build.rs integration.
///
/// Reads `definitions_path`, builds every registry it defines and writes the
/// generated module(s) to `output_path`.
///
/// # Errors
///
/// Returns an error if:
/// - the definition file cannot be read or parsed
/// - any registry fails validation
/// - a registry or bit name is not a usable Rust identifier
/// - the output file cannot be written
pub fn generate(
    definitions_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let definitions_path = definitions_path.as_ref();
    let output_path = output_path.as_ref();

    // 1. Load the definition table
    let table = DefinitionTable::from_file(definitions_path)?;

    // 2. Build and validate every registry
    let registries = build_registries(&table)?;

    // 3. Generate and write
    let code = generate_code(&registries)?;
    std::fs::write(output_path, code)?;

    tracing::info!(
        definitions = %definitions_path.display(),
        output = %output_path.display(),
        registries = registries.len(),
        "generated mask constants"
    );
    Ok(())
}

/// Build every registry in `table`, in registry-name order.
pub fn build_registries(table: &DefinitionTable) -> Result<Vec<BitRegistry>, GenerateError> {
    table
        .registry_names()
        .map(|name| BitRegistry::new(name, table).map_err(GenerateError::from))
        .collect()
}

/// Errors that can occur during generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Definition file could not be loaded
    #[error("definition file error: {0}")]
    Table(#[from] TableError),

    /// A registry failed validation
    #[error("registry error: {0}")]
    Registry(#[from] MaskError),

    /// A name cannot be emitted as a Rust identifier
    #[error("'{ident}' in registry '{registry}' is not a usable Rust identifier")]
    InvalidIdent { registry: String, ident: String },

    /// IO error writing the output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
