//! Rust source generation for mask registries.

use std::fmt::Write;

use maskbits::BitRegistry;

use crate::GenerateError;

/// Names the generated module defines itself; bit names may not shadow them.
const GENERATED_ITEMS: [&str; 3] = ["NAME", "DEFINITIONS", "registry"];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "gen", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Check that `s` can be emitted as a plain Rust identifier.
pub(crate) fn is_rust_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && s != "_"
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RUST_KEYWORDS.contains(&s)
}

/// Generate one `pub mod <registry>` per registry.
///
/// ```text
/// pub mod ccdmask {
///     pub const NAME: &str = "ccdmask";
///     /// Cosmic ray
///     pub const COSMIC: u64 = 0x10;
///     pub const DEFINITIONS: &str = "ccdmask:\n  - [...]";
///     pub fn registry() -> Result<::maskbits::BitRegistry, ::maskbits::MaskError> { .. }
/// }
/// ```
pub fn generate_code(registries: &[BitRegistry]) -> Result<String, GenerateError> {
    let mut code = String::new();
    code.push_str("// @generated by maskbits-build. Do not edit.\n");

    for registry in registries {
        if !is_rust_ident(registry.name()) {
            return Err(GenerateError::InvalidIdent {
                registry: registry.name().to_string(),
                ident: registry.name().to_string(),
            });
        }
        write_registry(&mut code, registry)?;
    }

    Ok(code)
}

fn write_registry(code: &mut String, registry: &BitRegistry) -> Result<(), GenerateError> {
    let name = registry.name();

    // Writing into a String cannot fail.
    let _ = writeln!(code);
    let _ = writeln!(code, "#[allow(non_upper_case_globals, dead_code)]");
    let _ = writeln!(code, "pub mod {name} {{");
    let _ = writeln!(code, "    /// Registry name.");
    let _ = writeln!(code, "    pub const NAME: &str = {name:?};");

    for bit in registry.iter() {
        let ident = bit.name();
        if !is_rust_ident(ident) || GENERATED_ITEMS.contains(&ident) {
            return Err(GenerateError::InvalidIdent {
                registry: name.to_string(),
                ident: ident.to_string(),
            });
        }
        let _ = writeln!(code);
        for line in bit.comment().lines() {
            let _ = writeln!(code, "    /// {line}");
        }
        let _ = writeln!(code, "    pub const {ident}: u64 = {:#x};", bit.mask());
    }

    let _ = writeln!(code);
    let _ = writeln!(code, "    /// Definition text, loadable with `BitRegistry::from_yaml_str`.");
    let _ = writeln!(code, "    pub const DEFINITIONS: &str = {:?};", registry.to_yaml());
    let _ = writeln!(code);
    let _ = writeln!(code, "    /// Build the registry from [`DEFINITIONS`].");
    let _ = writeln!(
        code,
        "    pub fn registry() -> ::core::result::Result<::maskbits::BitRegistry, ::maskbits::MaskError> {{"
    );
    let _ = writeln!(code, "        ::maskbits::BitRegistry::from_yaml_str(NAME, DEFINITIONS)");
    let _ = writeln!(code, "    }}");
    let _ = writeln!(code, "}}");

    Ok(())
}
