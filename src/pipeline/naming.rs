//! Title and output-filename derivation from the client's markdown filename.
//!
//! Rules:
//! * Only the last path component of the client filename is used; both `/`
//!   and `\` separate components. A name that reduces to nothing, `.` or `..`
//!   becomes [`FALLBACK_NAME`].
//! * The extension is the suffix after the last `.`. A leading dot does not
//!   start an extension, so `.md` has none.
//! * The title is the name without its extension.
//! * The output name replaces the extension with `azw3`, or appends `.azw3`
//!   when there is none: `report` → `report.azw3`.

use crate::config::ARTIFACT_EXTENSION;

/// Name used when the client filename has no usable last component.
pub const FALLBACK_NAME: &str = "document";

/// Last path component of a client-supplied filename.
pub fn base_name(filename: &str) -> &str {
    let last = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    match last.trim() {
        "" | "." | ".." => FALLBACK_NAME,
        _ => last,
    }
}

/// Split a base name into `(stem, extension)` at the last `.`. A leading
/// dot starts an extension too: `.md` has an empty stem.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        None => (name, None),
        Some(i) => (&name[..i], Some(&name[i + 1..])),
    }
}

/// Book title derived from the markdown filename.
pub fn derive_title(filename: &str) -> String {
    split_extension(base_name(filename)).0.to_string()
}

/// Download filename of the artifact generated from `filename`.
pub fn output_filename(filename: &str) -> String {
    let (stem, _) = split_extension(base_name(filename));
    format!("{stem}.{ARTIFACT_EXTENSION}")
}
