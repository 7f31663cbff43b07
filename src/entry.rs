//! The `(qualified_name, signature)` pair both the per-file visitor and the
//! cross-file aggregator operate on.

use crate::signature::Signature;

/// One function's MinHash signature, addressed by its qualified name.
///
/// `qualified_name` is `"sourceFile::functionName"` when the source file is
/// known, or just `functionName` otherwise — qualification is what keeps
/// bare-name collisions across files from colliding in the index. `name`
/// and `source_file` are kept alongside it (rather than derived by
/// splitting `qualified_name` back apart) since a source path could itself
/// legally contain `"::"`.
pub struct FunctionEntry {
    /// Bare function name.
    pub name: String,
    /// Source file path, or empty if unknown.
    pub source_file: String,
    /// The qualified (or bare) function name used as the index/pair key.
    pub qualified_name: String,
    /// The function's MinHash signature.
    pub signature: Signature,
}

impl FunctionEntry {
    /// Build an entry, qualifying `name` with `source_file` when non-empty.
    pub fn new(name: impl Into<String>, source_file: &str, signature: Signature) -> Self {
        let name = name.into();
        let qualified_name = if source_file.is_empty() {
            name.clone()
        } else {
            format!("{source_file}::{name}")
        };
        Self {
            name,
            source_file: source_file.to_string(),
            qualified_name,
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_with_source_file_when_present() {
        let entry = FunctionEntry::new("process", "a.go", Signature::new(8).unwrap());
        assert_eq!(entry.qualified_name, "a.go::process");
        assert_eq!(entry.name, "process");
        assert_eq!(entry.source_file, "a.go");
    }

    #[test]
    fn omits_qualification_when_source_file_empty() {
        let entry = FunctionEntry::new("process", "", Signature::new(8).unwrap());
        assert_eq!(entry.qualified_name, "process");
    }
}
