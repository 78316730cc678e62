use std::path::Path;

/// Language profile contract: how a source file is compiled and run.
///
/// Commands are argv vectors (never shell strings) derived from the absolute
/// path of the source file inside the submission workspace.
pub trait LanguageProfile: Send + Sync {
    /// Canonical language identifier
    fn language(&self) -> &'static str;

    /// Alternative identifiers accepted by the registry
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Source file extension, without the dot
    fn extension(&self) -> &'static str;

    /// Source file name without extension
    fn source_stem(&self) -> &'static str {
        "solution"
    }

    fn compile_command(&self, source: &Path) -> Option<Vec<String>>;

    fn run_command(&self, source: &Path) -> Vec<String>;

    /// Binaries that must be on PATH for this profile to work
    fn toolchain(&self) -> &'static [&'static str];

    fn source_file_name(&self) -> String {
        format!("{}.{}", self.source_stem(), self.extension())
    }
}

/// Directory holding `source`; compile outputs are placed next to it.
pub(crate) fn source_dir(source: &Path) -> &Path {
    source.parent().unwrap_or_else(|| Path::new("."))
}

/// Path of the native binary a compiled profile produces. The name differs by
/// platform.
pub(crate) fn native_binary(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "solution".to_string());
    let name = if cfg!(windows) {
        format!("{}.exe", stem)
    } else {
        stem
    };
    path_arg(&source_dir(source).join(name))
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
