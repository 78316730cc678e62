use crate::judge::adapter::{native_binary, path_arg, LanguageProfile};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct CProfile;

impl LanguageProfile for CProfile {
    fn language(&self) -> &'static str {
        "c"
    }

    fn extension(&self) -> &'static str {
        "c"
    }

    fn compile_command(&self, source: &Path) -> Option<Vec<String>> {
        Some(vec![
            "gcc".to_string(),
            "-std=c17".to_string(),
            "-O2".to_string(),
            "-pipe".to_string(),
            path_arg(source),
            "-o".to_string(),
            native_binary(source),
            "-lm".to_string(),
        ])
    }

    fn run_command(&self, source: &Path) -> Vec<String> {
        vec![native_binary(source)]
    }

    fn toolchain(&self) -> &'static [&'static str] {
        &["gcc"]
    }
}
