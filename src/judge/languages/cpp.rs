use crate::judge::adapter::{native_binary, path_arg, LanguageProfile};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct CppProfile;

impl LanguageProfile for CppProfile {
    fn language(&self) -> &'static str {
        "cpp"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["c++", "cxx", "cc"]
    }

    fn extension(&self) -> &'static str {
        "cpp"
    }

    fn compile_command(&self, source: &Path) -> Option<Vec<String>> {
        Some(vec![
            "g++".to_string(),
            "-std=c++17".to_string(),
            "-O2".to_string(),
            "-pipe".to_string(),
            path_arg(source),
            "-o".to_string(),
            native_binary(source),
        ])
    }

    fn run_command(&self, source: &Path) -> Vec<String> {
        vec![native_binary(source)]
    }

    fn toolchain(&self) -> &'static [&'static str] {
        &["g++"]
    }
}
