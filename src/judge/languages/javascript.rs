use crate::judge::adapter::{path_arg, LanguageProfile};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct JavaScriptProfile;

impl LanguageProfile for JavaScriptProfile {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["js", "node", "nodejs"]
    }

    fn extension(&self) -> &'static str {
        "js"
    }

    fn compile_command(&self, _source: &Path) -> Option<Vec<String>> {
        None
    }

    fn run_command(&self, source: &Path) -> Vec<String> {
        vec!["node".to_string(), path_arg(source)]
    }

    fn toolchain(&self) -> &'static [&'static str] {
        &["node"]
    }
}
