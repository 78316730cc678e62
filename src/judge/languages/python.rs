use crate::judge::adapter::{path_arg, LanguageProfile};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct PythonProfile;

impl LanguageProfile for PythonProfile {
    fn language(&self) -> &'static str {
        "python"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["py", "python3"]
    }

    fn extension(&self) -> &'static str {
        "py"
    }

    fn compile_command(&self, _source: &Path) -> Option<Vec<String>> {
        None
    }

    fn run_command(&self, source: &Path) -> Vec<String> {
        // -B: never write .pyc files into the workspace
        vec!["python3".to_string(), "-B".to_string(), path_arg(source)]
    }

    fn toolchain(&self) -> &'static [&'static str] {
        &["python3"]
    }
}
