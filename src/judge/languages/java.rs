use crate::judge::adapter::{path_arg, source_dir, LanguageProfile};
use std::path::Path;

/// Java submissions must declare `public class Main`; the source file is
/// named after it so `javac` accepts the public class.
#[derive(Debug, Clone, Default)]
pub struct JavaProfile;

impl LanguageProfile for JavaProfile {
    fn language(&self) -> &'static str {
        "java"
    }

    fn extension(&self) -> &'static str {
        "java"
    }

    fn source_stem(&self) -> &'static str {
        "Main"
    }

    fn compile_command(&self, source: &Path) -> Option<Vec<String>> {
        Some(vec![
            "javac".to_string(),
            "-encoding".to_string(),
            "UTF-8".to_string(),
            "-d".to_string(),
            path_arg(source_dir(source)),
            path_arg(source),
        ])
    }

    fn run_command(&self, source: &Path) -> Vec<String> {
        vec![
            "java".to_string(),
            "-Xss64m".to_string(),
            "-XX:+UseSerialGC".to_string(),
            "-cp".to_string(),
            path_arg(source_dir(source)),
            self.source_stem().to_string(),
        ]
    }

    fn toolchain(&self) -> &'static [&'static str] {
        &["javac", "java"]
    }
}
