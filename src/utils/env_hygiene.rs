/// Environment hygiene for judged programs
///
/// Submitted code never inherits the judge's full environment. Only the
/// allowlisted host variables survive; loader-injection variables are always
/// stripped and HOME/TMPDIR point into the submission workspace.
use std::collections::BTreeMap;
use std::path::Path;

/// Host variables that may pass through to the child
const PASSTHROUGH: &[&str] = &["PATH", "JAVA_HOME", "NODE_PATH", "PYTHONHASHSEED"];

const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Environment construction policy
#[derive(Debug, Clone)]
pub struct EnvPolicy {
    /// Copy allowlisted variables from the host
    pub inherit_allowlisted: bool,
    /// Force a UTF-8 C locale
    pub set_deterministic_locale: bool,
}

impl Default for EnvPolicy {
    fn default() -> Self {
        EnvPolicy {
            inherit_allowlisted: true,
            set_deterministic_locale: true,
        }
    }
}

impl EnvPolicy {
    /// Build the child environment for a run inside `workdir`.
    pub fn build<F>(&self, workdir: &Path, lookup: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = BTreeMap::new();

        if self.inherit_allowlisted {
            for key in PASSTHROUGH {
                if let Some(value) = lookup(key) {
                    env.insert(key.to_string(), value);
                }
            }
        }
        env.entry("PATH".to_string())
            .or_insert_with(|| FALLBACK_PATH.to_string());

        let dir = workdir.to_string_lossy().to_string();
        env.insert("HOME".to_string(), dir.clone());
        env.insert("TMPDIR".to_string(), dir);

        if self.set_deterministic_locale {
            env.insert("LANG".to_string(), "C.UTF-8".to_string());
            env.insert("LC_ALL".to_string(), "C.UTF-8".to_string());
        }

        env.retain(|key, _| !key.starts_with("LD_") && !key.starts_with("DYLD_"));
        env
    }

    /// Build the child environment from the real process environment.
    pub fn for_workdir(&self, workdir: &Path) -> BTreeMap<String, String> {
        self.build(workdir, |key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(key: &str) -> Option<String> {
        match key {
            "PATH" => Some("/opt/toolchains/bin:/usr/bin".to_string()),
            "LD_PRELOAD" => Some("/evil.so".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_allowlisted_path_survives() {
        let env = EnvPolicy::default().build(Path::new("/ws/run"), host);
        assert_eq!(env.get("PATH").map(String::as_str), Some("/opt/toolchains/bin:/usr/bin"));
    }

    #[test]
    fn test_secrets_and_loader_vars_are_not_inherited() {
        let env = EnvPolicy::default().build(Path::new("/ws/run"), host);
        assert!(!env.contains_key("LD_PRELOAD"));
        assert!(!env.contains_key("AWS_SECRET_ACCESS_KEY"));
    }

    #[test]
    fn test_home_and_tmp_point_into_workspace() {
        let env = EnvPolicy::default().build(Path::new("/ws/run"), |_| None);
        assert_eq!(env["HOME"], "/ws/run");
        assert_eq!(env["TMPDIR"], "/ws/run");
        assert_eq!(env["PATH"], FALLBACK_PATH);
        assert_eq!(env["LANG"], "C.UTF-8");
    }
}
