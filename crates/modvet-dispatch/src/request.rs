// crates/modvet-dispatch/src/request.rs
// ============================================================================
// Module: Dispatch Request
// Description: One external validator invocation.
// Purpose: Build the container argument vector for a module version.
// Dependencies: crate::settings
// ============================================================================

//! ## Overview
//! A [`DispatchRequest`] is transient: created on submit, consumed by a
//! worker, then dropped. Its argument vector is
//! `[runtime, run, --rm, --env-file, env_file, image, module, version, endpoint]`.

use modvet_core::PackageKey;

use crate::settings::ValidatorSettings;

/// Arguments and identity of one validator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Module path being validated.
    pub module: String,
    /// Version being validated.
    pub version: String,
    /// Full argument vector; the first element is the program.
    pub args: Vec<String>,
}

impl DispatchRequest {
    /// Builds the request for `module@version`.
    #[must_use]
    pub fn new(settings: &ValidatorSettings, module: &str, version: &str) -> Self {
        let args = vec![
            settings.runtime.clone(),
            "run".to_string(),
            "--rm".to_string(),
            "--env-file".to_string(),
            settings.env_file.display().to_string(),
            settings.image.clone(),
            module.to_string(),
            version.to_string(),
            settings.endpoint.clone(),
        ];
        Self {
            module: module.to_string(),
            version: version.to_string(),
            args,
        }
    }

    /// Builds the request for a package key.
    #[must_use]
    pub fn for_package(settings: &ValidatorSettings, key: &PackageKey) -> Self {
        Self::new(settings, key.module(), key.version())
    }

    /// Returns the `module@version` label.
    #[must_use]
    pub fn package(&self) -> String {
        format!("{}@{}", self.module, self.version)
    }

    /// Renders the argument vector as a POSIX shell command line.
    #[must_use]
    pub fn shell_line(&self) -> String {
        self.args.iter().map(|arg| shell_quote(arg)).collect::<Vec<_>>().join(" ")
    }
}

/// Single-quotes `arg` unless it only contains shell-safe characters.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg.bytes().all(|byte| {
            byte.is_ascii_alphanumeric() || b"-_./:@=+,%".contains(&byte)
        });
    if safe { arg.to_string() } else { format!("'{}'", arg.replace('\'', r"'\''")) }
}

#[cfg(test)]
mod tests {
    use super::DispatchRequest;
    use crate::settings::ValidatorSettings;

    #[test]
    fn argument_vector_layout() {
        let request =
            DispatchRequest::new(&ValidatorSettings::default(), "example.com/code", "v1.0.0");
        assert_eq!(
            request.args,
            vec![
                "docker",
                "run",
                "--rm",
                "--env-file",
                "/tmp/go_data/env",
                "gobuilder:manual",
                "example.com/code",
                "v1.0.0",
                "http://192.168.1.2:8080/api/report",
            ]
        );
        assert_eq!(request.package(), "example.com/code@v1.0.0");
    }

    #[test]
    fn shell_line_quotes_unsafe_arguments() {
        let settings = ValidatorSettings {
            image: "my image".to_string(),
            ..ValidatorSettings::default()
        };
        let request = DispatchRequest::new(&settings, "example.com/it's", "v1.0.0");
        let line = request.shell_line();
        assert!(line.starts_with("docker run --rm --env-file /tmp/go_data/env 'my image' "));
        assert!(line.contains(r"'example.com/it'\''s'"));
    }
}
