pub mod config;
pub mod git;
pub mod lifecycle;
pub mod package;
pub mod placement;
pub mod preserve;
pub mod release;
pub mod runtime;
pub mod stamp;

/// Test utilities shared across unit tests.
#[cfg(test)]
pub mod test_utils {
    use crate::package::PackageIdentity;
    use crate::runtime::CommandOutput;

    /// A module package of the given name.
    pub fn module(name: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(name, "drupal-module", version).unwrap()
    }

    /// The site skeleton package.
    pub fn root_package(version: &str) -> PackageIdentity {
        PackageIdentity::new("drupal/drupal", "drupal-core", version).unwrap()
    }

    /// A finished command with the given exit code and stdout.
    pub fn command_output(status: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            status,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}
