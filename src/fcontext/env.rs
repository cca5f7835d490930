/// Process-global configuration the core needs but must not read for itself.
///
/// Keeping this as an injected value (rather than reading `$HOME` or compiled-in
/// constants directly) is what lets `Handle::init` stay a pure function of its
/// arguments.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Specfile path used when `Options::paths` is empty.
    pub default_path: String,
    /// Platform limit on specfile path length (`NameTooLong` above this).
    pub path_max: usize,
    /// Whether to run context validation and `nodups_specs` during `init`.
    pub validating: bool,
}

impl Environment {
    /// The conventional defaults: `/etc/selinux/<policy>/contexts/files/file_contexts`
    /// equivalent path, POSIX `PATH_MAX`, validation off.
    pub fn system() -> Self {
        Environment {
            default_path: "/etc/selinux/config/contexts/files/file_contexts".to_string(),
            path_max: 4096,
            validating: false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::system()
    }
}
