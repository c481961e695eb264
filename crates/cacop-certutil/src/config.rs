//! Location of the NSS tools.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Program name of the NSS certificate database tool
pub const PROGRAM: &str = "certutil";

/// Environment variable the dynamic loader searches for shared libraries
#[cfg(target_os = "macos")]
pub const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
/// Environment variable the dynamic loader searches for shared libraries
#[cfg(not(target_os = "macos"))]
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Where to find `certutil` and the NSS shared libraries.
///
/// With neither directory set, `certutil` is resolved through `PATH` and the
/// system loader configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertutilConfig {
    /// Directory holding the `certutil` binary
    pub bin_dir: Option<PathBuf>,
    /// Directory holding `libnss3` and friends
    pub lib_dir: Option<PathBuf>,
}

impl CertutilConfig {
    /// Use an NSS distribution laid out as `<dist>/bin` and `<dist>/lib`
    #[must_use]
    pub fn from_dist(dist: impl AsRef<Path>) -> Self {
        let dist = dist.as_ref();
        Self {
            bin_dir: Some(dist.join("bin")),
            lib_dir: Some(dist.join("lib")),
        }
    }

    /// Path of the program to execute
    #[must_use]
    pub fn program(&self) -> PathBuf {
        self.bin_dir
            .as_ref()
            .map_or_else(|| PathBuf::from(PROGRAM), |dir| dir.join(PROGRAM))
    }

    /// Loader search path for the child process, with `lib_dir` prepended
    /// to `inherited`
    #[must_use]
    pub fn library_path(&self, inherited: Option<OsString>) -> Option<OsString> {
        let lib_dir = self.lib_dir.as_ref()?;
        let mut paths = vec![lib_dir.clone()];
        if let Some(inherited) = inherited {
            paths.extend(std::env::split_paths(&inherited));
        }
        std::env::join_paths(paths).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_through_path() {
        let config = CertutilConfig::default();
        assert_eq!(config.program(), PathBuf::from("certutil"));
        assert!(config.library_path(Some("/usr/lib".into())).is_none());
    }

    #[test]
    fn distribution_layout() {
        let config = CertutilConfig::from_dist("/opt/nss/dist");
        assert_eq!(config.program(), PathBuf::from("/opt/nss/dist/bin/certutil"));
        assert_eq!(config.lib_dir.as_deref(), Some(Path::new("/opt/nss/dist/lib")));
    }

    #[cfg(unix)]
    #[test]
    fn library_dir_is_prepended() {
        let config = CertutilConfig::from_dist("/opt/nss");
        assert_eq!(
            config.library_path(Some("/usr/lib:/usr/local/lib".into())),
            Some(OsString::from("/opt/nss/lib:/usr/lib:/usr/local/lib"))
        );
        assert_eq!(
            config.library_path(None),
            Some(OsString::from("/opt/nss/lib"))
        );
    }
}
