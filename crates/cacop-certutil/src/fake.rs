//! Shell stand-in for certutil.

use crate::config::CertutilConfig;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
dir=$(dirname "$0")
echo "$@" >> "$dir/calls.log"
if [ $# -eq 0 ]; then
  echo "certutil - Utility to manipulate NSS certificate databases"
  exit 1
fi
case "$1" in
  -A) cat > /dev/null ;;
  -O) printf '"root-fp" [CN=Root]\n  "leaf-fp" [CN=Leaf]\n' ;;
  -V)
    if [ "@VERIFY@" = "ok" ]; then
      echo "certutil: certificate is valid"
    else
      echo "certutil: certificate is invalid: Peer's Certificate issuer is not recognized."
      exit 255
    fi ;;
esac
exit 0
"#;

/// Write a fake `certutil` into a temp dir and point a config at it
pub fn install_fake(verify_ok: bool) -> (TempDir, CertutilConfig) {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("certutil");
    let script = SCRIPT.replace("@VERIFY@", if verify_ok { "ok" } else { "fail" });
    std::fs::write(&program, script).unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
    let config = CertutilConfig {
        bin_dir: Some(dir.path().to_path_buf()),
        lib_dir: Some(dir.path().join("lib")),
    };
    (dir, config)
}

/// Argument lines the fake recorded, one per invocation
pub fn calls(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join("calls.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
