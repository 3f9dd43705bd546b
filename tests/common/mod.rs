//! Shared fixtures: fake native tools and scratch trees.
//!
//! The fake tools record their arguments one per line in `<name>.args` and
//! copy what they were given into `capture/`, so tests can inspect the
//! staged payload, scripts and resources after the staging area is gone.

#![allow(dead_code)]

use kodegen_bundler_pkg::bundler::Toolchain;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const IDENTITY: &str = "Developer ID Installer: Example (TEAMID)";

const PKGBUILD: &str = r#"
out=""; root=""; scripts=""
while [ $# -gt 0 ]; do
  case "$1" in
    --root) root="$2"; shift 2 ;;
    --scripts) scripts="$2"; shift 2 ;;
    --identifier|--version|--install-location|--component-plist) shift 2 ;;
    --nopayload) shift ;;
    *) out="$1"; shift ;;
  esac
done
rm -rf "$DIR/capture/payload" "$DIR/capture/scripts"
mkdir -p "$DIR/capture"
cp -Rp "$root" "$DIR/capture/payload"
if [ -n "$scripts" ]; then cp -Rp "$scripts" "$DIR/capture/scripts"; fi
{ echo "component"; (cd "$root" && find . | LC_ALL=C sort); } > "$out"
"#;

const PRODUCTBUILD: &str = r#"
out=""; dist=""; res=""
while [ $# -gt 0 ]; do
  case "$1" in
    --distribution) dist="$2"; shift 2 ;;
    --resources) res="$2"; shift 2 ;;
    --package-path) shift 2 ;;
    *) out="$1"; shift ;;
  esac
done
rm -rf "$DIR/capture/resources"
mkdir -p "$DIR/capture"
cp "$dist" "$DIR/capture/distribution.xml"
cp -Rp "$res" "$DIR/capture/resources"
{ echo "product"; cat "$dist"; } > "$out"
"#;

const SECURITY: &str = r#"
echo '  1) 0123456789ABCDEF "Developer ID Installer: Example (TEAMID)"'
echo '     1 valid identities found'
"#;

const PRODUCTSIGN: &str = r#"
{ cat "$3"; echo "signed by $2"; } > "$4"
"#;

/// Scratch directory with fake tools and an input tree.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        std::fs::create_dir_all(fixture.tools_dir()).unwrap();
        for (name, body) in [
            ("pkgbuild", PKGBUILD),
            ("productbuild", PRODUCTBUILD),
            ("security", SECURITY),
            ("productsign", PRODUCTSIGN),
        ] {
            fixture.tool(name, body);
        }
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.path().join("tools")
    }

    pub fn capture(&self) -> PathBuf {
        self.tools_dir().join("capture")
    }

    pub fn stage_root(&self) -> PathBuf {
        self.path().join("stage")
    }

    /// Installs (or replaces) fake tool `name` with a shell `body`.
    pub fn tool(&self, name: &str, body: &str) -> PathBuf {
        let dir = self.tools_dir();
        let path = dir.join(name);
        let script = format!(
            "#!/bin/sh\nDIR='{}'\nfor a in \"$@\"; do printf '%s\\n' \"$a\"; done > \"$DIR/{name}.args\"\n{body}",
            dir.display()
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Arguments of the last invocation of `name`, or `None` if it never ran.
    pub fn args(&self, name: &str) -> Option<Vec<String>> {
        std::fs::read_to_string(self.tools_dir().join(format!("{name}.args")))
            .ok()
            .map(|s| s.lines().map(str::to_string).collect())
    }

    pub fn toolchain(&self) -> Toolchain {
        let tools = self.tools_dir();
        Toolchain {
            pkgbuild: tools.join("pkgbuild"),
            productbuild: tools.join("productbuild"),
            productsign: tools.join("productsign"),
            security: tools.join("security"),
            ..Toolchain::default()
        }
        .temp_root(self.stage_root())
    }

    /// Writes `contents` at `rel` under the fixture, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// A minimal application bundle at `rel`.
    pub fn app(&self, rel: &str) -> PathBuf {
        self.write(&format!("{rel}/Contents/Info.plist"), "<plist/>");
        let bin = self.write(&format!("{rel}/Contents/MacOS/app"), "#!/bin/sh\n");
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        self.path().join(rel)
    }

    /// True when no staging directory is left behind.
    pub fn staging_is_clean(&self) -> bool {
        match std::fs::read_dir(self.stage_root()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

/// Position of `needle` in `args`.
pub fn position(args: &[String], needle: &str) -> Option<usize> {
    args.iter().position(|a| a == needle)
}

/// Value following `flag` in `args`.
pub fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    position(args, flag).and_then(|i| args.get(i + 1)).map(String::as_str)
}
