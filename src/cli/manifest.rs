//! Build manifests: the package and file lists of one build.
//!
//! A manifest is a JSON or YAML document listing the packages of a build,
//! either as a bare list or under a `packages` key. File modes may be given
//! as numbers or as octal strings (`"0100755"`).

use crate::cache::MetadataCache;
use crate::error::{ErrorContext, InspectError, Result};
use crate::model::{
    BuildSide, DeclaredFile, FileEntry, FileFlags, FileStat, MetadataHandle, PackageMetadata,
    PackageSnapshot,
};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parsed build manifest.
#[derive(Debug, Clone, Default)]
pub struct BuildManifest {
    pub packages: Vec<ManifestPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    List(Vec<ManifestPackage>),
    Wrapped { packages: Vec<ManifestPackage> },
}

/// One package of a build manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestPackage {
    pub name: String,
    #[serde(default)]
    pub epoch: Option<u32>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub arch: Option<String>,
    /// Package archive path
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directory the payload was extracted to
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

/// One payload file of a manifest package.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestFile {
    pub path: String,
    #[serde(default = "default_mode", deserialize_with = "deserialize_mode")]
    pub mode: u32,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_owner")]
    pub group: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub capabilities: Option<String>,
    #[serde(default)]
    pub flags: FileFlags,
}

const fn default_mode() -> u32 {
    0o100_644
}

fn default_owner() -> String {
    "root".to_string()
}

fn deserialize_mode<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Mode {
        Number(u32),
        Octal(String),
    }

    match Mode::deserialize(deserializer)? {
        Mode::Number(mode) => Ok(mode),
        Mode::Octal(text) => {
            let digits = text.trim().trim_start_matches("0o");
            u32::from_str_radix(digits, 8)
                .map_err(|e| serde::de::Error::custom(format!("invalid octal mode '{text}': {e}")))
        }
    }
}

/// Snapshots of one build plus the packages that could not be loaded.
#[derive(Debug, Default)]
pub struct LoadedBuild {
    pub snapshots: Vec<PackageSnapshot>,
    pub failures: Vec<InspectError>,
}

impl BuildManifest {
    /// Parse a manifest, as JSON when `json` is set and YAML otherwise.
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        let document: ManifestDocument = if json {
            serde_json::from_str(content).context("build manifest")?
        } else {
            serde_yaml::from_str(content).context("build manifest")?
        };
        let packages = match document {
            ManifestDocument::List(packages) | ManifestDocument::Wrapped { packages } => packages,
        };
        Ok(Self { packages })
    }

    /// Read a manifest file; the format follows the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
        let json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest = Self::parse(&content, json)
            .with_context(|| format!("manifest {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            packages = manifest.packages.len(),
            "Loaded build manifest"
        );
        Ok(manifest)
    }

    /// Turn the manifest into snapshots, pulling metadata through `cache`.
    ///
    /// A package whose metadata fails to load is left out and recorded in
    /// [`LoadedBuild::failures`]. Later packages sharing a name with an
    /// earlier one are loaded outside the cache, which holds a single entry
    /// per name.
    pub fn into_snapshots(self, side: BuildSide, cache: &MetadataCache) -> LoadedBuild {
        let mut loaded = LoadedBuild::default();
        let mut seen: HashSet<String> = HashSet::new();

        for package in self.packages {
            let handle = if seen.contains(&package.name) {
                tracing::debug!(
                    package = %package.name,
                    %side,
                    "Duplicate package name, loading outside the cache"
                );
                package.metadata().map(Arc::new).map_err(|e| {
                    InspectError::metadata_load(package.name.as_str(), e)
                })
            } else {
                cache.get_or_load(&package.name, || package.metadata())
            };

            match handle {
                Ok(handle) => {
                    seen.insert(package.name.clone());
                    loaded.snapshots.push(package.into_snapshot(handle, side));
                }
                Err(e) => loaded.failures.push(e),
            }
        }

        loaded
    }
}

impl ManifestPackage {
    /// Header metadata described by this entry.
    fn metadata(&self) -> std::result::Result<PackageMetadata, String> {
        if self.name.trim().is_empty() {
            return Err("package name is empty".to_string());
        }
        if self.version.is_empty() {
            return Err("missing version".to_string());
        }
        if self.release.is_empty() {
            return Err("missing release".to_string());
        }

        let declared = self
            .files
            .iter()
            .map(|f| DeclaredFile {
                path: f.path.clone(),
                mode: f.mode,
                owner: f.owner.clone(),
                group: f.group.clone(),
                digest: f.checksum.clone(),
                flags: f.flags,
            })
            .collect();

        let mut metadata = PackageMetadata::new(&self.name, &self.version, &self.release)
            .with_files(declared);
        if let Some(epoch) = self.epoch {
            metadata = metadata.with_epoch(epoch);
        }
        if let Some(arch) = &self.arch {
            metadata = metadata.with_arch(arch);
        }
        Ok(metadata)
    }

    fn into_snapshot(self, metadata: MetadataHandle, side: BuildSide) -> PackageSnapshot {
        let root = self.root;
        let files = self
            .files
            .into_iter()
            .enumerate()
            .map(|(index, f)| {
                let mut entry = FileEntry::new(f.path)
                    .with_stat(FileStat {
                        mode: f.mode,
                        owner: f.owner,
                        group: f.group,
                        size: f.size,
                        mtime: f.mtime,
                    })
                    .with_index(index)
                    .with_flags(f.flags);
                if let Some(root) = &root {
                    let fullpath = root.join(entry.localpath.trim_start_matches('/'));
                    entry = entry.with_fullpath(fullpath);
                }
                if let Some(checksum) = f.checksum {
                    entry = entry.with_checksum(checksum);
                }
                if let Some(mime) = f.mime_type {
                    entry = entry.with_mime_type(mime);
                }
                if let Some(caps) = f.capabilities {
                    entry = entry.with_capabilities(caps);
                }
                entry
            })
            .collect();

        let mut snapshot = PackageSnapshot::new(metadata, side).with_files(files);
        if let Some(path) = self.path {
            snapshot = snapshot.with_package_path(path);
        }
        if let Some(root) = root {
            snapshot = snapshot.with_extracted_root(root);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
packages:
  - name: foo
    version: "1.0"
    release: "1"
    arch: x86_64
    files:
      - path: /usr/bin/foo
        mode: "0100755"
        checksum: aaaa
      - path: /etc/foo.conf
        mode: 33188
  - name: foo-libs
    version: "1.0"
    release: "1"
    files: []
"#;

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = BuildManifest::parse(YAML, false).expect("parse");
        assert_eq!(manifest.packages.len(), 2);
        let foo = &manifest.packages[0];
        assert_eq!(foo.files[0].mode, 0o100_755);
        assert_eq!(foo.files[1].mode, 0o100_644);
        assert_eq!(foo.files[1].owner, "root");
    }

    #[test]
    fn test_parse_json_list() {
        let json = r#"[{"name": "bar", "version": "2", "release": "1",
            "files": [{"path": "/usr/bin/bar", "mode": "4755"}]}]"#;
        let manifest = BuildManifest::parse(json, true).expect("parse");
        assert_eq!(manifest.packages[0].files[0].mode, 0o4755);
    }

    #[test]
    fn test_bad_mode_is_parse_error() {
        let yaml = "- name: foo\n  version: '1'\n  release: '1'\n  \
                    files:\n    - path: /x\n      mode: '09'\n";
        let err = BuildManifest::parse(yaml, false).expect_err("bad mode");
        assert!(matches!(err, InspectError::Parse { .. }));
    }

    #[test]
    fn test_into_snapshots_uses_cache() {
        let manifest = BuildManifest::parse(YAML, false).expect("parse");
        let cache = MetadataCache::new();
        let loaded = manifest.into_snapshots(BuildSide::After, &cache);

        assert!(loaded.failures.is_empty());
        assert_eq!(loaded.snapshots.len(), 2);
        assert_eq!(cache.names(), vec!["foo", "foo-libs"]);

        let foo = &loaded.snapshots[0];
        assert_eq!(foo.side(), BuildSide::After);
        assert_eq!(foo.metadata().arch.as_deref(), Some("x86_64"));
        assert_eq!(foo.files()[1].index, 1);
        assert!(foo.metadata().declared_file("/usr/bin/foo").is_some());
    }

    #[test]
    fn test_failed_package_is_isolated() {
        let yaml = "- name: broken\n  release: '1'\n- name: fine\n  version: '1'\n  release: '1'\n";
        let manifest = BuildManifest::parse(yaml, false).expect("parse");
        let cache = MetadataCache::new();
        let loaded = manifest.into_snapshots(BuildSide::Before, &cache);

        assert_eq!(loaded.snapshots.len(), 1);
        assert_eq!(loaded.failures.len(), 1);
        assert_eq!(loaded.failures[0].package(), Some("broken"));
        assert!(!cache.contains("broken"));
    }

    #[test]
    fn test_duplicate_names_keep_their_own_metadata() {
        let yaml = "- name: foo\n  version: '1.0'\n  release: '1'\n\
                    - name: foo\n  version: '1.1'\n  release: '1'\n";
        let manifest = BuildManifest::parse(yaml, false).expect("parse");
        let cache = MetadataCache::new();
        let loaded = manifest.into_snapshots(BuildSide::After, &cache);

        let versions: Vec<&str> = loaded
            .snapshots
            .iter()
            .map(|s| s.metadata().version.as_str())
            .collect();
        assert_eq!(versions, vec!["1.0", "1.1"]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("after.json");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(br#"{"packages": [{"name": "foo", "version": "1", "release": "1"}]}"#)
            .expect("write");

        let manifest = BuildManifest::load(&path).expect("load");
        assert_eq!(manifest.packages[0].name, "foo");

        let missing = BuildManifest::load(&dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(InspectError::Io { .. })));
    }
}
