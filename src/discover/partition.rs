//! Monorepo partition discovery: walks the target root once and returns an
//! ordered `[root, ...apps, ...packages]` list. Grounded on the teacher's
//! `core::project::find_project_root`'s upward marker search, generalized
//! from "find the one enclosing project" to "enumerate every partition
//! under this root".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Workspace,
    Root,
    App,
    Package,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub root: PathBuf,
    pub relative_path: String,
    pub kind: PartitionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_json_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsconfig_path: Option<PathBuf>,
}

fn markers(dir: &Path) -> (Option<PathBuf>, Option<PathBuf>) {
    let package_json = dir.join("package.json");
    let tsconfig = dir.join("tsconfig.json");
    (
        package_json.exists().then_some(package_json),
        tsconfig.exists().then_some(tsconfig),
    )
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Children of `group_dir` (e.g. `apps/`, `packages/`) that carry at least
/// one marker, skipping hidden entries. Unreadable directories are treated
/// as empty rather than surfaced as an error.
fn scan_group(group_dir: &Path, target_root: &Path, kind: PartitionKind) -> Vec<Partition> {
    let Ok(entries) = std::fs::read_dir(group_dir) else {
        return Vec::new();
    };

    let mut found: Vec<Partition> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter(|e| !is_hidden(&e.path()))
        .filter_map(|e| {
            let dir = e.path();
            let (package_json_path, tsconfig_path) = markers(&dir);
            if package_json_path.is_none() && tsconfig_path.is_none() {
                return None;
            }
            let relative_path = dir
                .strip_prefix(target_root)
                .unwrap_or(&dir)
                .to_string_lossy()
                .replace('\\', "/");
            Some(Partition {
                root: dir,
                relative_path,
                kind,
                package_json_path,
                tsconfig_path,
            })
        })
        .collect();

    found.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    found
}

/// Discovers `[root, ...apps, ...packages]` under `target_root`. A missing
/// target path yields a single unmarked `root` partition rather than an
/// error — only an entirely absent root is treated leniently; everything
/// else downstream (file-set resolution) is what actually fails loudly on a
/// bad path.
pub fn discover_partitions(target_root: &Path) -> Vec<Partition> {
    let (package_json_path, tsconfig_path) = if target_root.exists() {
        markers(target_root)
    } else {
        (None, None)
    };

    let apps = scan_group(&target_root.join("apps"), target_root, PartitionKind::App);
    let packages = scan_group(
        &target_root.join("packages"),
        target_root,
        PartitionKind::Package,
    );

    let root_kind = if apps.is_empty() && packages.is_empty() {
        PartitionKind::Root
    } else {
        PartitionKind::Workspace
    };

    let mut out = vec![Partition {
        root: target_root.to_path_buf(),
        relative_path: String::new(),
        kind: root_kind,
        package_json_path,
        tsconfig_path,
    }];
    out.extend(apps);
    out.extend(packages);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn single_package_root_is_not_a_workspace() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("package.json"));
        let partitions = discover_partitions(temp.path());
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].kind, PartitionKind::Root);
    }

    #[test]
    fn apps_precede_packages_and_each_group_is_sorted() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("package.json"));
        touch(&temp.path().join("apps/web/package.json"));
        touch(&temp.path().join("apps/admin/package.json"));
        touch(&temp.path().join("packages/ui/package.json"));
        touch(&temp.path().join("packages/core/tsconfig.json"));

        let partitions = discover_partitions(temp.path());
        let kinds_and_names: Vec<(PartitionKind, &str)> = partitions
            .iter()
            .map(|p| (p.kind, p.relative_path.as_str()))
            .collect();
        assert_eq!(
            kinds_and_names,
            vec![
                (PartitionKind::Workspace, ""),
                (PartitionKind::App, "apps/admin"),
                (PartitionKind::App, "apps/web"),
                (PartitionKind::Package, "packages/core"),
                (PartitionKind::Package, "packages/ui"),
            ]
        );
    }

    #[test]
    fn hidden_and_markerless_children_are_skipped() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("package.json"));
        std::fs::create_dir_all(temp.path().join("apps/.hidden")).unwrap();
        std::fs::create_dir_all(temp.path().join("apps/no-marker")).unwrap();
        touch(&temp.path().join("apps/real/package.json"));

        let partitions = discover_partitions(temp.path());
        let apps: Vec<&str> = partitions
            .iter()
            .filter(|p| p.kind == PartitionKind::App)
            .map(|p| p.relative_path.as_str())
            .collect();
        assert_eq!(apps, vec!["apps/real"]);
    }

    #[test]
    fn missing_target_path_yields_single_unmarked_root() {
        let partitions = discover_partitions(Path::new("/does/not/exist/anywhere"));
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].kind, PartitionKind::Root);
        assert!(partitions[0].package_json_path.is_none());
    }
}
