//! 本地路径修复
//!
//! 沙箱容器迁移后，记录中的绝对路径会指向已不存在的旧容器。
//! 修复器按固定顺序生成候选路径并探测存在性，命中即返回，
//! 已经有效的路径原样通过。

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::repository::LocalMediaSourceRef;

pub struct PathHealer {
    local: LocalMediaSourceRef,
    extra_roots: Vec<PathBuf>,
}

impl PathHealer {
    pub fn new(local: LocalMediaSourceRef, extra_roots: Vec<PathBuf>) -> Self {
        Self { local, extra_roots }
    }

    /// 修复记录的本地路径，返回首个实际存在的候选
    pub async fn heal(&self, stored: Option<&str>, file_name: Option<&str>) -> Option<PathBuf> {
        let stored = stored.filter(|value| !value.trim().is_empty())?;
        for candidate in self.candidates(stored, file_name) {
            if self.local.exists(&candidate).await {
                debug!(stored = %stored, healed = %candidate.display(), "local path healed");
                return Some(candidate);
            }
        }
        None
    }

    fn roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.local.documents_root()];
        roots.extend(self.extra_roots.iter().cloned());
        roots
    }

    fn candidates(&self, stored: &str, file_name: Option<&str>) -> Vec<PathBuf> {
        let stored_path = PathBuf::from(stored);
        let mut out: Vec<PathBuf> = Vec::new();
        let mut push = |path: PathBuf| {
            if !out.contains(&path) {
                out.push(path);
            }
        };

        // 原样路径优先，已有效的记录不做任何改写
        push(stored_path.clone());

        for root in self.roots() {
            if let Some(rebased) = rebase_onto(&stored_path, &root) {
                push(rebased.clone());
                if let (Some(parent), Some(name)) = (rebased.parent(), file_name) {
                    push(parent.join(name));
                }
            }
            // 旧容器前缀定位不到时，改试逐级更短的尾部片段
            if stored_path.is_absolute() {
                let parts: Vec<_> = stored_path
                    .components()
                    .filter_map(|component| match component {
                        Component::Normal(part) => Some(part),
                        _ => None,
                    })
                    .collect();
                for start in 1..parts.len().saturating_sub(1) {
                    let tail: PathBuf = parts[start..].iter().collect();
                    push(root.join(tail));
                }
            }
            if stored_path.is_relative() {
                push(root.join(&stored_path));
            }
            if let Some(leaf) = stored_path.file_name() {
                push(root.join(leaf));
            }
            if let Some(name) = file_name {
                push(root.join(name));
            }
        }

        out
    }
}

/// 在旧路径中定位与根目录末级目录同名的片段，将其后的部分重新挂到当前根目录下
fn rebase_onto(stored: &Path, root: &Path) -> Option<PathBuf> {
    let marker = root.file_name()?;
    let components: Vec<_> = stored.components().collect();
    let index = components
        .iter()
        .position(|component| component.as_os_str() == marker)?;
    let tail: PathBuf = components[index + 1..].iter().collect();
    if tail.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(tail))
}
