use std::path::{Component, Path, PathBuf};

/// Absolute roots the model tends to assume it runs under; remapped onto the
/// real workspace.
const CONTAINER_ROOTS: &[&str] = &["/workspace", "/app", "/project"];

/// Resolve `.` and `..` without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Map a model-supplied path onto the workspace: strip backticks, remap
/// container roots, anchor relative paths at the workspace root.
pub fn normalize_in_workspace(workspace: &Path, raw: &str) -> PathBuf {
    let cleaned = raw.trim().replace('`', "");
    for root in CONTAINER_ROOTS {
        if cleaned == *root {
            return lexical_normalize(workspace);
        }
        if let Some(rest) = cleaned
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return lexical_normalize(&workspace.join(rest));
        }
    }

    let path = Path::new(&cleaned);
    if path.is_absolute() {
        lexical_normalize(path)
    } else {
        lexical_normalize(&workspace.join(path))
    }
}

pub fn is_within_workspace(workspace: &Path, path: &Path) -> bool {
    lexical_normalize(path).starts_with(lexical_normalize(workspace))
}
