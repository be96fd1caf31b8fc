use std::path::{Component, Path, PathBuf};

/// Returns the path leading from the directory `from` to `to`.
///
/// The computation is purely lexical, both paths must be relative to the same directory (or both
/// be absolute). `.` components are ignored and `..` components are resolved against the
/// preceding component where possible.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);

    let common = from
        .iter()
        .zip(&to)
        .take_while(|(from, to)| from == to)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push(Component::ParentDir);
    }
    for component in &to[common..] {
        relative.push(component);
    }

    if relative.as_os_str().is_empty() {
        relative.push(Component::CurDir);
    }
    relative
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("out/app/cloud", "out/app/base", "../base")]
    #[case("out/app/cloud/aws/base", "out/app/cloud/base", "../../base")]
    #[case("out/a", "out/a", ".")]
    #[case("out/a", "out/a/base", "base")]
    #[case("./out/a/b", "out/a/base", "../base")]
    #[case("out/a/../b", "out/base", "../base")]
    #[case("/abs/out/x", "/abs/out/base", "../base")]
    fn relative_paths(#[case] from: &str, #[case] to: &str, #[case] expected: &str) {
        assert_eq!(
            relative_path(Path::new(from), Path::new(to)),
            PathBuf::from(expected)
        );
    }
}
