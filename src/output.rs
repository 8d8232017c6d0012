//! Naming rules for the files written into the `dist` directory.
//!
//! Every compiled asset is written as a sibling pair, an unminified file with
//! an adjacent source map and a minified file with a `.min` suffix:
//!
//! ```text
//! dist/css/style.css
//! dist/css/style.css.map
//! dist/css/style.min.css
//! ```

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Suffix inserted before the extension of minified files.
pub const MIN_SUFFIX: &str = ".min";

/// Normalize a path, removing things like `.` and `..`.
///
/// CAUTION: This does not resolve symlinks (unlike [`std::fs::canonicalize`]).
/// Leading `..` components of relative paths are kept, since there is
/// nothing to pop them against.
///
/// Adapted from
/// <https://github.com/rust-lang/cargo/blob/f7acf448fc127df9a77c52cc2bba027790ac4931/crates/cargo-util/src/paths.rs#L76-L116>
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Utf8Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        Utf8PathBuf::from(c.as_str())
    } else {
        Utf8PathBuf::new()
    };

    for component in components {
        match component {
            Utf8Component::Prefix(..) => unreachable!(),
            Utf8Component::RootDir => {
                ret.push(Utf8Component::RootDir);
            }
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if ret.ends_with(Utf8Component::ParentDir) {
                    ret.push(Utf8Component::ParentDir);
                } else {
                    let popped = ret.pop();
                    if !popped && !ret.has_root() {
                        ret.push(Utf8Component::ParentDir);
                    }
                }
            }
            Utf8Component::Normal(c) => {
                ret.push(c);
            }
        }
    }
    ret
}

/// Returns true when `path` lies inside `dir` (or is `dir` itself).
///
/// Both paths are normalized first and compared component by component, so
/// `src/ts/page1` does not contain `src/ts/page10/main.ts`.
pub fn is_under(path: &Utf8Path, dir: &Utf8Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// `style.css` -> `style.min.css`
pub fn min_sibling(path: &Utf8Path) -> Utf8PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{MIN_SUFFIX}.{ext}"),
        None => format!("{stem}{MIN_SUFFIX}"),
    };
    path.with_file_name(name)
}

/// `style.css` -> `style.css.map`
pub fn map_sibling(path: &Utf8Path) -> Utf8PathBuf {
    let name = path.file_name().unwrap_or_default();
    path.with_file_name(format!("{name}.map"))
}
