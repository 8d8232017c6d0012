use std::fmt::Display;
use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use console::Style;
use indicatif::ProgressBar;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::{ClearError, CopyError};
use crate::files::PassThrough;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Delete the entire `dist` directory if it exists, then create it empty.
pub fn clear_dist(dist: &Utf8Path) -> Result<(), ClearError> {
    let s = Instant::now();

    if fs::metadata(dist).is_ok() {
        fs::remove_dir_all(dist) //
            .map_err(ClearError::RemoveError)?;
    }

    fs::create_dir_all(dist) //
        .map_err(ClearError::CreateError)?;

    tracing::info!("cleaned the dist directory {}", as_overhead(s));

    Ok(())
}

/// Write a file, creating its parent directories first.
pub fn write(path: &Utf8Path, data: impl AsRef<[u8]>) -> std::io::Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_str().is_empty()
    {
        fs::create_dir_all(dir)?;
    }

    fs::write(path, data)
}

/// Copy every pass-through class from under `root` verbatim, the classes
/// are copied in parallel. Returns the number of files copied.
pub fn copy_static(root: &Utf8Path, classes: &[PassThrough]) -> Result<usize, CopyError> {
    let s = Instant::now();
    let pb = ProgressBar::no_length();
    pb.set_style(crate::utils::get_style_copy());
    pb.set_message("Copying static files...");

    let copied = classes
        .par_iter()
        .map(|class| copy_class(root, class, &pb))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .sum();

    pb.finish_and_clear();
    tracing::info!("copied {copied} static files {}", as_overhead(s));

    Ok(copied)
}

fn copy_class(root: &Utf8Path, class: &PassThrough, pb: &ProgressBar) -> Result<usize, CopyError> {
    let base = root.join(&class.base);

    // A project doesn't have to ship every kind of static asset.
    if !base.is_dir() {
        tracing::debug!("skipping {}, directory doesn't exist", class.base);
        return Ok(0);
    }

    let mut files = Vec::new();
    for pattern in &class.patterns {
        for path in glob::glob(base.join(pattern).as_str())? {
            let path = Utf8PathBuf::try_from(path?)?;
            if path.is_file() {
                files.push(path);
            }
        }
    }

    // `**/*` and the specific patterns can overlap
    files.sort();
    files.dedup();

    for file in &files {
        let relative = file
            .strip_prefix(&base)
            .map_err(|_| CopyError::Prefix(file.clone(), base.clone()))?;
        let target = root.join(&class.dest).join(relative);

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir)?;
        }

        fs::copy(file, &target)?;
        pb.inc(1);
    }

    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_clear_dist_removes_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        let dist = root.join("dist");

        write(&dist.join("css/old.css"), "a{}").unwrap();
        clear_dist(&dist).unwrap();

        assert!(dist.is_dir());
        assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
    }

    #[test]
    fn test_copy_static_keeps_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);

        write(&root.join("src/fonts/a.woff2"), [0u8, 1, 2]).unwrap();
        write(&root.join("src/fonts/sub/b.ttf"), [3u8]).unwrap();
        write(&root.join("src/fonts/readme.txt"), "ignored").unwrap();
        write(&root.join("src/vendor/lib/x.js"), "x").unwrap();

        let classes = vec![
            PassThrough::new("src/fonts", &["**/*.woff2", "**/*.ttf"], "dist/fonts"),
            PassThrough::new("src/vendor", &["**/*", "**/*.js"], "dist/vendor"),
            PassThrough::new("src/img", &["**/*.png"], "dist/img"),
        ];

        let copied = copy_static(&root, &classes).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(fs::read(root.join("dist/fonts/a.woff2")).unwrap(), [0u8, 1, 2]);
        assert!(root.join("dist/fonts/sub/b.ttf").is_file());
        assert!(!root.join("dist/fonts/readme.txt").exists());
        assert!(root.join("dist/vendor/lib/x.js").is_file());
        assert!(!root.join("dist/img").exists());
    }
}
