//! The static lists of files taking part in the build.
//!
//! Edit these lists to add a stylesheet or a script to the project. Each
//! entry is built as a separate task, so every entry point gets its own
//! output file, source map and minified sibling.

use camino::Utf8PathBuf;

/// One declared source → destination pairing.
///
/// For stylesheets `dist` is the output directory, every source is compiled
/// into its own `<stem>.css` there. For scripts `dist` is the output file,
/// all sources are bundled together into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapping {
    pub src: Vec<Utf8PathBuf>,
    pub dist: Utf8PathBuf,
}

impl SourceMapping {
    pub fn new(src: impl Into<Utf8PathBuf>, dist: impl Into<Utf8PathBuf>) -> Self {
        Self {
            src: vec![src.into()],
            dist: dist.into(),
        }
    }

    pub fn many<I, P>(src: I, dist: impl Into<Utf8PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            src: src.into_iter().map(Into::into).collect(),
            dist: dist.into(),
        }
    }

    /// Directories containing the entry files, changes under these trigger a
    /// rebuild of the mapping in watch mode.
    pub fn entry_dirs(&self) -> Vec<Utf8PathBuf> {
        let mut dirs: Vec<Utf8PathBuf> = self
            .src
            .iter()
            .map(|src| match src.parent() {
                Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
                _ => Utf8PathBuf::from("."),
            })
            .collect();

        dirs.sort();
        dirs.dedup();
        dirs
    }

    /// File name of a script bundle, `dist/js/page1/page1.js` -> `page1.js`.
    pub fn file_name(&self) -> Option<&str> {
        self.dist.file_name()
    }
}

/// A class of files copied verbatim from `base` to `dest`, keeping their
/// path relative to `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassThrough {
    pub base: Utf8PathBuf,
    pub patterns: Vec<&'static str>,
    pub dest: Utf8PathBuf,
}

impl PassThrough {
    pub fn new(
        base: impl Into<Utf8PathBuf>,
        patterns: &[&'static str],
        dest: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            base: base.into(),
            patterns: patterns.to_vec(),
            dest: dest.into(),
        }
    }
}

/// Stylesheets, compiled by `build-scss`.
pub fn scss_files() -> Vec<SourceMapping> {
    vec![
        SourceMapping::new("src/scss/style.scss", "dist/css"),
        SourceMapping::new("src/scss/admin-style.scss", "dist/css"),
    ]
}

/// TypeScript entry points, bundled by `build-ts`.
pub fn ts_files() -> Vec<SourceMapping> {
    vec![
        SourceMapping::new("src/ts/page1/page1.ts", "dist/js/page1/page1.js"),
        SourceMapping::new("src/ts/page2/page2.ts", "dist/js/page2/page2.js"),
    ]
}

/// JavaScript entry points, bundled by `build-js`.
pub fn js_files() -> Vec<SourceMapping> {
    vec![
        SourceMapping::new("src/js/page3/page3.js", "dist/js/page3/page3.js"),
        SourceMapping::new("src/js/page4/page4.js", "dist/js/page4/page4.js"),
    ]
}

/// Files which need no compiling and are copied as they are.
pub fn pass_through() -> Vec<PassThrough> {
    vec![
        PassThrough::new("src/css", &["**/*.css", "**/*.css.map"], "dist/css"),
        PassThrough::new(
            "src/fonts",
            &[
                "**/*.ttf",
                "**/*.woff",
                "**/*.woff2",
                "**/*.otf",
                "**/*.eot",
                "**/*.svg",
            ],
            "dist/fonts",
        ),
        PassThrough::new("src/js", &["**/*.js", "**/*.js.map"], "dist/js"),
        PassThrough::new(
            "src/img",
            &["**/*.jpeg", "**/*.jpg", "**/*.png", "**/*.gif", "**/*.svg"],
            "dist/img",
        ),
        PassThrough::new("src/vendor", &["**/*"], "dist/vendor"),
    ]
}
