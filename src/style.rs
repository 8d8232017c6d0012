//! Stylesheet pipeline.
//!
//! Each Sass entry is compiled with `grass`, vendor prefixed for the
//! configured browserslist query with `lightningcss`, and written twice:
//!
//! 1. `<stem>.css` with an adjacent `<stem>.css.map`,
//! 2. `<stem>.min.css`, minified from the file written in the first step.
//!
//! The source map describes the CSS emitted by the Sass compiler and embeds
//! it as the source content, `grass` itself doesn't produce source maps.
//!
//! Prefixing runs `lightningcss`'s minify pass, so the unminified output is
//! already normalized: comments are dropped, colors and shorthands are
//! shortened and declarations may be reordered. Only the whitespace differs
//! from the `.min.css` sibling.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use crate::error::StyleError;
use crate::files::SourceMapping;
use crate::io;
use crate::output::{map_sibling, min_sibling};

/// Options shared by every stylesheet of a project.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Browserslist query used to decide which vendor prefixes are needed.
    pub browsers: Vec<String>,
    /// Additional directories searched by Sass `@use` and `@import`,
    /// relative to the project root.
    pub load_paths: Vec<Utf8PathBuf>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            browsers: vec!["last 10 versions".to_string()],
            load_paths: Vec::new(),
        }
    }
}

impl StyleOptions {
    fn targets(&self) -> Result<Targets, StyleError> {
        let browsers = Browsers::from_browserslist(&self.browsers)
            .map_err(|e| StyleError::Browserslist(e.to_string()))?;

        Ok(Targets {
            browsers,
            ..Targets::default()
        })
    }
}

/// Files written for a single stylesheet.
#[derive(Debug, Clone)]
pub struct StyleOutput {
    pub css: Utf8PathBuf,
    pub map: Utf8PathBuf,
    pub min: Utf8PathBuf,
}

/// Compile every source of the mapping into the mapping's `dist` directory.
pub fn process(
    root: &Utf8Path,
    mapping: &SourceMapping,
    options: &StyleOptions,
) -> Result<Vec<StyleOutput>, StyleError> {
    let dist = root.join(&mapping.dist);
    let targets = options.targets()?;

    mapping
        .src
        .iter()
        .map(|src| compile(root, src, &dist, options, &targets))
        .collect()
}

/// Name of the unminified output of a stylesheet, `style.scss` -> `style.css`.
pub fn output_name(src: &Utf8Path) -> Option<String> {
    src.file_stem().map(|stem| format!("{stem}.css"))
}

fn compile(
    root: &Utf8Path,
    src: &Utf8Path,
    dist: &Utf8Path,
    options: &StyleOptions,
    targets: &Targets,
) -> Result<StyleOutput, StyleError> {
    let name = output_name(src).ok_or_else(|| StyleError::Name(src.to_path_buf()))?;
    let out = dist.join(&name);
    let map = map_sibling(&out);
    let min = min_sibling(&out);

    let load_paths: Vec<_> = options.load_paths.iter().map(|dir| root.join(dir)).collect();
    let mut sass = grass::Options::default().style(grass::OutputStyle::Expanded);
    for dir in &load_paths {
        sass = sass.load_path(dir.as_std_path());
    }

    let compiled = grass::from_path(root.join(src).as_std_path(), &sass)?;

    let (code, source_map) = prefix(src, &compiled, targets)?;
    let map_name = map.file_name().unwrap_or_default();
    io::write(&out, format!("{code}\n/*# sourceMappingURL={map_name} */\n"))?;
    io::write(&map, source_map)?;

    let written = fs::read_to_string(&out)?;
    io::write(&min, minify(&out, &written, targets)?)?;

    tracing::debug!("compiled {src} into {out}");

    Ok(StyleOutput { css: out, map, min })
}

/// Add vendor prefixes and print the stylesheet unminified, together with
/// its source map serialized as JSON.
///
/// The map has rule-level granularity only: each rule points at the start of
/// the matching rule in the Sass output, not at the `.scss` source lines.
fn prefix(src: &Utf8Path, css: &str, targets: &Targets) -> Result<(String, String), StyleError> {
    let css_error = |e: String| StyleError::Css(src.to_path_buf(), e);

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: src.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| css_error(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let mut source_map = SourceMap::new("/");
    source_map.add_source(src.as_str());
    source_map
        .set_source_content(0, css)
        .map_err(|e| StyleError::SourceMap(format!("{e:?}")))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: false,
            source_map: Some(&mut source_map),
            targets: targets.clone(),
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let json = source_map
        .to_json(None)
        .map_err(|e| StyleError::SourceMap(format!("{e:?}")))?;

    Ok((printed.code, json))
}

fn minify(path: &Utf8Path, css: &str, targets: &Targets) -> Result<String, StyleError> {
    let css_error = |e: String| StyleError::Css(path.to_path_buf(), e);

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: path.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| css_error(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: targets.clone(),
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCSS: &str = r#"
// A line comment that never reaches the output
$accent: #ff0000;

/* Block comment, dropped by the prefixing pass */
.card {
    color: $accent;
    user-select: none;

    .title {
        font-weight: bold;
        margin: 0px 0px 0px 0px;
    }
}
"#;

    fn project() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_process_writes_css_map_and_min() {
        let (_dir, root) = project();
        io::write(&root.join("a.scss"), SCSS).unwrap();

        let mapping = SourceMapping::new("a.scss", "out/css");
        let outputs = process(&root, &mapping, &StyleOptions::default()).unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].css, root.join("out/css/a.css"));
        assert!(root.join("out/css/a.css").is_file());
        assert!(root.join("out/css/a.css.map").is_file());
        assert!(root.join("out/css/a.min.css").is_file());

        let entries = fs::read_dir(root.join("out/css")).unwrap().count();
        assert_eq!(entries, 3);
    }

    #[test]
    fn test_minified_output_is_smaller_and_bare() {
        let (_dir, root) = project();
        io::write(&root.join("a.scss"), SCSS).unwrap();

        let mapping = SourceMapping::new("a.scss", "out/css");
        process(&root, &mapping, &StyleOptions::default()).unwrap();

        let css = fs::read_to_string(root.join("out/css/a.css")).unwrap();
        let min = fs::read_to_string(root.join("out/css/a.min.css")).unwrap();

        assert!(min.len() <= css.len());
        assert!(css.contains("/*# sourceMappingURL=a.css.map */"));
        assert!(!css.contains("Block comment"));
        assert!(css.contains('\n'));
        assert!(!min.contains("/*"));
        assert!(!min.contains('\n'));
        assert!(min.contains(".card .title"));
    }

    #[test]
    fn test_vendor_prefixes_are_added() {
        let (_dir, root) = project();
        io::write(&root.join("a.scss"), SCSS).unwrap();

        let mapping = SourceMapping::new("a.scss", "out/css");
        process(&root, &mapping, &StyleOptions::default()).unwrap();

        let css = fs::read_to_string(root.join("out/css/a.css")).unwrap();
        let min = fs::read_to_string(root.join("out/css/a.min.css")).unwrap();

        assert!(css.contains("-webkit-user-select"));
        assert!(min.contains("-webkit-user-select"));
    }

    #[test]
    fn test_source_map_is_json() {
        let (_dir, root) = project();
        io::write(&root.join("styles/a.scss"), SCSS).unwrap();

        let mapping = SourceMapping::new("styles/a.scss", "out/css");
        process(&root, &mapping, &StyleOptions::default()).unwrap();

        let map = fs::read_to_string(root.join("out/css/a.css.map")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&map).unwrap();

        assert_eq!(json["version"], 3);
        assert!(json["sources"][0].as_str().unwrap().ends_with("a.scss"));
    }

    #[test]
    fn test_partials_and_load_paths() {
        let (_dir, root) = project();
        io::write(&root.join("shared/_colors.scss"), "$brand: #123456;").unwrap();
        io::write(&root.join("src/_mixins.scss"), "@mixin pad { padding: 1px; }").unwrap();
        io::write(
            &root.join("src/site.scss"),
            "@import 'mixins';\n@import 'colors';\nbody { color: $brand; @include pad; }",
        )
        .unwrap();

        let mapping = SourceMapping::new("src/site.scss", "dist/css");
        let options = StyleOptions {
            load_paths: vec![Utf8PathBuf::from("shared")],
            ..StyleOptions::default()
        };
        process(&root, &mapping, &options).unwrap();

        let min = fs::read_to_string(root.join("dist/css/site.min.css")).unwrap();
        assert!(min.contains("#123456"));
        assert!(min.contains("padding:1px"));
    }

    #[test]
    fn test_sass_error_writes_nothing() {
        let (_dir, root) = project();
        io::write(&root.join("broken.scss"), ".a { color: $missing; }").unwrap();

        let mapping = SourceMapping::new("broken.scss", "out/css");
        let result = process(&root, &mapping, &StyleOptions::default());

        assert!(matches!(result, Err(StyleError::Sass(_))));
        assert!(!root.join("out/css/broken.css").exists());
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let (_dir, root) = project();
        io::write(&root.join("a.scss"), SCSS).unwrap();

        let mapping = SourceMapping::new("a.scss", "out/css");
        let options = StyleOptions::default();

        process(&root, &mapping, &options).unwrap();
        let first = fs::read(root.join("out/css/a.min.css")).unwrap();
        let first_map = fs::read(root.join("out/css/a.css.map")).unwrap();

        process(&root, &mapping, &options).unwrap();
        assert_eq!(fs::read(root.join("out/css/a.min.css")).unwrap(), first);
        assert_eq!(fs::read(root.join("out/css/a.css.map")).unwrap(), first_map);
    }

    #[test]
    fn test_invalid_browserslist() {
        let options = StyleOptions {
            browsers: vec!["not a real query ((".to_string()],
            ..StyleOptions::default()
        };

        assert!(matches!(options.targets(), Err(StyleError::Browserslist(_))));
    }
}
