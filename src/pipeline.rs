//! Tasks binding the pipelines to the declared file lists.
//!
//! Each mapping becomes exactly one task. Style tasks compile every source of
//! their mapping, script tasks own the bundler created for their mapping and
//! reuse it across rebuilds.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};

use crate::engine::{Registry, Task};
use crate::error::{FrontbuildError, RegistryError};
use crate::files::SourceMapping;
use crate::output::{is_under, normalize_path};
use crate::script::{Bundler, ScriptOptions};
use crate::style::{self, StyleOptions};

/// Asset class handled by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Scss,
    Ts,
    Js,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Scss => "scss",
            Kind::Ts => "ts",
            Kind::Js => "js",
        }
    }

    /// Name of the task writing `file`, `build-ts: filename - page1.js`.
    pub fn task_name(&self, file: &str) -> String {
        format!("build-{}: filename - {file}", self.as_str())
    }
}

/// Compiles the stylesheets of one mapping.
pub struct StyleTask {
    name: String,
    root: Utf8PathBuf,
    mapping: SourceMapping,
    options: StyleOptions,
    dist_root: Utf8PathBuf,
}

impl StyleTask {
    pub fn new(
        root: &Utf8Path,
        mapping: SourceMapping,
        dist_root: &Utf8Path,
        options: &StyleOptions,
    ) -> Self {
        let files: Vec<String> = mapping
            .src
            .iter()
            .map(|src| style::output_name(src).unwrap_or_else(|| src.to_string()))
            .collect();

        Self {
            name: Kind::Scss.task_name(&files.join(", ")),
            root: root.to_path_buf(),
            mapping,
            options: options.clone(),
            dist_root: normalize_path(dist_root),
        }
    }
}

impl Task for StyleTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self) -> Vec<Utf8PathBuf> {
        self.mapping
            .src
            .iter()
            .filter_map(|src| style::output_name(src))
            .map(|name| self.mapping.dist.join(name))
            .collect()
    }

    fn run(&self) -> anyhow::Result<()> {
        style::process(&self.root, &self.mapping, &self.options)
            .with_context(|| format!("Failed to compile {}", self.name))?;
        Ok(())
    }

    fn watched(&self) -> Vec<Utf8PathBuf> {
        let mut watched = self.mapping.entry_dirs();
        watched.extend(self.options.load_paths.iter().cloned());
        watched
    }

    fn is_dirty(&self, path: &Utf8Path) -> bool {
        !is_under(path, &self.dist_root) && self.watched().iter().any(|dir| is_under(path, dir))
    }
}

/// Bundles the entries of one mapping into a single script.
pub struct ScriptTask {
    name: String,
    mapping: SourceMapping,
    bundler: Bundler,
}

impl ScriptTask {
    pub fn new(
        root: &Utf8Path,
        mapping: SourceMapping,
        kind: Kind,
        dist_root: &Utf8Path,
        options: &ScriptOptions,
    ) -> Result<Self, FrontbuildError> {
        let file = mapping
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| mapping.dist.to_string());
        let name = kind.task_name(&file);

        let bundler = Bundler::new(root, &mapping.src, kind == Kind::Ts, dist_root, options)
            .map_err(|e| FrontbuildError::Script(name.clone(), e))?;

        Ok(Self {
            name,
            mapping,
            bundler,
        })
    }
}

impl Task for ScriptTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self) -> Vec<Utf8PathBuf> {
        vec![self.mapping.dist.clone()]
    }

    fn run(&self) -> anyhow::Result<()> {
        let output = self
            .bundler
            .bundle(&self.mapping.dist)
            .with_context(|| format!("Failed to bundle {}", self.name))?;

        tracing::debug!("{} pulled in {} module(s)", self.name, output.inputs.len());
        Ok(())
    }

    fn watched(&self) -> Vec<Utf8PathBuf> {
        let mut watched = self.bundler.entry_dirs();
        watched.extend(self.bundler.input_dirs());
        watched.sort();
        watched.dedup();
        watched
    }

    fn is_dirty(&self, path: &Utf8Path) -> bool {
        self.bundler.is_dirty(path)
    }
}

/// One task per stylesheet mapping.
pub fn styles(
    root: &Utf8Path,
    mappings: &[SourceMapping],
    dist_root: &Utf8Path,
    options: &StyleOptions,
) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    for mapping in mappings {
        registry.register(StyleTask::new(root, mapping.clone(), dist_root, options))?;
    }
    Ok(registry)
}

/// One task, and one bundler, per script mapping.
pub fn scripts(
    root: &Utf8Path,
    mappings: &[SourceMapping],
    kind: Kind,
    dist_root: &Utf8Path,
    options: &ScriptOptions,
) -> Result<Registry, FrontbuildError> {
    let mut registry = Registry::new();
    for mapping in mappings {
        registry.register(ScriptTask::new(
            root,
            mapping.clone(),
            kind,
            dist_root,
            options,
        )?)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names() {
        assert_eq!(
            Kind::Ts.task_name("page1.js"),
            "build-ts: filename - page1.js"
        );

        let registry = styles(
            Utf8Path::new("."),
            &crate::files::scss_files(),
            Utf8Path::new("dist"),
            &StyleOptions::default(),
        )
        .unwrap();

        assert_eq!(
            registry.names(),
            vec![
                "build-scss: filename - style.css",
                "build-scss: filename - admin-style.css"
            ]
        );
    }

    #[test]
    fn test_script_registry() {
        let registry = scripts(
            Utf8Path::new("."),
            &crate::files::js_files(),
            Kind::Js,
            Utf8Path::new("dist"),
            &ScriptOptions::default(),
        )
        .unwrap();

        assert_eq!(
            registry.names(),
            vec!["build-js: filename - page3.js", "build-js: filename - page4.js"]
        );
        assert_eq!(
            registry.watched(),
            vec![
                Utf8PathBuf::from("src/js/page3"),
                Utf8PathBuf::from("src/js/page4")
            ]
        );
    }

    #[test]
    fn test_same_output_twice_is_rejected() {
        let mappings = [
            SourceMapping::new("src/js/a/main.js", "dist/js/main.js"),
            SourceMapping::new("src/js/b/main.js", "dist/js/main.js"),
        ];

        let result = scripts(
            Utf8Path::new("."),
            &mappings,
            Kind::Js,
            Utf8Path::new("dist"),
            &ScriptOptions::default(),
        );

        assert!(matches!(
            result,
            Err(FrontbuildError::Registry(RegistryError::Duplicate(path, _, _)))
                if path == "dist/js/main.js"
        ));
    }

    #[test]
    fn test_same_file_name_in_different_dirs() {
        let mappings = [
            SourceMapping::new("src/js/site/index.js", "dist/js/site/index.js"),
            SourceMapping::new("src/js/admin/index.js", "dist/js/admin/index.js"),
        ];

        let registry = scripts(
            Utf8Path::new("."),
            &mappings,
            Kind::Js,
            Utf8Path::new("dist"),
            &ScriptOptions::default(),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names(),
            vec!["build-js: filename - index.js", "build-js: filename - index.js"]
        );
    }

    #[test]
    fn test_stylesheets_with_same_stem() {
        let site = [
            SourceMapping::new("src/scss/site/main.scss", "dist/css/site"),
            SourceMapping::new("src/scss/admin/main.scss", "dist/css/admin"),
        ];
        let registry = styles(
            Utf8Path::new("."),
            &site,
            Utf8Path::new("dist"),
            &StyleOptions::default(),
        )
        .unwrap();
        assert_eq!(registry.len(), 2);

        let clash = [
            SourceMapping::new("src/scss/site/main.scss", "dist/css"),
            SourceMapping::new("src/scss/admin/main.scss", "dist/css"),
        ];
        let result = styles(
            Utf8Path::new("."),
            &clash,
            Utf8Path::new("dist"),
            &StyleOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RegistryError::Duplicate(path, _, _)) if path == "dist/css/main.css"
        ));
    }

    #[test]
    fn test_bundled_modules_are_watched() {
        let task = ScriptTask::new(
            Utf8Path::new("."),
            SourceMapping::new("src/ts/page1/page1.ts", "dist/js/page1/page1.js"),
            Kind::Ts,
            Utf8Path::new("dist"),
            &ScriptOptions::default(),
        )
        .unwrap();

        assert_eq!(task.watched(), vec![Utf8PathBuf::from("src/ts/page1")]);

        task.bundler.record_inputs([
            Utf8PathBuf::from("src/ts/page1/page1.ts"),
            Utf8PathBuf::from("src/ts/shared/greet.ts"),
            Utf8PathBuf::from("node_modules/lodash/lodash.js"),
        ]);

        let shared = Utf8Path::new("src/ts/shared/greet.ts");
        assert!(task.is_dirty(shared));
        assert!(task.watched().iter().any(|dir| is_under(shared, dir)));
        assert_eq!(
            task.watched(),
            vec![
                Utf8PathBuf::from("src/ts/page1"),
                Utf8PathBuf::from("src/ts/shared")
            ]
        );
    }

    #[test]
    fn test_empty_mapping_is_a_script_error() {
        let mappings = [SourceMapping::many(Vec::<Utf8PathBuf>::new(), "dist/js/x.js")];

        let result = scripts(
            Utf8Path::new("."),
            &mappings,
            Kind::Js,
            Utf8Path::new("dist"),
            &ScriptOptions::default(),
        );

        assert!(matches!(result, Err(FrontbuildError::Script(name, _)) if name.ends_with("x.js")));
    }

    #[test]
    fn test_style_dirty_selection() {
        let registry = styles(
            Utf8Path::new("."),
            &crate::files::scss_files(),
            Utf8Path::new("dist"),
            &StyleOptions {
                load_paths: vec![Utf8PathBuf::from("shared/scss")],
                ..StyleOptions::default()
            },
        )
        .unwrap();

        let dirty = registry.select_dirty(&[
            Utf8PathBuf::from("src/scss/partials/_buttons.scss"),
            Utf8PathBuf::from("src/scss/style.scss"),
        ]);
        assert_eq!(dirty, vec![0, 1]);

        let dirty = registry.select_dirty(&[Utf8PathBuf::from("shared/scss/_vars.scss")]);
        assert_eq!(dirty, vec![0, 1]);

        let dirty = registry.select_dirty(&[
            Utf8PathBuf::from("src/scssx/style.scss"),
            Utf8PathBuf::from("dist/css/style.css"),
        ]);
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_style_task_ignores_dist_inside_sources() {
        let task = StyleTask::new(
            Utf8Path::new("."),
            SourceMapping::new("a.scss", "out/css"),
            Utf8Path::new("./out"),
            &StyleOptions::default(),
        );

        assert_eq!(task.watched(), vec![Utf8PathBuf::from(".")]);
        assert!(task.is_dirty(Utf8Path::new("a.scss")));
        assert!(!task.is_dirty(Utf8Path::new("out/css/a.css")));
    }
}
