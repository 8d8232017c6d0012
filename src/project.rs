use std::time::Instant;

use camino::Utf8PathBuf;
use console::style;

use crate::engine::{Registry, Report};
use crate::error::FrontbuildError;
use crate::files::{self, PassThrough, SourceMapping};
use crate::io::{self, as_overhead};
use crate::pipeline::{self, Kind};
use crate::script::ScriptOptions;
use crate::style::StyleOptions;
use crate::Mode;

/// A front-end project rooted at a directory, together with the lists of
/// files it builds.
///
/// ```rust,no_run
/// use frontbuild::{Project, SourceMapping};
///
/// let report = Project::new(".")
///     .scss(vec![SourceMapping::new("src/scss/style.scss", "dist/css")])
///     .build()
///     .unwrap();
///
/// assert!(report.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct Project {
    root: Utf8PathBuf,
    dist: Utf8PathBuf,
    scss: Vec<SourceMapping>,
    ts: Vec<SourceMapping>,
    js: Vec<SourceMapping>,
    pass_through: Vec<PassThrough>,
    styles: StyleOptions,
    scripts: ScriptOptions,
}

impl Project {
    /// Project with the default file lists, writing into `dist`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            dist: Utf8PathBuf::from("dist"),
            scss: files::scss_files(),
            ts: files::ts_files(),
            js: files::js_files(),
            pass_through: files::pass_through(),
            styles: StyleOptions::default(),
            scripts: ScriptOptions::default(),
        }
    }

    /// Destination root, relative to the project root. Cleared on every
    /// full build.
    pub fn dist(mut self, dist: impl Into<Utf8PathBuf>) -> Self {
        self.dist = dist.into();
        self
    }

    pub fn scss(mut self, mappings: Vec<SourceMapping>) -> Self {
        self.scss = mappings;
        self
    }

    pub fn ts(mut self, mappings: Vec<SourceMapping>) -> Self {
        self.ts = mappings;
        self
    }

    pub fn js(mut self, mappings: Vec<SourceMapping>) -> Self {
        self.js = mappings;
        self
    }

    pub fn pass_through(mut self, classes: Vec<PassThrough>) -> Self {
        self.pass_through = classes;
        self
    }

    pub fn styles(mut self, options: StyleOptions) -> Self {
        self.styles = options;
        self
    }

    pub fn scripts(mut self, options: ScriptOptions) -> Self {
        self.scripts = options;
        self
    }

    /// Build the registry of tasks for one asset class.
    pub fn registry(&self, kind: Kind) -> Result<Registry, FrontbuildError> {
        let registry = match kind {
            Kind::Scss => pipeline::styles(&self.root, &self.scss, &self.dist, &self.styles)?,
            Kind::Ts => pipeline::scripts(&self.root, &self.ts, kind, &self.dist, &self.scripts)?,
            Kind::Js => pipeline::scripts(&self.root, &self.js, kind, &self.dist, &self.scripts)?,
        };

        Ok(registry)
    }

    /// Build everything from scratch: clear the destination root, copy the
    /// static files, then run the three pipelines concurrently.
    pub fn build(&self) -> Result<Report, FrontbuildError> {
        let s = Instant::now();
        tracing::info!("{}", style("Building project").bold());

        let scss = self.registry(Kind::Scss)?;
        let ts = self.registry(Kind::Ts)?;
        let js = self.registry(Kind::Js)?;

        io::clear_dist(&self.root.join(&self.dist))?;
        io::copy_static(&self.root, &self.pass_through)?;

        let (mut report, (ts, js)) = rayon::join(
            || scss.run(),
            || rayon::join(|| ts.run(), || js.run()),
        );
        report.merge(ts);
        report.merge(js);

        if report.is_success() {
            tracing::info!("{} {}", style("Build complete").green(), as_overhead(s));
        } else {
            tracing::error!("{} {report}", style("Build failed").red());
        }

        Ok(report)
    }

    /// Run one asset class, either once or in watch mode. Watching never
    /// returns unless the watcher fails.
    pub fn run(&self, kind: Kind, mode: Mode) -> Result<Report, FrontbuildError> {
        let registry = self.registry(kind)?;

        match mode {
            Mode::Build => Ok(registry.run()),
            #[cfg(feature = "live")]
            Mode::Watch => {
                crate::engine::watch(&self.root, &registry)?;
                Ok(Report::default())
            }
            #[cfg(not(feature = "live"))]
            Mode::Watch => {
                tracing::warn!("built without the `live` feature, running {} once", kind.as_str());
                Ok(registry.run())
            }
        }
    }
}
