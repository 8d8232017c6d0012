//! Script pipeline.
//!
//! Bundling is delegated to the `esbuild` executable, which resolves the
//! module graph from the entry file, strips TypeScript types and lowers the
//! syntax to the configured target. For every mapping this writes:
//!
//! 1. `<name>.js` with an adjacent `<name>.js.map`,
//! 2. `<name>.min.js`, minified from the file written in the first step.
//!
//! **Note:** `esbuild` must be available in the system PATH, or its location
//! set through [`ScriptOptions::program`].

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::process::{Command, Stdio};
use std::sync::RwLock;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use serde::Deserialize;

use crate::error::ScriptError;
use crate::files::SourceMapping;
use crate::output::{map_sibling, min_sibling, normalize_path};

/// Options shared by every bundle of a project.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// The esbuild executable.
    pub program: String,
    /// Syntax level the bundles are lowered to.
    pub target: String,
    /// Output module format, `iife` wraps each bundle in its own scope.
    pub format: String,
    /// Changed paths matching any of these never trigger a rebuild.
    pub ignore: Vec<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            program: "esbuild".to_string(),
            target: "es2015".to_string(),
            format: "iife".to_string(),
            ignore: vec!["**/node_modules/**".to_string()],
        }
    }
}

const EXTENSIONS_JS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs", ".json"];
const EXTENSIONS_TS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];

/// Files written for a single bundle.
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub js: Utf8PathBuf,
    pub map: Utf8PathBuf,
    pub min: Utf8PathBuf,
    /// Source files esbuild pulled into the bundle, relative to the root.
    pub inputs: Vec<Utf8PathBuf>,
}

/// A configured bundler bound to the entries of one mapping.
///
/// The bundler is created once and reused for every rebuild in watch mode.
/// Between builds it only remembers which files made up the last bundle.
#[derive(Debug)]
pub struct Bundler {
    program: String,
    basedir: Utf8PathBuf,
    entries: Vec<Utf8PathBuf>,
    typed: bool,
    target: String,
    format: String,
    extensions: Vec<&'static str>,
    tsconfig: Option<Utf8PathBuf>,
    ignore: Vec<Pattern>,
    inputs: RwLock<HashSet<Utf8PathBuf>>,
}

#[derive(Deserialize)]
struct Metafile {
    inputs: BTreeMap<String, serde_json::Value>,
}

impl Bundler {
    /// Configure a bundler for `entries`, with paths relative to `basedir`.
    /// `dist` is the destination root, its contents are never watched.
    pub fn new(
        basedir: &Utf8Path,
        entries: &[Utf8PathBuf],
        typed: bool,
        dist: &Utf8Path,
        options: &ScriptOptions,
    ) -> Result<Self, ScriptError> {
        if entries.is_empty() {
            return Err(ScriptError::NoEntries);
        }

        let mut extensions = Vec::new();
        if typed {
            extensions.extend_from_slice(EXTENSIONS_TS);
        }
        extensions.extend_from_slice(EXTENSIONS_JS);

        let tsconfig = (typed && basedir.join("tsconfig.json").is_file())
            .then(|| Utf8PathBuf::from("tsconfig.json"));

        let mut ignore = options
            .ignore
            .iter()
            .map(|glob| Pattern::new(glob))
            .collect::<Result<Vec<_>, _>>()?;
        ignore.push(Pattern::new(normalize_path(dist).join("**").as_str())?);

        Ok(Self {
            program: options.program.clone(),
            basedir: basedir.to_path_buf(),
            entries: entries.iter().map(|entry| normalize_path(entry)).collect(),
            typed,
            target: options.target.clone(),
            format: options.format.clone(),
            extensions,
            tsconfig,
            ignore,
            inputs: RwLock::new(HashSet::new()),
        })
    }

    /// Directories containing the entry files.
    pub fn entry_dirs(&self) -> Vec<Utf8PathBuf> {
        SourceMapping::many(self.entries.clone(), "").entry_dirs()
    }

    /// Directories containing the modules pulled into the last bundle,
    /// except the ignored ones.
    pub fn input_dirs(&self) -> Vec<Utf8PathBuf> {
        let Ok(inputs) = self.inputs.read() else {
            return Vec::new();
        };

        let mut dirs: Vec<Utf8PathBuf> = inputs
            .iter()
            .filter(|input| !self.is_ignored(input))
            .filter_map(|input| input.parent())
            .filter(|dir| !dir.as_str().is_empty() && !dir.starts_with(".."))
            .map(Utf8Path::to_path_buf)
            .collect();

        dirs.sort();
        dirs.dedup();
        dirs
    }

    /// Replace the modules known to make up the bundle.
    pub(crate) fn record_inputs(&self, inputs: impl IntoIterator<Item = Utf8PathBuf>) {
        if let Ok(mut known) = self.inputs.write() {
            *known = inputs.into_iter().map(|input| normalize_path(&input)).collect();
        }
    }

    fn is_ignored(&self, path: &Utf8Path) -> bool {
        self.ignore.iter().any(|p| p.matches_path(path.as_std_path()))
    }

    /// Decide whether a changed file, relative to the base directory,
    /// affects this bundle.
    pub fn is_dirty(&self, path: &Utf8Path) -> bool {
        let path = normalize_path(path);

        if self.is_ignored(&path) {
            return false;
        }

        if self
            .entry_dirs()
            .iter()
            .any(|dir| crate::output::is_under(&path, dir))
        {
            return true;
        }

        match self.inputs.read() {
            Ok(inputs) => inputs.contains(&path),
            Err(_) => false,
        }
    }

    /// Arguments for the bundling run writing `outfile`, paths relative to
    /// the base directory.
    fn bundle_args(&self, outfile: &Utf8Path, metafile: &Utf8Path) -> Vec<String> {
        let mut args = Vec::new();

        if self.entries.len() == 1 {
            args.push(self.entries[0].to_string());
        } else {
            args.push("--sourcefile=<entries>".to_string());
        }

        args.push("--bundle".to_string());
        args.push("--sourcemap".to_string());
        args.push("--platform=browser".to_string());
        args.push(format!("--format={}", self.format));
        args.push(format!("--target={}", self.target));
        args.push(format!("--resolve-extensions={}", self.extensions.join(",")));

        if self.typed {
            args.push("--loader:.ts=ts".to_string());
            args.push("--loader:.tsx=tsx".to_string());
        }

        if let Some(tsconfig) = &self.tsconfig {
            args.push(format!("--tsconfig={tsconfig}"));
        }

        args.push(format!("--metafile={metafile}"));
        args.push(format!("--outfile={outfile}"));
        args.push("--log-level=warning".to_string());
        args
    }

    /// Arguments for minifying the already written bundle.
    fn minify_args(&self, input: &Utf8Path, outfile: &Utf8Path) -> Vec<String> {
        vec![
            input.to_string(),
            "--minify".to_string(),
            format!("--target={}", self.target),
            format!("--outfile={outfile}"),
            "--log-level=warning".to_string(),
        ]
    }

    /// Entry module importing every entry in order, used when one mapping
    /// bundles several files.
    fn stdin_entry(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("import \"./{entry}\";\n"))
            .collect()
    }

    /// Resolve the module graph and write the bundle, its source map and
    /// its minified sibling to `dist`, a path relative to the base directory.
    pub fn bundle(&self, dist: &Utf8Path) -> Result<BundleOutput, ScriptError> {
        if dist.file_name().is_none() {
            return Err(ScriptError::Name(dist.to_path_buf()));
        }

        let dist = normalize_path(dist);
        let min = min_sibling(&dist);

        if let Some(dir) = dist.parent()
            && !dir.as_str().is_empty()
        {
            fs::create_dir_all(self.basedir.join(dir))?;
        }

        let metafile = tempfile::Builder::new()
            .prefix("frontbuild-meta-")
            .suffix(".json")
            .tempfile()?;
        let metafile_path = Utf8PathBuf::try_from(metafile.path().to_path_buf())
            .map_err(|e| ScriptError::Io(e.into_io_error()))?;

        let stdin = (self.entries.len() > 1).then(|| self.stdin_entry());
        self.run(self.bundle_args(&dist, &metafile_path), stdin)?;

        let meta: Metafile = serde_json::from_slice(&fs::read(&metafile_path)?)?;
        let inputs: Vec<Utf8PathBuf> = meta
            .inputs
            .keys()
            .filter(|key| !key.starts_with('<'))
            .map(|key| normalize_path(Utf8Path::new(key)))
            .collect();

        self.record_inputs(inputs.iter().cloned());

        self.run(self.minify_args(&dist, &min), None)?;

        Ok(BundleOutput {
            map: map_sibling(&dist),
            js: dist,
            min,
            inputs,
        })
    }

    fn run(&self, args: Vec<String>, stdin: Option<String>) -> Result<(), ScriptError> {
        tracing::debug!("{} {}", self.program, args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .current_dir(&self.basedir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if stdin.is_some() {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }

        let mut child = command.spawn()?;

        if let Some(source) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            std::io::Write::write_all(&mut pipe, source.as_bytes())?;
        }

        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(ScriptError::Esbuild(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        Ok(())
    }
}
