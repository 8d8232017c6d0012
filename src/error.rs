#[cfg(feature = "live")]
use std::sync::mpsc::RecvError;

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontbuildError {
    #[error("Error while clearing the dist directory:\n{0}")]
    Clear(#[from] ClearError),

    #[error("Error while copying static files:\n{0}")]
    Copy(#[from] CopyError),

    #[error("Error while registering tasks:\n{0}")]
    Registry(#[from] RegistryError),

    #[error("Error while building script task '{0}':\n{1}")]
    Script(String, ScriptError),

    #[cfg(feature = "live")]
    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),
}

#[derive(Debug, Error)]
pub enum ClearError {
    #[error("Failed to remove the dist directory:\n{0}")]
    RemoveError(std::io::Error),

    #[error("Failed to create the dist directory:\n{0}")]
    CreateError(std::io::Error),
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Path {0} is outside of {1}")]
    Prefix(Utf8PathBuf, Utf8PathBuf),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tasks '{1}' and '{2}' both write {0}")]
    Duplicate(Utf8PathBuf, String, String),
}

/// Errors that can occur when compiling stylesheets.
#[derive(Debug, Error)]
pub enum StyleError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A Sass compilation error occurred.
    #[error("Sass compilation error: {0}")]
    Sass(#[from] Box<grass::Error>),

    /// The compiled CSS could not be parsed, transformed or printed.
    #[error("CSS error in {0}: {1}")]
    Css(Utf8PathBuf, String),

    /// The browserslist query is invalid.
    #[error("Invalid browserslist query: {0}")]
    Browserslist(String),

    #[error("Source map error: {0}")]
    SourceMap(String),

    #[error("Source {0} has no file name")]
    Name(Utf8PathBuf),
}

/// Errors that can occur when bundling scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// An I/O error occurred during process execution.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The esbuild process returned a non-zero exit code.
    #[error("esbuild execution failed:\n{0}")]
    Esbuild(String),

    /// The metafile written by esbuild could not be read.
    #[error("Couldn't read esbuild metafile: {0}")]
    Metafile(#[from] serde_json::Error),

    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),

    #[error("Mapping has no entry files")]
    NoEntries,

    #[error("Destination {0} has no file name")]
    Name(Utf8PathBuf),
}

#[cfg(feature = "live")]
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Recv(#[from] RecvError),
}
