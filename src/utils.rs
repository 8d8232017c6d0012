use std::sync::LazyLock;

use indicatif::ProgressStyle;

static STYLE_ROOT: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("Error setting progress bar template")
        .progress_chars("=>-")
});

static STYLE_TASK: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .expect("Error setting progress bar template")
});

static STYLE_COPY: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] {pos} {msg}")
        .expect("Error setting progress bar template")
});

pub(crate) fn get_style_root() -> ProgressStyle {
    STYLE_ROOT.clone()
}

pub(crate) fn get_style_task() -> ProgressStyle {
    STYLE_TASK.clone()
}

pub(crate) fn get_style_copy() -> ProgressStyle {
    STYLE_COPY.clone()
}
