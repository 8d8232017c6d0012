use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use frontbuild::{Kind, Mode, Project};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Command {
    /// Clear dist, copy static files and build every asset once.
    Build,
    BuildScss,
    WatchScss,
    BuildTs,
    WatchTs,
    BuildJs,
    WatchJs,
}

impl Command {
    fn step(self) -> Option<(Kind, Mode)> {
        match self {
            Command::Build => None,
            Command::BuildScss => Some((Kind::Scss, Mode::Build)),
            Command::WatchScss => Some((Kind::Scss, Mode::Watch)),
            Command::BuildTs => Some((Kind::Ts, Mode::Build)),
            Command::WatchTs => Some((Kind::Ts, Mode::Watch)),
            Command::BuildJs => Some((Kind::Js, Mode::Build)),
            Command::WatchJs => Some((Kind::Js, Mode::Watch)),
        }
    }
}

#[derive(Parser, Debug, Clone)]
struct Args {
    #[clap(value_enum, index = 1, default_value = "build")]
    command: Command,

    /// Project root, all source and output paths are relative to it.
    #[clap(long, default_value = ".")]
    root: Utf8PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    frontbuild::init_logging();

    let project = Project::new(args.root);

    let report = match args.command.step() {
        None => project.build()?,
        Some((kind, mode)) => project.run(kind, mode)?,
    };

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
