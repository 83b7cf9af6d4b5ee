use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tpub_core::{BuildBackend, CommandGroup, ReleaseRequest};

pub const TPUB_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nOptions:\n{options}\n";

pub const TPUB_BEFORE_HELP: &str = concat!(
    "tpub ",
    env!("CARGO_PKG_VERSION"),
    " – build and upload Python distributions to a test index\n\n",
    "\x1b[1;36mRelease\x1b[0m\n",
    "  (none) / release  Empty dist/, build an sdist and a wheel, upload them with twine.\n\n",
    "\x1b[1;36mSingle steps\x1b[0m\n",
    "  clean             Remove everything inside dist/ (the directory is kept).\n",
    "  build             Clean dist/, then build an sdist and a wheel into it.\n",
    "  upload            Upload every file currently in dist/.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "tpub",
    author,
    version,
    disable_help_subcommand = true,
    before_help = TPUB_BEFORE_HELP,
    help_template = TPUB_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct TpubCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit a {status,message,details} JSON envelope on stdout",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(flatten)]
    pub release: ReleaseArgs,
    #[command(subcommand)]
    pub command: Option<CommandGroupCli>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReleaseArgs {
    #[arg(
        long,
        value_name = "PATH",
        help = "Output directory for built artifacts [env: TPUB_DIST_DIR] [default: dist]",
        global = true
    )]
    pub dist_dir: Option<PathBuf>,
    #[arg(
        long,
        value_name = "NAME|URL",
        help = "Upload target: testpypi, pypi, a host, or a URL [env: TPUB_REPOSITORY] [default: testpypi]",
        global = true
    )]
    pub repository: Option<String>,
    #[arg(
        long,
        value_enum,
        help = "Packaging tool to run [env: TPUB_BUILD_BACKEND] [default: auto]",
        global = true
    )]
    pub backend: Option<BackendArg>,
    #[arg(
        long,
        help = "Show what would be removed, built, and uploaded without doing it",
        global = true
    )]
    pub dry_run: bool,
    #[arg(
        long,
        help = "Upload even if the build step fails [env: TPUB_KEEP_GOING=1]",
        global = true
    )]
    pub keep_going: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CommandGroupCli {
    #[command(
        about = "Empty dist/, build an sdist and a wheel, and upload them (the default).",
        override_usage = "tpub release [--repository NAME|URL] [--dry-run]"
    )]
    Release,
    #[command(
        about = "Remove every entry inside dist/ while keeping the directory.",
        override_usage = "tpub clean [--dist-dir PATH] [--dry-run]"
    )]
    Clean,
    #[command(
        about = "Clean dist/, then build an sdist and a wheel into it.",
        override_usage = "tpub build [--backend auto|build|setuptools]"
    )]
    Build,
    #[command(
        about = "Upload every file currently in dist/ with twine.",
        override_usage = "tpub upload [--repository NAME|URL]"
    )]
    Upload,
}

impl CommandGroupCli {
    pub fn group(self) -> CommandGroup {
        match self {
            CommandGroupCli::Release => CommandGroup::Release,
            CommandGroupCli::Clean => CommandGroup::Clean,
            CommandGroupCli::Build => CommandGroup::Build,
            CommandGroupCli::Upload => CommandGroup::Upload,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Auto,
    Build,
    Setuptools,
}

impl From<BackendArg> for BuildBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Auto => BuildBackend::Auto,
            BackendArg::Build => BuildBackend::Build,
            BackendArg::Setuptools => BuildBackend::Setuptools,
        }
    }
}

pub fn release_request_from_args(args: &ReleaseArgs) -> ReleaseRequest {
    ReleaseRequest {
        dist_dir: args.dist_dir.clone(),
        repository: args.repository.clone(),
        backend: args.backend.map(BuildBackend::from),
        keep_going: args.keep_going,
        dry_run: args.dry_run,
    }
}
