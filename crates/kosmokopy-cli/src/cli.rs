use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// A single-mode file transfer invocation: copy or move a tree (or an
/// explicit file list) between local and/or SSH-reachable locations.
#[derive(Parser, Debug)]
#[command(name = "kosmokopy")]
#[command(about = "Copy or move files between local and SSH-reachable locations")]
pub struct Cli {
    /// Required marker confirming this is a non-interactive CLI
    /// invocation; its absence is treated as a usage error.
    #[arg(long)]
    pub cli: bool,

    /// Source root, as `path` or `host:path`. Mutually exclusive with
    /// `--src-files`.
    #[arg(long)]
    pub src: Option<String>,

    /// Explicit list of source file paths, always transferred in
    /// files-only mode regardless of `--mode`.
    #[arg(long = "src-files", num_args = 1.., value_delimiter = ',')]
    pub src_files: Vec<PathBuf>,

    /// Destination root, as `path` or `host:path`.
    #[arg(long)]
    pub dst: String,

    /// Delete each source file immediately after it is verified at
    /// the destination.
    #[arg(long = "move")]
    pub move_files: bool,

    /// What to do when the destination name is already taken.
    #[arg(long, value_enum, default_value = "skip")]
    pub conflict: ConflictArg,

    /// Remove ASCII spaces from destination file and directory names.
    #[arg(long)]
    pub strip_spaces: bool,

    /// Whether to preserve the source's directory structure under the
    /// destination, or flatten every file into it.
    #[arg(long, value_enum, default_value = "folders")]
    pub mode: ModeArg,

    /// Which back-end moves the bytes.
    #[arg(long, value_enum, default_value = "standard")]
    pub method: MethodArg,

    /// Exclusion pattern; repeatable. See the pattern grammar in the
    /// project documentation for the four recognized forms.
    #[arg(long)]
    pub exclude: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ConflictArg {
    Skip,
    Overwrite,
    Rename,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Folders,
    Files,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MethodArg {
    Standard,
    Rsync,
}

impl From<ConflictArg> for kosmokopy_core::ConflictMode {
    fn from(value: ConflictArg) -> Self {
        match value {
            ConflictArg::Skip => kosmokopy_core::ConflictMode::Skip,
            ConflictArg::Overwrite => kosmokopy_core::ConflictMode::Overwrite,
            ConflictArg::Rename => kosmokopy_core::ConflictMode::Rename,
        }
    }
}

impl From<ModeArg> for kosmokopy_core::Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Folders => kosmokopy_core::Mode::FoldersAndFiles,
            ModeArg::Files => kosmokopy_core::Mode::FilesOnly,
        }
    }
}

impl From<MethodArg> for kosmokopy_core::Method {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Standard => kosmokopy_core::Method::Standard,
            MethodArg::Rsync => kosmokopy_core::Method::Rsync,
        }
    }
}
