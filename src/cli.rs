use clap::{Parser, Subcommand, ValueEnum};
use netshape::catalog::CatalogMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netshape", version, about = "Static shape inference for CNN graphs")]
pub struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// How to treat op types the catalog does not know
    #[arg(long, value_enum, global = true)]
    pub catalog_mode: Option<ModeArg>,

    /// Shorthand for --catalog-mode strict
    #[arg(long, global = true, conflicts_with = "catalog_mode")]
    pub strict: bool,

    /// Network input dimension as H,W,C
    #[arg(long, global = true)]
    pub input_dims: Option<String>,

    /// Network input tensor name
    #[arg(long, global = true)]
    pub input: Option<String>,

    /// Skip the comparison against shapes declared in the graph
    #[arg(long, global = true)]
    pub no_annotations: bool,

    /// Log level (RUST_LOG syntax)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a Caffe2 predict net
    #[command(name = "caffe2")]
    Caffe2 {
        /// Serialized predict NetDef
        #[arg(long)]
        predict_net: PathBuf,

        /// Serialized init NetDef holding the weight shapes
        #[arg(long)]
        init_net: Option<PathBuf>,
    },
    /// Analyze a TensorFlow GraphDef
    Tensorflow {
        /// Serialized GraphDef
        #[arg(long)]
        graph: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Lenient,
    Strict,
}

impl From<ModeArg> for CatalogMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Lenient => CatalogMode::Lenient,
            ModeArg::Strict => CatalogMode::Strict,
        }
    }
}
