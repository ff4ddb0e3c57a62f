mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use netshape::catalog::{CatalogMode, SourceFormat};
use netshape::config::InferenceConfig;
use netshape::graph::Dimension;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid --log filter")?)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli)?;

    let (format, graph, weights) = match &cli.command {
        Command::Caffe2 { predict_net, init_net } => {
            let init = init_net.as_deref().map(read_file).transpose()?;
            (SourceFormat::Caffe2, read_file(predict_net)?, init)
        }
        Command::Tensorflow { graph } => (SourceFormat::TensorFlow, read_file(graph)?, None),
    };

    let report = netshape::analyze(format, &graph, weights.as_deref(), &config)
        .with_context(|| format!("shape inference over {format} graph failed"))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Config file values, then command-line overrides.
fn build_config(cli: &Cli) -> Result<InferenceConfig> {
    let mut config = match &cli.config {
        Some(path) => InferenceConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => InferenceConfig::new(),
    };

    if cli.strict {
        config.catalog_mode = CatalogMode::Strict;
    } else if let Some(mode) = cli.catalog_mode {
        config.catalog_mode = mode.into();
    }
    if let Some(name) = &cli.input {
        config.input_name = Some(name.clone());
    }
    if let Some(dims) = &cli.input_dims {
        config.input_dims = Some(parse_dims(dims)?);
    }
    if cli.no_annotations {
        config.check_annotations = false;
    }
    Ok(config)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_dims(s: &str) -> Result<Dimension> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --input-dims '{s}'"))?;

    match parts.as_slice() {
        [h, w, c] if *h > 0 && *w > 0 && *c > 0 => Ok(Dimension::new(*h, *w, *c)),
        _ => bail!("invalid --input-dims '{s}' (expected H,W,C with positive values)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dims() {
        assert_eq!(parse_dims("224,224,3").unwrap(), Dimension::new(224, 224, 3));
        assert_eq!(parse_dims(" 32, 16 ,1").unwrap(), Dimension::new(32, 16, 1));
        assert!(parse_dims("224,224").is_err());
        assert!(parse_dims("0,224,3").is_err());
        assert!(parse_dims("a,b,c").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "netshape",
            "--strict",
            "--input",
            "gpu_0/data",
            "--input-dims",
            "299,299,3",
            "caffe2",
            "--predict-net",
            "predict.pb",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.catalog_mode, CatalogMode::Strict);
        assert_eq!(config.input_name.as_deref(), Some("gpu_0/data"));
        assert_eq!(config.input_dims, Some(Dimension::new(299, 299, 3)));
        assert!(config.check_annotations);
    }
}
