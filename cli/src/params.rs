use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::ArgMatches;
use imagerec::prelude::*;

/// Everything the command line asked for, files not read yet.
#[derive(Debug)]
pub struct Parameters {
    pub model: PathBuf,
    pub labels: PathBuf,
    pub images: Vec<PathBuf>,
    pub config: RecognizerConfig,
    pub json: bool,
}

impl Parameters {
    pub fn from_clap(matches: &ArgMatches) -> anyhow::Result<Parameters> {
        let mut config = match matches.value_of("config") {
            Some(path) => read_config(Path::new(path))?,
            None => RecognizerConfig::default(),
        };
        override_config(&mut config, matches)?;
        config.validate()?;
        let images: Vec<PathBuf> =
            matches.values_of("images").into_iter().flatten().map(PathBuf::from).collect();
        if images.is_empty() {
            bail!("no image to recognize");
        }
        Ok(Parameters {
            model: required_path(matches, "model")?,
            labels: required_path(matches, "labels")?,
            images,
            config,
            json: matches.is_present("json"),
        })
    }
}

fn required_path(matches: &ArgMatches, name: &str) -> anyhow::Result<PathBuf> {
    matches.value_of(name).map(PathBuf::from).with_context(|| format!("--{} is required", name))
}

pub fn read_config(path: &Path) -> anyhow::Result<RecognizerConfig> {
    let json = fs_err::read_to_string(path)?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn override_config(config: &mut RecognizerConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let n = &mut config.normalization;
    if let Some(size) = matches.value_of("size") {
        let (h, w) = parse_size(size)?;
        n.height = h;
        n.width = w;
    }
    if matches.is_present("mean") {
        n.mean = matches.value_of_t("mean")?;
    }
    if matches.is_present("scale") {
        n.scale = matches.value_of_t("scale")?;
    }
    if matches.is_present("channels") {
        n.channels = matches.value_of_t("channels")?;
    }
    if let Some(name) = matches.value_of("input_node") {
        config.input_name = name.to_string();
    }
    if let Some(name) = matches.value_of("output_node") {
        config.output_name = name.to_string();
    }
    if matches.is_present("deadline") {
        config.deadline_ms = Some(matches.value_of_t("deadline")?);
    }
    Ok(())
}

/// `224x224` or `224` for a square.
pub fn parse_size(size: &str) -> anyhow::Result<(usize, usize)> {
    let parse =
        |s: &str| s.trim().parse::<usize>().with_context(|| format!("invalid size {:?}", size));
    match size.split_once('x') {
        Some((h, w)) => Ok((parse(h)?, parse(w)?)),
        None => {
            let side = parse(size)?;
            Ok((side, side))
        }
    }
}

/// Reads model and labels, and builds a ready recognizer.
pub fn load_recognizer(params: &Parameters) -> anyhow::Result<Recognizer> {
    let model = fs_err::read(&params.model)?;
    let labels = LabelTable::from_text(&fs_err::read_to_string(&params.labels)?);
    let mut recognizer = Recognizer::new(params.config.clone())?;
    recognizer
        .load_model(&model)
        .with_context(|| format!("loading model {}", params.model.display()))?;
    recognizer
        .load_labels(labels)
        .with_context(|| format!("loading labels {}", params.labels.display()))?;
    Ok(recognizer)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(parse_size("224x224").unwrap(), (224, 224));
        assert_eq!(parse_size("299").unwrap(), (299, 299));
        assert_eq!(parse_size("128x96").unwrap(), (128, 96));
        assert!(parse_size("axb").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mobilenet.json");
        fs_err::write(&path, r#"{ "normalization": { "mean": 127.5, "scale": 127.5 } }"#).unwrap();
        let config = read_config(&path).unwrap();
        assert_eq!(config.normalization.mean, 127.5);
        assert_eq!(config.normalization.height, 224);
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs_err::write(&path, r#"{ "normalization": { "mean": 127.5 }, "deadline_ms": 50 }"#)
            .unwrap();
        let path = path.to_str().unwrap();
        let matches = crate::command().get_matches_from(vec![
            "imagerec", "-m", "m.pb", "-l", "l.txt", "-c", path, "--size", "299", "--mean", "128",
            "a.jpg", "b.jpg",
        ]);
        let params = Parameters::from_clap(&matches).unwrap();
        assert_eq!(params.config.normalization.mean, 128.0);
        assert_eq!(params.config.normalization.height, 299);
        assert_eq!(params.config.deadline_ms, Some(50));
        assert_eq!(params.images.len(), 2);
        assert!(!params.json);
    }
}
