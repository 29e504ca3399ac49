#[macro_use]
extern crate log;

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgMatches, Command};
use imagerec::prelude::*;

mod params;

use params::Parameters;

pub fn command() -> Command<'static> {
    Command::new("imagerec")
        .version(clap::crate_version!())
        .about("Classifies images with a frozen TensorFlow model")
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .takes_value(true)
                .required(true)
                .help("Frozen graph (.pb) with an input and an output tensor"),
        )
        .arg(
            Arg::new("labels")
                .short('l')
                .long("labels")
                .takes_value(true)
                .required(true)
                .help("Label file, one class per line, in training order"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .takes_value(true)
                .help("JSON recognizer configuration"),
        )
        .arg(Arg::new("size").long("size").takes_value(true).help("Model input size (HxW)"))
        .arg(Arg::new("mean").long("mean").takes_value(true).help("Value subtracted from pixels"))
        .arg(Arg::new("scale").long("scale").takes_value(true).help("Pixel divisor"))
        .arg(Arg::new("channels").long("channels").takes_value(true).help("1, 3 or 4"))
        .arg(
            Arg::new("input_node")
                .long("input-node")
                .takes_value(true)
                .help("Override the input tensor name"),
        )
        .arg(
            Arg::new("output_node")
                .long("output-node")
                .takes_value(true)
                .help("Override the output tensor name"),
        )
        .arg(
            Arg::new("deadline")
                .long("deadline")
                .takes_value(true)
                .help("Give up on an image after this many milliseconds"),
        )
        .arg(Arg::new("json").long("json").help("One JSON object per image"))
        .arg(
            Arg::new("verbosity")
                .short('v')
                .multiple_occurrences(true)
                .help("Sets the level of verbosity."),
        )
        .arg(
            Arg::new("images")
                .takes_value(true)
                .multiple_values(true)
                .required(true)
                .help("Images to recognize (JPEG)"),
        )
}

fn main() {
    let matches = command().get_matches();

    let level = match matches.occurrences_of("verbosity") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    match handle(&matches) {
        Ok(true) => (),
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("{:?}", e);
            process::exit(1)
        }
    }
}

/// Returns Ok(false) when at least one image failed.
fn handle(matches: &ArgMatches) -> anyhow::Result<bool> {
    let params = Parameters::from_clap(matches)?;
    let recognizer = Arc::new(params::load_recognizer(&params)?);
    let mut all_good = true;
    for path in &params.images {
        let result = match fs_err::read(path) {
            Ok(image) => recognizer.recognize_bounded(image).map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(best) if params.json => {
                let line = serde_json::json!({
                    "image": path.display().to_string(),
                    "label": best.label,
                    "confidence": best.confidence,
                });
                println!("{}", line);
            }
            Ok(best) if params.images.len() == 1 => println!("BEST MATCH: {}", best),
            Ok(best) => println!("{}: BEST MATCH: {}", path.display(), best),
            Err(e) => {
                all_good = false;
                error!("{}", failure_report(path, &e));
            }
        }
    }
    Ok(all_good)
}

fn failure_report(path: &Path, e: &anyhow::Error) -> String {
    match e.downcast_ref::<RecognizeError>() {
        Some(internal) if internal.is_internal() => {
            format!("{}: internal fault, please report it: {:#}", path.display(), e)
        }
        _ => format!("{}: {:#}", path.display(), e),
    }
}
