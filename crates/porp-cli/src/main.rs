use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use porp_codec::{CodecConfig, ContainerCodec};
use porp_model::{ContainerHeader, ProjectDocument, SurveyDocument, TabularMatrix, Variant};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "PORP_CONFIG";
const DEFAULT_FILTER: &str = "porp=info";

fn cli() -> Command {
    let kind = || {
        Arg::new("kind")
            .required(true)
            .value_parser(["survey", "project", "data"])
            .help("Artifact family")
    };

    Command::new("porp")
        .version(porp_codec::VERSION)
        .about("Inspect and convert Porpoise survey, project and data containers")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Codec configuration file (defaults to $PORP_CONFIG)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Show container header and payload size")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("decode")
                .about("Decode containers to JSON")
                .arg(kind())
                .arg(
                    Arg::new("files")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("encode")
                .about("Encode a JSON document into a container")
                .arg(kind())
                .arg(
                    Arg::new("json")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON input as produced by `decode`"),
                )
                .arg(
                    Arg::new("out")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("variant")
                        .long("variant")
                        .default_value("bin")
                        .value_parser(["bin", "txt"])
                        .help("Container framing"),
                )
                .arg(
                    Arg::new("exported")
                        .long("exported")
                        .action(ArgAction::SetTrue)
                        .help("Set EXPORTFILE=T in the header"),
                ),
        )
        .subcommand(
            Command::new("export-legacy")
                .about("Decrypt a 29-byte-header legacy export to stdout")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let codec = ContainerCodec::new(load_config(matches.get_one::<PathBuf>("config"))?);

    match matches.subcommand() {
        Some(("inspect", args)) => inspect(&codec, required_path(args, "file")?),
        Some(("decode", args)) => {
            let kind = required_str(args, "kind")?;
            let files: Vec<&PathBuf> = args.get_many::<PathBuf>("files").into_iter().flatten().collect();
            decode(&codec, kind, &files)
        }
        Some(("encode", args)) => {
            let variant = match required_str(args, "variant")? {
                "txt" => Variant::Text,
                _ => Variant::Binary,
            };
            let header = ContainerHeader::new(variant, args.get_flag("exported"));
            encode(
                &codec,
                required_str(args, "kind")?,
                required_path(args, "json")?,
                required_path(args, "out")?,
                header,
            )
        }
        Some(("export-legacy", args)) => {
            let path = required_path(args, "file")?;
            let text = codec
                .read_legacy_export(path)
                .with_context(|| format!("failed to decrypt {}", path.display()))?;
            println!("{text}");
            Ok(())
        }
        _ => bail!("no subcommand given"),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn load_config(flag: Option<&PathBuf>) -> Result<CodecConfig> {
    let path = flag
        .cloned()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading codec configuration");
            CodecConfig::from_file(&path)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => Ok(CodecConfig::default()),
    }
}

fn inspect(codec: &ContainerCodec, path: &Path) -> Result<()> {
    let raw = codec
        .read_raw(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let summary = serde_json::json!({
        "file": path.display().to_string(),
        "has_header": raw.has_header(),
        "header": raw.has_header().then(|| raw.header().render()),
        "variant": raw.variant(),
        "exported": raw.exported(),
        "payload_len": raw.payload().len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn decode(codec: &ContainerCodec, kind: &str, files: &[&PathBuf]) -> Result<()> {
    let results: Vec<Result<serde_json::Value>> = files
        .par_iter()
        .map(|path| {
            decode_one(codec, kind, path).with_context(|| format!("failed to decode {}", path.display()))
        })
        .collect();

    let mut failed = 0usize;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Err(err) => {
                failed += 1;
                tracing::error!(file = %path.display(), "{err:#}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} files failed to decode", files.len());
    }
    Ok(())
}

fn decode_one(codec: &ContainerCodec, kind: &str, path: &Path) -> Result<serde_json::Value> {
    let value = match kind {
        "survey" => serde_json::to_value(codec.read_survey(path)?)?,
        "project" => serde_json::to_value(codec.read_project(path)?)?,
        "data" => serde_json::to_value(codec.read_data(path)?)?,
        other => bail!("unknown kind {other:?}"),
    };
    Ok(value)
}

fn encode(codec: &ContainerCodec, kind: &str, json: &Path, out: &Path, header: ContainerHeader) -> Result<()> {
    let text = std::fs::read_to_string(json).with_context(|| format!("failed to read {}", json.display()))?;
    match kind {
        "survey" => {
            let survey: SurveyDocument = serde_json::from_str(&text).context("invalid survey JSON")?;
            codec.write_survey(out, &survey, header)?;
        }
        "project" => {
            let project: ProjectDocument = serde_json::from_str(&text).context("invalid project JSON")?;
            codec.write_project(out, &project, header)?;
        }
        "data" => {
            let matrix: TabularMatrix = serde_json::from_str(&text).context("invalid data JSON")?;
            codec.write_data(out, &matrix, header)?;
        }
        other => bail!("unknown kind {other:?}"),
    }
    tracing::info!(out = %out.display(), %kind, header = %header.render(), "container written");
    Ok(())
}

fn required_str<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{name}>"))
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing argument <{name}>"))
}
