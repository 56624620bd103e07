use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use constructor_engine::{BuildError, ConstructionError, EngineConfig, ResolutionEngine};
use constructor_types::TypeTable;
use serde_json::Value as JsonValue;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "constructor")]
#[command(about = "Resolve untyped payloads into constructor-call trees using parameter descriptors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a payload against a type and print the resulting constructor call
    Emit {
        /// Descriptor YAML files; later files override types of the same name
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Type to construct
        #[arg(short = 't', long = "type-name", required = true)]
        type_name: String,

        /// Payload file (JSON or YAML mapping); `-` reads stdin, omitted means empty
        #[arg(short = 'p', long = "payload", value_name = "FILE")]
        payload: Option<PathBuf>,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "rust")]
        format: OutputFormat,

        /// Pretty print JSON output
        #[arg(long = "pretty")]
        pretty: bool,

        /// Engine configuration file (YAML)
        #[arg(short = 'c', long = "config", value_name = "FILE")]
        config: Option<PathBuf>,

        /// Maximum nesting depth; overrides the configuration file
        #[arg(long = "max-depth")]
        max_depth: Option<usize>,
    },

    /// Print the parameter descriptors of one type, or list all types
    Inspect {
        /// Descriptor YAML files; later files override types of the same name
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Type to describe; omitted lists every type
        #[arg(short = 't', long = "type-name")]
        type_name: Option<String>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum OutputFormat {
    /// Rust-flavoured constructor expression
    Rust,
    /// Serialized call tree
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Emit {
            files,
            type_name,
            payload,
            format,
            pretty,
            config,
            max_depth,
        } => {
            run_emit(files, type_name, payload, format, pretty, config, max_depth)?;
        }

        Commands::Inspect { files, type_name } => {
            run_inspect(files, type_name)?;
        }
    }

    Ok(())
}

fn load_tables(files: &[PathBuf]) -> anyhow::Result<TypeTable> {
    let mut table = TypeTable::new();
    for file in files {
        let loaded = TypeTable::load(file)?;
        tracing::debug!(file = %file.display(), types = loaded.len(), "loaded descriptor file");
        table.merge(loaded);
    }
    Ok(table)
}

fn load_config(path: Option<&Path>, max_depth: Option<usize>) -> anyhow::Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config '{}'", path.display()))?;
            serde_yml::from_str::<EngineConfig>(&contents)
                .with_context(|| format!("Failed to parse config '{}'", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(max_depth) = max_depth {
        config = config.with_max_depth(max_depth);
    }
    Ok(config)
}

fn read_payload(path: Option<&Path>) -> anyhow::Result<JsonValue> {
    let contents = match path {
        None => return Ok(JsonValue::Object(serde_json::Map::new())),
        Some(path) if path == Path::new("-") => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload '{}'", path.display()))?,
    };
    /* YAML is a superset of JSON, so one parser covers both */
    let payload: JsonValue = serde_yml::from_str(&contents).context("Failed to parse payload")?;
    Ok(payload)
}

fn run_emit(
    files: Vec<PathBuf>,
    type_name: String,
    payload: Option<PathBuf>,
    format: OutputFormat,
    pretty: bool,
    config: Option<PathBuf>,
    max_depth: Option<usize>,
) -> anyhow::Result<()> {
    let config = load_config(config.as_deref(), max_depth)?;
    let payload = read_payload(payload.as_deref())?;
    println!(
        "{}",
        emit_output(&files, &type_name, payload, format, pretty, config)?
    );
    Ok(())
}

fn emit_output(
    files: &[PathBuf],
    type_name: &str,
    payload: JsonValue,
    format: OutputFormat,
    pretty: bool,
    config: EngineConfig,
) -> anyhow::Result<String> {
    let table = load_tables(files)?;
    let engine = ResolutionEngine::with_config(table, config);
    let call = engine
        .emit_json(type_name, payload)
        .map_err(|err| anyhow::anyhow!("{}", describe_failure(type_name, &err)))?;

    let output = match format {
        OutputFormat::Rust => call.render(),
        OutputFormat::Json if pretty => serde_json::to_string_pretty(&call)?,
        OutputFormat::Json => serde_json::to_string(&call)?,
    };
    Ok(output)
}

/* Multi-line report: the failing parameter path, then one line per attempt */
fn describe_failure(type_name: &str, err: &BuildError) -> String {
    match err.as_construction() {
        Some(construction) => describe_construction(type_name, construction),
        None => format!("Failed to build '{}': {}", type_name, err),
    }
}

fn describe_construction(type_name: &str, err: &ConstructionError) -> String {
    let mut report = format!(
        "Failed to build '{}': cannot resolve parameter '{}'",
        type_name,
        err.path()
    );
    for attempt in err.errors() {
        report.push_str("\n  - ");
        report.push_str(&attempt.to_string());
    }
    report
}

fn run_inspect(files: Vec<PathBuf>, type_name: Option<String>) -> anyhow::Result<()> {
    print!("{}", inspect_output(&files, type_name.as_deref())?);
    Ok(())
}

fn inspect_output(files: &[PathBuf], type_name: Option<&str>) -> anyhow::Result<String> {
    let table = load_tables(files)?;
    let mut output = String::new();

    let Some(type_name) = type_name else {
        for name in table.type_names() {
            output.push_str(name);
            output.push('\n');
        }
        return Ok(output);
    };

    let def = table
        .get(type_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown type '{}'", type_name))?;

    output.push_str(&def.name);
    output.push('\n');
    for param in &def.parameters {
        output.push_str(&format!("  {}: {}", param.name, param.type_expression()));
        if let Some(default) = &param.default {
            output.push_str(&format!(" = {}", default));
        }
        if param.is_complex() {
            output.push_str("  (resolved)");
        }
        output.push('\n');
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use constructor_engine::AttemptError;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn cli_parses_emit_arguments() {
        let cli = Cli::try_parse_from([
            "constructor",
            "emit",
            "-f",
            "shapes.yaml",
            "-t",
            "Shape",
            "--format",
            "json",
            "--max-depth",
            "8",
        ])
        .expect("parse args");

        match cli.command {
            Commands::Emit {
                type_name,
                format,
                max_depth,
                payload,
                ..
            } => {
                assert_eq!(type_name, "Shape");
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(max_depth, Some(8));
                assert!(payload.is_none());
            }
            Commands::Inspect { .. } => panic!("expected emit"),
        }
    }

    #[test]
    fn max_depth_flag_overrides_default() {
        let config = load_config(None, Some(3)).expect("config");
        assert_eq!(config.max_depth, 3);
        assert_eq!(
            load_config(None, None).expect("config"),
            EngineConfig::default()
        );
    }

    fn shapes_fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../constructor_engine/tests/fixtures/shapes.yaml")
    }

    #[test]
    fn emit_resolves_payload_against_loaded_files() {
        let output = emit_output(
            &[shapes_fixture()],
            "Shape",
            json!({"center": {"x": 1, "y": 2}, "label": "a"}),
            OutputFormat::Rust,
            false,
            EngineConfig::default(),
        )
        .expect("emit Shape");
        assert_eq!(output, r#"Shape::new(Point::new(1, 2), "a")"#);
    }

    #[test]
    fn later_files_override_earlier_types() {
        let mut overlay = tempfile::NamedTempFile::new().expect("temp file");
        overlay
            .write_all(
                b"types:\n  - name: Point\n    parameters:\n      - name: x\n        type: int\n",
            )
            .expect("write overlay");
        let files = vec![shapes_fixture(), overlay.path().to_path_buf()];

        let output = emit_output(
            &files,
            "Group",
            json!({"members": [{"x": 3}]}),
            OutputFormat::Json,
            false,
            EngineConfig::default(),
        )
        .expect("emit Group");
        let tree: JsonValue = serde_json::from_str(&output).expect("json output");
        let point = &tree["args"][0]["value"]["value"][0]["value"];
        assert_eq!(point["type-name"], json!("Point"));
        assert_eq!(point["args"].as_array().map(Vec::len), Some(1));

        let listing = inspect_output(&files, Some("Point")).expect("inspect Point");
        assert_eq!(listing, "Point\n  x: int\n");
    }

    #[test]
    fn emit_failure_reports_the_parameter_path() {
        let err = emit_output(
            &[shapes_fixture()],
            "Group",
            json!({"members": "oops"}),
            OutputFormat::Rust,
            false,
            EngineConfig::default(),
        )
        .expect_err("members is not a sequence");
        assert!(err
            .to_string()
            .starts_with("Failed to build 'Group': cannot resolve parameter 'members'"));
    }

    #[test]
    fn inspect_lists_types_and_marks_resolved_parameters() {
        let listing = inspect_output(&[shapes_fixture()], None).expect("list types");
        assert!(listing.starts_with("Point\nShape\nGroup\n"));

        let group = inspect_output(&[shapes_fixture()], Some("Group")).expect("inspect Group");
        assert_eq!(
            group,
            "Group\n  members: Point[]  (resolved)\n  name: string = \"group\"\n"
        );
        assert!(inspect_output(&[shapes_fixture()], Some("Ghost")).is_err());
    }

    #[test]
    fn construction_report_lists_every_attempt() {
        let err = ConstructionError::chained(
            "frame",
            ConstructionError::exhausted(
                "origin",
                vec![AttemptError::SequenceExpected {
                    type_name: "Point".to_string(),
                    found: "string",
                }],
            ),
        );

        let report = describe_failure("Canvas", &BuildError::Construction(err));
        assert_eq!(
            report,
            "Failed to build 'Canvas': cannot resolve parameter 'frame -> origin'\n  - type Point[] expects a sequence, got string"
        );
    }
}
