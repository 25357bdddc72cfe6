//! CLI command implementations
//!
//! `validate` reports validation outcomes as JSON responses; only I/O and
//! configuration problems are CLI errors. `import` loads a dataset
//! definition and a rows file and runs a hub import into an in-memory store.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::json;

use crate::hub::{HubDataset, JsonlHubSource};
use crate::logging;
use crate::records::{
    validate_create, validate_update, Dataset, ExistingRecords, MemoryRecordStore, RecordCreate,
    RecordResult, RecordUpdate, RecordsBulkCreate, RecordsBulkCreateValidator, RecordsBulkUpsert,
    RecordsBulkUpsertValidator,
};

use super::args::{Cli, Command, ValidateMode};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{parse_request, write_error_to, write_response, write_response_to};

/// Parse arguments, set up logging and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = Config::load_or_default(cli.config.as_deref())?;
    logging::init(&config.log_filter);
    run_command(cli.command, &config)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command, config: &Config) -> CliResult<()> {
    match cmd {
        Command::Validate { dataset, mode } => validate(&dataset, mode),
        Command::Import {
            dataset,
            rows,
            take,
        } => import(&dataset, &rows, take, config),
    }
}

/// Validate one request from stdin and report the outcome on stdout
pub fn validate(dataset_path: &Path, mode: ValidateMode) -> CliResult<()> {
    let dataset = load_dataset(dataset_path)?;
    validate_request(&dataset, mode, io::stdin().lock(), &mut io::stdout())
}

/// Validate one request read from `reader` and write the response to `writer`
pub fn validate_request<R: Read, W: Write>(
    dataset: &Dataset,
    mode: ValidateMode,
    reader: R,
    writer: &mut W,
) -> CliResult<()> {
    let outcome = match mode {
        ValidateMode::Create => {
            let record: RecordCreate = parse_request(reader)?;
            validate_create(&record, dataset)
        }
        ValidateMode::Update => {
            let record: RecordUpdate = parse_request(reader)?;
            validate_update(&record, dataset)
        }
        ValidateMode::BulkCreate => {
            let records: RecordsBulkCreate = parse_request(reader)?;
            let store = MemoryRecordStore::new();
            runtime()?.block_on(RecordsBulkCreateValidator::new(&records).validate_for(dataset, &store))
        }
        ValidateMode::BulkUpsert => {
            let records: RecordsBulkUpsert = parse_request(reader)?;
            let existing = ExistingRecords::new();
            RecordsBulkUpsertValidator::new(&records, &existing).validate_for(dataset)
        }
    };

    report(writer, outcome)
}

fn report<W: Write>(writer: &mut W, outcome: RecordResult<()>) -> CliResult<()> {
    match outcome {
        Ok(()) => write_response_to(writer, json!({ "valid": true })),
        Err(err) => {
            tracing::info!(event = "RECORD_REJECTED", reason = %err);
            write_error_to(writer, err.status_code(), &err.to_string())
        }
    }
}

/// Import a rows file into a dataset
pub fn import(dataset_path: &Path, rows_path: &Path, take: Option<usize>, config: &Config) -> CliResult<()> {
    let dataset = load_dataset(dataset_path)?;
    let source = JsonlHubSource::open(rows_path)?;

    let mut hub = HubDataset::new(source).with_batch_size(config.import_batch_size);
    if let Some(n) = take {
        hub = hub.take(n);
    }

    let store = MemoryRecordStore::new();
    let summary = runtime()?.block_on(hub.import_to(&store, &dataset))?;
    let records = store
        .count(&dataset)
        .map_err(|e| CliError::import_failed(e.to_string()))?;

    write_response(json!({
        "dataset_id": dataset.id,
        "num_rows": hub.num_rows(),
        "imported_rows": summary.rows,
        "batches": summary.batches,
        "records": records,
    }))
}

/// Load a dataset definition from a JSON file
pub fn load_dataset(path: &Path) -> CliResult<Dataset> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::dataset_error(format!("Failed to read dataset: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::dataset_error(format!("Invalid dataset JSON: {}", e)))
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Field;
    use serde_json::Value;
    use tempfile::NamedTempFile;

    fn reviews() -> Dataset {
        Dataset::new("reviews").with_field(Field::text("text", true))
    }

    fn run_validate(mode: ValidateMode, request: &str) -> Value {
        let mut output = Vec::new();
        validate_request(&reviews(), mode, request.as_bytes(), &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_validate_valid_record() {
        let response = run_validate(ValidateMode::Create, r#"{"fields": {"text": "hi"}}"#);
        assert_eq!(response, json!({"status": "ok", "data": {"valid": true}}));
    }

    #[test]
    fn test_validate_invalid_record() {
        let response = run_validate(ValidateMode::Create, r#"{"fields": {}}"#);
        assert_eq!(
            response,
            json!({
                "status": "error",
                "code": 422,
                "message": "missing required value for field: 'text'"
            })
        );
    }

    #[test]
    fn test_validate_bulk_create_reports_position() {
        let response = run_validate(
            ValidateMode::BulkCreate,
            r#"{"items": [{"fields": {"text": "a"}}, {"fields": {"text": "b", "x": 1}}]}"#,
        );
        assert_eq!(response["code"], 422);
        assert_eq!(
            response["message"],
            "record at position 1 is not valid because found fields values for non configured fields: ['x']"
        );
    }

    #[test]
    fn test_validate_empty_request_is_cli_error() {
        let mut output = Vec::new();
        let err = validate_request(&reviews(), ValidateMode::Update, "".as_bytes(), &mut output).unwrap_err();
        assert!(err.message().contains("Empty input"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_load_dataset() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "reviews", "status": "ready", "fields": [{{"name": "text", "required": true, "settings": {{"type": "text"}}}}]}}"#
        )
        .unwrap();

        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.name, "reviews");
        assert_eq!(dataset.fields.len(), 1);
    }

    #[test]
    fn test_load_dataset_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_dataset(file.path()).unwrap_err();
        assert!(err.message().contains("Invalid dataset JSON"));
    }

    #[test]
    fn test_import_command() {
        let mut dataset = NamedTempFile::new().unwrap();
        write!(
            dataset,
            r#"{{"name": "apps", "status": "ready", "fields": [{{"name": "package_name", "required": true, "settings": {{"type": "text"}}}}]}}"#
        )
        .unwrap();

        let mut rows = NamedTempFile::new().unwrap();
        writeln!(rows, r#"{{"id": "a", "package_name": "com.a"}}"#).unwrap();
        writeln!(rows, r#"{{"id": "b", "package_name": "com.b"}}"#).unwrap();

        let config = Config::default();
        assert!(import(dataset.path(), rows.path(), Some(1), &config).is_ok());
    }

    #[test]
    fn test_import_command_unpublished_dataset() {
        let mut dataset = NamedTempFile::new().unwrap();
        write!(dataset, r#"{{"name": "apps", "status": "draft"}}"#).unwrap();
        let mut rows = NamedTempFile::new().unwrap();
        writeln!(rows, r#"{{"id": "a"}}"#).unwrap();

        let err = import(dataset.path(), rows.path(), None, &Config::default()).unwrap_err();
        assert!(err.message().contains("non published dataset"));
    }
}
