//! Entry points shared by the `simple_validator` and `validate_ipxact` binaries.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use crate::cli::{CommonArgs, IpxactCli, SimpleCli, VerbosityLevel};
use crate::config::ConfigManager;
use crate::error_reporter::ErrorReporter;
use crate::external_tool::ExternalValidator;
use crate::http_client::AsyncHttpClient;
use crate::logging;
use crate::output::Output;
use crate::validator::{IpxactValidator, ValidationProgress, ValidationResult};

pub const SIMPLE_SCHEMA_DIR: &str = "schema";
pub const IPXACT_SCHEMA_DIR: &str = "ipxact_schema";

/// A configured validator plus the output it reports through
pub struct Session {
    pub output: Arc<Output>,
    pub validator: IpxactValidator<AsyncHttpClient>,
}

/// Load configuration, install logging and build the validator.
///
/// Failures are reported on stderr; `None` means the process should exit with failure.
pub async fn start(tool: &str, args: &CommonArgs, default_schema_dir: &str) -> Option<Session> {
    let config = match ConfigManager::load_config(args).await {
        Ok(config) => config,
        Err(e) => {
            ErrorReporter::new(VerbosityLevel::from_flags(args.verbose, args.quiet))
                .report_config_error(&e);
            return None;
        }
    };

    let verbosity = config.verbosity();
    logging::init(verbosity);

    let client = match AsyncHttpClient::new(config.http_client_config()) {
        Ok(client) => client,
        Err(e) => {
            ErrorReporter::new(verbosity).report_startup_error(&e);
            return None;
        }
    };

    let output = Arc::new(Output::new(verbosity));
    let progress_output = Arc::clone(&output);
    let validator = IpxactValidator::new(
        client,
        config.validator_config(Path::new(default_schema_dir)),
    )
    .with_external_validator(ExternalValidator::new(config.validation.xmllint.clone()))
    .with_progress(Arc::new(move |progress: ValidationProgress| {
        progress_output.print_progress(&progress)
    }));

    output.print_banner(tool, validator.library_version());
    tracing::debug!(config = ?validator.config(), "validator ready");

    Some(Session { output, validator })
}

fn exit_code(result: &ValidationResult) -> ExitCode {
    ExitCode::from(result.exit_code())
}

/// Schema validation with content-check fallback
pub async fn run_simple(cli: SimpleCli) -> ExitCode {
    let Some(session) = start("simple_validator", &cli.common, SIMPLE_SCHEMA_DIR).await else {
        return ExitCode::FAILURE;
    };

    if !cli.xml_file.exists() {
        println!("{}", session.output.format_file_not_found(&cli.xml_file));
        return ExitCode::FAILURE;
    }

    let result = session.validator.validate_xml_file(&cli.xml_file).await;
    session.output.print_result(&result);
    exit_code(&result)
}

/// Strict IP-XACT validation
pub async fn run_ipxact(cli: IpxactCli) -> ExitCode {
    let Some(session) = start("validate_ipxact", &cli.common, IPXACT_SCHEMA_DIR).await else {
        return ExitCode::FAILURE;
    };

    let xml = match tokio::fs::read_to_string(&cli.xml_file).await {
        Ok(xml) => xml,
        Err(e) => {
            println!("{}", session.output.format_read_error(&e));
            return ExitCode::FAILURE;
        }
    };

    let result = session.validator.validate_ipxact_component(&xml).await;
    session.output.print_result(&result);
    exit_code(&result)
}
