use serde_json::Value;

use crate::cli::{CallArgs, ConnectArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_error};
use crate::output::render_value;

pub(crate) async fn handle_call(
    ctx: &AppContext,
    args: CallArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let method = args.method.trim();
    if method.is_empty() {
        return Err(CliError::validation("method must not be empty"));
    }
    let params = parse_params(args.params.as_deref())?;

    if !args.no_auth {
        ctx.deluge
            .ensure_authenticated()
            .await
            .map_err(classify_error)?;
    }
    let result = ctx
        .deluge
        .call(method, params)
        .await
        .map_err(classify_error)?;
    render_value(&result, format)
}

pub(crate) async fn handle_connect(
    ctx: &AppContext,
    args: ConnectArgs,
    format: OutputFormat,
) -> CliResult<()> {
    ctx.deluge
        .ensure_authenticated()
        .await
        .map_err(classify_error)?;
    let result = ctx
        .deluge
        .connect(args.host)
        .await
        .map_err(classify_error)?;
    render_value(&result, format)
}

/// Positional parameters from a JSON array literal; absent means none.
pub(crate) fn parse_params(raw: Option<&str>) -> CliResult<Vec<Value>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(params)) => Ok(params),
        Ok(_) => Err(CliError::validation("params must be a JSON array")),
        Err(err) => Err(CliError::validation(format!(
            "params are not valid JSON: {err}"
        ))),
    }
}
