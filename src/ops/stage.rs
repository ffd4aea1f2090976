use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::SqlBackend;
use crate::credentials::CredentialProvider;
use crate::engine::RunContext;
use crate::error::TaskError;
use crate::task::Task;

/// JSONPaths value that asks the warehouse to derive the schema itself
/// instead of reading a paths file.
pub const AUTO_JSON_PATHS: &str = "auto";

/// Loads JSON files from the object store into a staging table.
///
/// Clears the staging table, then issues a bulk COPY for the resolved
/// source path. The object key may contain `{placeholder}` segments filled
/// from the run context, so each run can target its own data interval.
pub struct StageTask {
    backend: Arc<dyn SqlBackend>,
    credentials: Arc<dyn CredentialProvider>,
    credential_id: String,
    table: String,
    s3_bucket: String,
    s3_key: String,
    json_paths: String,
    region: String,
}

impl StageTask {
    pub fn new(
        backend: Arc<dyn SqlBackend>,
        credentials: Arc<dyn CredentialProvider>,
        table: impl Into<String>,
        s3_bucket: impl Into<String>,
        s3_key: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            credentials,
            credential_id: "aws_credentials".to_string(),
            table: table.into(),
            s3_bucket: s3_bucket.into(),
            s3_key: s3_key.into(),
            json_paths: AUTO_JSON_PATHS.to_string(),
            region: "us-west-2".to_string(),
        }
    }

    /// Bucket-relative key of the JSONPaths file, or [`AUTO_JSON_PATHS`].
    pub fn with_json_paths(mut self, value: impl Into<String>) -> Self {
        self.json_paths = value.into();
        self
    }

    pub fn with_region(mut self, value: impl Into<String>) -> Self {
        self.region = value.into();
        self
    }

    pub fn with_credential_id(mut self, value: impl Into<String>) -> Self {
        self.credential_id = value.into();
        self
    }

    fn copy_statement(
        &self,
        s3_path: &str,
        access_key: &str,
        secret_key: &str,
        json_paths: &str,
    ) -> String {
        format!(
            "COPY {}\n\
             FROM '{}'\n\
             ACCESS_KEY_ID '{}'\n\
             SECRET_ACCESS_KEY '{}'\n\
             FORMAT AS JSON '{}'\n\
             TIMEFORMAT AS 'epochmillisecs'\n\
             REGION '{}'",
            self.table, s3_path, access_key, secret_key, json_paths, self.region
        )
    }
}

#[async_trait]
impl Task for StageTask {
    async fn execute(&self, ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        debug!("Fetching credentials '{}'", self.credential_id);
        let credentials = self.credentials.get_credentials(&self.credential_id).await?;

        let s3_path = resolve_source_path(&self.s3_bucket, &self.s3_key, ctx)?;
        let json_paths = resolve_json_paths(&self.s3_bucket, &self.json_paths);

        info!("Clearing staging table '{}'", self.table);
        self.backend
            .execute(&format!("DELETE FROM {}", self.table))
            .await
            .map_err(|e| {
                TaskError::Load(format!("clearing staging table '{}': {}", self.table, e))
            })?;

        // The statement carries secrets, so it is never logged
        info!("Copying '{}' into staging table '{}'", s3_path, self.table);
        let copy = self.copy_statement(
            &s3_path,
            &credentials.access_key,
            &credentials.secret_key,
            &json_paths,
        );
        self.backend.execute(&copy).await.map_err(|e| {
            TaskError::Load(format!(
                "copy into '{}' from '{}': {}",
                self.table, s3_path, e
            ))
        })?;

        info!("Staged '{}' into '{}'", s3_path, self.table);
        Ok(())
    }
}

/// Expand `{placeholder}` segments in the object key and prefix the bucket.
///
/// Built-in placeholders are `ds` (logical date as YYYY-MM-DD), `ds_nodash`,
/// `execution_date` (RFC 3339) and `run_id`. Run parameters are also
/// available and shadow the built-ins on a name clash. An unknown
/// placeholder fails the task rather than staging from a wrong path.
pub(crate) fn resolve_source_path(
    bucket: &str,
    key_template: &str,
    ctx: &RunContext,
) -> Result<String, TaskError> {
    let rendered = render_template(key_template, &template_vars(ctx))?;
    Ok(format!("s3://{}/{}", bucket, rendered))
}

/// An explicit JSONPaths file lives in the same bucket; the auto sentinel
/// passes through untouched.
pub(crate) fn resolve_json_paths(bucket: &str, json_paths: &str) -> String {
    if json_paths == AUTO_JSON_PATHS {
        AUTO_JSON_PATHS.to_string()
    } else {
        format!("s3://{}/{}", bucket, json_paths)
    }
}

fn template_vars(ctx: &RunContext) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("ds".to_string(), ctx.logical_date().format("%Y-%m-%d").to_string());
    vars.insert(
        "ds_nodash".to_string(),
        ctx.logical_date().format("%Y%m%d").to_string(),
    );
    vars.insert("execution_date".to_string(), ctx.logical_date().to_rfc3339());
    vars.insert("run_id".to_string(), ctx.run_id().to_string());
    for (key, value) in ctx.parameters() {
        vars.insert(key.clone(), value.clone());
    }
    vars
}

fn render_template(template: &str, vars: &HashMap<String, String>) -> Result<String, TaskError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(TaskError::Load(format!(
                            "unresolved placeholder '{{{}}}' in object key '{}'",
                            name, template
                        )))
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                return Err(TaskError::Load(format!(
                    "unterminated placeholder in object key '{}'",
                    template
                )))
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}
