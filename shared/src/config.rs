//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
///
/// Every function reads the same variables; each one only requires the
/// values it actually uses, through the accessors below.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Table holding survey definitions
    pub surveys_config_table: Option<String>,
    /// Table holding survey results
    pub surveys_results_table: Option<String>,
    /// Contact flow that receives review tasks
    pub contact_flow_id: Option<String>,
    /// Connect instance alias, used to build contact trace record links
    pub instance_name: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Single-table functions are deployed with a plain `TABLE` variable, which
    /// is used when the specific table variable is absent.
    pub fn from_env() -> Self {
        let table = env::var("TABLE").ok();

        Self {
            surveys_config_table: env::var("TABLE_SURVEYS_CONFIG").ok().or_else(|| table.clone()),
            surveys_results_table: env::var("TABLE_SURVEYS_RESULTS").ok().or(table),
            contact_flow_id: env::var("CONTACT_FLOW_ID").ok(),
            instance_name: env::var("INSTANCE_NAME").ok(),
        }
    }

    pub fn config_table(&self) -> Result<&str> {
        required(&self.surveys_config_table, "TABLE_SURVEYS_CONFIG")
    }

    pub fn results_table(&self) -> Result<&str> {
        required(&self.surveys_results_table, "TABLE_SURVEYS_RESULTS")
    }

    pub fn contact_flow_id(&self) -> Result<&str> {
        required(&self.contact_flow_id, "CONTACT_FLOW_ID")
    }

    pub fn instance_name(&self) -> Result<&str> {
        required(&self.instance_name, "INSTANCE_NAME")
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::Config(format!("{} not set", name)))
}
