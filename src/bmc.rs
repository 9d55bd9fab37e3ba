//! Pushes the BMC network settings the inspection service assigns to this
//! machine into the BMC, then tells the service they are in place.

use crate::collectors;
use crate::config::{InspectionConfig, ToolsConfig};
use crate::executor::{stdout_string, BoxedExecutor, ExecutionError};
use crate::managers::HostFacts;
use crate::util::failures::AccumulatedFailures;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use slog::{info, warn, Logger};
use std::process::Command;
use std::time::Duration;

const CALLBACK_SUFFIX: &str = "/v1/continue";
const CURL_TIMEOUT_SECS: &str = "10";

#[derive(thiserror::Error, Debug)]
pub enum BmcError {
    #[error("reading host facts: {0}")]
    HostFacts(#[from] collectors::Error),

    #[error("failed to run ipmitool or curl: {0}")]
    Execution(#[from] ExecutionError),

    #[error("unexpected response from inspection service: {0}")]
    Response(String),
}

/// Network settings assigned to a BMC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BmcSettings {
    pub ip_address: String,
    pub netmask:    String,
    pub gateway:    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The service has no settings for this machine.
    Unassigned,
    AlreadySet,
    Updated,
}

pub struct BmcSetter {
    exec:         BoxedExecutor,
    host:         HostFacts,
    ipmitool:     String,
    curl:         String,
    callback_url: String,
    retries:      u32,
    interval:     Duration,
    log:          Logger,
}

impl BmcSetter {
    pub fn new(
        exec: BoxedExecutor,
        tools: &ToolsConfig,
        inspection: &InspectionConfig,
        log: &Logger,
    ) -> Self {
        let log = log.new(slog::o!("component" => "bmc"));
        Self {
            host:         HostFacts::new(exec.clone(), tools, &log),
            exec,
            ipmitool:     tools.ipmitool.clone(),
            curl:         tools.curl.clone(),
            callback_url: inspection.callback_url.clone(),
            retries:      inspection.bmc_retries,
            interval:     Duration::from_secs(inspection.bmc_retry_interval_sec),
            log,
        }
    }

    /// Record the outcome in `data["set_ipmi"]["result"]`. A failure on the
    /// last attempt goes into `failures` instead of being returned.
    pub fn set_bm_ipmi(&self, data: &mut Map<String, Value>, failures: &mut AccumulatedFailures) {
        data.insert("set_ipmi".to_string(), json!({ "result": false }));

        let attempts = self.retries + 1;
        for attempt in 1..=attempts {
            match self.attempt() {
                Ok(outcome) => {
                    info!(self.log, "bmc update finished";
                        "attempt" => attempt, "outcome" => ?outcome);
                    if outcome != Outcome::Unassigned {
                        data.insert("set_ipmi".to_string(), json!({ "result": true }));
                    }
                    return;
                }
                Err(e) if attempt < attempts => {
                    warn!(self.log, "bmc update failed, retrying";
                        "attempt" => attempt, "error" => %e,
                        "retry_in_secs" => self.interval.as_secs());
                    std::thread::sleep(self.interval);
                }
                Err(e) => {
                    warn!(self.log, "bmc update failed"; "attempts" => attempts, "error" => %e);
                    failures.add(format_args!("failed to set bmc address: {}", e));
                }
            }
        }
    }

    fn attempt(&self) -> Result<Outcome, BmcError> {
        let serial = self.host.system_vendor()?.serial_number;
        let current = self.host.bmc_address()?;
        let url = format!("{}/v1/bmc/{}", inspection_host(&self.callback_url), serial);

        let body = self.http_get(&url)?;
        let settings = match parse_settings(&body)? {
            Some(s) => s,
            None => {
                info!(self.log, "no bmc settings assigned"; "serial" => &serial);
                return Ok(Outcome::Unassigned);
            }
        };
        if settings.ip_address == current {
            return Ok(Outcome::AlreadySet);
        }

        info!(self.log, "updating bmc network";
            "from" => &current, "to" => &settings.ip_address);
        self.ipmitool(&["lan", "set", "1", "ipsrc", "static"])?;
        self.ipmitool(&["lan", "set", "1", "ipaddr", &settings.ip_address])?;
        self.ipmitool(&["lan", "set", "1", "netmask", &settings.netmask])?;
        self.ipmitool(&["lan", "set", "1", "defgw", "ipaddr", &settings.gateway])?;
        self.http_post(&url, &json!({ "has_set": true }))?;
        Ok(Outcome::Updated)
    }

    fn ipmitool(&self, args: &[&str]) -> Result<(), ExecutionError> {
        let mut cmd = Command::new(&self.ipmitool);
        cmd.args(args);
        self.exec.execute(&mut cmd)?;
        Ok(())
    }

    fn http_get(&self, url: &str) -> Result<String, ExecutionError> {
        let mut cmd = Command::new(&self.curl);
        cmd.args(["-sSf", "--max-time", CURL_TIMEOUT_SECS, url]);
        Ok(stdout_string(&self.exec.execute(&mut cmd)?))
    }

    fn http_post(&self, url: &str, body: &Value) -> Result<(), ExecutionError> {
        let payload = body.to_string();
        let mut cmd = Command::new(&self.curl);
        cmd.args([
            "-sSf", "--max-time", CURL_TIMEOUT_SECS,
            "-X", "POST",
            "-H", "Content-Type: application/json",
            "-d", &payload,
            url,
        ]);
        self.exec.execute(&mut cmd)?;
        Ok(())
    }
}

/// "http://10.0.0.1:5050/v1/continue" → "http://10.0.0.1:5050"
pub fn inspection_host(callback_url: &str) -> &str {
    callback_url
        .split(CALLBACK_SUFFIX)
        .next()
        .unwrap_or(callback_url)
}

/// An empty body, `null` or `{}` means nothing is assigned.
fn parse_settings(body: &str) -> Result<Option<BmcSettings>, BmcError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| BmcError::Response(format!("not JSON: {}", e)))?;
    match &value {
        Value::Null => Ok(None),
        Value::Object(m) if m.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BmcError::Response(e.to_string())),
    }
}
