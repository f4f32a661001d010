use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Process-start configuration for the query core (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCoreConfig {
    pub query: QueryConfig,
    pub base: BaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// `timeseries_query_max_quanta_span`: upper bound on the number of
    /// sub-queries a single compile may expand into.
    pub max_quanta_span: u32,

    /// Per sub-query storage deadline, in milliseconds (default 10 000).
    pub sub_query_timeout_ms: u64,

    /// Polling ceiling while waiting for a table to finish activating, in
    /// seconds (default 30).
    pub activation_wait_secs: u64,

    /// Storage retry budget for a single sub-query dispatch (default 10).
    pub fetch_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// 日志输出路径
    pub log_dir: Option<String>,
}

impl Default for QueryCoreConfig {
    fn default() -> Self {
        QueryCoreConfig {
            query: QueryConfig::default(),
            base: BaseConfig::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            max_quanta_span: 5,
            sub_query_timeout_ms: 10_000,
            activation_wait_secs: 30,
            fetch_retries: 10,
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            log_dir: Some(String::from("/tmp/query_core/logs")),
        }
    }
}

impl BaseConfig {
    pub fn get_log_dir(&self) -> Option<String> {
        self.log_dir.clone()
    }
}

/// 读取指定路径下的配制文件信息
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<QueryCoreConfig, QueryError> {
    let mut file = File::open(path.as_ref())
        .map_err(|e| QueryError::InvalidQuery(format!("config file open failed: {e}")))?;
    let mut s = String::new();

    let _ = file.read_to_string(&mut s);
    toml::from_str(s.as_str()).map_err(|e| QueryError::InvalidQuery(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = QueryCoreConfig::default();
        assert_eq!(cfg.query.sub_query_timeout_ms, 10_000);
        assert_eq!(cfg.query.activation_wait_secs, 30);
        assert_eq!(cfg.query.fetch_retries, 10);
    }

    #[test]
    fn reads_toml_file() {
        let dir = std::env::temp_dir().join("query_core_test_config.toml");
        std::fs::write(
            &dir,
            "[query]\nmax_quanta_span = 3\nsub_query_timeout_ms = 5000\nactivation_wait_secs = 10\nfetch_retries = 2\n[base]\nlog_dir = \"/tmp/x\"\n",
        )
        .unwrap();
        let cfg = read_config(&dir).unwrap();
        assert_eq!(cfg.query.max_quanta_span, 3);
        let _ = std::fs::remove_file(&dir);
    }
}
