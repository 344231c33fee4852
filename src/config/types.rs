use serde::Deserialize;

/// Main configuration structure for Seq-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fields: FieldSelectors,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
}

/// Batch controller behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarvestConfig {
    /// First ID to fetch when not resuming
    #[serde(default = "default_start_id")]
    pub start_id: u64,

    /// Number of IDs fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Consecutive empty batches tolerated before probing liveness
    #[serde(default = "default_empty_batch_threshold")]
    pub empty_batch_threshold: u32,

    /// Resume after the last recorded ID instead of `start_id`
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Keep records with no data alongside populated ones
    #[serde(default = "default_true")]
    pub keep_empty: bool,

    /// Treat stored empty records as unknown so they are fetched again
    #[serde(default)]
    pub refetch_empty: bool,

    /// Sleep after rolling back on a dead liveness probe (seconds)
    #[serde(default = "default_rollback_cooldown_secs")]
    pub rollback_cooldown_secs: u64,

    /// Log fetch errors and retry the batch instead of terminating
    #[serde(default)]
    pub ignore_fetch_errors: bool,

    /// Sleep before retrying after an ignored fetch error (seconds)
    #[serde(default = "default_error_cooldown_secs")]
    pub error_cooldown_secs: u64,
}

/// Which transport retrieves the raw document for an ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Direct,
    Authenticated,
    Browser,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Authenticated => "authenticated",
            Self::Browser => "browser",
        }
    }
}

/// Remote source and transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Record view endpoint; the ID is passed as `editid1`
    pub base_url: String,

    /// Per-ID fetch timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Liveness probe timeout (milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// ID re-fetched by the liveness probe
    #[serde(default = "default_probe_id")]
    pub probe_id: u64,

    /// Login endpoint for the authenticated strategy
    #[serde(default)]
    pub login_url: Option<String>,

    /// Name of the session cookie issued by the login endpoint
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Clear browser cookies every N processed IDs (0 disables)
    #[serde(default = "default_rotate_interval")]
    pub rotate_credentials_interval: u64,

    /// How long the browser waits for the marker element (milliseconds)
    #[serde(default = "default_dom_timeout_ms")]
    pub dom_timeout_ms: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Persistence mode for committed batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Append,
    #[default]
    Overwrite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the CSV store
    #[serde(default = "default_output_file")]
    pub file: String,

    #[serde(default)]
    pub mode: OutputMode,

    /// Log intended writes instead of touching the store
    #[serde(default)]
    pub dry_run: bool,
}

/// CSS selectors locating each record field in a fetched document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldSelectors {
    #[serde(default = "default_first_name")]
    pub first_name: String,
    #[serde(default = "default_middle_name")]
    pub middle_name: String,
    #[serde(default = "default_last_name")]
    pub last_name: String,
    #[serde(default = "default_first_date")]
    pub first_date: String,
    #[serde(default = "default_second_date")]
    pub second_date: String,
    #[serde(default = "default_category")]
    pub category: String,
}

/// Login form parameters (HTTP) and element selectors (browser)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginConfig {
    #[serde(default = "default_username_param")]
    pub username: String,
    #[serde(default = "default_password_param")]
    pub password: String,
    #[serde(default = "default_submit_param")]
    pub submit_param: String,
    #[serde(default = "default_submit_value")]
    pub submit_value: String,

    #[serde(default = "default_username_selector")]
    pub username_selector: String,
    #[serde(default = "default_password_selector")]
    pub password_selector: String,
    #[serde(default)]
    pub remember_selector: Option<String>,
    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,
}

/// An operator-supplied account used by the authenticated strategies
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    pub username: String,
    pub password: String,
}

fn default_true() -> bool {
    true
}
fn default_start_id() -> u64 {
    1
}
fn default_batch_size() -> u32 {
    8
}
fn default_empty_batch_threshold() -> u32 {
    4
}
fn default_rollback_cooldown_secs() -> u64 {
    60
}
fn default_error_cooldown_secs() -> u64 {
    300
}
fn default_timeout_ms() -> u64 {
    2_000
}
fn default_probe_timeout_ms() -> u64 {
    10_000
}
fn default_probe_id() -> u64 {
    1
}
fn default_session_cookie() -> String {
    "PHPSESSID".to_string()
}
fn default_rotate_interval() -> u64 {
    100
}
fn default_dom_timeout_ms() -> u64 {
    5_000
}
fn default_output_file() -> String {
    "results.csv".to_string()
}
fn default_first_name() -> String {
    "#first_name".to_string()
}
fn default_middle_name() -> String {
    "#middle_name".to_string()
}
fn default_last_name() -> String {
    "#last_name".to_string()
}
fn default_first_date() -> String {
    "#first_date".to_string()
}
fn default_second_date() -> String {
    "#second_date".to_string()
}
fn default_category() -> String {
    "#category".to_string()
}
fn default_username_param() -> String {
    "username".to_string()
}
fn default_password_param() -> String {
    "password".to_string()
}
fn default_submit_param() -> String {
    "submit".to_string()
}
fn default_submit_value() -> String {
    "Login".to_string()
}
fn default_username_selector() -> String {
    "#username".to_string()
}
fn default_password_selector() -> String {
    "#password".to_string()
}
fn default_submit_selector() -> String {
    "button[type='submit']".to_string()
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_id: default_start_id(),
            batch_size: default_batch_size(),
            empty_batch_threshold: default_empty_batch_threshold(),
            resume: true,
            keep_empty: true,
            refetch_empty: false,
            rollback_cooldown_secs: default_rollback_cooldown_secs(),
            ignore_fetch_errors: false,
            error_cooldown_secs: default_error_cooldown_secs(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Direct,
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_id: default_probe_id(),
            login_url: None,
            session_cookie: default_session_cookie(),
            rotate_credentials_interval: default_rotate_interval(),
            dom_timeout_ms: default_dom_timeout_ms(),
            user_agent: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            mode: OutputMode::Overwrite,
            dry_run: false,
        }
    }
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            first_name: default_first_name(),
            middle_name: default_middle_name(),
            last_name: default_last_name(),
            first_date: default_first_date(),
            second_date: default_second_date(),
            category: default_category(),
        }
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            username: default_username_param(),
            password: default_password_param(),
            submit_param: default_submit_param(),
            submit_value: default_submit_value(),
            username_selector: default_username_selector(),
            password_selector: default_password_selector(),
            remember_selector: None,
            submit_selector: default_submit_selector(),
        }
    }
}

impl FieldSelectors {
    /// Selector strings paired with the record field they fill
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("first_name", &self.first_name),
            ("middle_name", &self.middle_name),
            ("last_name", &self.last_name),
            ("first_date", &self.first_date),
            ("second_date", &self.second_date),
            ("category", &self.category),
        ]
    }
}
