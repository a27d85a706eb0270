// # sweb-hook - ACME manual hook for SpaceWeb DNS
//
// Thin integration layer: reads the environment, logs in to the panel and
// hands the challenge to `ChallengeEngine`. All DNS logic lives in
// `sweb-core`, all panel protocol details in `sweb-client`.
//
// ## Modes (first argument)
//
// - `auth`: publish `CERTBOT_VALIDATION` at `_acme-challenge.<CERTBOT_DOMAIN>`,
//   then wait `SWEB_PROPAGATION_SECONDS` once the last challenge is published
// - `cleanup`: remove the record published by `auth`
// - `list`: print every record of the zone
// - `check`: add, find and delete a random TXT value at `_test-challenge`
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Panel
// - `SWEB_USERNAME`: Panel login (required)
// - `SWEB_PASSWORD`: Panel password (required)
// - `SWEB_USER_AGENT`: User-Agent header (optional)
//
// ### Challenge
// - `SWEB_ZONE`: Zone apex (defaults to `CERTBOT_DOMAIN`)
// - `SWEB_DROP_STALE`: Remove old challenge records before publishing (default: false)
// - `SWEB_PROPAGATION_SECONDS`: Wait after publishing (default: 1200)
// - `SWEB_PACING_SECS`: Base delay before every request (default: 5)
// - `SWEB_PACING_JITTER`: Jitter as a fraction of the base delay (default: 1.15)
//
// ### Certbot session
// Certbot runs the hook once per challenge. `CERTBOT_REMAINING_CHALLENGES`
// and `CERTBOT_ALL_DOMAINS` tell the runs of one session apart:
// - only the first `auth` run sweeps stale records, for every validation
//   name of the session, so later runs never delete a sibling challenge
// - only the last `auth` run waits for propagation
//
// ### Logging
// - `SWEB_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export SWEB_USERNAME=u1234
// export SWEB_PASSWORD=secret
// certbot certonly --manual --preferred-challenges dns \
//     --manual-auth-hook "sweb-hook auth" \
//     --manual-cleanup-hook "sweb-hook cleanup" \
//     -d example.com -d '*.example.com'
// ```

use anyhow::{Context, Result};
use rand::Rng;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use sweb_client::{SwebApi, SwebClient};
use sweb_core::config::{PacingConfig, SwebConfig};
use sweb_core::record::RecordType;
use sweb_core::{ChallengeEngine, EngineEvent, Pacer, TxtEdit};
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Label prefix of ACME validation records
const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Label used by the `check` round trip
const CHECK_LABEL: &str = "_test-challenge";

/// Exit codes
///
/// - 0: Success
/// - 1: Configuration error
/// - 2: Runtime error (login, transport or panel failure)
#[derive(Debug, Clone, Copy)]
enum HookExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<HookExitCode> for ExitCode {
    fn from(code: HookExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// What the hook was invoked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Auth,
    Cleanup,
    List,
    Check,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auth" => Ok(Mode::Auth),
            "cleanup" => Ok(Mode::Cleanup),
            "list" => Ok(Mode::List),
            "check" => Ok(Mode::Check),
            other => anyhow::bail!(
                "Unknown mode '{}'. Valid modes: auth, cleanup, list, check",
                other
            ),
        }
    }
}

/// Hook configuration
struct Config {
    mode: Mode,
    sweb: SwebConfig,
    zone: Option<String>,
    certbot_domain: Option<String>,
    certbot_validation: Option<String>,
    remaining_challenges: Option<usize>,
    all_domains: Vec<String>,
    log_level: String,
}

/// What an `auth` run does around publishing its challenge
#[derive(Debug, PartialEq, Eq)]
struct AuthPlan {
    /// Validation names swept before publishing
    sweep: Vec<String>,
    /// Propagation wait after publishing
    wait: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("sweb", &self.sweb)
            .field("zone", &self.zone)
            .field("certbot_domain", &self.certbot_domain)
            .field("remaining_challenges", &self.remaining_challenges)
            .field("all_domains", &self.all_domains)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from the command line and environment variables
    fn from_env() -> Result<Self> {
        let mode = env::args()
            .nth(1)
            .context("Missing mode argument. Usage: sweb-hook <auth|cleanup|list|check>")?;
        Self::from_lookup(&mode, |name| env::var(name).ok())
    }

    /// Load configuration through `lookup`
    fn from_lookup(mode: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut sweb = SwebConfig::new(
            lookup("SWEB_USERNAME").unwrap_or_default(),
            lookup("SWEB_PASSWORD").unwrap_or_default(),
        );
        sweb.credentials.user_agent = non_empty("SWEB_USER_AGENT");

        if let Some(raw) = non_empty("SWEB_DROP_STALE") {
            sweb.challenge.drop_stale_records = parse_bool("SWEB_DROP_STALE", &raw)?;
        }
        if let Some(raw) = non_empty("SWEB_PROPAGATION_SECONDS") {
            sweb.challenge.propagation_seconds = parse_number("SWEB_PROPAGATION_SECONDS", &raw)?;
        }
        sweb.challenge.pacing = PacingConfig {
            base_secs: match non_empty("SWEB_PACING_SECS") {
                Some(raw) => parse_number("SWEB_PACING_SECS", &raw)?,
                None => sweb.challenge.pacing.base_secs,
            },
            jitter: match non_empty("SWEB_PACING_JITTER") {
                Some(raw) => parse_number("SWEB_PACING_JITTER", &raw)?,
                None => sweb.challenge.pacing.jitter,
            },
        };

        let remaining_challenges = match non_empty("CERTBOT_REMAINING_CHALLENGES") {
            Some(raw) => Some(parse_number("CERTBOT_REMAINING_CHALLENGES", &raw)?),
            None => None,
        };
        let all_domains = non_empty("CERTBOT_ALL_DOMAINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            mode: mode.parse()?,
            sweb,
            zone: non_empty("SWEB_ZONE"),
            certbot_domain: non_empty("CERTBOT_DOMAIN"),
            certbot_validation: non_empty("CERTBOT_VALIDATION"),
            remaining_challenges,
            all_domains,
            log_level: lookup("SWEB_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.sweb.credentials.username.is_empty() {
            anyhow::bail!(
                "SWEB_USERNAME is required. \
                Set it via: export SWEB_USERNAME=your_login"
            );
        }
        if self.sweb.credentials.password.is_empty() {
            anyhow::bail!(
                "SWEB_PASSWORD is required. \
                Set it via: export SWEB_PASSWORD=your_password"
            );
        }

        self.sweb.validate()?;

        match self.mode {
            Mode::Auth | Mode::Cleanup => {
                if self.certbot_domain.is_none() {
                    anyhow::bail!("CERTBOT_DOMAIN is required in {:?} mode", self.mode);
                }
                if self.certbot_validation.is_none() {
                    anyhow::bail!("CERTBOT_VALIDATION is required in {:?} mode", self.mode);
                }
            }
            Mode::List | Mode::Check => {
                if self.zone().is_none() {
                    anyhow::bail!("SWEB_ZONE or CERTBOT_DOMAIN is required in {:?} mode", self.mode);
                }
            }
        }

        if let Some(zone) = self.zone()
            && let Some(domain) = &self.certbot_domain
            && !in_zone(domain, zone)
        {
            anyhow::bail!(
                "CERTBOT_DOMAIN '{}' is not inside SWEB_ZONE '{}'",
                domain,
                zone
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SWEB_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Zone apex to operate on
    fn zone(&self) -> Option<&str> {
        self.zone.as_deref().or(self.certbot_domain.as_deref())
    }

    /// `(zone, validation name, token)` of the ACME challenge
    fn challenge(&self) -> Result<(String, String, String)> {
        let zone = self.zone().context("No zone configured")?;
        let domain = self
            .certbot_domain
            .as_deref()
            .context("CERTBOT_DOMAIN is not set")?;
        let token = self
            .certbot_validation
            .as_deref()
            .context("CERTBOT_VALIDATION is not set")?;

        Ok((
            zone.to_string(),
            format!("{}.{}", ACME_CHALLENGE_LABEL, domain),
            token.to_string(),
        ))
    }

    /// Decide what the `auth` run sweeps and how long it waits
    ///
    /// Without certbot's session variables the run is treated as a session
    /// of its own. When the session cannot be placed (remaining count without
    /// the domain list), nothing is swept.
    fn auth_plan(&self) -> Result<AuthPlan> {
        let (zone, validation_name, _) = self.challenge()?;

        let first_run = match self.remaining_challenges {
            None => true,
            Some(remaining) => remaining + 1 == self.all_domains.len(),
        };

        let sweep = if !self.sweb.challenge.drop_stale_records || !first_run {
            Vec::new()
        } else if self.remaining_challenges.is_none() {
            vec![validation_name]
        } else {
            let mut names = vec![validation_name];
            for domain in &self.all_domains {
                let domain = domain.strip_prefix("*.").unwrap_or(domain);
                let name = format!("{}.{}", ACME_CHALLENGE_LABEL, domain);
                if in_zone(domain, &zone) && !names.contains(&name) {
                    names.push(name);
                }
            }
            names
        };

        let last_run = self.remaining_challenges.unwrap_or(0) == 0;
        let seconds = self.sweb.challenge.propagation_seconds;
        let wait = (last_run && seconds > 0).then(|| Duration::from_secs(seconds));

        Ok(AuthPlan { sweep, wait })
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Check whether `domain` is the zone apex or below it
fn in_zone(domain: &str, zone: &str) -> bool {
    domain == zone || domain.ends_with(&format!(".{}", zone))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean (true/false). Got: {}", name, raw),
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{} must be a number. Got: {} ({})", name, raw, e))
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return HookExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return HookExitCode::ConfigError.into();
    }

    // Logs go to stderr; `list` prints the zone on stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HookExitCode::ConfigError.into();
    }

    debug!(?config, "Configuration loaded");

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HookExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(config).await {
            error!("Hook failed: {:#}", e);
            HookExitCode::RuntimeError
        } else {
            HookExitCode::Success
        }
    });

    result.into()
}

/// Log in and run the selected mode
async fn run(config: Config) -> Result<()> {
    info!(mode = ?config.mode, "Authenticating on SpaceWeb");
    let client = SwebClient::from_config(&config.sweb)?;
    client.login().await.context("Panel login failed")?;
    let api = SwebApi::new(client);

    match config.mode {
        Mode::Auth => {
            let (zone, validation_name, token) = config.challenge()?;
            let plan = config.auth_plan()?;
            debug!(?plan, "Auth plan");

            // The sweep is driven by the plan; the engine itself never sweeps here
            let mut challenge = config.sweb.challenge.clone();
            challenge.drop_stale_records = false;
            let (mut engine, mut events) = ChallengeEngine::new(Box::new(api), challenge)?;

            let mut stale_removed = 0;
            for name in &plan.sweep {
                stale_removed += engine.drop_stale(&zone, name).await?;
            }

            let outcome = engine.publish(&zone, &validation_name, &token).await?;
            log_events(&mut events);
            info!(
                subdomain = %outcome.subdomain,
                stale_removed,
                "Challenge published"
            );

            match plan.wait {
                Some(wait) => {
                    info!("Waiting {}s for DNS propagation", wait.as_secs());
                    tokio::time::sleep(wait).await;
                }
                None => info!(
                    remaining = ?config.remaining_challenges,
                    "More challenges pending, not waiting for propagation yet"
                ),
            }
        }
        Mode::Cleanup => {
            let (zone, validation_name, token) = config.challenge()?;
            let (mut engine, mut events) =
                ChallengeEngine::new(Box::new(api), config.sweb.challenge.clone())?;

            if !engine.cleanup(&zone, &validation_name, &token).await? {
                warn!("Nothing to clean up for {}", validation_name);
            }
            log_events(&mut events);
        }
        Mode::List => {
            let zone = config.zone().context("No zone configured")?;
            for record in api.domains_dns_info(zone).await? {
                println!(
                    "{}\t{}\t{}",
                    record.category(),
                    record.label().unwrap_or("-"),
                    record.value().unwrap_or("-")
                );
            }
        }
        Mode::Check => {
            let zone = config.zone().context("No zone configured")?;
            check_round_trip(&api, zone, Pacer::new(config.sweb.challenge.pacing)).await?;
        }
    }

    Ok(())
}

/// Add, find and delete a random TXT value
async fn check_round_trip(api: &SwebApi, zone: &str, pacer: Pacer) -> Result<()> {
    let value = rand::thread_rng().gen_range(100_000_000u32..1_000_000_000).to_string();

    info!("Adding TXT record for {}.{}", CHECK_LABEL, zone);
    pacer.pause().await;
    let status = api
        .domains_dns_edit_txt(
            zone,
            &TxtEdit::Add {
                subdomain: CHECK_LABEL.to_string(),
                value: value.clone(),
            },
        )
        .await?;
    info!(%status, "Add answered");

    pacer.pause().await;
    let record = api
        .domains_dns_info_find(zone, CHECK_LABEL, RecordType::Txt, None)
        .await?
        .into_iter()
        .find(|record| record.value() == Some(value.as_str()))
        .context("Added TXT record not found in the zone listing")?;
    let index = record
        .index()
        .cloned()
        .context("Added TXT record has no index")?;

    info!("Deleting TXT record {}", index);
    pacer.pause().await;
    let status = api
        .domains_dns_edit_txt(
            zone,
            &TxtEdit::Delete {
                subdomain: CHECK_LABEL.to_string(),
                index,
            },
        )
        .await?;
    info!(%status, "Delete answered");

    Ok(())
}

/// Log the events emitted by the engine so far
fn log_events(events: &mut mpsc::Receiver<EngineEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::StaleRecordRemoved {
                subdomain, value, ..
            } => info!(%subdomain, %value, "Removed stale TXT record"),
            EngineEvent::ChallengePublished { subdomain, .. } => {
                info!(%subdomain, "Published challenge TXT record")
            }
            EngineEvent::ChallengeRemoved { subdomain, .. } => {
                info!(%subdomain, "Removed challenge TXT record")
            }
            EngineEvent::ChallengeNotFound { subdomain, .. } => {
                warn!(%subdomain, "Challenge TXT record not found")
            }
        }
    }
}
