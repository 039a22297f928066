#![forbid(unsafe_code)]

pub mod codec;
pub mod compare;
pub mod fingerprint;
pub mod model;
pub mod registry;
pub mod shape_check;
pub mod topics;

pub use codec::{JsonLoopbackCodec, WireCodec};
pub use compare::{Mismatch, StructuralEq, Tolerance};
pub use registry::{Sample, TopicHandler, TopicRegistry, lookup, registry};
pub use topics::TopicRecord;

use crate::fingerprint::{sample_fingerprint, wire_b64};
use rtc_runtime::{LifecycleLedger, ValidationMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub const VALIDATION_MODE_ENV: &str = "RTC_VALIDATION_MODE";
pub const ROUNDTRIP_LOG_PATH_ENV: &str = "RTC_ROUNDTRIP_LOG_PATH";
pub const SEED_PLAN_FIXTURE: &str = "roundtrip_seed_plan.json";

/// Seeds every suite runs unless the config narrows them.
pub const DEFAULT_SEEDS: [i32; 12] = [0, 1, 2, 3, 5, 6, 7, 11, 42, 99, 1000, 123_456];

pub const ROUNDTRIP_REASON_CODES: [&str; 7] = [
    "roundtrip_ok",
    "roundtrip_generation_defect",
    "roundtrip_validation_mismatch",
    "roundtrip_comparison_mismatch",
    "roundtrip_unknown_type",
    "roundtrip_codec_failure",
    "roundtrip_sample_type_mismatch",
];

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    pub seeds: Vec<i32>,
    pub mode: ValidationMode,
    pub tolerance: Tolerance,
    /// Registered type names to run; empty runs every topic.
    pub type_filter: Vec<String>,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            seeds: DEFAULT_SEEDS.to_vec(),
            mode: mode_from_env().unwrap_or_default(),
            tolerance: Tolerance::default(),
            type_filter: Vec::new(),
        }
    }

    /// Handlers selected by `type_filter`, in registration order.
    pub fn selected_handlers(&self) -> Result<Vec<&'static TopicHandler>, HarnessError> {
        if self.type_filter.is_empty() {
            return Ok(registry().handlers().iter().collect());
        }
        for name in &self.type_filter {
            lookup(name)?;
        }
        Ok(registry()
            .handlers()
            .iter()
            .filter(|handler| self.type_filter.iter().any(|name| name == handler.name()))
            .collect())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

fn mode_from_env() -> Option<ValidationMode> {
    std::env::var(VALIDATION_MODE_ENV)
        .ok()
        .and_then(|raw| ValidationMode::parse(&raw))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub case_count: usize,
    pub pass_count: usize,
    pub failures: Vec<String>,
}

impl SuiteReport {
    fn new(suite: &'static str) -> Self {
        Self {
            suite,
            case_count: 0,
            pass_count: 0,
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }

    fn record(&mut self, case_id: &str, outcome: &CaseOutcome) {
        self.case_count += 1;
        if outcome.passed {
            self.pass_count += 1;
        } else {
            self.failures.push(format!(
                "{case_id}: reason_code={} {}",
                outcome.reason_code, outcome.detail
            ));
        }
    }

    fn record_logged(&mut self, ctx: &CaseContext<'_>, outcome: &CaseOutcome) -> Result<(), String> {
        self.record(&ctx.fixture_id, outcome);
        ctx.log(outcome)
    }

    fn check_ledger(&mut self, ledger: &LifecycleLedger) {
        if !ledger.is_balanced() {
            self.failures.push(format!(
                "lifecycle ledger unbalanced: outstanding={:?} over_released={:?}",
                ledger.outstanding(),
                ledger.over_released()
            ));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// A generated instance does not conform to its own descriptor.
    Generation {
        type_name: &'static str,
        seed: i32,
        detail: String,
    },
    Validation {
        type_name: &'static str,
        seed: i32,
        mismatch: Mismatch,
    },
    Comparison {
        type_name: &'static str,
        seed: Option<i32>,
        mismatch: Mismatch,
    },
    UnknownType {
        name: String,
    },
    Codec {
        type_name: &'static str,
        codec: &'static str,
        stage: &'static str,
        detail: String,
    },
    SampleTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl HarnessError {
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Generation { .. } => "roundtrip_generation_defect",
            Self::Validation { .. } => "roundtrip_validation_mismatch",
            Self::Comparison { .. } => "roundtrip_comparison_mismatch",
            Self::UnknownType { .. } => "roundtrip_unknown_type",
            Self::Codec { .. } => "roundtrip_codec_failure",
            Self::SampleTypeMismatch { .. } => "roundtrip_sample_type_mismatch",
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation {
                type_name,
                seed,
                detail,
            } => write!(f, "{type_name} seed={seed}: generated instance violates descriptor: {detail}"),
            Self::Validation {
                type_name,
                seed,
                mismatch,
            } => write!(f, "{type_name} seed={seed}: validation failed at {mismatch}"),
            Self::Comparison {
                type_name,
                seed: Some(seed),
                mismatch,
            } => write!(f, "{type_name} seed={seed}: comparison failed at {mismatch}"),
            Self::Comparison {
                type_name,
                seed: None,
                mismatch,
            } => write!(f, "{type_name}: comparison failed at {mismatch}"),
            Self::UnknownType { name } => write!(f, "no topic registered as {name}"),
            Self::Codec {
                type_name,
                codec,
                stage,
                detail,
            } => write!(f, "{type_name}: codec {codec} failed during {stage}: {detail}"),
            Self::SampleTypeMismatch { expected, actual } => {
                write!(f, "handler for {expected} was given a {actual} sample")
            }
        }
    }
}

impl std::error::Error for HarnessError {}

/// Result of one (type, seed) round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub passed: bool,
    pub reason_code: &'static str,
    pub detail: String,
    pub sample_sha256: Option<String>,
    /// Encoded bytes of a failing case, base64, for replay.
    pub wire_b64: Option<String>,
}

impl CaseOutcome {
    fn pass(sample_sha256: Option<String>) -> Self {
        Self {
            passed: true,
            reason_code: "roundtrip_ok",
            detail: String::new(),
            sample_sha256,
            wire_b64: None,
        }
    }

    fn fail(err: &HarnessError) -> Self {
        Self {
            passed: false,
            reason_code: err.reason_code(),
            detail: err.to_string(),
            sample_sha256: None,
            wire_b64: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct RoundtripLogEntry {
    suite: &'static str,
    fixture_id: String,
    type_name: String,
    seed: i32,
    mode: String,
    env_fingerprint: String,
    artifact_refs: Vec<String>,
    reason_code: String,
    passed: bool,
    detail: String,
    sample_sha256: Option<String>,
    wire_b64: Option<String>,
}

struct CaseContext<'a> {
    suite: &'static str,
    fixture_id: String,
    type_name: &'a str,
    seed: i32,
    mode: ValidationMode,
    artifact_refs: &'a [String],
}

impl CaseContext<'_> {
    fn log(&self, outcome: &CaseOutcome) -> Result<(), String> {
        maybe_append_roundtrip_log(&RoundtripLogEntry {
            suite: self.suite,
            fixture_id: self.fixture_id.clone(),
            type_name: self.type_name.to_string(),
            seed: self.seed,
            mode: self.mode.as_str().to_string(),
            env_fingerprint: env_fingerprint(),
            artifact_refs: normalize_artifact_refs(self.artifact_refs.to_vec()),
            reason_code: outcome.reason_code.to_string(),
            passed: outcome.passed,
            detail: outcome.detail.clone(),
            sample_sha256: outcome.sample_sha256.clone(),
            wire_b64: outcome.wire_b64.clone(),
        })
    }
}

static ROUNDTRIP_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

pub fn set_roundtrip_log_path(path: Option<PathBuf>) {
    let cell = ROUNDTRIP_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

fn maybe_append_roundtrip_log(entry: &RoundtripLogEntry) -> Result<(), String> {
    let configured = ROUNDTRIP_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os(ROUNDTRIP_LOG_PATH_ENV).map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing roundtrip log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending roundtrip log {}: {err}", path.display()))
}

fn env_fingerprint() -> String {
    format!(
        "{}-{}-rtc{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION")
    )
}

fn normalize_artifact_refs(mut refs: Vec<String>) -> Vec<String> {
    refs.retain(|entry| !entry.trim().is_empty());
    if refs.is_empty() {
        refs.push(format!("crates/rtc-conformance/fixtures/{SEED_PLAN_FIXTURE}"));
    }
    refs
}

fn case_id(type_name: &str, seed: i32) -> String {
    format!("{type_name}@{seed}")
}

/// Generate, validate, encode, decode, compare and validate again, then
/// release every instance the case acquired. Never panics; every failure
/// becomes the case's outcome.
pub fn run_roundtrip_case(
    handler: &TopicHandler,
    seed: i32,
    config: &HarnessConfig,
    codec: &dyn WireCodec,
    ledger: &mut LifecycleLedger,
) -> CaseOutcome {
    let original = match handler.generate(seed, ledger) {
        Ok(sample) => sample,
        Err(err) => return CaseOutcome::fail(&err),
    };
    let mut wire = None;
    let result = roundtrip_generated(handler, &original, seed, config, codec, ledger, &mut wire);
    let released = handler.release(original, ledger);
    match result.and_then(|sha| released.map(|()| sha)) {
        Ok(sha) => CaseOutcome::pass(Some(sha)),
        Err(err) => {
            let mut outcome = CaseOutcome::fail(&err);
            outcome.wire_b64 = wire.as_deref().map(wire_b64);
            outcome
        }
    }
}

fn roundtrip_generated(
    handler: &TopicHandler,
    original: &Sample,
    seed: i32,
    config: &HarnessConfig,
    codec: &dyn WireCodec,
    ledger: &mut LifecycleLedger,
    wire: &mut Option<Vec<u8>>,
) -> Result<String, HarnessError> {
    let sha = sample_fingerprint(handler, original)?;
    handler.validate(original, seed, config.mode, &config.tolerance)?;
    let bytes = wire.insert(handler.encode(original, codec)?);
    let decoded = handler.decode(bytes, codec, ledger)?;
    let checked = handler
        .compare(original, &decoded, &config.tolerance)
        .and_then(|()| handler.validate(&decoded, seed, config.mode, &config.tolerance));
    handler.release(decoded, ledger)?;
    checked.map(|()| sha)
}

/// Generating twice from one seed yields identical instances.
pub fn run_determinism_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let handlers = config.selected_handlers().map_err(|err| err.to_string())?;
    let mut report = SuiteReport::new("determinism");
    let mut ledger = LifecycleLedger::new();

    for handler in handlers {
        for &seed in &config.seeds {
            let outcome = determinism_case(handler, seed, config, &mut ledger)
                .unwrap_or_else(|err| CaseOutcome::fail(&err));
            let ctx = CaseContext {
                suite: report.suite,
                fixture_id: case_id(handler.name(), seed),
                type_name: handler.name(),
                seed,
                mode: config.mode,
                artifact_refs: &[],
            };
            report.record_logged(&ctx, &outcome)?;
        }
    }

    report.check_ledger(&ledger);
    Ok(report)
}

fn determinism_case(
    handler: &TopicHandler,
    seed: i32,
    config: &HarnessConfig,
    ledger: &mut LifecycleLedger,
) -> Result<CaseOutcome, HarnessError> {
    let first = handler.generate(seed, ledger)?;
    let mut second = handler.alloc(ledger);
    // refill over a different seed first so stale contents would show
    let refill = handler
        .fill(&mut second, seed.wrapping_add(1))
        .and_then(|()| handler.fill(&mut second, seed));
    let result = refill.and_then(|()| {
        let lhs = sample_fingerprint(handler, &first)?;
        let rhs = sample_fingerprint(handler, &second)?;
        handler.compare(&first, &second, &config.tolerance)?;
        Ok((lhs, rhs))
    });
    handler.release(first, ledger)?;
    handler.release(second, ledger)?;
    let (lhs, rhs) = result?;
    if lhs == rhs {
        Ok(CaseOutcome::pass(Some(lhs)))
    } else {
        Ok(CaseOutcome {
            passed: false,
            reason_code: "roundtrip_generation_defect",
            detail: format!("fingerprint drift first={lhs} second={rhs}"),
            sample_sha256: Some(lhs),
            wire_b64: None,
        })
    }
}

/// A freshly generated instance validates against its own seed in both
/// validation modes.
pub fn run_self_consistency_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let handlers = config.selected_handlers().map_err(|err| err.to_string())?;
    let mut report = SuiteReport::new("self_consistency");
    let mut ledger = LifecycleLedger::new();

    for handler in handlers {
        for &seed in &config.seeds {
            for mode in [ValidationMode::Minimal, ValidationMode::Full] {
                let outcome = match handler.generate(seed, &mut ledger) {
                    Ok(sample) => {
                        let checked = handler.validate(&sample, seed, mode, &config.tolerance);
                        let released = handler.release(sample, &mut ledger);
                        match checked.and(released) {
                            Ok(()) => CaseOutcome::pass(None),
                            Err(err) => CaseOutcome::fail(&err),
                        }
                    }
                    Err(err) => CaseOutcome::fail(&err),
                };
                let ctx = CaseContext {
                    suite: report.suite,
                    fixture_id: format!("{}/{}", case_id(handler.name(), seed), mode.as_str()),
                    type_name: handler.name(),
                    seed,
                    mode,
                    artifact_refs: &[],
                };
                report.record_logged(&ctx, &outcome)?;
            }
        }
    }

    report.check_ledger(&ledger);
    Ok(report)
}

/// Every selected (type, seed) pair survives a trip through `codec`.
pub fn run_roundtrip_suite(
    config: &HarnessConfig,
    codec: &dyn WireCodec,
) -> Result<SuiteReport, String> {
    let handlers = config.selected_handlers().map_err(|err| err.to_string())?;
    let mut report = SuiteReport::new("roundtrip");
    let mut ledger = LifecycleLedger::new();

    for handler in handlers {
        for &seed in &config.seeds {
            let outcome = run_roundtrip_case(handler, seed, config, codec, &mut ledger);
            let ctx = CaseContext {
                suite: report.suite,
                fixture_id: case_id(handler.name(), seed),
                type_name: handler.name(),
                seed,
                mode: config.mode,
                artifact_refs: &[],
            };
            report.record_logged(&ctx, &outcome)?;
        }
    }

    report.check_ledger(&ledger);
    Ok(report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SeedPlanExpectation {
    Pass,
    UnknownType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedPlanCase {
    id: String,
    type_name: String,
    seeds: Vec<i32>,
    expect: SeedPlanExpectation,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    artifact_refs: Vec<String>,
}

fn load_seed_plan(fixture_root: &Path) -> Result<Vec<SeedPlanCase>, String> {
    let path = fixture_root.join(SEED_PLAN_FIXTURE);
    let raw = fs::read_to_string(&path)
        .map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid json in {}: {err}", path.display()))
}

/// Round trips the pinned seeds listed in the seed-plan fixture.
pub fn run_seed_plan_suite(
    config: &HarnessConfig,
    codec: &dyn WireCodec,
) -> Result<SuiteReport, String> {
    let cases = load_seed_plan(&config.fixture_root)?;
    let mut report = SuiteReport::new("seed_plan");
    let mut ledger = LifecycleLedger::new();

    for case in cases {
        let mode = match case.mode.as_deref() {
            None => config.mode,
            Some(raw) => ValidationMode::parse(raw)
                .ok_or_else(|| format!("{}: invalid mode {raw}", case.id))?,
        };
        let case_config = HarnessConfig {
            mode,
            ..config.clone()
        };

        let handler = match (case.expect, lookup(&case.type_name)) {
            (SeedPlanExpectation::Pass, Ok(handler)) => handler,
            (expect, resolved) => {
                let outcome = unresolved_outcome(&case.type_name, expect, resolved.err());
                let ctx = CaseContext {
                    suite: report.suite,
                    fixture_id: case.id.clone(),
                    type_name: &case.type_name,
                    seed: case.seeds.first().copied().unwrap_or_default(),
                    mode,
                    artifact_refs: &case.artifact_refs,
                };
                report.record_logged(&ctx, &outcome)?;
                continue;
            }
        };

        for &seed in &case.seeds {
            let outcome = run_roundtrip_case(handler, seed, &case_config, codec, &mut ledger);
            let ctx = CaseContext {
                suite: report.suite,
                fixture_id: format!("{}@{seed}", case.id),
                type_name: handler.name(),
                seed,
                mode,
                artifact_refs: &case.artifact_refs,
            };
            report.record_logged(&ctx, &outcome)?;
        }
    }

    report.check_ledger(&ledger);
    Ok(report)
}

/// Outcome of a seed-plan entry whose type did not resolve to a handler, or
/// resolved when it was expected not to.
fn unresolved_outcome(
    type_name: &str,
    expect: SeedPlanExpectation,
    lookup_error: Option<HarnessError>,
) -> CaseOutcome {
    match (expect, lookup_error) {
        (SeedPlanExpectation::UnknownType, Some(err)) => CaseOutcome {
            reason_code: err.reason_code(),
            detail: err.to_string(),
            ..CaseOutcome::pass(None)
        },
        (_, Some(err)) => CaseOutcome::fail(&err),
        (_, None) => CaseOutcome {
            passed: false,
            reason_code: "roundtrip_unknown_type",
            detail: format!("{type_name} unexpectedly resolved to a registered topic"),
            sample_sha256: None,
            wire_b64: None,
        },
    }
}

pub fn run_all_core_suites(config: &HarnessConfig) -> Result<Vec<SuiteReport>, String> {
    let codec = JsonLoopbackCodec;
    Ok(vec![
        run_determinism_suite(config)?,
        run_self_consistency_suite(config)?,
        run_roundtrip_suite(config, &codec)?,
        run_seed_plan_suite(config, &codec)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::{
        CaseOutcome, HarnessConfig, HarnessError, JsonLoopbackCodec, ROUNDTRIP_REASON_CODES,
        WireCodec, lookup, run_roundtrip_case, run_roundtrip_suite, run_seed_plan_suite,
        set_roundtrip_log_path,
    };
    use crate::compare::Mismatch;
    use crate::topics::{AlignmentCheckTopic, IoTDeviceMutableTopic, TopicRecord};
    use rtc_layout::TypeDescriptor;
    use rtc_runtime::{LifecycleLedger, ValidationMode};
    use serde_json::Value;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(label: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        std::env::temp_dir().join(format!("rtc_{label}_{ts}.jsonl"))
    }

    /// Flips one octet of `blob` on the way back.
    struct CorruptingCodec;

    impl WireCodec for CorruptingCodec {
        fn name(&self) -> &'static str {
            "corrupting"
        }

        fn encode(&self, descriptor: &TypeDescriptor, value: &Value) -> Result<Vec<u8>, String> {
            JsonLoopbackCodec.encode(descriptor, value)
        }

        fn decode(&self, descriptor: &TypeDescriptor, bytes: &[u8]) -> Result<Value, String> {
            let mut value = JsonLoopbackCodec.decode(descriptor, bytes)?;
            if let Some(first) = value
                .get_mut("blob")
                .and_then(Value::as_array_mut)
                .and_then(|blob| blob.first_mut())
            {
                let flipped = first.as_u64().map_or(0, |b| b ^ 1);
                *first = Value::from(flipped);
            }
            Ok(value)
        }
    }

    struct FailingCodec;

    impl WireCodec for FailingCodec {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn encode(&self, _: &TypeDescriptor, _: &Value) -> Result<Vec<u8>, String> {
            Ok(b"garbage".to_vec())
        }

        fn decode(&self, _: &TypeDescriptor, _: &[u8]) -> Result<Value, String> {
            Err("short read".to_string())
        }
    }

    #[test]
    fn reason_codes_are_unique_and_cover_errors() {
        let mut codes = ROUNDTRIP_REASON_CODES.to_vec();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ROUNDTRIP_REASON_CODES.len());

        let errors = [
            HarnessError::UnknownType {
                name: "x".to_string(),
            },
            HarnessError::Validation {
                type_name: "t",
                seed: 1,
                mismatch: Mismatch::new("id", 1, 2),
            },
            HarnessError::SampleTypeMismatch {
                expected: "a",
                actual: "b",
            },
        ];
        for err in errors {
            assert!(ROUNDTRIP_REASON_CODES.contains(&err.reason_code()));
        }
    }

    #[test]
    fn roundtrip_case_passes_with_loopback() {
        let cfg = HarnessConfig::default_paths();
        let handler = lookup(IoTDeviceMutableTopic::TYPE_NAME).expect("registered");
        let mut ledger = LifecycleLedger::new();
        let outcome = run_roundtrip_case(handler, 42, &cfg, &JsonLoopbackCodec, &mut ledger);
        assert!(outcome.passed, "{}", outcome.detail);
        assert_eq!(outcome.reason_code, "roundtrip_ok");
        assert_eq!(outcome.sample_sha256.as_deref().map(str::len), Some(64));
        assert!(outcome.wire_b64.is_none());
        assert!(ledger.is_balanced());
    }

    #[test]
    fn corrupted_wire_is_a_comparison_failure_with_replay_bytes() {
        let cfg = HarnessConfig::default_paths();
        let handler = lookup(AlignmentCheckTopic::TYPE_NAME).expect("registered");
        let mut ledger = LifecycleLedger::new();
        let outcome = run_roundtrip_case(handler, 7, &cfg, &CorruptingCodec, &mut ledger);
        assert!(!outcome.passed);
        assert_eq!(outcome.reason_code, "roundtrip_comparison_mismatch");
        assert!(outcome.detail.contains("blob[0]"), "{}", outcome.detail);
        assert!(outcome.wire_b64.is_some());
        assert!(ledger.is_balanced());
    }

    #[test]
    fn codec_failure_does_not_stop_the_suite() {
        let cfg = HarnessConfig {
            seeds: vec![1, 2],
            type_filter: vec![AlignmentCheckTopic::TYPE_NAME.to_string()],
            ..HarnessConfig::default_paths()
        };
        let report = run_roundtrip_suite(&cfg, &FailingCodec).expect("suite runs");
        assert_eq!(report.case_count, 2);
        assert_eq!(report.pass_count, 0);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("roundtrip_codec_failure"));
    }

    #[test]
    fn unknown_type_filter_is_rejected() {
        let cfg = HarnessConfig {
            type_filter: vec!["AtomicTests::Missing".to_string()],
            ..HarnessConfig::default_paths()
        };
        let err = run_roundtrip_suite(&cfg, &JsonLoopbackCodec).expect_err("unknown filter");
        assert!(err.contains("AtomicTests::Missing"));
    }

    #[test]
    fn minimal_mode_config_round_trips() {
        let cfg = HarnessConfig {
            mode: ValidationMode::Minimal,
            seeds: vec![-3, 0, 9],
            ..HarnessConfig::default_paths()
        };
        let report = run_roundtrip_suite(&cfg, &JsonLoopbackCodec).expect("suite runs");
        assert!(report.all_passed(), "{:?}", report.failures);
        assert_eq!(report.case_count, 8 * 3);
    }

    #[test]
    fn failing_cases_are_logged_as_jsonl() {
        let path = temp_path("roundtrip_log");
        set_roundtrip_log_path(Some(path.clone()));
        let cfg = HarnessConfig {
            seeds: vec![7],
            type_filter: vec![AlignmentCheckTopic::TYPE_NAME.to_string()],
            ..HarnessConfig::default_paths()
        };
        let report = run_roundtrip_suite(&cfg, &CorruptingCodec).expect("suite runs");
        set_roundtrip_log_path(None);
        assert_eq!(report.failures.len(), 1);

        let raw = fs::read_to_string(&path).expect("log written");
        let _ = fs::remove_file(&path);
        // suites running concurrently in this process may share the slot
        let entries: Vec<Value> = raw
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).expect("jsonl line"))
            .filter(|entry| entry["fixture_id"] == "AtomicTests::AlignmentCheckTopic@7")
            .filter(|entry| entry["suite"] == "roundtrip")
            .collect();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry["suite"], "roundtrip");
        assert_eq!(entry["fixture_id"], "AtomicTests::AlignmentCheckTopic@7");
        assert_eq!(entry["seed"], 7);
        assert_eq!(entry["passed"], false);
        assert_eq!(entry["reason_code"], "roundtrip_comparison_mismatch");
        assert!(entry["wire_b64"].is_string());
        assert!(entry["artifact_refs"].as_array().is_some_and(|refs| !refs.is_empty()));
    }

    #[test]
    fn seed_plan_fixture_passes() {
        let cfg = HarnessConfig::default_paths();
        let report = run_seed_plan_suite(&cfg, &JsonLoopbackCodec).expect("fixture loads");
        assert!(report.all_passed(), "{:?}", report.failures);
        assert!(report.case_count >= 8);
    }

    #[test]
    fn missing_fixture_is_an_io_error() {
        let cfg = HarnessConfig {
            fixture_root: std::env::temp_dir().join("rtc_no_such_fixture_dir"),
            ..HarnessConfig::default_paths()
        };
        let err = run_seed_plan_suite(&cfg, &JsonLoopbackCodec).expect_err("missing");
        assert!(err.starts_with("failed reading"), "{err}");
    }

    #[test]
    fn outcome_failure_carries_reason() {
        let outcome = CaseOutcome::fail(&HarnessError::Generation {
            type_name: "AtomicTests::OffsetKeyTopic",
            seed: 3,
            detail: "group_name: length 40 exceeds bound 32".to_string(),
        });
        assert!(!outcome.passed);
        assert_eq!(outcome.reason_code, "roundtrip_generation_defect");
        assert!(outcome.detail.contains("seed=3"));
    }
}
