// ─────────────────────────────────────────────────────────────────────
// Enrichment Cascade Core — File Exchange Backend
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Alternate backend reached through a JSON exchange file.
//!
//! The request is written to `enrichment_params_and_results[_<uid>].json`,
//! an external program is run on it and is expected to rewrite the same
//! file with the response keys. The file is removed once read.
//! Concurrent calls must use distinct uids; `solve_batch` derives one per
//! item.

use crate::assemble::check_consistency;
use crate::solver::EnrichmentSolver;
use enrichment_types::config::{CascadeSpec, EnrichmentProcess};
use enrichment_types::error::{EnrichmentError, EnrichmentResult};
use enrichment_types::isotopes::NucId;
use enrichment_types::state::{CascadeResult, Composition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub const EXCHANGE_FILE_STEM: &str = "enrichment_params_and_results";
/// Replaced by the exchange file path in program arguments.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Request keys read by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDocument {
    pub feed_composition: BTreeMap<NucId, f64>,
    pub product_assay: f64,
    pub tails_assay: f64,
    pub feed_qty: f64,
    pub product_qty: f64,
    pub max_swu: f64,
    pub process: EnrichmentProcess,
    /// Overall U-235 separation factor γ, under its historical key.
    pub alpha_235: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_downblending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_integer_stages: Option<bool>,
}

impl ExchangeDocument {
    /// Request document for `spec`, flags included.
    pub fn from_spec(spec: &CascadeSpec) -> Self {
        ExchangeDocument {
            feed_composition: spec.feed_composition.to_atom_basis().to_map(),
            product_assay: spec.target_product_assay,
            tails_assay: spec.target_tails_assay,
            feed_qty: spec.feed_qty,
            product_qty: spec.product_qty,
            max_swu: spec.max_swu,
            process: spec.process,
            alpha_235: spec.gamma_235,
            use_downblending: Some(spec.use_downblending),
            use_integer_stages: Some(spec.use_integer_stages),
        }
    }

    /// Drop the flag keys for backends that do not accept them.
    pub fn without_flags(mut self) -> Self {
        self.use_downblending = None;
        self.use_integer_stages = None;
        self
    }

    /// Rebuild the request. Absent flags default to on.
    pub fn to_spec(&self) -> EnrichmentResult<CascadeSpec> {
        let feed = Composition::atom(self.feed_composition.iter().map(|(&k, &v)| (k, v)))?;
        let mut spec = CascadeSpec::new(
            feed,
            self.product_assay,
            self.tails_assay,
            self.alpha_235,
            self.process,
        )
        .with_feed_qty(self.feed_qty)
        .with_product_qty(self.product_qty)
        .with_max_swu(self.max_swu);
        spec.use_downblending = self.use_downblending.unwrap_or(true);
        spec.use_integer_stages = self.use_integer_stages.unwrap_or(true);
        Ok(spec)
    }

    pub fn read(path: impl AsRef<Path>) -> EnrichmentResult<Self> {
        read_json(path)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> EnrichmentResult<()> {
        write_json(self, path)
    }
}

/// Keys the backend writes back in place of the request.
///
/// A backend may overwrite the whole file, so request keys such as the
/// target assays are not expected here. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub feed_qty: f64,
    pub product_qty: f64,
    pub tails_qty: f64,
    pub swu: f64,
    pub n_enriching: f64,
    pub n_stripping: f64,
    pub product_composition: BTreeMap<NucId, f64>,
    pub tails_composition: BTreeMap<NucId, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_composition: Option<BTreeMap<NucId, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<EnrichmentProcess>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_235: Option<f64>,
}

impl ExchangeResponse {
    /// Response a backend would write for `spec` and `result`.
    pub fn from_result(spec: &CascadeSpec, result: &CascadeResult) -> Self {
        ExchangeResponse {
            feed_qty: result.feed_qty,
            product_qty: result.product_qty,
            tails_qty: result.tails_qty,
            swu: result.swu,
            n_enriching: result.n_enriching,
            n_stripping: result.n_stripping,
            product_composition: result.product_composition.to_map(),
            tails_composition: result.tails_composition.to_map(),
            feed_composition: Some(spec.feed_composition.to_atom_basis().to_map()),
            process: Some(spec.process),
            alpha_235: Some(spec.gamma_235),
        }
    }

    pub fn to_result(&self) -> EnrichmentResult<CascadeResult> {
        let atom = |map: &BTreeMap<NucId, f64>| {
            Composition::atom(map.iter().map(|(&k, &v)| (k, v)))
        };
        Ok(CascadeResult {
            product_composition: atom(&self.product_composition)?,
            tails_composition: atom(&self.tails_composition)?,
            feed_qty: self.feed_qty,
            product_qty: self.product_qty,
            tails_qty: self.tails_qty,
            swu: self.swu,
            n_enriching: self.n_enriching,
            n_stripping: self.n_stripping,
        })
    }

    pub fn read(path: impl AsRef<Path>) -> EnrichmentResult<Self> {
        read_json(path)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> EnrichmentResult<()> {
        write_json(self, path)
    }
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> EnrichmentResult<T> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> EnrichmentResult<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}

/// Solver delegating to an external program through the exchange file.
#[derive(Debug, Clone)]
pub struct ExchangeFileSolver {
    program: String,
    args: Vec<String>,
    work_dir: PathBuf,
    uid: Option<String>,
    send_flags: bool,
}

impl ExchangeFileSolver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        ExchangeFileSolver {
            program: program.into(),
            args,
            work_dir: PathBuf::from("."),
            uid: None,
            send_flags: true,
        }
    }

    /// The Python multi-isotope calculator, which only reads request keys.
    /// The exchange path reaches it as `sys.argv[1]`.
    pub fn python() -> Self {
        let script = "import sys; from misoenrichment import calculator; \
                      calculator.calculate_enrichment_from_file(sys.argv[1], suppress_warnings=True)";
        let mut solver = Self::new(
            "python3",
            vec!["-c".to_string(), script.to_string(), FILE_PLACEHOLDER.to_string()],
        );
        solver.send_flags = false;
        solver
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn file_name(&self) -> String {
        match self.uid.as_deref() {
            Some(uid) if !uid.is_empty() => format!("{EXCHANGE_FILE_STEM}_{uid}.json"),
            _ => format!("{EXCHANGE_FILE_STEM}.json"),
        }
    }

    pub fn exchange_path(&self) -> PathBuf {
        self.work_dir.join(self.file_name())
    }

    /// Same backend on uid `<uid>_<index>`, so batch items never share a file.
    pub fn for_item(&self, index: usize) -> Self {
        let uid = match self.uid.as_deref() {
            Some(uid) if !uid.is_empty() => format!("{uid}_{index}"),
            _ => index.to_string(),
        };
        self.clone().with_uid(uid)
    }

    fn run_backend(&self, path: &Path) -> EnrichmentResult<ExchangeResponse> {
        let path_str = path.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(FILE_PLACEHOLDER, &path_str))
            .collect();
        debug!(program = %self.program, ?args, "running enrichment backend");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| {
                EnrichmentError::ExternalBackend(format!("cannot run '{}': {e}", self.program))
            })?;
        if !status.success() {
            return Err(EnrichmentError::ExternalBackend(format!(
                "'{}' exited unsuccessfully ({status})",
                self.program
            )));
        }
        ExchangeResponse::read(path).map_err(|e| {
            EnrichmentError::ExternalBackend(format!(
                "cannot read exchange file '{}': {e}",
                path.display()
            ))
        })
    }
}

impl EnrichmentSolver for ExchangeFileSolver {
    fn solve(&self, spec: &CascadeSpec) -> EnrichmentResult<CascadeResult> {
        spec.validate()?;
        let path = self.exchange_path();
        let mut request = ExchangeDocument::from_spec(spec);
        if !self.send_flags {
            request = request.without_flags();
        }
        request.write(&path).map_err(|e| {
            EnrichmentError::ExternalBackend(format!(
                "cannot write exchange file '{}': {e}",
                path.display()
            ))
        })?;

        let response = self.run_backend(&path);
        let removed = std::fs::remove_file(&path);
        let response = response?;
        removed.map_err(|e| {
            EnrichmentError::ExternalBackend(format!(
                "cannot delete exchange file '{}': {e}",
                path.display()
            ))
        })?;

        let result = response.to_result()?;
        check_consistency(spec, &result)?;
        info!(
            backend = %self.program,
            swu = result.swu,
            n_enriching = result.n_enriching,
            n_stripping = result.n_stripping,
            "external cascade calculation finished"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "exchange-file"
    }

    fn for_batch_item(&self, index: usize) -> Option<Box<dyn EnrichmentSolver>> {
        Some(Box::new(self.for_item(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{calculate, solve_batch};
    use enrichment_types::isotopes::{NUC_IDS, U234, U235, U238};
    use serde_json::json;

    fn spec() -> CascadeSpec {
        let feed = Composition::atom([(U234, 0.001), (U235, 0.1), (U238, 0.899)]).unwrap();
        CascadeSpec::new(feed, 0.9, 0.03, 1.4, EnrichmentProcess::Centrifuge)
            .with_feed_qty(1000.0)
            .with_product_qty(1000.0)
    }

    #[test]
    fn test_file_name_from_uid() {
        let solver = ExchangeFileSolver::new("true", vec![]);
        assert_eq!(solver.file_name(), "enrichment_params_and_results.json");
        assert_eq!(
            solver.with_uid("42").file_name(),
            "enrichment_params_and_results_42.json"
        );
    }

    #[test]
    fn test_request_keys() {
        let json = serde_json::to_value(ExchangeDocument::from_spec(&spec())).unwrap();
        assert_eq!(json["process"], "centrifuge");
        assert_eq!(json["alpha_235"], 1.4);
        let x235 = json["feed_composition"]["922350000"].as_f64().unwrap();
        assert!((x235 - 0.1).abs() < 1e-15, "x235 = {x235}");
        assert!(json.get("swu").is_none());
        let bare = serde_json::to_value(ExchangeDocument::from_spec(&spec()).without_flags()).unwrap();
        assert!(bare.get("use_downblending").is_none());
    }

    #[test]
    fn test_spec_roundtrip() {
        let s = spec().with_staging(true, false);
        let back = ExchangeDocument::from_spec(&s).to_spec().unwrap();
        assert!(back.feed_composition.approx_eq(&s.feed_composition, 1e-15));
        assert_eq!(back.target_product_assay, s.target_product_assay);
        assert_eq!(back.feed_qty, s.feed_qty);
        assert!(!back.use_downblending && back.use_integer_stages);
    }

    /// Key set written by the Python calculator: no target assays, no SWU
    /// limit, every nuclide listed.
    fn calculator_response(spec: &CascadeSpec, result: &CascadeResult) -> serde_json::Value {
        let all = |c: &Composition| {
            NUC_IDS
                .iter()
                .map(|&id| (id.to_string(), json!(c.fraction(id).unwrap())))
                .collect::<serde_json::Map<_, _>>()
        };
        json!({
            "feed_qty": result.feed_qty,
            "product_qty": result.product_qty,
            "tails_qty": result.tails_qty,
            "swu": result.swu,
            "process": "centrifuge",
            "alpha_235": spec.gamma_235,
            "n_enriching": result.n_enriching,
            "n_stripping": result.n_stripping,
            "feed_composition": all(&spec.feed_composition),
            "product_composition": all(&result.product_composition),
            "tails_composition": all(&result.tails_composition),
        })
    }

    #[test]
    fn test_request_is_not_a_response() {
        let json = serde_json::to_string(&ExchangeDocument::from_spec(&spec())).unwrap();
        let err = serde_json::from_str::<ExchangeResponse>(&json).unwrap_err();
        assert!(err.to_string().contains("missing field"), "{err}");
    }

    #[test]
    fn test_calculator_response_parses() {
        let expected = calculate(&spec()).unwrap();
        let value = calculator_response(&spec(), &expected);
        assert!(value.get("product_assay").is_none() && value.get("max_swu").is_none());

        let response: ExchangeResponse = serde_json::from_value(value).unwrap();
        assert_eq!(response.process, Some(EnrichmentProcess::Centrifuge));
        assert_eq!(response.product_composition.len(), NUC_IDS.len());
        let result = response.to_result().unwrap();
        assert!(result.product_composition.approx_eq(&expected.product_composition, 1e-15));
        assert_eq!(result.n_stripping, expected.n_stripping);
    }

    #[test]
    fn test_document_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let result = calculate(&spec()).unwrap();
        let doc = ExchangeResponse::from_result(&spec(), &result);
        doc.write(&path).unwrap();
        let back = ExchangeResponse::read(&path).unwrap();
        let parsed = back.to_result().unwrap();
        assert!(parsed.product_composition.approx_eq(&result.product_composition, 1e-15));
        assert!((parsed.swu - result.swu).abs() < 1e-12 * result.swu);
    }

    #[cfg(unix)]
    #[test]
    fn test_backend_response_is_used_and_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let expected = calculate(&spec()).unwrap();
        let response = dir.path().join("response.json");
        ExchangeResponse::from_result(&spec(), &expected)
            .write(&response)
            .unwrap();

        let solver = ExchangeFileSolver::new(
            "cp",
            vec![response.to_string_lossy().into_owned(), FILE_PLACEHOLDER.into()],
        )
        .with_work_dir(dir.path())
        .with_uid("cp");
        let result = solver.solve(&spec()).unwrap();
        assert_eq!(result.n_enriching, expected.n_enriching);
        assert!((result.swu - expected.swu).abs() < 1e-9 * expected.swu);
        assert!(!solver.exchange_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_backend_overwriting_request_with_calculator_keys() {
        let dir = tempfile::tempdir().unwrap();
        let expected = calculate(&spec()).unwrap();
        let response = dir.path().join("calculator.json");
        let body = serde_json::to_string(&calculator_response(&spec(), &expected)).unwrap();
        std::fs::write(&response, body).unwrap();

        let solver = ExchangeFileSolver::new(
            "cp",
            vec![response.to_string_lossy().into_owned(), FILE_PLACEHOLDER.into()],
        )
        .with_work_dir(dir.path())
        .with_uid("calculator");
        let result = solver.solve(&spec()).unwrap();
        assert_eq!(
            (result.n_enriching, result.n_stripping),
            (expected.n_enriching, expected.n_stripping)
        );
        assert!((result.product_assay() - 0.9).abs() < 1e-5, "{result}");
        assert!((result.swu - expected.swu).abs() < 1e-9 * expected.swu);
        assert!(!solver.exchange_path().exists());
    }

    #[test]
    fn test_batch_items_get_own_files() {
        let solver = ExchangeFileSolver::new("true", vec![]).with_uid("run");
        assert_eq!(
            solver.for_item(0).file_name(),
            "enrichment_params_and_results_run_0.json"
        );
        assert_ne!(solver.for_item(1).exchange_path(), solver.for_item(2).exchange_path());
        assert_eq!(solver.file_name(), "enrichment_params_and_results_run.json");
        assert_eq!(
            ExchangeFileSolver::new("true", vec![]).for_item(4).file_name(),
            "enrichment_params_and_results_4.json"
        );
        assert_eq!(solver.for_batch_item(0).unwrap().name(), "exchange-file");
    }

    #[cfg(unix)]
    #[test]
    fn test_batch_through_backend() {
        let dir = tempfile::tempdir().unwrap();
        let expected = calculate(&spec()).unwrap();
        let response = dir.path().join("response.json");
        ExchangeResponse::from_result(&spec(), &expected)
            .write(&response)
            .unwrap();

        let solver = ExchangeFileSolver::new(
            "cp",
            vec![response.to_string_lossy().into_owned(), FILE_PLACEHOLDER.into()],
        )
        .with_work_dir(dir.path());
        let specs = vec![spec(); 8];
        let results = solve_batch(&solver, &specs);
        assert_eq!(results.len(), specs.len());
        for r in results {
            let r = r.unwrap();
            assert_eq!(r.n_enriching, expected.n_enriching);
        }
        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left.len(), 1, "{left:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ExchangeFileSolver::new("false", vec![]).with_work_dir(dir.path());
        let err = solver.solve(&spec()).unwrap_err();
        assert!(matches!(err, EnrichmentError::ExternalBackend(_)), "{err}");
        assert!(!solver.exchange_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_backend_deleting_file() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ExchangeFileSolver::new("rm", vec![FILE_PLACEHOLDER.into()])
            .with_work_dir(dir.path());
        let err = solver.solve(&spec()).unwrap_err();
        assert!(err.to_string().contains("cannot read"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_backend_without_response_keys() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ExchangeFileSolver::new("true", vec![]).with_work_dir(dir.path());
        let err = solver.solve(&spec()).unwrap_err();
        assert!(err.to_string().contains("missing field"), "{err}");
        assert!(!solver.exchange_path().exists());
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let solver = ExchangeFileSolver::new("definitely-not-an-enrichment-backend", vec![])
            .with_work_dir(dir.path());
        assert!(matches!(
            solver.solve(&spec()),
            Err(EnrichmentError::ExternalBackend(_))
        ));
    }

    #[test]
    fn test_python_preset_passes_path_as_argument() {
        let solver = ExchangeFileSolver::python();
        assert!(!solver.send_flags);
        assert_eq!(solver.args.len(), 3);
        assert!(solver.args[1].contains("sys.argv[1]"), "{}", solver.args[1]);
        assert!(!solver.args[1].contains(FILE_PLACEHOLDER));
        assert_eq!(solver.args[2], FILE_PLACEHOLDER);
    }
}
