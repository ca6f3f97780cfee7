//! Producer configuration (YAML or JSON).

use crate::{ProducerError, Result};
use at_core::{CollectionKind, TrackMatchingParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration. Every section is optional; an absent section
/// disables its producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// ISR reweighting.
    #[serde(default)]
    pub isr_weight: Option<IsrWeightConfig>,
    /// Pileup reweighting.
    #[serde(default)]
    pub pu_scaling: Option<PuScalingConfig>,
    /// Track vetoes and GSF matching.
    #[serde(default)]
    pub tracks: Option<TrackMatchingParams>,
    /// Member variables of leading objects.
    #[serde(default)]
    pub user_variables: Vec<UserVariableConfig>,
}

/// ISR reweighting settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsrWeightConfig {
    /// Particle ids whose original instances make up the ISR system.
    pub pdg_ids: Vec<i32>,
    /// Weight file; unset or empty disables the weights.
    #[serde(default)]
    pub weight_file: Option<PathBuf>,
    /// Histograms multiplied into the weight, in order.
    #[serde(default)]
    pub weight_hist: Vec<String>,
}

impl IsrWeightConfig {
    /// Weight file and histogram names, when both are set.
    pub fn weights(&self) -> Option<(&Path, &[String])> {
        let file = self.weight_file.as_deref().filter(|p| !p.as_os_str().is_empty())?;
        if self.weight_hist.is_empty() {
            return None;
        }
        Some((file, &self.weight_hist))
    }
}

/// Pileup reweighting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PuScalingConfig {
    /// File holding both pileup distributions.
    pub pu: PathBuf,
    /// Simulated distribution.
    pub dataset: String,
    /// Target (data) distribution.
    pub target: String,
    /// Format of the input events.
    pub data_format: DataFormat,
}

/// Event data tier the snapshots were produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFormat {
    /// Full AOD.
    Aod,
    /// Skimmed AOD with custom collections.
    AodCustom,
    /// MiniAOD.
    MiniAod,
    /// MiniAOD with custom collections.
    MiniAodCustom,
}

impl DataFormat {
    /// Whether pileup summaries are available for reweighting.
    pub fn supports_pileup_reweighting(self) -> bool {
        matches!(self, Self::MiniAod | Self::MiniAodCustom)
    }
}

/// One member variable to publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserVariableConfig {
    /// Collection whose leading object is read.
    pub collection: CollectionKind,
    /// Member or accessor name.
    pub member: String,
    /// Output key; defaults to `<collection>_<member>`.
    #[serde(default)]
    pub key: Option<String>,
}

impl UserVariableConfig {
    /// Key under which the value is published.
    pub fn output_key(&self) -> String {
        self.key.clone().unwrap_or_else(|| format!("{}_{}", self.collection, self.member))
    }
}

impl AnalysisConfig {
    /// Resolve relative weight-file paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let isr_file = self.isr_weight.as_mut().and_then(|isr| isr.weight_file.as_mut());
        if let Some(file) = isr_file.filter(|f| !f.as_os_str().is_empty() && f.is_relative()) {
            *file = base.join(&*file);
        }
        if let Some(pu) = self.pu_scaling.as_mut().filter(|pu| pu.pu.is_relative()) {
            pu.pu = base.join(&pu.pu);
        }
    }

    /// Reject settings no producer could run with.
    pub fn validate(&self) -> Result<()> {
        if let Some(tracks) = &self.tracks {
            let dr = tracks.min_delta_r_for_fiducial_track;
            if dr.is_nan() || dr < 0.0 {
                return Err(ProducerError::Config(format!(
                    "tracks.min_delta_r_for_fiducial_track must be >= 0, got {dr}"
                )));
            }
        }
        for uv in &self.user_variables {
            if uv.member.is_empty() {
                return Err(ProducerError::Config(format!(
                    "user variable on '{}' has an empty member name",
                    uv.collection
                )));
            }
        }
        Ok(())
    }
}

/// Read a configuration file; `.json` is parsed as JSON, anything else as
/// YAML. Relative weight-file paths are resolved against the file's directory.
pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let mut cfg: AnalysisConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    if let Some(dir) = path.parent() {
        cfg.resolve_paths(dir);
    }
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
isr_weight:
  pdg_ids: [1000006, -1000006]
  weight_file: isr.root
  weight_hist: [isrWeight]
pu_scaling:
  pu: /data/pu.root
  dataset: mc
  target: data
  data_format: MINI_AOD_CUSTOM
tracks:
  min_delta_r_for_fiducial_track: 0.05
  max_delta_r_for_gsf_track_matching: 0.2
user_variables:
  - { collection: muons, member: pt, key: leadingMuonPt }
  - { collection: tracks, member: dRMinJet }
"#;

    #[test]
    fn test_yaml_config() {
        let mut cfg: AnalysisConfig = serde_yaml_ng::from_str(YAML).unwrap();
        cfg.resolve_paths(Path::new("/cfg"));
        let isr = cfg.isr_weight.as_ref().unwrap();
        assert_eq!(isr.pdg_ids, vec![1000006, -1000006]);
        assert_eq!(isr.weights().unwrap().0, Path::new("/cfg/isr.root"));

        let pu = cfg.pu_scaling.as_ref().unwrap();
        assert_eq!(pu.pu, PathBuf::from("/data/pu.root"));
        assert!(pu.data_format.supports_pileup_reweighting());

        let tracks = cfg.tracks.unwrap();
        assert_eq!(tracks.max_delta_r_for_gsf_track_matching, 0.2);
        assert_eq!(tracks.max_delta_r_for_gen_matching, 0.1);

        assert_eq!(cfg.user_variables[0].output_key(), "leadingMuonPt");
        assert_eq!(cfg.user_variables[1].output_key(), "tracks_dRMinJet");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_json_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{"isr_weight": {"pdg_ids": [1000022], "weight_file": "", "weight_hist": ["w"]}}"#,
        )
        .unwrap();
        let cfg = read_config(&path).unwrap();
        let isr = cfg.isr_weight.unwrap();
        assert!(isr.weights().is_none(), "empty file name disables the weights");
        assert!(cfg.pu_scaling.is_none());
    }

    #[test]
    fn test_unknown_keys_and_formats_rejected() {
        assert!(serde_yaml_ng::from_str::<AnalysisConfig>("isr_weights: {}").is_err());
        let bad_format = "pu_scaling: {pu: a, dataset: b, target: c, data_format: RECO}";
        assert!(serde_yaml_ng::from_str::<AnalysisConfig>(bad_format).is_err());
        let ok = "pu_scaling: {pu: a, dataset: b, target: c, data_format: AOD}";
        let cfg: AnalysisConfig = serde_yaml_ng::from_str(ok).unwrap();
        assert!(!cfg.pu_scaling.unwrap().data_format.supports_pileup_reweighting());
    }

    #[test]
    fn test_validate_rejects_negative_cone() {
        let cfg: AnalysisConfig =
            serde_yaml_ng::from_str("tracks: {min_delta_r_for_fiducial_track: -1.0}").unwrap();
        assert!(matches!(cfg.validate(), Err(ProducerError::Config(_))));
    }
}
