use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fallback settings file, read from the working directory.
pub const PARAMS_FILE: &str = "params.json";

pub const DEFAULT_FACE_RATIO: f64 = 0.2;

pub const DEFAULT_LOG_FILE: &str = "execute.log";

pub static DETECTOR_MODEL_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(
        option_env!("FACESIFT_DETECTOR_MODEL")
            .unwrap_or("models/face_detection_yunet_2023mar.onnx"),
    )
});

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub image_folder_path: PathBuf,
    pub output_folder_path: PathBuf,
    #[serde(rename = "face_ratio")]
    pub face_ratio_threshold: f64,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let ratio = self.face_ratio_threshold;
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            anyhow::bail!("face_ratio must be in (0, 1], got {}", ratio);
        }
        Ok(())
    }
}

/// Pick the run configuration.
///
/// Command-line folders win only when both are given; in that case `params`
/// is never opened. Otherwise everything, the ratio included, comes from
/// `params`.
pub fn resolve(
    image_folder_path: Option<PathBuf>,
    output_folder_path: Option<PathBuf>,
    face_ratio: f64,
    params: &Path,
) -> Result<Config> {
    let cfg = match (image_folder_path, output_folder_path) {
        (Some(image_folder_path), Some(output_folder_path)) => Config {
            image_folder_path,
            output_folder_path,
            face_ratio_threshold: face_ratio,
        },
        _ => {
            log::debug!("folders not given on the command line, using {}", params.display());
            load_params(params)?
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_params(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading parameters at {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing parameters {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_file(body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("facesift-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(PARAMS_FILE);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn cli_folders_skip_params_file() {
        let cfg = resolve(
            Some("in".into()),
            Some("out".into()),
            DEFAULT_FACE_RATIO,
            Path::new("/definitely/missing/params.json"),
        )
        .unwrap();
        assert_eq!(cfg.image_folder_path, PathBuf::from("in"));
        assert_eq!(cfg.output_folder_path, PathBuf::from("out"));
        assert_eq!(cfg.face_ratio_threshold, 0.2);
    }

    #[test]
    fn cli_folders_ignore_malformed_params() {
        let params = params_file("{ this is not json");
        let cfg = resolve(Some("in".into()), Some("out".into()), 0.5, &params).unwrap();
        assert_eq!(cfg.face_ratio_threshold, 0.5);
    }

    #[test]
    fn single_cli_folder_falls_back_to_params() {
        let params = params_file(
            r#"{ "image_folder_path": "photos", "output_folder_path": "faces", "face_ratio": 0.35 }"#,
        );
        let cfg = resolve(Some("ignored".into()), None, 0.9, &params).unwrap();
        assert_eq!(
            cfg,
            Config {
                image_folder_path: "photos".into(),
                output_folder_path: "faces".into(),
                face_ratio_threshold: 0.35,
            }
        );
    }

    #[test]
    fn missing_key_names_the_key() {
        let params = params_file(r#"{ "image_folder_path": "photos", "output_folder_path": "faces" }"#);
        let err = resolve(None, None, DEFAULT_FACE_RATIO, &params).unwrap_err();
        assert!(format!("{:#}", err).contains("face_ratio"));
    }

    #[test]
    fn missing_params_file_is_fatal() {
        let err = resolve(None, None, DEFAULT_FACE_RATIO, Path::new("/definitely/missing/params.json"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("params.json"));
    }

    #[test]
    fn ratio_out_of_range_rejected() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            assert!(resolve(Some("in".into()), Some("out".into()), bad, Path::new(PARAMS_FILE)).is_err());
        }
        assert!(resolve(Some("in".into()), Some("out".into()), 1.0, Path::new(PARAMS_FILE)).is_ok());
    }
}
