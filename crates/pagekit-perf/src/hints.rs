//! Resource hints
//!
//! Connection/device heuristics and responsive image attributes. Everything
//! here is a pure function of the environment signals passed in.

use serde::{Deserialize, Serialize};

use crate::PerfError;

/// Default `srcset` widths
pub const DEFAULT_IMAGE_WIDTHS: [u32; 4] = [320, 640, 960, 1280];

/// Three-tier `sizes` hint: full width on phones, half on tablets, a third on desktop
pub const RESPONSIVE_SIZES: &str = "(max-width: 768px) 100vw, (max-width: 1200px) 50vw, 33vw";

/// Effective connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2G,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[default]
    #[serde(rename = "4g")]
    FourG,
}

impl EffectiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow2G => "slow-2g",
            Self::TwoG => "2g",
            Self::ThreeG => "3g",
            Self::FourG => "4g",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Some(Self::Slow2G),
            "2g" => Some(Self::TwoG),
            "3g" => Some(Self::ThreeG),
            "4g" => Some(Self::FourG),
            _ => None,
        }
    }
}

/// Network information
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkInformation {
    pub effective_type: EffectiveType,
    /// User asked for reduced data usage
    pub save_data: bool,
}

/// What the runtime tells us about the network, device and user
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentSignals {
    /// Absent when the runtime exposes no network information
    pub connection: Option<NetworkInformation>,
    /// Logical processor count, if reported
    pub hardware_concurrency: Option<usize>,
    pub prefers_reduced_motion: bool,
}

impl EnvironmentSignals {
    pub fn from_json(json: &str) -> Result<Self, PerfError> {
        serde_json::from_str(json).map_err(|e| PerfError::InvalidSignals(e.to_string()))
    }

    /// Read signals from the current process.
    ///
    /// `PAGEKIT_REDUCED_MOTION` and `PAGEKIT_SAVE_DATA` take truthy values
    /// (`1`, `true`, `yes`, `reduce`); `PAGEKIT_EFFECTIVE_TYPE` takes a
    /// connection type such as `3g`.
    pub fn detect() -> Self {
        let save_data = env_flag("PAGEKIT_SAVE_DATA");
        let effective_type = std::env::var("PAGEKIT_EFFECTIVE_TYPE")
            .ok()
            .and_then(|v| EffectiveType::parse(&v));

        let connection = match (save_data, effective_type) {
            (false, None) => None,
            (save_data, effective_type) => Some(NetworkInformation {
                save_data,
                effective_type: effective_type.unwrap_or_default(),
            }),
        };

        let signals = Self {
            connection,
            hardware_concurrency: std::thread::available_parallelism().ok().map(|n| n.get()),
            prefers_reduced_motion: env_flag("PAGEKIT_REDUCED_MOTION"),
        };
        tracing::debug!(?signals, "environment signals detected");
        signals
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "reduce"))
        .unwrap_or(false)
}

/// Data saver on, or a 2G-class connection. Unknown connections count as fast.
pub fn is_slow_connection(signals: &EnvironmentSignals) -> bool {
    signals.connection.as_ref().is_some_and(|c| {
        c.save_data || matches!(c.effective_type, EffectiveType::Slow2G | EffectiveType::TwoG)
    })
}

/// Two logical processors or fewer
pub fn is_low_end_device(signals: &EnvironmentSignals) -> bool {
    signals.hardware_concurrency.is_some_and(|n| n <= 2)
}

pub fn prefers_reduced_motion(signals: &EnvironmentSignals) -> bool {
    signals.prefers_reduced_motion
}

/// `src`, `srcset` and `sizes` for a responsive `<img>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveImageProps {
    pub src: String,
    pub src_set: String,
    pub sizes: String,
}

/// Build width-suffixed variants of `url`. Any query string on `url` is
/// dropped from the variants but kept on `src`.
pub fn get_responsive_image_props(url: &str, widths: &[u32]) -> ResponsiveImageProps {
    let base = url.split_once('?').map_or(url, |(base, _)| base);
    let src_set = widths
        .iter()
        .map(|w| format!("{base}?w={w} {w}w"))
        .collect::<Vec<_>>()
        .join(", ");

    ResponsiveImageProps {
        src: url.to_string(),
        src_set,
        sizes: RESPONSIVE_SIZES.to_string(),
    }
}
