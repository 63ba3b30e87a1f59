/// Vintage style presets and output format options
///
/// Static, read-only tables loaded once. Styles are selected by id.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown style '{0}'")]
pub struct UnknownStyle(pub String);

/// A named prompt template biasing the look of the generated clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    /// Stable identifier, also used in download filenames
    pub id: &'static str,

    /// Display name
    pub name: &'static str,

    /// Human description
    pub description: &'static str,

    /// Prompt fragment appended to every request using this style
    pub prompt: &'static str,

    /// Preview thumbnail reference
    pub thumbnail: &'static str,
}

impl StylePreset {
    /// Look up a preset by id
    pub fn by_id(id: &str) -> Option<&'static StylePreset> {
        VINTAGE_STYLES.iter().find(|style| style.id == id.trim())
    }

    /// Default preset (first entry)
    pub fn default_style() -> &'static StylePreset {
        &VINTAGE_STYLES[0]
    }
}

pub static VINTAGE_STYLES: [StylePreset; 5] = [
    StylePreset {
        id: "silent-cinema",
        name: "Silent Cinema (1920s)",
        description: "High contrast black and white, heavy grain, and frame flickering.",
        prompt: "A 1920s silent film aesthetic. Black and white, heavy film grain, dust scratches, jittery frame, high contrast archival footage.",
        thumbnail: "https://images.unsplash.com/photo-1536440136628-849c177e76a1?auto=format&fit=crop&q=80&w=200",
    },
    StylePreset {
        id: "technicolor-70s",
        name: "Technicolor (1970s)",
        description: "Warm color grading, soft focus, and characteristic film burns.",
        prompt: "1970s technicolor film style. Warm yellow and orange hues, soft glow, slight color bleeding, authentic 35mm film texture.",
        thumbnail: "https://images.unsplash.com/photo-1485846234645-a62644f84728?auto=format&fit=crop&q=80&w=200",
    },
    StylePreset {
        id: "vhs-90s",
        name: "VHS Camcorder (1990s)",
        description: "Tracking lines, magnetic interference, and low-res glow.",
        prompt: "90s home video VHS aesthetic. Tracking artifacts, magnetic tape noise, color ghosting, slightly desaturated, interlaced scanning lines.",
        thumbnail: "https://images.unsplash.com/photo-1550751827-4bd374c3f58b?auto=format&fit=crop&q=80&w=200",
    },
    StylePreset {
        id: "8mm-home",
        name: "8mm Home Movie",
        description: "Nostalgic, oversaturated colors with heavy frame jitter.",
        prompt: "8mm home movie footage. Handheld jitter, vibrant but aged colors, rounded corners, light leaks, dust, and heavy film texture.",
        thumbnail: "https://images.unsplash.com/photo-1478720568477-152d9b164e26?auto=format&fit=crop&q=80&w=200",
    },
    StylePreset {
        id: "noir-detective",
        name: "Noir Detective",
        description: "Moody shadows, sharp lighting, and cinematic smoke.",
        prompt: "Classic Film Noir style. Deep shadows, low-key lighting, smoky atmosphere, dramatic monochrome transitions, high aesthetic grain.",
        thumbnail: "https://images.unsplash.com/photo-1509248961158-e54f6934749c?auto=format&fit=crop&q=80&w=200",
    },
];

/// Status lines shown while a job is generating, cycled by poll count
pub static LOADING_MESSAGES: [&str; 8] = [
    "Restoring celluloid archives...",
    "Applying chemical development process...",
    "Calibrating the light projector...",
    "Scanning negative frames...",
    "Interpolating lost motion data...",
    "Simulating 24 frames per second...",
    "Adding historical character grain...",
    "Finalizing the archival transfer...",
];

/// Output aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 16:9 cinema
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 vertical
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9 Cinema",
            Self::Portrait => "9:16 Vertical",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "16:9" | "landscape" | "cinema" => Ok(Self::Landscape),
            "9:16" | "portrait" | "vertical" => Ok(Self::Portrait),
            other => Err(format!(
                "unsupported aspect ratio '{other}', expected 16:9 or 9:16"
            )),
        }
    }
}

/// Resolution tier requested from the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P720 => "720p",
        }
    }
}
