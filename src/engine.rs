use crate::error::OcrError;
use image::GrayImage;
use std::fmt;
use std::str::FromStr;

/// Characters accepted by the alphanumeric whitelist
pub const ALPHANUMERIC: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// How the engine should interpret the layout of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// Uniform block of text (`--psm 6`)
    SingleBlock,
    /// Single text line (`--psm 7`)
    SingleLine,
    /// Single word (`--psm 8`)
    SingleWord,
}

impl PageSegMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::SingleBlock => 6,
            Self::SingleLine => 7,
            Self::SingleWord => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            6 => Some(Self::SingleBlock),
            7 => Some(Self::SingleLine),
            8 => Some(Self::SingleWord),
            _ => None,
        }
    }
}

/// Which internal recognizer the engine should use (`--oem`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    Legacy,
    Lstm,
    Combined,
    #[default]
    Default,
}

impl EngineMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::Lstm => 1,
            Self::Combined => 2,
            Self::Default => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Legacy),
            1 => Some(Self::Lstm),
            2 => Some(Self::Combined),
            3 => Some(Self::Default),
            _ => None,
        }
    }
}

/// Recognition configuration handed to an engine with every image.
///
/// Renders to and parses from the Tesseract command-line form, e.g.
/// `--psm 7 --oem 3 -c tessedit_char_whitelist=0123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub page_seg_mode: PageSegMode,
    pub engine_mode: EngineMode,
    pub whitelist: Option<String>,
}

impl OcrConfig {
    pub fn new(page_seg_mode: PageSegMode) -> Self {
        Self {
            page_seg_mode,
            engine_mode: EngineMode::Default,
            whitelist: None,
        }
    }

    pub fn with_whitelist(mut self, chars: &str) -> Self {
        self.whitelist = Some(chars.to_string());
        self
    }

    /// Whether `c` may appear in the engine output under this configuration
    pub fn allows(&self, c: char) -> bool {
        match &self.whitelist {
            Some(chars) => chars.contains(c),
            None => true,
        }
    }
}

impl fmt::Display for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "--psm {} --oem {}",
            self.page_seg_mode.code(),
            self.engine_mode.code()
        )?;
        if let Some(chars) = &self.whitelist {
            write!(f, " -c tessedit_char_whitelist={}", chars)?;
        }
        Ok(())
    }
}

impl FromStr for OcrConfig {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut page_seg_mode = None;
        let mut engine_mode = EngineMode::Default;
        let mut whitelist = None;

        let mut tokens = s.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "--psm" => {
                    let code = next_code(&mut tokens, "--psm")?;
                    page_seg_mode = Some(PageSegMode::from_code(code).ok_or_else(|| {
                        OcrError::InvalidRequest(format!("Unsupported page segmentation mode: {}", code))
                    })?);
                }
                "--oem" => {
                    let code = next_code(&mut tokens, "--oem")?;
                    engine_mode = EngineMode::from_code(code).ok_or_else(|| {
                        OcrError::InvalidRequest(format!("Unsupported engine mode: {}", code))
                    })?;
                }
                "-c" => {
                    let assignment = tokens.next().ok_or_else(|| {
                        OcrError::InvalidRequest("Missing variable after -c".to_string())
                    })?;
                    match assignment.split_once('=') {
                        Some(("tessedit_char_whitelist", chars)) if !chars.is_empty() => {
                            whitelist = Some(chars.to_string());
                        }
                        _ => {
                            return Err(OcrError::InvalidRequest(format!(
                                "Unsupported config variable: {}",
                                assignment
                            )))
                        }
                    }
                }
                other => {
                    return Err(OcrError::InvalidRequest(format!(
                        "Unexpected config token: {}",
                        other
                    )))
                }
            }
        }

        let page_seg_mode = page_seg_mode
            .ok_or_else(|| OcrError::InvalidRequest("Config is missing --psm".to_string()))?;

        Ok(Self {
            page_seg_mode,
            engine_mode,
            whitelist,
        })
    }
}

fn next_code<'a>(tokens: &mut impl Iterator<Item = &'a str>, flag: &str) -> Result<u8, OcrError> {
    tokens
        .next()
        .and_then(|t| t.parse::<u8>().ok())
        .ok_or_else(|| OcrError::InvalidRequest(format!("Expected a number after {}", flag)))
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text in a preprocessed grayscale image
    fn recognize(&self, image: &GrayImage, config: &OcrConfig) -> Result<String, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_whitelisted_single_line() {
        let config = OcrConfig::new(PageSegMode::SingleLine).with_whitelist(ALPHANUMERIC);
        assert_eq!(
            config.to_string(),
            format!("--psm 7 --oem 3 -c tessedit_char_whitelist={}", ALPHANUMERIC)
        );
    }

    #[test]
    fn test_parses_rendered_form() {
        let config: OcrConfig = "--psm 8 --oem 3".parse().unwrap();
        assert_eq!(config.page_seg_mode, PageSegMode::SingleWord);
        assert_eq!(config.engine_mode, EngineMode::Default);
        assert!(config.whitelist.is_none());

        let config: OcrConfig = "--psm 7 --oem 1 -c tessedit_char_whitelist=AB12"
            .parse()
            .unwrap();
        assert_eq!(config.engine_mode, EngineMode::Lstm);
        assert_eq!(config.whitelist.as_deref(), Some("AB12"));
    }

    #[test]
    fn test_rejects_missing_psm_and_unknown_tokens() {
        assert!("--oem 3".parse::<OcrConfig>().is_err());
        assert!("--psm 42".parse::<OcrConfig>().is_err());
        assert!("--psm 7 --dpi 300".parse::<OcrConfig>().is_err());
        assert!("--psm 7 -c load_system_dawg=0".parse::<OcrConfig>().is_err());
    }

    #[test]
    fn test_allows_respects_whitelist() {
        let open = OcrConfig::new(PageSegMode::SingleBlock);
        assert!(open.allows('-'));

        let restricted = open.with_whitelist(ALPHANUMERIC);
        assert!(restricted.allows('z'));
        assert!(!restricted.allows('-'));
    }
}
