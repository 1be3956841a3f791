use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "captcha-solver-server")]
#[command(about = "Self-hosted CAPTCHA solver using OCR with image preprocessing")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "CAPTCHA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CAPTCHA_PORT", default_value = "5555")]
    pub port: u16,

    /// OCR engine to use (defaults to the first compiled-in engine)
    #[arg(long, env = "CAPTCHA_ENGINE")]
    pub engine: Option<String>,

    /// Recognition language (e.g., "eng")
    #[arg(long, env = "CAPTCHA_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Path to tessdata directory (downloaded to the cache dir if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Maximum request body size in bytes (default: 5MB)
    #[arg(long, env = "CAPTCHA_MAX_FILE_SIZE", default_value = "5242880")]
    pub max_file_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// CLAHE clip limit
    #[arg(long, env = "CAPTCHA_CLIP_LIMIT", default_value = "2.0")]
    pub clip_limit: f32,

    /// CLAHE tile grid size (tiles per side)
    #[arg(long, env = "CAPTCHA_TILE_GRID", default_value = "8")]
    pub tile_grid: u32,

    /// Adaptive threshold neighbourhood size (odd)
    #[arg(long, env = "CAPTCHA_BLOCK_SIZE", default_value = "11")]
    pub block_size: u32,

    /// Constant subtracted from the local mean in adaptive thresholding
    #[arg(long, env = "CAPTCHA_THRESHOLD_OFFSET", default_value = "2.0")]
    pub threshold_offset: f32,

    /// Mean intensity below which the cleaned image is inverted
    #[arg(long, env = "CAPTCHA_POLARITY_MIDPOINT", default_value = "127.0")]
    pub polarity_midpoint: f32,

    /// Fixed threshold used by the simple pipeline
    #[arg(long, env = "CAPTCHA_GLOBAL_THRESHOLD", default_value = "127")]
    pub global_threshold: u8,

    /// Upscale factor applied at the end of every pipeline
    #[arg(long, env = "CAPTCHA_UPSCALE_FACTOR", default_value = "2")]
    pub upscale_factor: u32,

    /// Minimum normalized answer length
    #[arg(long, env = "CAPTCHA_MIN_CANDIDATE_LEN", default_value = "4")]
    pub min_candidate_len: usize,

    /// Maximum number of solves running at once
    #[arg(long, env = "CAPTCHA_MAX_CONCURRENT_SOLVES", default_value = "4")]
    pub max_concurrent_solves: usize,

    /// Wall-clock limit for one solve request, in seconds
    #[arg(long, env = "CAPTCHA_SOLVE_TIMEOUT_SECS", default_value = "30")]
    pub solve_timeout_secs: u64,

    /// Run recognition strategies on parallel threads
    #[arg(long, env = "CAPTCHA_PARALLEL_STRATEGIES", default_value_t = false)]
    pub parallel_strategies: bool,
}

/// Numeric knobs of the preprocessing stages
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingParams {
    pub clip_limit: f32,
    pub tile_grid: u32,
    pub block_size: u32,
    pub threshold_offset: f32,
    pub polarity_midpoint: f32,
    pub global_threshold: u8,
    pub upscale_factor: u32,
}

impl Default for PreprocessingParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: 8,
            block_size: 11,
            threshold_offset: 2.0,
            polarity_midpoint: 127.0,
            global_threshold: 127,
            upscale_factor: 2,
        }
    }
}

impl PreprocessingParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.clip_limit <= 0.0 {
            return Err(format!("clip limit must be positive, got {}", self.clip_limit));
        }
        if self.tile_grid == 0 {
            return Err("tile grid must be at least 1".to_string());
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(format!(
                "block size must be odd and at least 3, got {}",
                self.block_size
            ));
        }
        if self.upscale_factor == 0 {
            return Err("upscale factor must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Knobs of the strategy orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    pub min_candidate_len: usize,
    pub parallel_strategies: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            min_candidate_len: 4,
            parallel_strategies: false,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub engine: Option<String>,
    pub default_language: String,
    pub tessdata_path: Option<String>,
    pub max_file_size: usize,
    pub max_concurrent_solves: usize,
    pub solve_timeout: Duration,
    pub preprocessing: PreprocessingParams,
    pub solver: SolverParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5555,
            engine: None,
            default_language: "eng".to_string(),
            tessdata_path: None,
            max_file_size: 5 * 1024 * 1024,
            max_concurrent_solves: 4,
            solve_timeout: Duration::from_secs(30),
            preprocessing: PreprocessingParams::default(),
            solver: SolverParams::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        self.preprocessing.validate()?;
        if self.max_concurrent_solves == 0 {
            return Err("max concurrent solves must be at least 1".to_string());
        }
        Ok(())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            engine: args.engine,
            default_language: args.default_language,
            tessdata_path: args.tessdata_path,
            max_file_size: args.max_file_size,
            max_concurrent_solves: args.max_concurrent_solves,
            solve_timeout: Duration::from_secs(args.solve_timeout_secs),
            preprocessing: PreprocessingParams {
                clip_limit: args.clip_limit,
                tile_grid: args.tile_grid,
                block_size: args.block_size,
                threshold_offset: args.threshold_offset,
                polarity_midpoint: args.polarity_midpoint,
                global_threshold: args.global_threshold,
                upscale_factor: args.upscale_factor,
            },
            solver: SolverParams {
                min_candidate_len: args.min_candidate_len,
                parallel_strategies: args.parallel_strategies,
            },
        }
    }
}
