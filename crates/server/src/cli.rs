//! Command line interface: argument definitions and batch encoding.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use phono_core::format::{
    RateControl, BIT_DEPTH, BIT_RATE, BIT_RATE_MODE, CHANNEL_MODE, QUALITY, USE_QUALITY,
    VBR_QUALITY,
};
use phono_core::{ConversionRequest, ConversionService, Outcome, RawParams};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "phono", version, about = "Convert audio between WAV, MP3 and FLAC")]
pub struct Cli {
    /// Config file (defaults to $PHONO_CONFIG, then ./phono.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Convert files in place
    Encode {
        #[command(subcommand)]
        target: EncodeTarget,
    },
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,
    /// Base directory for temporary output files
    #[arg(long)]
    pub tempdir: Option<PathBuf>,
    /// Frames per pipeline buffer
    #[arg(long)]
    pub buffersize: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum EncodeTarget {
    /// Encode to WAV
    Wav(WavArgs),
    /// Encode to MP3
    Mp3(Mp3Args),
}

#[derive(Debug, Args)]
pub struct WavArgs {
    /// Sample bit depth
    #[arg(long, default_value_t = 24)]
    pub bitdepth: u16,
    /// Frames per pipeline buffer
    #[arg(long)]
    pub buffersize: Option<usize>,
    /// Files or directories to convert
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct Mp3Args {
    /// 0 = mono, 1 = stereo, 2 = joint stereo
    #[arg(long, default_value_t = 2)]
    pub channelmode: u8,
    /// VBR, CBR or ABR
    #[arg(long, default_value = "vbr")]
    pub bitratemode: String,
    /// VBR quality (0-9) under VBR, kbps otherwise
    #[arg(long, default_value_t = 4)]
    pub bitrate: u16,
    /// Encoder quality (0-9); enables the quality setting when present
    #[arg(long)]
    pub quality: Option<u8>,
    /// Frames per pipeline buffer
    #[arg(long)]
    pub buffersize: Option<usize>,
    /// Files or directories to convert
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

impl EncodeTarget {
    pub fn output_format(&self) -> &'static str {
        match self {
            EncodeTarget::Wav(_) => "wav",
            EncodeTarget::Mp3(_) => "mp3",
        }
    }

    pub fn buffer_size(&self) -> Option<usize> {
        match self {
            EncodeTarget::Wav(args) => args.buffersize,
            EncodeTarget::Mp3(args) => args.buffersize,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        match self {
            EncodeTarget::Wav(args) => &args.paths,
            EncodeTarget::Mp3(args) => &args.paths,
        }
    }

    /// Encoder parameters under their canonical names.
    pub fn params(&self) -> RawParams {
        match self {
            EncodeTarget::Wav(args) => RawParams::new().with(BIT_DEPTH, args.bitdepth.to_string()),
            EncodeTarget::Mp3(args) => {
                let rate_param = match RateControl::parse(&args.bitratemode) {
                    Some(RateControl::Vbr) => VBR_QUALITY,
                    _ => BIT_RATE,
                };
                let mut params = RawParams::new()
                    .with(BIT_RATE_MODE, args.bitratemode.clone())
                    .with(rate_param, args.bitrate.to_string())
                    .with(CHANNEL_MODE, args.channelmode.to_string());
                if let Some(quality) = args.quality {
                    params.insert(USE_QUALITY, "true");
                    params.insert(QUALITY, quality.to_string());
                }
                params
            }
        }
    }
}

/// Per-run totals for `phono encode`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when `cancel` stopped the run early.
    pub interrupted: bool,
}

/// Converts every supported file under `target.paths()`.
///
/// Parameters are validated once up front; an invalid set fails the whole
/// run before any file is touched. Individual file failures are logged and
/// counted. Once `cancel` is set no further file is started; the service is
/// expected to abort the file in progress.
pub fn run_encode(
    service: &ConversionService,
    target: &EncodeTarget,
    cancel: &AtomicBool,
) -> Result<EncodeSummary> {
    let format = target.output_format();
    let params = target.params();
    let encoder = service
        .validate_params(format, &params)
        .context("Invalid encoder parameters")?;
    let extension = service
        .registry()
        .resolve_output_format(format)
        .map(|f| f.default_extension())
        .context("Output format is not available")?;
    info!(format = %format, params = ?encoder, "Encoding files");

    // Collect first so outputs written during the run are not picked up.
    let mut files = Vec::new();
    for path in target.paths() {
        collect_files(path, &mut files)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }

    let mut summary = EncodeSummary::default();
    for file in files {
        if cancel.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }
        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            summary.skipped += 1;
            continue;
        };
        if service.registry().resolve_input_format(name).is_err() {
            debug!(path = %file.display(), "Skipping unsupported file");
            summary.skipped += 1;
            continue;
        }

        match convert_file(service, &file, name, format, extension, &params) {
            Ok(dest) => {
                info!(source = %file.display(), dest = %dest.display(), "Converted");
                summary.converted += 1;
            }
            Err(_) if cancel.load(Ordering::SeqCst) => {
                warn!(path = %file.display(), "Conversion cancelled");
                summary.interrupted = true;
                break;
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(path = %file.display(), error = %reason, "Conversion failed");
                summary.failed += 1;
            }
        }
    }

    info!(
        converted = summary.converted,
        failed = summary.failed,
        skipped = summary.skipped,
        interrupted = summary.interrupted,
        "Encoding finished"
    );
    Ok(summary)
}

fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    if path.is_dir() {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        for entry in entries {
            collect_files(&entry, files)?;
        }
    } else if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        warn!(path = %path.display(), "Path does not exist");
    }
    Ok(())
}

fn convert_file(
    service: &ConversionService,
    source: &Path,
    name: &str,
    format: &str,
    extension: &str,
    params: &RawParams,
) -> Result<PathBuf> {
    let input = File::open(source).context("Failed to open input")?;
    let request = ConversionRequest::new(input, name, format, params.clone());

    let mut output = match service.convert(request) {
        Outcome::Success(output) => output,
        outcome => {
            let reason = outcome
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| outcome.label().to_string());
            anyhow::bail!("{}", reason);
        }
    };

    let dest = unique_output_path(source, extension);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    if let Err(e) = io::copy(&mut output, &mut file) {
        drop(file);
        let _ = fs::remove_file(&dest);
        return Err(e).with_context(|| format!("Failed to write {}", dest.display()));
    }
    Ok(dest)
}

/// `<stem><ext>` next to `source`, or `<stem>_<n><ext>` when that exists.
pub fn unique_output_path(source: &Path, extension: &str) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");

    let candidate = dir.join(format!("{}{}", stem, extension));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_wav_defaults() {
        let cli = parse(&["phono", "encode", "wav", "a.flac"]);
        let Command::Encode { target } = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(target.output_format(), "wav");
        assert_eq!(target.params().get(BIT_DEPTH), Some("24"));
        assert_eq!(target.buffer_size(), None);
    }

    #[test]
    fn test_mp3_vbr_maps_bitrate_to_vbr_quality() {
        let cli = parse(&["phono", "encode", "mp3", "--bitrate", "2", "in"]);
        let Command::Encode { target } = cli.command else {
            panic!("expected encode");
        };
        let params = target.params();
        assert_eq!(params.get(BIT_RATE_MODE), Some("vbr"));
        assert_eq!(params.get(VBR_QUALITY), Some("2"));
        assert_eq!(params.get(BIT_RATE), None);
        assert_eq!(params.get(CHANNEL_MODE), Some("2"));
        assert_eq!(params.get(USE_QUALITY), None);
    }

    #[test]
    fn test_mp3_cbr_with_quality() {
        let cli = parse(&[
            "phono",
            "encode",
            "mp3",
            "--bitratemode",
            "cbr",
            "--bitrate",
            "192",
            "--quality",
            "3",
            "--buffersize",
            "512",
            "in",
        ]);
        let Command::Encode { target } = cli.command else {
            panic!("expected encode");
        };
        let params = target.params();
        assert_eq!(params.get(BIT_RATE), Some("192"));
        assert_eq!(params.get(VBR_QUALITY), None);
        assert_eq!(params.get(USE_QUALITY), Some("true"));
        assert_eq!(params.get(QUALITY), Some("3"));
        assert_eq!(target.buffer_size(), Some(512));
    }

    #[test]
    fn test_encode_requires_paths() {
        assert!(Cli::try_parse_from(["phono", "encode", "wav"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = parse(&["phono", "serve", "--port", "9000", "--config", "/etc/phono.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/phono.toml")));
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(9000));
    }

    fn encode_target(args: &[&str]) -> EncodeTarget {
        match parse(args).command {
            Command::Encode { target } => target,
            other => panic!("expected encode, got {:?}", other),
        }
    }

    fn service(temp_dir: &Path) -> ConversionService {
        ConversionService::new(
            std::sync::Arc::new(phono_core::FormatRegistry::builtin()),
            phono_core::ConverterConfig::default().with_temp_dir(temp_dir),
        )
    }

    #[test]
    fn test_run_encode_converts_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        phono_core::testing::fixtures::write_wav_file(&dir.path().join("a.wav"), 1_000);
        fs::write(dir.path().join("readme.txt"), b"hi").unwrap();

        let path = dir.path().to_string_lossy().to_string();
        let target = encode_target(&["phono", "encode", "wav", "--bitdepth", "16", &path]);
        let summary = run_encode(&service(work.path()), &target, &AtomicBool::new(false)).unwrap();

        assert_eq!(
            summary,
            EncodeSummary {
                converted: 1,
                failed: 0,
                skipped: 1,
                interrupted: false,
            }
        );
        assert!(dir.path().join("a_1.wav").is_file());
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_run_encode_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        phono_core::testing::fixtures::write_wav_file(&dir.path().join("a.wav"), 1_000);

        let path = dir.path().to_string_lossy().to_string();
        let target = encode_target(&["phono", "encode", "mp3", &path]);
        let summary = run_encode(&service(work.path()), &target, &AtomicBool::new(true)).unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.converted, 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unique_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("take.wav");
        fs::write(&source, b"x").unwrap();

        assert_eq!(unique_output_path(&source, ".mp3"), dir.path().join("take.mp3"));
        assert_eq!(unique_output_path(&source, ".wav"), dir.path().join("take_1.wav"));

        fs::write(dir.path().join("take_1.wav"), b"x").unwrap();
        assert_eq!(unique_output_path(&source, ".wav"), dir.path().join("take_2.wav"));
    }
}
