//! Converter module: the conversion request pipeline.
//!
//! A [`ConversionJob`] resolves the input and output formats, validates the
//! encoder parameters, builds the codecs through a [`CodecFactory`], acquires
//! a scoped output from an [`OutputProvider`], streams through a
//! [`PipelineRunner`] and hands back a rewound [`ConvertedOutput`]. The output
//! is released exactly once whatever happens.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use phono_core::converter::{ConversionRequest, ConversionService, ConverterConfig, Outcome};
//! use phono_core::{FormatRegistry, RawParams};
//!
//! let service = ConversionService::new(Arc::new(FormatRegistry::builtin()), ConverterConfig::default());
//!
//! let request = ConversionRequest::new(
//!     std::fs::File::open("track.wav")?,
//!     "track.wav",
//!     "mp3",
//!     RawParams::new()
//!         .with("bitRateMode", "VBR")
//!         .with("vbrQuality", "4")
//!         .with("channelMode", "2"),
//! );
//!
//! match service.convert(request) {
//!     Outcome::Success(output) => println!("{} bytes of {}", output.byte_len(), output.content_type()),
//!     other => eprintln!("{:?}", other.error()),
//! }
//! ```

mod config;
mod error;
mod factory;
mod job;
mod output;
mod runner;
mod service;
mod types;

pub use config::ConverterConfig;
pub use error::{ConvertError, ErrorClass};
pub use factory::{BoundEncoder, CodecFactory, ConfiguredEncoder, StreamFactory};
pub use job::{output_file_name, ConversionJob};
pub use output::{OutputHint, OutputProvider, ScopedOutput, TempFileProvider};
pub use runner::{PipelineReport, PipelineRunner, PipelineState};
pub use service::ConversionService;
pub use types::{ConversionRequest, ConvertedOutput, JobState, Outcome};
