#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`QrScannerError`)
//! - [`config`]: Scanner configuration (`QrScannerConfig`, builder)
//! - [`frame`]: Uploaded image to RGB8 frame conversion (`UploadedImage`)
//! - [`scan_loop`]: Camera polling state machine (`CameraScanLoop`, `ScanCancelHandle`)
//! - [`normalizer`]: Raw payload to canonical id (`PayloadNormalizer`)
//! - [`resolver`]: Entity lookup (`EntityResolver`, `Resolution`, `HttpScanLookup`)
//! - [`session`]: Per-attempt state and events (`ScanSession`)
//! - [`pipeline`]: Detected-to-terminal flow (`ResolutionPipeline`, `ScanReport`, `ScanOutcome`)
//! - [`scanner`]: Entry points per acquisition source (`QrScanner`, `QrScannerBuilder`)
//! - [`dispatch`]: Consumer projections (`ResultDispatcher`, `ScanConsumer`, adapters)
//! - [`headless`]: Collaborators for hosts without a camera (`NoCamera`, `NoDecoder`)
//!
//! # Architecture
//!
//! ```text
//! CameraDevice --> CameraScanLoop --+
//! image bytes  --> UploadedImage ---+--> FrameDecoder --> ScanSession (Detected)
//! manual text ----------------------+                          |
//!                                                     PayloadNormalizer
//!                                                              |
//!                                               EntityResolver --> ScanLookup
//!                                                              |
//!                                                         ScanReport
//!                                                              |
//!                                   ResultDispatcher --> identifier / autofill / detail consumers
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod headless;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod scan_loop;
pub mod scanner;
pub mod session;

// --- Public API Re-exports ---

// Scanner (entry points)
pub use scanner::{QrScanner, QrScannerBuilder};

// Configuration
pub use config::{QrScannerConfig, QrScannerConfigBuilder};

// Error
pub use error::QrScannerError;

// Acquisition
pub use frame::UploadedImage;
pub use headless::{NoCamera, NoDecoder};
pub use scan_loop::{CameraScanLoop, ScanCancelHandle};

// Normalization and resolution
pub use normalizer::PayloadNormalizer;
pub use pipeline::{
    DegradedResult, ResolutionPipeline, ScanFailure, ScanOutcome, ScanReport, display_identifier,
};
pub use resolver::{EntityResolver, HttpScanLookup, Resolution};
pub use session::ScanSession;

// Dispatch
pub use dispatch::{
    AutofillFields, AutofillProfile, Delivery, DispatchSummary, EntityIdField, Interest,
    ManufacturerForm, RecipientForm, ResultDispatcher, ScanConsumer, TraceabilityPanel,
    TraceabilityView,
};
