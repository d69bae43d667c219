// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Optional subscriber wiring for the `tracing` diagnostics every module in this crate emits
//! through. The crate itself never installs a subscriber; this module is a convenience for
//! embedding applications that want one with minimal setup, gated behind the `profiling` feature
//! so the dependency is not paid by consumers who configure their own.

#![cfg(feature = "profiling")]

use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a stderr subscriber honoring `RUST_LOG`, defaulting to `info` when unset.
pub fn init_stderr() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Installs a non-blocking rolling file subscriber under `directory`, returning the guard that
/// must be kept alive for the duration of logging (dropping it flushes and stops the writer).
pub fn init_file(directory: impl AsRef<Path>, file_prefix: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::daily(directory, file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(writer).try_init();
    guard
}
