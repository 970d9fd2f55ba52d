//! On-disk path definitions for SNR run artefacts.
//!
//! This module defines the workspace layout. It contains **no I/O logic** - only typed path
//! construction.

pub mod common;
pub mod volumes;
