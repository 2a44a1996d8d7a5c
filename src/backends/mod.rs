// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for platform collaborators
//!
//! This module provides platform-specific backend implementations for:
//! - Camera capture via V4L2 (or a still image standing in for a camera)
//! - Position fixes via GeoClue2 (or a fixed configured position)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  App Layer                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │   Camera    │    │   Geolocation    │   │
//! │  │ (V4L2/File) │    │ (GeoClue/Fixed)  │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera backends with device enumeration and frame capture
//! - [`geolocation`]: One-shot position fixes with timeout and policy

pub mod camera;
pub mod geolocation;
