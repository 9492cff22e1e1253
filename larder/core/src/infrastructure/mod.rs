// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Concrete implementations of domain seams: repositories,
//!   identifier sources and tracing setup

pub mod ids;
pub mod repositories;
pub mod telemetry;

pub use ids::{RandomIdSource, SequentialIdSource};
pub use repositories::InMemoryCookbookRepository;
pub use telemetry::init_tracing;
