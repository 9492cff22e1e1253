// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Larder Core
//!
//! Cookbook aggregates with per-instance computed-value caching, and the
//! three-representation conversion pipeline (domain ↔ API ↔ storage).
//!
//! # Architecture
//!
//! - **Domain Layer:** entities, value objects, cache ledger, repository contract
//! - **Application Layer:** API views, collection transformer, adapter registry,
//!   conversion pipeline, cookbook service
//! - **Infrastructure Layer:** in-memory repository, id sources, telemetry

pub mod domain;
pub mod application;
pub mod infrastructure;
