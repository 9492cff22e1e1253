// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Provides the mutable, invariant-enforcing side of the larder model.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Aggregates, value objects and the per-instance cache ledger

pub mod cache;
pub mod config;
pub mod cookbook;
pub mod entity;
pub mod error;
pub mod events;
pub mod nutrition;
pub mod rating;
pub mod record;
pub mod repository;
pub mod tag;
