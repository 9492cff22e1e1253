// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Immutable API views, the conversion pipeline between the
//!   domain, API and storage forms, and the cookbook use-case service

pub mod conversion;
pub mod cookbook_service;
pub mod view;

pub use conversion::{
    Conversion, ConversionError, ConversionIncompleteError, ConversionPipeline, ValidationFailure,
};
pub use cookbook_service::{CookbookService, CookbookUpdate, StandardCookbookService};
pub use view::{CookbookView, CookbookViewFields, RecipeView, RecipeViewFields};
